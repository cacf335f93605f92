//! Final standings for a race.
//!
//! Entrants who submitted are ranked on their submitted numbers. Anyone who
//! did not is ranked on the last live figures they reported, with zero
//! character counts and a completion time of "now".

use crate::room::Participant;
use shared::{rank_results, ConnectionId, RankedResult, SubmittedResult};
use std::collections::HashMap;

/// True once every entrant has a submitted result.
///
/// A race with no entrants left is also complete.
pub fn all_submitted<'a, I>(entrants: I, results: &HashMap<ConnectionId, SubmittedResult>) -> bool
where
    I: IntoIterator<Item = &'a Participant>,
{
    entrants
        .into_iter()
        .all(|participant| results.contains_key(&participant.connection_id))
}

/// Resolves one result per entrant and ranks them.
///
/// `entrants` should be given in join order so full ties stay stable.
pub fn standings<'a, I>(
    entrants: I,
    results: &HashMap<ConnectionId, SubmittedResult>,
    now: u64,
) -> Vec<RankedResult>
where
    I: IntoIterator<Item = &'a Participant>,
{
    let resolved = entrants
        .into_iter()
        .map(|participant| resolve(participant, results.get(&participant.connection_id), now))
        .collect();

    rank_results(resolved)
}

fn resolve(participant: &Participant, submitted: Option<&SubmittedResult>, now: u64) -> RankedResult {
    let user = &participant.user;
    match submitted {
        Some(result) => RankedResult {
            user_id: user.id.clone(),
            name: user.name.clone(),
            wpm: result.wpm,
            accuracy: result.accuracy,
            correct_chars: result.correct_chars,
            incorrect_chars: result.incorrect_chars,
            total_chars: result.total_chars,
            completed_at: result.completed_at.unwrap_or(now),
            position: 0,
        },
        None => RankedResult {
            user_id: user.id.clone(),
            name: user.name.clone(),
            wpm: participant.current_wpm,
            accuracy: participant.current_accuracy,
            correct_chars: 0,
            incorrect_chars: 0,
            total_chars: 0,
            completed_at: now,
            position: 0,
        },
    }
}
