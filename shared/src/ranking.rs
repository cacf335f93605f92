//! Ranking and typing statistics.

use crate::RankedResult;
use std::cmp::Ordering;

/// Orders results by wpm, then accuracy, both descending, and assigns
/// 1-based positions.
///
/// The sort is stable, so entries that tie on both keys keep the order they
/// were given in. Any incoming `position` is overwritten.
pub fn rank_results(mut results: Vec<RankedResult>) -> Vec<RankedResult> {
    results.sort_by(|a, b| match b.wpm.cmp(&a.wpm) {
        Ordering::Equal => b.accuracy.total_cmp(&a.accuracy),
        other => other,
    });

    for (index, result) in results.iter_mut().enumerate() {
        result.position = index as u32 + 1;
    }

    results
}

/// Live statistics for a partially typed passage.
///
/// A character counts as correct when it matches the passage at the same
/// index. Words are five correct characters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TypingStats {
    pub wpm: u32,
    pub accuracy: f64,
    pub correct_chars: u32,
    pub incorrect_chars: u32,
    pub total_chars: u32,
}

impl TypingStats {
    pub fn compute(typed: &str, passage: &str, elapsed_secs: f64) -> Self {
        let total_chars = typed.chars().count() as u32;
        let correct_chars = typed
            .chars()
            .zip(passage.chars())
            .filter(|(typed, expected)| typed == expected)
            .count() as u32;
        let incorrect_chars = total_chars - correct_chars;

        let accuracy = if total_chars > 0 {
            (f64::from(correct_chars) / f64::from(total_chars) * 100.0).round()
        } else {
            0.0
        };

        let minutes = elapsed_secs / 60.0;
        let wpm = if minutes > 0.0 {
            (f64::from(correct_chars) / 5.0 / minutes).round() as u32
        } else {
            0
        };

        Self {
            wpm,
            accuracy,
            correct_chars,
            incorrect_chars,
            total_chars,
        }
    }

    /// Share of the passage typed so far, 0-100.
    pub fn progress(typed: &str, passage: &str) -> f64 {
        let passage_len = passage.chars().count();
        if passage_len == 0 {
            return 0.0;
        }
        let typed_len = typed.chars().count().min(passage_len);
        typed_len as f64 / passage_len as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn result(user_id: &str, wpm: u32, accuracy: f64) -> RankedResult {
        RankedResult {
            user_id: user_id.to_string(),
            name: user_id.to_uppercase(),
            wpm,
            accuracy,
            correct_chars: 0,
            incorrect_chars: 0,
            total_chars: 0,
            completed_at: 0,
            position: 0,
        }
    }

    #[test]
    fn test_ranking_breaks_wpm_ties_by_accuracy() {
        let ranked = rank_results(vec![
            result("a", 80, 90.0),
            result("b", 80, 95.0),
            result("c", 60, 99.0),
        ]);

        let order: Vec<(&str, u32)> = ranked
            .iter()
            .map(|r| (r.user_id.as_str(), r.position))
            .collect();
        assert_eq!(order, vec![("b", 1), ("a", 2), ("c", 3)]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let ranked = rank_results(vec![
            result("first", 50, 90.0),
            result("second", 50, 90.0),
            result("third", 50, 90.0),
        ]);

        assert_eq!(ranked[0].user_id, "first");
        assert_eq!(ranked[1].user_id, "second");
        assert_eq!(ranked[2].user_id, "third");
        assert_eq!(ranked[2].position, 3);
    }

    #[test]
    fn test_ranking_empty() {
        assert!(rank_results(Vec::new()).is_empty());
    }

    #[test]
    fn test_stats_for_perfect_typing() {
        // 50 correct characters in 30 seconds: 10 words in half a minute.
        let passage = "a".repeat(60);
        let typed = "a".repeat(50);
        let stats = TypingStats::compute(&typed, &passage, 30.0);

        assert_eq!(stats.correct_chars, 50);
        assert_eq!(stats.incorrect_chars, 0);
        assert_eq!(stats.total_chars, 50);
        assert_eq!(stats.wpm, 20);
        assert_approx_eq!(stats.accuracy, 100.0);
    }

    #[test]
    fn test_stats_count_mismatches() {
        let stats = TypingStats::compute("hxllo", "hello world", 60.0);

        assert_eq!(stats.correct_chars, 4);
        assert_eq!(stats.incorrect_chars, 1);
        assert_approx_eq!(stats.accuracy, 80.0);
        assert_eq!(stats.correct_chars + stats.incorrect_chars, stats.total_chars);
    }

    #[test]
    fn test_stats_before_any_input() {
        let stats = TypingStats::compute("", "hello", 0.0);
        assert_eq!(stats, TypingStats::default());
    }

    #[test]
    fn test_progress_is_capped() {
        assert_approx_eq!(TypingStats::progress("hel", "hello world!"), 25.0);
        assert_approx_eq!(TypingStats::progress("hello world!!!", "hello world!"), 100.0);
        assert_approx_eq!(TypingStats::progress("abc", ""), 0.0);
    }
}
