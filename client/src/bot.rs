//! Simulated typist.
//!
//! The bot types a passage at a steady target speed, fumbling a fraction of
//! keystrokes, and reports the same figures a human client would.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{now_millis, SubmittedResult, TypingStats};
use std::time::Duration;

pub struct TypingBot {
    passage: Vec<char>,
    typed: String,
    target_wpm: u32,
    error_rate: f64,
    rng: StdRng,
}

impl TypingBot {
    pub fn new(passage: &str, target_wpm: u32, error_rate: f64, seed: u64) -> Self {
        Self {
            passage: passage.chars().collect(),
            typed: String::new(),
            target_wpm,
            error_rate: error_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Keystrokes per second at the target speed.
    pub fn chars_per_second(&self) -> f64 {
        f64::from(self.target_wpm) * 5.0 / 60.0
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    fn passage_text(&self) -> String {
        self.passage.iter().collect()
    }

    pub fn is_done(&self) -> bool {
        self.typed.chars().count() >= self.passage.len()
    }

    /// Catches the typed text up to where the bot should be after `elapsed`.
    pub fn advance(&mut self, elapsed: Duration) {
        let target = ((elapsed.as_secs_f64() * self.chars_per_second()) as usize).min(self.passage.len());
        let mut position = self.typed.chars().count();

        while position < target {
            let expected = self.passage[position];
            let key = if self.rng.gen_bool(self.error_rate) {
                fumble(expected)
            } else {
                expected
            };
            self.typed.push(key);
            position += 1;
        }
    }

    pub fn progress(&self) -> f64 {
        TypingStats::progress(&self.typed, &self.passage_text())
    }

    pub fn stats(&self, elapsed: Duration) -> TypingStats {
        TypingStats::compute(&self.typed, &self.passage_text(), elapsed.as_secs_f64())
    }

    pub fn result(&self, elapsed: Duration) -> SubmittedResult {
        let stats = self.stats(elapsed);
        SubmittedResult {
            wpm: stats.wpm,
            accuracy: stats.accuracy,
            correct_chars: stats.correct_chars,
            incorrect_chars: stats.incorrect_chars,
            total_chars: stats.total_chars,
            completed_at: Some(now_millis()),
        }
    }
}

fn fumble(expected: char) -> char {
    if expected == 'x' {
        'z'
    } else {
        'x'
    }
}
