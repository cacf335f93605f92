//! Competition clock: countdown ticks and the forced-finish deadline.
//!
//! Each timer is a spawned task that sleeps and then posts a `ClockEvent`
//! back to the owning room. Handles are kept so every pending timer can be
//! aborted at once. Events carry the round that scheduled them; cancelling
//! starts a new round, so an event that was already queued before the abort
//! is recognised as stale and ignored.

use crate::config::RoomConfig;
use log::debug;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Countdown { round: u64, n: u32 },
    Deadline { round: u64 },
}

impl ClockEvent {
    pub fn round(&self) -> u64 {
        match self {
            ClockEvent::Countdown { round, .. } | ClockEvent::Deadline { round } => *round,
        }
    }
}

pub struct MatchClock {
    config: RoomConfig,
    round: u64,
    timers: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedSender<ClockEvent>,
}

impl MatchClock {
    pub fn new(config: RoomConfig) -> (Self, mpsc::UnboundedReceiver<ClockEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let clock = Self {
            config,
            round: 0,
            timers: Vec::new(),
            events,
        };
        (clock, receiver)
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn is_current(&self, event: &ClockEvent) -> bool {
        event.round() == self.round
    }

    /// Number of timers that have not fired or been aborted yet.
    pub fn pending(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_finished()).count()
    }

    /// Cancels anything pending and starts a countdown in a fresh round.
    ///
    /// Ticks run from `countdown_from` down to 0, the first one a full tick
    /// interval after this call.
    pub fn start_countdown(&mut self) {
        self.cancel();

        let round = self.round;
        let from = self.config.countdown_from;
        let tick = self.config.countdown_tick;
        let events = self.events.clone();

        self.spawn_timer(async move {
            for n in (0..=from).rev() {
                sleep(tick).await;
                if events.send(ClockEvent::Countdown { round, n }).is_err() {
                    return;
                }
            }
        });
    }

    /// Schedules the forced finish `time_limit + finish_grace` from now, in
    /// the current round.
    pub fn schedule_deadline(&mut self, time_limit: Duration) {
        let round = self.round;
        let wait = time_limit + self.config.finish_grace;
        let events = self.events.clone();

        debug!("Round {} deadline in {:?}", round, wait);
        self.spawn_timer(async move {
            sleep(wait).await;
            let _ = events.send(ClockEvent::Deadline { round });
        });
    }

    /// Aborts every pending timer and invalidates events already in flight.
    pub fn cancel(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        self.round += 1;
    }

    fn spawn_timer<F>(&mut self, timer: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.timers.retain(|t| !t.is_finished());
        self.timers.push(tokio::spawn(timer));
    }
}

impl Drop for MatchClock {
    fn drop(&mut self) {
        for timer in &self.timers {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoomConfig {
        RoomConfig {
            countdown_from: 3,
            countdown_tick: Duration::from_secs(1),
            finish_grace: Duration::from_secs(2),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_down_to_zero() {
        let (mut clock, mut events) = MatchClock::new(config());
        clock.start_countdown();
        let round = clock.round();

        for expected in [3, 2, 1, 0] {
            let event = events.recv().await.unwrap();
            assert_eq!(event, ClockEvent::Countdown { round, n: expected });
            assert!(clock.is_current(&event));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let (mut clock, mut events) = MatchClock::new(config());
        let started = tokio::time::Instant::now();
        clock.start_countdown();

        events.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_includes_grace() {
        let (mut clock, mut events) = MatchClock::new(config());
        let started = tokio::time::Instant::now();
        clock.schedule_deadline(Duration::from_secs(30));

        let event = events.recv().await.unwrap();
        assert_eq!(event, ClockEvent::Deadline { round: clock.round() });
        assert!(started.elapsed() >= Duration::from_secs(32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_timers() {
        let (mut clock, mut events) = MatchClock::new(config());
        clock.start_countdown();

        let first = events.recv().await.unwrap();
        clock.cancel();
        assert!(!clock.is_current(&first));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(clock.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_previous_round() {
        let (mut clock, mut events) = MatchClock::new(config());
        clock.start_countdown();
        let stale_round = clock.round();
        clock.start_countdown();

        let event = events.recv().await.unwrap();
        assert_ne!(event.round(), stale_round);
        assert!(clock.is_current(&event));
    }
}
