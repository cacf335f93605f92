//! Performance benchmarks for hot paths in the coordinator

use server::dispatcher::{fan_out, Outbox};
use shared::{
    decode_message, encode_event, rank_results, ConnectionId, RankedResult, ServerEvent,
    TypingStats,
};
use std::time::Instant;

fn racer(i: u32) -> RankedResult {
    RankedResult {
        user_id: format!("user-{}", i),
        name: format!("Racer {}", i),
        wpm: (i * 37) % 140,
        accuracy: f64::from((i * 13) % 100),
        correct_chars: 200,
        incorrect_chars: 5,
        total_chars: 205,
        completed_at: u64::from(i),
        position: 0,
    }
}

/// Benchmarks ranking a large room's results
#[test]
fn benchmark_rank_results() {
    let iterations = 1_000;
    let results: Vec<RankedResult> = (0..100).map(racer).collect();
    let start = Instant::now();

    for _ in 0..iterations {
        let ranked = rank_results(results.clone());
        assert_eq!(ranked[0].position, 1);
    }

    let duration = start.elapsed();
    println!(
        "Ranking 100 results: {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks decoding the most frequent client message
#[test]
fn benchmark_decode_progress_update() {
    let frame = br#"{"type":"progress-update","roomCode":"ABC123","progress":42.5,"wpm":71,"accuracy":96.0}"#;
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = decode_message(frame).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Decode progress-update: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks encoding a live update for the wire
#[test]
fn benchmark_encode_live_update() {
    let event = ServerEvent::LiveUpdate {
        user_id: "user-1".to_string(),
        progress: 42.5,
        wpm: 71,
        accuracy: 96.0,
    };
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = encode_event(&event).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Encode live-update: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks fanning a live update out to a full room
#[test]
fn benchmark_fan_out() {
    let mut receivers = Vec::new();
    let outboxes: Vec<Outbox> = (0..50)
        .map(|i| {
            let (outbox, rx) = Outbox::channel(ConnectionId(i), 1_024);
            receivers.push(rx);
            outbox
        })
        .collect();
    let event = ServerEvent::LiveUpdate {
        user_id: "user-1".to_string(),
        progress: 10.0,
        wpm: 60,
        accuracy: 99.0,
    };

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        fan_out(&outboxes, &event);
        for rx in receivers.iter_mut() {
            while rx.try_recv().is_ok() {}
        }
    }

    let duration = start.elapsed();
    println!(
        "Fan-out to 50 outboxes: {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks computing typing stats for a full passage
#[test]
fn benchmark_typing_stats() {
    let passage = "the quick brown fox jumps over the lazy dog ".repeat(10);
    let typed = passage.replace('o', "0");
    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let stats = TypingStats::compute(&typed, &passage, 45.0);
        assert!(stats.accuracy < 100.0);
    }

    let duration = start.elapsed();
    println!(
        "Typing stats: {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2_000);
}
