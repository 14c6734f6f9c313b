//! Multi-producer stress tests for the collector.

#![allow(clippy::unwrap_used)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracekit_collector::{CollectorConfig, TraceCollector};

const PRODUCERS: usize = 4;
const PER_PRODUCER: usize = 500;

#[test]
fn per_producer_order_survives_concurrent_ingestion() {
    let config = CollectorConfig::builder()
        .drain_interval(Duration::from_millis(2))
        .startup_delay(Duration::from_millis(1))
        .max_queue(PRODUCERS * PER_PRODUCER)
        .max_retained(PRODUCERS * PER_PRODUCER)
        .build()
        .unwrap();
    let collector = Arc::new(TraceCollector::new(config).unwrap());

    let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let (_id, backlog) = collector.add_listener(move |batch| {
        let mut seen = sink.lock();
        for message in batch {
            seen.push(message.text.clone());
        }
    });
    assert!(backlog.is_empty());

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let collector = Arc::clone(&collector);
            std::thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    collector.trace(format!("p{producer}:{seq}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    collector.flush(false);

    let seen = received.lock();
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    // Interleaving across producers is arbitrary; within one producer the
    // sequence numbers must be strictly increasing.
    for producer in 0..PRODUCERS {
        let prefix = format!("p{producer}:");
        let sequence: Vec<usize> = seen
            .iter()
            .filter_map(|text| text.strip_prefix(&prefix))
            .map(|seq| seq.parse().unwrap())
            .collect();
        assert_eq!(sequence.len(), PER_PRODUCER);
        assert!(sequence.windows(2).all(|pair| pair[0] < pair[1]));
    }
    collector.shutdown();
}

#[test]
fn concurrent_flush_and_enqueue_lose_nothing_without_overflow() {
    let config = CollectorConfig::builder()
        .drain_interval(Duration::from_secs(3600))
        .startup_delay(Duration::from_secs(3600))
        .max_queue(10_000)
        .max_retained(10_000)
        .build()
        .unwrap();
    let collector = Arc::new(TraceCollector::new(config).unwrap());

    let producer = {
        let collector = Arc::clone(&collector);
        std::thread::spawn(move || {
            for seq in 0..2000 {
                collector.trace(format!("{seq}"));
            }
        })
    };
    for _ in 0..20 {
        collector.flush(false);
    }
    producer.join().unwrap();
    collector.flush(false);

    let snapshot = collector.trace_snapshot(false);
    assert_eq!(snapshot.len(), 2000);
    for (expected, message) in snapshot.iter().enumerate() {
        assert_eq!(message.text, expected.to_string());
    }
    collector.shutdown();
}
