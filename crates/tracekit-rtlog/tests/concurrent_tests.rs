//! Concurrency tests for the circular trace log.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::thread;
use tracekit_rtlog::RtTraceLog;

#[test]
fn many_producers_record_without_loss_before_wrap() {
    let log = Arc::new(RtTraceLog::new(0x1000));
    let producers = 8;
    let per_producer = 100;

    let mut handles = vec![];
    for producer in 0..producers {
        let log = Arc::clone(&log);
        let handle = thread::Builder::new()
            .name(format!("producer-{producer}"))
            .spawn(move || {
                for sequence in 0..per_producer {
                    log.record(format!("p{producer}-m{sequence}"));
                }
            })
            .unwrap();
        handles.push(handle);
    }
    for handle in handles {
        assert!(handle.join().is_ok(), "producer should not panic");
    }

    // Total is well below capacity, so every record must survive.
    let entries = log.snapshot_oldest_first();
    assert_eq!(entries.len(), producers * per_producer);

    // Per-producer order is preserved even though the global interleaving
    // is arbitrary.
    for producer in 0..producers {
        let own: Vec<_> = entries
            .iter()
            .filter(|entry| entry.thread == format!("producer-{producer}"))
            .collect();
        assert_eq!(own.len(), per_producer);
        for (sequence, entry) in own.iter().enumerate() {
            assert_eq!(entry.message, format!("p{producer}-m{sequence}"));
        }
    }
}

#[test]
fn snapshot_during_recording_is_consistent() {
    let log = Arc::new(RtTraceLog::new(0x100));
    let writer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for sequence in 0..10_000 {
                log.record(format!("w-{sequence}"));
            }
        })
    };

    for _ in 0..50 {
        let entries = log.snapshot_oldest_first();
        assert!(entries.len() <= log.capacity());
        // At most one entry may be mid-write (cursor claimed, slot not yet
        // filled); everything else must be fully written, never torn.
        let in_flight = entries.iter().filter(|entry| entry.elapsed_ns == 0).count();
        assert!(in_flight <= 1);
        for entry in entries.iter().filter(|entry| entry.elapsed_ns > 0) {
            assert!(entry.message.starts_with("w-"));
        }
    }

    assert!(writer.join().is_ok(), "writer should not panic");
}
