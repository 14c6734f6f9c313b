//! Property tests for the SPSC ring queue.

use quickcheck_macros::quickcheck;
use tracekit_ring::RingQueue;

/// A single-threaded reference model: whatever interleaving of enqueues and
/// dequeues we apply, the ring must behave exactly like an unbounded FIFO
/// truncated to `capacity - 1` live items.
#[quickcheck]
fn matches_fifo_model(ops: Vec<Option<u16>>) -> bool {
    let capacity = 9;
    let queue = RingQueue::new(capacity);
    let mut model = std::collections::VecDeque::new();

    for op in ops {
        match op {
            Some(value) => {
                let accepted = queue.try_enqueue(value);
                if model.len() < capacity - 1 {
                    if !accepted {
                        return false;
                    }
                    model.push_back(value);
                } else if accepted {
                    return false;
                }
            }
            None => {
                if queue.try_dequeue() != model.pop_front() {
                    return false;
                }
            }
        }
        if queue.len() != model.len() || queue.len() > capacity - 1 {
            return false;
        }
    }
    true
}

#[quickcheck]
fn peek_matches_queue_contents(values: Vec<u16>) -> bool {
    let queue = RingQueue::new(32);
    let kept: Vec<u16> = values.into_iter().take(31).collect();
    for &value in &kept {
        if !queue.try_enqueue(value) {
            return false;
        }
    }
    kept.iter()
        .enumerate()
        .all(|(offset, &value)| queue.peek_at(offset) == Some(value))
        && queue.peek_at(kept.len()).is_none()
}
