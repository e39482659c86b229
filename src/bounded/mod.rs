mod channel;
pub(crate) mod inner_queue;

pub use channel::{BoundedQueueChannel, Consumer, Producer};
pub use inner_queue::{BoundedQueue, Position, QueueState};

#[cfg(test)]
mod tests {
    use super::{BoundedQueueChannel, QueueState};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn basic_insert_remove() {
        let (producer, consumer) = BoundedQueueChannel::split(1).unwrap();
        assert_eq!(producer.insert(10), 0);
        assert_eq!(consumer.remove(), (10, 0));
    }

    #[test]
    fn zero_capacity_split_fails() {
        assert!(BoundedQueueChannel::split::<u8>(0).is_err());
    }

    #[test]
    fn third_insert_blocks_until_remove() {
        let (producer, consumer) = BoundedQueueChannel::split(2).unwrap();
        assert_eq!(producer.insert("A"), 0);
        assert_eq!(producer.state(), QueueState::Partial);
        assert_eq!(producer.insert("B"), 1);
        assert_eq!(producer.state(), QueueState::Full);

        let inserted = Arc::new(AtomicBool::new(false));
        let blocked = {
            let producer = producer.clone();
            let inserted = Arc::clone(&inserted);
            thread::spawn(move || {
                let position = producer.insert("C");
                inserted.store(true, Ordering::SeqCst);
                position
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!inserted.load(Ordering::SeqCst));
        assert_eq!(consumer.len(), 2);

        assert_eq!(consumer.remove(), ("A", 0));
        assert_eq!(blocked.join().unwrap(), 2);
        assert!(inserted.load(Ordering::SeqCst));

        assert_eq!(consumer.remove(), ("B", 1));
        assert_eq!(consumer.remove(), ("C", 2));
        assert!(consumer.is_empty());
    }

    #[test]
    fn capacity_one_preserves_order() {
        let (producer, consumer) = BoundedQueueChannel::split(1).unwrap();
        let t = thread::spawn(move || {
            for i in 1..=1000u32 {
                producer.insert(i);
            }
        });

        let received: Vec<u32> = (0..1000).map(|_| consumer.remove().0).collect();
        t.join().unwrap();
        assert_eq!(received, (1..=1000).collect::<Vec<_>>());
    }

    #[test]
    fn single_producer_single_consumer_with_jitter() {
        let (producer, consumer) = BoundedQueueChannel::split(3).unwrap();
        let t = thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(7);
            for i in 0..500u64 {
                if rng.random_bool(0.1) {
                    thread::sleep(Duration::from_micros(rng.random_range(0..200)));
                }
                assert_eq!(producer.insert(i), i);
            }
        });

        let mut rng = SmallRng::seed_from_u64(11);
        for i in 0..500u64 {
            if rng.random_bool(0.1) {
                thread::sleep(Duration::from_micros(rng.random_range(0..200)));
            }
            assert_eq!(consumer.remove(), (i, i));
        }
        t.join().unwrap();
    }

    // Which blocked producer wins a freed slot is unspecified; only the set
    // of delivered items is checked.
    #[test]
    fn every_blocked_producer_eventually_completes() {
        let (producer, consumer) = BoundedQueueChannel::split(1).unwrap();
        producer.insert(0u32);

        let handles: Vec<_> = (1..=4u32)
            .map(|token| {
                let producer = producer.clone();
                thread::spawn(move || {
                    producer.insert(token);
                })
            })
            .collect();

        let mut received = HashSet::new();
        for _ in 0..5 {
            assert!(received.insert(consumer.remove().0));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(received, (0..=4).collect());
        assert!(consumer.is_empty());
    }

    #[test]
    fn every_blocked_consumer_eventually_completes() {
        let (producer, consumer) = BoundedQueueChannel::split(2).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let consumer = consumer.clone();
                thread::spawn(move || consumer.remove().0)
            })
            .collect();

        for token in 100..104u32 {
            producer.insert(token);
        }

        let received: HashSet<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(received, (100..104).collect());
    }

    #[test]
    fn many_producers_many_consumers_stress() {
        const THREADS: u64 = 10;
        const OPS: u64 = 10_000;
        const CAPACITY: usize = 16;

        let (producer, consumer) = BoundedQueueChannel::split(CAPACITY).unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let sampler = {
            let consumer = consumer.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut samples = 0u64;
                while !done.load(Ordering::Relaxed) {
                    let (head, tail) = consumer.counters();
                    assert!(head <= tail);
                    assert!(tail - head <= CAPACITY as u64);
                    samples += 1;
                    thread::yield_now();
                }
                samples
            })
        };

        let producers: Vec<_> = (0..THREADS)
            .map(|p| {
                let producer = producer.clone();
                thread::spawn(move || {
                    for i in 0..OPS {
                        producer.insert(p * OPS + i);
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..THREADS)
            .map(|_| {
                let consumer = consumer.clone();
                thread::spawn(move || (0..OPS).map(|_| consumer.remove().0).collect::<Vec<_>>())
            })
            .collect();

        for handle in producers {
            handle.join().unwrap();
        }
        let batches: Vec<Vec<u64>> = consumers.into_iter().map(|h| h.join().unwrap()).collect();
        done.store(true, Ordering::Relaxed);
        assert!(sampler.join().unwrap() > 0);

        // Each consumer sees a subsequence of the global FIFO order, so the
        // tokens of any one producer arrive in increasing order.
        for batch in &batches {
            let mut last = vec![None; THREADS as usize];
            for &token in batch {
                let p = (token / OPS) as usize;
                assert!(last[p].is_none_or(|prev| prev < token));
                last[p] = Some(token);
            }
        }

        let mut all: Vec<u64> = batches.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..THREADS * OPS).collect::<Vec<_>>());
        assert_eq!(consumer.counters(), (THREADS * OPS, THREADS * OPS));
        assert!(consumer.is_empty());
    }
}
