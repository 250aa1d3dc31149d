#![cfg(test)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use crate::config::{ConsistencyMode, DispatcherConfig};
use crate::event::{DispatchMode, EventDispatcher, Listener, Priority};

use super::common::{TickEvent, counting_tick};

fn run_parallel_register_and_post(dispatcher: Arc<EventDispatcher>) {
    const THREADS: usize = 100;
    let counter = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dispatcher.register(counting_tick(&counter));
                dispatcher.post(&TickEvent).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Each post sees at least the listener its own thread registered
    assert!(counter.load(Ordering::SeqCst) >= THREADS);
    assert_eq!(dispatcher.registry().len(crate::event::TypeKey::of::<TickEvent>()), THREADS);
}

#[test]
fn test_parallel_register_and_post_snapshot() {
    run_parallel_register_and_post(Arc::new(EventDispatcher::new()));
}

#[test]
fn test_parallel_register_and_post_serialized() {
    let config = DispatcherConfig {
        consistency: ConsistencyMode::Serialized,
        ..DispatcherConfig::default()
    };
    run_parallel_register_and_post(Arc::new(EventDispatcher::with_config(config)));
}

#[test]
fn test_posts_observe_consistent_order_under_churn() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let violation = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    // Every post records the priorities it saw; they must never increase
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for value in [-50i8, 0, 50] {
        let seen = Arc::clone(&seen);
        dispatcher.register(Listener::builder::<TickEvent>().priority(value).build(move |_| {
            seen.lock().push(value);
            Ok(())
        }));
    }

    let churn = {
        let dispatcher = Arc::clone(&dispatcher);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut round: i8 = 0;
            while !stop.load(Ordering::SeqCst) {
                let listener = Listener::builder::<TickEvent>()
                    .priority(Priority(round % 40))
                    .build(|_| Ok(()));
                dispatcher.register(listener.clone());
                dispatcher.deregister(&listener);
                round = round.wrapping_add(1);
            }
        })
    };

    let posters: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let violation = Arc::clone(&violation);
            thread::spawn(move || {
                for _ in 0..200 {
                    let sequence = dispatcher
                        .registry()
                        .snapshot(crate::event::TypeKey::of::<TickEvent>())
                        .unwrap_or_default();
                    if sequence.windows(2).any(|pair| pair[0].priority() < pair[1].priority()) {
                        violation.store(true, Ordering::SeqCst);
                    }
                    dispatcher.post(&TickEvent).unwrap();
                }
            })
        })
        .collect();
    for poster in posters {
        poster.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    churn.join().unwrap();

    assert!(!violation.load(Ordering::SeqCst));
    assert_eq!(seen.lock().len(), 4 * 200 * 3);
    assert_eq!(dispatcher.registry().len(crate::event::TypeKey::of::<TickEvent>()), 3);
}

#[test]
fn test_parallel_asynchronous_posts() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        dispatcher.register(counting_tick(&counter));
    }

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                dispatcher
                    .post_with(Arc::new(TickEvent), DispatchMode::AsynchronousAwait)
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(!handle.join().unwrap());
    }
    assert_eq!(counter.load(Ordering::SeqCst), 16 * 4);
}
