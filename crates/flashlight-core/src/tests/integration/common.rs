#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::event::{Cancellation, Event, Listener, Stage};

/// Cancelable event fired around a module toggle
#[derive(Debug)]
pub struct ToggleEvent {
    pub module: &'static str,
    pub stage: Stage,
    pub cancellation: Cancellation,
}

impl ToggleEvent {
    pub fn new(module: &'static str, stage: Stage) -> Self {
        Self {
            module,
            stage,
            cancellation: Cancellation::new(),
        }
    }
}

impl Event for ToggleEvent {
    fn cancellation(&self) -> Option<&Cancellation> {
        Some(&self.cancellation)
    }
}

/// Plain per-frame event
#[derive(Debug, Default)]
pub struct TickEvent;

impl Event for TickEvent {}

pub fn counting_tick(counter: &Arc<AtomicUsize>) -> Listener {
    let counter = Arc::clone(counter);
    Listener::new(move |_event: &TickEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}
