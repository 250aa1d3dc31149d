#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::{
    DispatchMode, EventDispatcher, ListenerGroup, ListenerMethod, ListenerProvider, ListenerResult, MethodTable,
    Priority, Stage,
};

use super::common::{TickEvent, ToggleEvent};

/// A feature module that keeps its listeners in a group and toggles them
struct Module {
    name: &'static str,
    ticks: AtomicUsize,
    group: Mutex<ListenerGroup>,
}

impl Module {
    fn new(name: &'static str) -> Arc<Self> {
        let module = Arc::new(Self {
            name,
            ticks: AtomicUsize::new(0),
            group: Mutex::new(ListenerGroup::new()),
        });
        module.group.lock().unwrap().add_provider(&module);
        module
    }

    fn on_tick(&self, _event: &TickEvent) -> ListenerResult {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Fires the Pre/Post toggle events around enabling the module
    fn set_enabled(&self, dispatcher: &EventDispatcher, enabled: bool) -> bool {
        let pre = ToggleEvent::new(self.name, Stage::Pre);
        if dispatcher.post(&pre).unwrap() {
            return false;
        }
        let group = self.group.lock().unwrap();
        if enabled {
            group.enable(dispatcher);
        } else {
            group.disable(dispatcher);
        }
        dispatcher.post(&ToggleEvent::new(self.name, Stage::Post)).unwrap();
        true
    }
}

impl ListenerProvider for Module {
    fn listener_methods(table: &mut MethodTable<Self>) {
        table.add(ListenerMethod::new("on_tick").handles(Module::on_tick));
    }
}

#[test]
fn test_module_toggle_lifecycle() {
    let dispatcher = EventDispatcher::new();
    let module = Module::new("fullbright");
    let stages = Arc::new(Mutex::new(Vec::new()));

    let stages_clone = Arc::clone(&stages);
    dispatcher.register(crate::event::Listener::new(move |event: &ToggleEvent| {
        stages_clone.lock().unwrap().push((event.module, event.stage));
        Ok(())
    }));

    assert!(module.set_enabled(&dispatcher, true));
    dispatcher.post(&TickEvent).unwrap();
    dispatcher.post_with(Arc::new(TickEvent), DispatchMode::AsynchronousAwait).unwrap();
    assert_eq!(module.ticks.load(Ordering::SeqCst), 2);

    assert!(module.set_enabled(&dispatcher, false));
    dispatcher.post(&TickEvent).unwrap();
    assert_eq!(module.ticks.load(Ordering::SeqCst), 2);

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            ("fullbright", Stage::Pre),
            ("fullbright", Stage::Post),
            ("fullbright", Stage::Pre),
            ("fullbright", Stage::Post),
        ]
    );
}

#[test]
fn test_canceled_pre_event_blocks_toggle() {
    let dispatcher = EventDispatcher::new();
    let module = Module::new("xray");

    dispatcher.register(
        crate::event::Listener::builder::<ToggleEvent>()
            .priority(Priority::HIGHEST)
            .filter(|event| event.stage == Stage::Pre && event.module == "xray")
            .build_canceler(),
    );

    assert!(!module.set_enabled(&dispatcher, true));
    dispatcher.post(&TickEvent).unwrap();
    assert_eq!(module.ticks.load(Ordering::SeqCst), 0);
    assert!(!dispatcher.has_listeners::<TickEvent>());
}
