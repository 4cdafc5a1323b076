//! Typed notification bus for dataset and selection changes
//!
//! Handlers subscribe per event type and run synchronously on the
//! dispatching thread, after the controls store has released its lock.

use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Notification bus for consumers of selection changes
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Events published by the controls store
pub mod events {
    use super::Event;

    /// A record store was installed
    #[derive(Debug, Clone)]
    pub struct DatasetLoaded {
        pub record_count: usize,
        pub categorical_fields: usize,
        pub continuous_fields: usize,
    }

    /// A filter event produced a new selection
    #[derive(Debug, Clone)]
    pub struct SelectionRecomputed {
        pub event_kind: String,
        pub version: u64,
        pub selected: usize,
        pub total: usize,
    }

    /// A recognized filter event was refused and forwarded unchanged
    #[derive(Debug, Clone)]
    pub struct FilterRejected {
        pub event_kind: String,
        pub reason: String,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        DatasetLoaded,
        SelectionRecomputed,
        FilterRejected
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Publish an event. Handlers must not publish on the same bus.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
