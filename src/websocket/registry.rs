use super::event::EventKind;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// One handler per event kind; inserting for a kind replaces the old one.
#[derive(Default)]
pub struct SubscriberRegistry {
    handlers: HashMap<EventKind, EventHandler>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler that was replaced, if any.
    pub fn insert(&mut self, kind: EventKind, handler: EventHandler) -> Option<EventHandler> {
        self.handlers.insert(kind, handler)
    }

    pub fn remove(&mut self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
