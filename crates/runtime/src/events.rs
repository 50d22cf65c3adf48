use parking_lot::Mutex;

use crate::error::LifecycleError;
use crate::lifecycle::LifecycleCallbacks;

/// Lifecycle notification as observed by a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent<R> {
    SetStart,
    SetSuccess { resource: R, is_update: bool },
    SetError(String),
    UpdateStart,
    UpdateSuccess,
    UpdateError(String),
}

/// Callback sink that records every notification in order.
#[derive(Debug)]
pub struct EventLog<R> {
    events: Mutex<Vec<LifecycleEvent<R>>>,
}

impl<R> Default for EventLog<R> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<R: Clone> EventLog<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent<R>> {
        self.events.lock().clone()
    }

    pub fn drain(&self) -> Vec<LifecycleEvent<R>> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Resources delivered through successful reads.
    pub fn delivered(&self) -> Vec<R> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                LifecycleEvent::SetSuccess { resource, .. } => Some(resource.clone()),
                _ => None,
            })
            .collect()
    }

    fn emit(&self, event: LifecycleEvent<R>) {
        self.events.lock().push(event);
    }
}

impl<R: Clone + Send + Sync + 'static> LifecycleCallbacks<R> for EventLog<R> {
    fn on_set_start(&self) {
        self.emit(LifecycleEvent::SetStart);
    }

    fn on_set_success(&self, resource: &R, is_update: bool) {
        self.emit(LifecycleEvent::SetSuccess {
            resource: resource.clone(),
            is_update,
        });
    }

    fn on_set_error(&self, error: &LifecycleError) {
        self.emit(LifecycleEvent::SetError(error.to_string()));
    }

    fn on_update_start(&self) {
        self.emit(LifecycleEvent::UpdateStart);
    }

    fn on_update_success(&self) {
        self.emit(LifecycleEvent::UpdateSuccess);
    }

    fn on_update_error(&self, error: &LifecycleError) {
        self.emit(LifecycleEvent::UpdateError(error.to_string()));
    }
}
