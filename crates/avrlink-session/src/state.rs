use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use avrlink_frame::{Attribute, Value};

/// Receives attribute updates decoded from the receiver.
///
/// Called from the listener thread and from foreground exchanges while the
/// stream lock is held, so implementations must not call back into the
/// session that feeds them.
pub trait StateSink: Send + Sync {
    fn notify(&self, attribute: Attribute, value: &Value);
}

type Observer = Arc<dyn Fn(Attribute, &Value) + Send + Sync>;

#[derive(Default)]
struct Slot {
    current: Option<Value>,
    /// Value immediately before the pending write, for single-step undo.
    previous: Option<Value>,
    observers: Vec<Observer>,
}

/// In-memory attribute state with per-attribute observers and a one-slot undo buffer.
#[derive(Default)]
pub struct StateStore {
    slots: Mutex<HashMap<Attribute, Slot>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer called whenever `attribute` changes value.
    pub fn subscribe<F>(&self, attribute: Attribute, observer: F)
    where
        F: Fn(Attribute, &Value) + Send + Sync + 'static,
    {
        self.lock()
            .entry(attribute)
            .or_default()
            .observers
            .push(Arc::new(observer));
    }

    /// Attributes with at least one observer, in registry order.
    pub fn watched(&self) -> Vec<Attribute> {
        let slots = self.lock();
        Attribute::ALL
            .into_iter()
            .filter(|attribute| {
                slots
                    .get(attribute)
                    .is_some_and(|slot| !slot.observers.is_empty())
            })
            .collect()
    }

    /// Current value, if known.
    pub fn get(&self, attribute: Attribute) -> Option<Value> {
        self.lock()
            .get(&attribute)
            .and_then(|slot| slot.current.clone())
    }

    /// Value captured by the last [`begin_write`](Self::begin_write).
    pub fn previous(&self, attribute: Attribute) -> Option<Value> {
        self.lock()
            .get(&attribute)
            .and_then(|slot| slot.previous.clone())
    }

    /// All known values, in registry order.
    pub fn snapshot(&self) -> Vec<(Attribute, Value)> {
        let slots = self.lock();
        Attribute::ALL
            .into_iter()
            .filter_map(|attribute| {
                slots
                    .get(&attribute)
                    .and_then(|slot| slot.current.clone())
                    .map(|value| (attribute, value))
            })
            .collect()
    }

    /// Record a locally issued write: remember the current value for undo and
    /// set the new one.
    pub fn begin_write(&self, attribute: Attribute, value: Value) {
        let observers = {
            let mut slots = self.lock();
            let slot = slots.entry(attribute).or_default();
            let changed = slot.current.as_ref() != Some(&value);
            slot.previous = slot.current.replace(value.clone());
            changed.then(|| slot.observers.clone())
        };
        if let Some(observers) = observers {
            call(&observers, attribute, &value);
        }
    }

    /// Undo the last write to `attribute`, returning the restored value.
    ///
    /// When nothing was known before the write, the attribute becomes unknown
    /// again and `None` is returned.
    pub fn revert(&self, attribute: Attribute) -> Option<Value> {
        let (restored, observers) = {
            let mut slots = self.lock();
            let slot = slots.entry(attribute).or_default();
            let restored = slot.previous.take();
            slot.current = restored.clone();
            (restored, slot.observers.clone())
        };
        if let Some(value) = &restored {
            call(&observers, attribute, value);
        }
        restored
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Attribute, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateSink for StateStore {
    fn notify(&self, attribute: Attribute, value: &Value) {
        let observers = {
            let mut slots = self.lock();
            let slot = slots.entry(attribute).or_default();
            if slot.current.as_ref() == Some(value) {
                return;
            }
            slot.current = Some(value.clone());
            slot.observers.clone()
        };
        call(&observers, attribute, value);
    }
}

// Observers run outside the store lock so they may read the store.
fn call(observers: &[Observer], attribute: Attribute, value: &Value) {
    for observer in observers {
        observer(attribute, value);
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("values", &self.snapshot())
            .finish()
    }
}
