use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use control::Temperature;
use log::*;
use thiserror::Error;

mod event;

pub use event::SensorEvent;

pub const UNKNOWN: &str = "unknown";
pub const UNAVAILABLE: &str = "unavailable";

/// Why a sensor state could not be used as a temperature. Never surfaced to
/// the operator; the reading is simply treated as absent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnreadableSensor {
    #[error("sensor has no state")]
    Missing,
    #[error("sensor state is unknown")]
    Unknown,
    #[error("sensor is unavailable")]
    Unavailable,
    #[error("sensor state {0:?} is not a number")]
    NotNumeric(String),
}

pub fn parse_reading(state: Option<&str>) -> Result<Temperature, UnreadableSensor> {
    let state = state.ok_or(UnreadableSensor::Missing)?;
    match state {
        UNKNOWN => Err(UnreadableSensor::Unknown),
        UNAVAILABLE => Err(UnreadableSensor::Unavailable),
        _ => state
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Temperature::new)
            .ok_or_else(|| UnreadableSensor::NotNumeric(state.to_string())),
    }
}

/// Parse a state, logging and discarding anything unreadable.
pub fn reading_or_absent(entity: &str, state: Option<&str>) -> Option<Temperature> {
    parse_reading(state)
        .inspect_err(|err| debug!("Ignoring reading of {}: {}", entity, err))
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Listener {
    id: SubscriptionId,
    entity: String,
    callback: Rc<dyn Fn(&SensorEvent)>,
}

/// Current state of every sensor entity known to the host, plus the
/// subscribers interested in changes to them.
///
/// Delivery is synchronous: `set_state` returns once every subscriber of the
/// entity has run. Subscribers may call back into the bus.
#[derive(Default)]
pub struct SensorBus {
    states: RefCell<HashMap<String, String>>,
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl SensorBus {
    pub fn state(&self, entity: &str) -> Option<String> {
        self.states.borrow().get(entity).cloned()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.states.borrow().contains_key(entity)
    }

    pub fn set_state(&self, entity: &str, state: impl Into<String>) {
        let new_state = state.into();
        let old_state = self
            .states
            .borrow_mut()
            .insert(entity.to_string(), new_state.clone());
        self.dispatch(SensorEvent {
            entity: entity.to_string(),
            old_state,
            new_state: Some(new_state),
        });
    }

    pub fn remove_state(&self, entity: &str) {
        let old_state = self.states.borrow_mut().remove(entity);
        self.dispatch(SensorEvent {
            entity: entity.to_string(),
            old_state,
            new_state: None,
        });
    }

    pub fn subscribe(
        &self,
        entity: &str,
        callback: impl Fn(&SensorEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Listener {
            id,
            entity: entity.to_string(),
            callback: Rc::new(callback),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.borrow_mut().retain(|listener| listener.id != id);
    }

    pub fn subscriber_count(&self, entity: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|listener| listener.entity == entity)
            .count()
    }

    fn dispatch(&self, event: SensorEvent) {
        // Release the borrow before running callbacks so they can (un)subscribe
        let callbacks: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.entity == event.entity)
            .map(|listener| listener.callback.clone())
            .collect();
        for callback in callbacks {
            callback(&event);
        }
    }
}
