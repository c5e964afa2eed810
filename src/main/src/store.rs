use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use control::{ParameterKey, ParameterSet, ParameterValue};
use log::*;

mod backend;
mod event;

pub use backend::{JsonFileBackend, MemoryBackend, SettingsBackend};
pub use event::ParameterChanged;

use crate::error::Result;
use crate::installation::InstallationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observer {
    id: ObserverId,
    callback: Rc<dyn Fn(&ParameterChanged)>,
}

/// Current parameters of every installation.
///
/// Writes are validated, persisted through the backend and only then applied;
/// observers of the installation are notified before `set` returns.
pub struct ParameterStore {
    backend: RefCell<Box<dyn SettingsBackend>>,
    parameters: RefCell<HashMap<InstallationId, ParameterSet>>,
    observers: RefCell<HashMap<InstallationId, Vec<Observer>>>,
    next_id: Cell<u64>,
}

impl ParameterStore {
    pub fn new(backend: Box<dyn SettingsBackend>) -> Self {
        ParameterStore {
            backend: RefCell::new(backend),
            parameters: RefCell::new(HashMap::new()),
            observers: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn in_memory() -> Self {
        ParameterStore::new(Box::<MemoryBackend>::default())
    }

    /// Load the persisted parameters of an installation on top of `initial`.
    ///
    /// Persisted values that no longer validate are skipped. The flow bounds
    /// are checked on the combined result, so the order the backend returns
    /// values in does not matter.
    pub fn seed(&self, id: &InstallationId, initial: ParameterSet) -> Result<ParameterSet> {
        let stored: Vec<_> = self
            .backend
            .borrow()
            .read(id)?
            .into_iter()
            .filter(|(key, value)| {
                key.check(*value)
                    .inspect_err(|err| warn!("Ignoring stored {} of {}: {}", key, id, err))
                    .is_ok()
            })
            .collect();

        let mut parameters = initial;
        if let Err(err) = parameters.set_many(stored.iter().copied()) {
            // Only the flow bounds can conflict; keep whichever values fit
            warn!("Stored parameters of {} conflict: {}", id, err);
            for (key, value) in stored {
                if let Err(err) = parameters.set(key, value) {
                    warn!("Ignoring stored {} of {}: {}", key, id, err);
                }
            }
        }
        debug!("Seeded {}: {:?}", id, parameters);
        self.parameters.borrow_mut().insert(id.clone(), parameters);
        Ok(parameters)
    }

    /// Current value of `key`, or its default if the installation is unknown.
    pub fn get(&self, id: &InstallationId, key: ParameterKey) -> ParameterValue {
        self.parameters(id).get(key)
    }

    pub fn parameters(&self, id: &InstallationId) -> ParameterSet {
        self.parameters
            .borrow()
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&self, id: &InstallationId, key: ParameterKey, value: ParameterValue) -> Result<()> {
        let mut parameters = self.parameters(id);
        parameters
            .set(key, value)
            .inspect_err(|err| warn!("Rejected {} = {} for {}: {}", key, value, id, err))?;

        self.backend.borrow_mut().write(id, key, value)?;
        self.parameters.borrow_mut().insert(id.clone(), parameters);
        info!("{}: {} = {}", id, key, value);

        self.notify(&ParameterChanged {
            installation_id: id.clone(),
            key,
            value,
        });
        Ok(())
    }

    /// Validate `values` together, then persist and apply them. Observers are
    /// notified once per value, after all of them have been applied.
    pub fn set_many(
        &self,
        id: &InstallationId,
        values: &[(ParameterKey, ParameterValue)],
    ) -> Result<()> {
        let mut parameters = self.parameters(id);
        parameters
            .set_many(values.iter().copied())
            .inspect_err(|err| warn!("Rejected {:?} for {}: {}", values, id, err))?;

        {
            let mut backend = self.backend.borrow_mut();
            for (key, value) in values {
                backend.write(id, *key, *value)?;
            }
        }
        self.parameters.borrow_mut().insert(id.clone(), parameters);

        for (key, value) in values {
            info!("{}: {} = {}", id, key, value);
            self.notify(&ParameterChanged {
                installation_id: id.clone(),
                key: *key,
                value: *value,
            });
        }
        Ok(())
    }

    /// Drop the cached and persisted parameters of a removed installation.
    pub fn forget(&self, id: &InstallationId) -> Result<()> {
        self.parameters.borrow_mut().remove(id);
        self.observers.borrow_mut().remove(id);
        self.backend.borrow_mut().remove(id)?;
        Ok(())
    }

    pub fn subscribe(
        &self,
        id: &InstallationId,
        callback: impl Fn(&ParameterChanged) + 'static,
    ) -> ObserverId {
        let observer_id = ObserverId(self.next_id.get());
        self.next_id.set(observer_id.0 + 1);
        self.observers
            .borrow_mut()
            .entry(id.clone())
            .or_default()
            .push(Observer {
                id: observer_id,
                callback: Rc::new(callback),
            });
        observer_id
    }

    pub fn unsubscribe(&self, id: &InstallationId, observer_id: ObserverId) {
        if let Some(observers) = self.observers.borrow_mut().get_mut(id) {
            observers.retain(|observer| observer.id != observer_id);
        }
    }

    pub fn observer_count(&self, id: &InstallationId) -> usize {
        self.observers.borrow().get(id).map_or(0, Vec::len)
    }

    fn notify(&self, change: &ParameterChanged) {
        let callbacks: Vec<_> = self
            .observers
            .borrow()
            .get(&change.installation_id)
            .map(|observers| {
                observers
                    .iter()
                    .map(|observer| observer.callback.clone())
                    .collect()
            })
            .unwrap_or_default();
        for callback in callbacks {
            callback(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use control::{CalculationMode, ParameterError, Temperature};

    fn installation() -> InstallationId {
        InstallationId::for_outdoor_sensor("sensor.outdoor")
    }

    struct FailingBackend;

    impl SettingsBackend for FailingBackend {
        fn read(&self, _id: &InstallationId) -> anyhow::Result<Vec<(ParameterKey, ParameterValue)>> {
            Ok(Vec::new())
        }

        fn write(
            &mut self,
            _id: &InstallationId,
            _key: ParameterKey,
            _value: ParameterValue,
        ) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn remove(&mut self, _id: &InstallationId) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_get_returns_default_when_never_set() {
        let store = ParameterStore::in_memory();
        assert_eq!(
            store.get(&installation(), ParameterKey::CurveSlope),
            ParameterValue::Number(1.4)
        );
        assert_eq!(
            store.get(&installation(), ParameterKey::CalculationMode),
            ParameterValue::Mode(CalculationMode::Classic)
        );
    }

    #[test]
    fn test_set_notifies_with_new_value_applied() {
        let store = Rc::new(ParameterStore::in_memory());
        let id = installation();
        store.seed(&id, ParameterSet::default()).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let reader = store.clone();
        store.subscribe(&id, move |change| {
            // The store already holds the new value when observers run
            let current = reader.get(&change.installation_id, change.key);
            sink.borrow_mut().push((change.clone(), current));
        });

        store
            .set(&id, ParameterKey::CurveSlope, ParameterValue::Number(1.1))
            .unwrap();

        let change = ParameterChanged {
            installation_id: id.clone(),
            key: ParameterKey::CurveSlope,
            value: ParameterValue::Number(1.1),
        };
        assert_eq!(
            *seen.borrow(),
            vec![(change, ParameterValue::Number(1.1))]
        );
    }

    #[test]
    fn test_out_of_range_is_rejected_without_notification() {
        let store = ParameterStore::in_memory();
        let id = installation();
        let notified = Rc::new(Cell::new(false));
        let flag = notified.clone();
        store.subscribe(&id, move |_| flag.set(true));

        let result = store.set(&id, ParameterKey::MaxFlowTemp, ParameterValue::Number(95.0));

        assert!(matches!(
            result,
            Err(Error::Parameter(ParameterError::OutOfRange { .. }))
        ));
        assert_eq!(
            store.parameters(&id).max_flow_temp,
            Temperature::new(75.0)
        );
        assert!(!notified.get());
    }

    #[test]
    fn test_backend_failure_keeps_previous_value() {
        let store = ParameterStore::new(Box::new(FailingBackend));
        let id = installation();

        let result = store.set(&id, ParameterKey::CurveLevel, ParameterValue::Number(3.0));

        assert!(matches!(result, Err(Error::Backend(_))));
        assert_eq!(store.parameters(&id), ParameterSet::default());
    }

    #[test]
    fn test_seed_prefers_persisted_values() {
        let mut backend = MemoryBackend::default();
        let id = installation();
        backend
            .write(&id, ParameterKey::RoomTempTarget, ParameterValue::Number(22.0))
            .unwrap();
        // Written by an older build with a wider range
        backend
            .write(&id, ParameterKey::CurveSlope, ParameterValue::Number(7.0))
            .unwrap();
        let store = ParameterStore::new(Box::new(backend));

        let initial = ParameterSet {
            curve_slope: 1.6,
            room_temp_target: Temperature::new(19.0),
            ..ParameterSet::default()
        };
        let seeded = store.seed(&id, initial).unwrap();

        assert_eq!(seeded.room_temp_target, Temperature::new(22.0));
        assert_eq!(seeded.curve_slope, 1.6);
        assert_eq!(store.parameters(&id), seeded);
    }

    #[test]
    fn test_seed_restores_saved_flow_bounds_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let id = installation();
        let initial = ParameterSet {
            min_flow_temp: Temperature::new(50.0),
            max_flow_temp: Temperature::new(90.0),
            ..ParameterSet::default()
        };

        let store = ParameterStore::new(Box::new(JsonFileBackend::open(&path).unwrap()));
        store.seed(&id, initial).unwrap();
        store
            .set(&id, ParameterKey::MinFlowTemp, ParameterValue::Number(40.0))
            .unwrap();
        store
            .set(&id, ParameterKey::MaxFlowTemp, ParameterValue::Number(45.0))
            .unwrap();
        let before = store.parameters(&id);

        // The file lists max_flow_temp before min_flow_temp
        let restarted = ParameterStore::new(Box::new(JsonFileBackend::open(&path).unwrap()));
        let after = restarted.seed(&id, initial).unwrap();

        assert_eq!(after, before);
        assert_eq!(after.min_flow_temp, Temperature::new(40.0));
        assert_eq!(after.max_flow_temp, Temperature::new(45.0));
    }

    #[test]
    fn test_seed_keeps_fitting_bound_when_stored_bounds_conflict() {
        let mut backend = MemoryBackend::default();
        let id = installation();
        backend
            .write(&id, ParameterKey::MaxFlowTemp, ParameterValue::Number(45.0))
            .unwrap();
        backend
            .write(&id, ParameterKey::MinFlowTemp, ParameterValue::Number(48.0))
            .unwrap();
        let store = ParameterStore::new(Box::new(backend));

        let seeded = store.seed(&id, ParameterSet::default()).unwrap();

        // Applied in key order: min fits the default maximum, max then does not
        assert_eq!(seeded.min_flow_temp, Temperature::new(48.0));
        assert_eq!(seeded.max_flow_temp, Temperature::new(75.0));
    }

    #[test]
    fn test_set_many_checks_bounds_on_the_result() {
        let store = ParameterStore::in_memory();
        let id = installation();
        store
            .set(&id, ParameterKey::MaxFlowTemp, ParameterValue::Number(45.0))
            .unwrap();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        store.subscribe(&id, move |change| sink.borrow_mut().push(change.key));

        store
            .set_many(
                &id,
                &[
                    (ParameterKey::MinFlowTemp, ParameterValue::Number(48.0)),
                    (ParameterKey::MaxFlowTemp, ParameterValue::Number(60.0)),
                ],
            )
            .unwrap();

        assert_eq!(store.parameters(&id).min_flow_temp, Temperature::new(48.0));
        assert_eq!(store.parameters(&id).max_flow_temp, Temperature::new(60.0));
        assert_eq!(
            *changes.borrow(),
            vec![ParameterKey::MinFlowTemp, ParameterKey::MaxFlowTemp]
        );
    }

    #[test]
    fn test_observers_are_per_installation() {
        let store = ParameterStore::in_memory();
        let first = installation();
        let second = InstallationId::for_outdoor_sensor("sensor.garden");
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let observer = store.subscribe(&first, move |_| counter.set(counter.get() + 1));

        store
            .set(&second, ParameterKey::Hysteresis, ParameterValue::Number(0.5))
            .unwrap();
        assert_eq!(count.get(), 0);

        store
            .set(&first, ParameterKey::Hysteresis, ParameterValue::Number(0.5))
            .unwrap();
        assert_eq!(count.get(), 1);

        store.unsubscribe(&first, observer);
        assert_eq!(store.observer_count(&first), 0);
    }
}
