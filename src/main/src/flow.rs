use std::cell::{Cell, RefCell};
use std::rc::Rc;

use control::{compute_flow_temperature, ParameterSet, Temperature};
use log::*;
use time::OffsetDateTime;

use crate::installation::Installation;
use crate::publish::{FlowAttributes, FlowState, FlowUpdate, Publish, RoomAttributes};
use crate::sensor::{reading_or_absent, SensorBus, SensorEvent, SubscriptionId};
use crate::store::{ObserverId, ParameterChanged, ParameterStore};

/// Last usable reading of each sensor. Unreadable states are stored as `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ReadingCache {
    pub outdoor: Option<Temperature>,
    pub room: Option<Temperature>,
}

/// Decide availability and, when available, the flow temperature.
///
/// An outdoor reading is always required; the room reading only when the
/// mode computes against it.
pub fn evaluate(readings: &ReadingCache, params: &ParameterSet) -> FlowState {
    match readings.outdoor {
        None => FlowState::Unavailable,
        Some(_) if params.calculation_mode.requires_room_temperature() && readings.room.is_none() => {
            FlowState::Unavailable
        }
        Some(outdoor) => {
            FlowState::Available(compute_flow_temperature(outdoor, readings.room, params))
        }
    }
}

enum Subscription {
    Sensor(SubscriptionId),
    Parameters(ObserverId),
}

struct FlowContext {
    installation: Installation,
    store: Rc<ParameterStore>,
    publisher: Rc<dyn Publish>,
    readings: RefCell<ReadingCache>,
    state: Cell<Option<FlowState>>,
}

impl FlowContext {
    fn on_outdoor_reading(&self, event: &SensorEvent) {
        let reading = reading_or_absent(&event.entity, event.new_state());
        self.readings.borrow_mut().outdoor = reading;
        self.update();
    }

    fn on_room_reading(&self, event: &SensorEvent) {
        let reading = reading_or_absent(&event.entity, event.new_state());
        self.readings.borrow_mut().room = reading;
        self.update();
    }

    fn on_parameter_changed(&self, change: &ParameterChanged) {
        if change.installation_id != self.installation.id {
            return;
        }
        debug!("{} changed to {}, recomputing {}", change.key, change.value, change.installation_id);
        self.update();
    }

    fn update(&self) {
        let params = self.store.parameters(&self.installation.id);
        let readings = *self.readings.borrow();
        let state = evaluate(&readings, &params);

        match (self.state.replace(Some(state)), state) {
            (Some(FlowState::Available(_)), FlowState::Unavailable) => {
                warn!("{} is unavailable: {:?}", self.installation.id, readings)
            }
            (None | Some(FlowState::Unavailable), FlowState::Available(temperature)) => {
                info!("{} is available at {}", self.installation.id, temperature)
            }
            _ => {}
        }

        let update = FlowUpdate {
            installation_id: self.installation.id.clone(),
            name: self.installation.name.clone(),
            state,
            attributes: self.attributes(&readings, &params),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.publisher.publish(&update);
    }

    fn attributes(&self, readings: &ReadingCache, params: &ParameterSet) -> FlowAttributes {
        FlowAttributes {
            outdoor_temperature: readings.outdoor,
            curve_slope: params.curve_slope,
            curve_level: params.curve_level,
            room_temperature_target: params.room_temp_target,
            min_flow_temperature: params.min_flow_temp,
            max_flow_temperature: params.max_flow_temp,
            hysteresis: params.hysteresis,
            calculation_mode: params.calculation_mode,
            outdoor_sensor: self.installation.outdoor_sensor.clone(),
            room: self
                .installation
                .room_sensor
                .as_ref()
                .map(|room_sensor| RoomAttributes {
                    room_sensor: room_sensor.clone(),
                    room_temperature_actual: readings.room,
                }),
        }
    }
}

/// The derived flow temperature of one installation, kept up to date with its
/// sensors and parameters for as long as this value is alive.
///
/// Dropping it releases its subscriptions in reverse order of registration.
pub struct FlowTemperatureSensor {
    context: Rc<FlowContext>,
    sensors: Rc<SensorBus>,
    subscriptions: Vec<Subscription>,
}

impl FlowTemperatureSensor {
    pub fn attach(
        installation: Installation,
        sensors: Rc<SensorBus>,
        store: Rc<ParameterStore>,
        publisher: Rc<dyn Publish>,
    ) -> FlowTemperatureSensor {
        // Pick up readings that already exist so the first publish is not a
        // spurious "unavailable"
        let outdoor_sensor = installation.outdoor_sensor.clone();
        let room_sensor = installation.room_sensor.clone();
        let readings = ReadingCache {
            outdoor: reading_or_absent(&outdoor_sensor, sensors.state(&outdoor_sensor).as_deref()),
            room: room_sensor
                .as_deref()
                .and_then(|entity| reading_or_absent(entity, sensors.state(entity).as_deref())),
        };

        if room_sensor.is_none()
            && store
                .parameters(&installation.id)
                .calculation_mode
                .requires_room_temperature()
        {
            warn!(
                "{} computes with the room temperature but has no room sensor",
                installation.id
            );
        }

        let id = installation.id.clone();
        let context = Rc::new(FlowContext {
            installation,
            store: store.clone(),
            publisher,
            readings: RefCell::new(readings),
            state: Cell::new(None),
        });

        let mut subscriptions = Vec::new();
        {
            let context = context.clone();
            subscriptions.push(Subscription::Sensor(sensors.subscribe(
                &outdoor_sensor,
                move |event| context.on_outdoor_reading(event),
            )));
        }
        if let Some(room_sensor) = &room_sensor {
            let context = context.clone();
            subscriptions.push(Subscription::Sensor(
                sensors.subscribe(room_sensor, move |event| context.on_room_reading(event)),
            ));
        }
        {
            let context = context.clone();
            subscriptions.push(Subscription::Parameters(store.subscribe(
                &id,
                move |change| context.on_parameter_changed(change),
            )));
        }

        context.update();

        FlowTemperatureSensor {
            context,
            sensors,
            subscriptions,
        }
    }

    pub fn installation(&self) -> &Installation {
        &self.context.installation
    }

    pub fn readings(&self) -> ReadingCache {
        *self.context.readings.borrow()
    }

    pub fn state(&self) -> FlowState {
        self.context.state.get().unwrap_or(FlowState::Unavailable)
    }

    /// Recompute and publish without any new input.
    pub fn refresh(&self) {
        self.context.update();
    }
}

impl Drop for FlowTemperatureSensor {
    fn drop(&mut self) {
        let id = &self.context.installation.id;
        while let Some(subscription) = self.subscriptions.pop() {
            match subscription {
                Subscription::Sensor(subscription) => self.sensors.unsubscribe(subscription),
                Subscription::Parameters(observer) => self.context.store.unsubscribe(id, observer),
            }
        }
        debug!("Detached {}", id);
    }
}
