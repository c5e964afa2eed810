/// A state change of one sensor entity, as delivered to subscribers.
///
/// `None` means the entity has no state at all, e.g. it was removed from the
/// host.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub entity: String,
    pub old_state: Option<String>,
    pub new_state: Option<String>,
}

impl SensorEvent {
    pub fn new_state(&self) -> Option<&str> {
        self.new_state.as_deref()
    }
}
