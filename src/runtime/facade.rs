//! The equipment-entity facade: the interpreter's single external
//! collaborator.
//!
//! The interpreter reads live and historical attribute values, the current
//! equipment state, the entity's behavior catalog (for import validation),
//! and the display-device catalog through this trait. Every call is blocking
//! and synchronous; a facade owns its own concurrency discipline.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::{EquipmentState, Value};

/// Opaque identifier of a monitored equipment entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a display device in the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Device identifier as referenced from behavior source.
    pub name: String,
    /// Catalog id of the device.
    pub id: Uuid,
}

impl DeviceRef {
    /// Construct a reference with a fresh catalog id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
        }
    }
}

/// External collaborator providing equipment data to the interpreter.
pub trait EntityFacade {
    /// Current value of a named attribute, consulting the entity's live
    /// attribute set first and the executed object (e.g. the active
    /// production order) second. `None` means the attribute has no recorded
    /// value, which the language surfaces as the absent value.
    fn latest_attribute(&self, name: &str) -> Option<Value>;

    /// All recorded values of a trend attribute inside the window
    /// `[from, to]`, oldest first.
    fn attribute_history(&self, name: &str, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Value>;

    /// Live equipment state of the entity.
    fn current_state(&self, entity: &EntityId) -> EquipmentState;

    /// Whether the attribute exists in the entity's catalog at all.
    fn is_known_attribute(&self, name: &str) -> bool;

    /// Source text of a behavior defined on the entity, keyed by dotted
    /// name. Consulted by the reference phase to validate imports.
    fn behavior_source(&self, entity: &EntityId, name: &str) -> Option<String>;

    /// Display device lookup, consulted by the reference phase.
    fn display_device(&self, name: &str) -> Option<DeviceRef>;

    /// The clock the time-window built-ins subtract from. Defaults to the
    /// wall clock; fixture facades pin it for deterministic tests.
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Serializable content of a [`StaticEntityFacade`], also the on-disk
/// fixture format consumed by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacadeFixture {
    /// Latest attribute values.
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    /// Historical samples per attribute, as (timestamp, value) pairs.
    #[serde(default)]
    pub history: HashMap<String, Vec<(NaiveDateTime, Value)>>,
    /// Reported equipment state.
    #[serde(default)]
    pub state: EquipmentState,
    /// Behavior sources keyed by dotted name.
    #[serde(default)]
    pub behaviors: HashMap<String, String>,
    /// Registered display device names.
    #[serde(default)]
    pub devices: Vec<String>,
    /// Pinned clock; `None` falls back to the wall clock.
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

/// In-memory facade used by tests and the CLI.
///
/// State lives behind [`RwLock`]s so independent interpretations may run
/// against one fixture from parallel threads.
pub struct StaticEntityFacade {
    inner: RwLock<FacadeFixture>,
}

impl StaticEntityFacade {
    /// Create an empty facade.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(FacadeFixture::default()),
        }
    }

    /// Create a facade from fixture content.
    pub fn from_fixture(fixture: FacadeFixture) -> Self {
        Self {
            inner: RwLock::new(fixture),
        }
    }

    /// Set the latest value of an attribute.
    pub fn insert_attribute(&self, name: impl Into<String>, value: Value) {
        self.inner.write().attributes.insert(name.into(), value);
    }

    /// Append a historical sample for an attribute.
    pub fn record_history(&self, name: impl Into<String>, at: NaiveDateTime, value: Value) {
        self.inner
            .write()
            .history
            .entry(name.into())
            .or_default()
            .push((at, value));
    }

    /// Set the reported equipment state.
    pub fn set_state(&self, state: EquipmentState) {
        self.inner.write().state = state;
    }

    /// Register a behavior source under a dotted name.
    pub fn define_behavior(&self, name: impl Into<String>, source: impl Into<String>) {
        self.inner
            .write()
            .behaviors
            .insert(name.into(), source.into());
    }

    /// Register a display device name.
    pub fn register_device(&self, name: impl Into<String>) {
        self.inner.write().devices.push(name.into());
    }

    /// Pin the clock used for history windows.
    pub fn set_now(&self, now: NaiveDateTime) {
        self.inner.write().now = Some(now);
    }
}

impl Default for StaticEntityFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityFacade for StaticEntityFacade {
    fn latest_attribute(&self, name: &str) -> Option<Value> {
        self.inner.read().attributes.get(name).cloned()
    }

    fn attribute_history(&self, name: &str, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Value> {
        let inner = self.inner.read();
        let Some(samples) = inner.history.get(name) else {
            return Vec::new();
        };
        samples
            .iter()
            .filter(|(at, _)| *at >= from && *at <= to)
            .map(|(_, value)| value.clone())
            .collect()
    }

    fn current_state(&self, _entity: &EntityId) -> EquipmentState {
        self.inner.read().state
    }

    fn is_known_attribute(&self, name: &str) -> bool {
        let inner = self.inner.read();
        inner.attributes.contains_key(name) || inner.history.contains_key(name)
    }

    fn behavior_source(&self, _entity: &EntityId, name: &str) -> Option<String> {
        self.inner.read().behaviors.get(name).cloned()
    }

    fn display_device(&self, name: &str) -> Option<DeviceRef> {
        let inner = self.inner.read();
        inner
            .devices
            .iter()
            .find(|device| device.as_str() == name)
            .map(|device| DeviceRef::new(device.clone()))
    }

    fn now(&self) -> NaiveDateTime {
        self.inner
            .read()
            .now
            .unwrap_or_else(|| Utc::now().naive_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn history_respects_window_bounds() {
        let facade = StaticEntityFacade::new();
        facade.record_history("temp", at(8), Value::Float(1.0));
        facade.record_history("temp", at(10), Value::Float(2.0));
        facade.record_history("temp", at(12), Value::Float(3.0));

        let window = facade.attribute_history("temp", at(9), at(11));
        assert_eq!(window, vec![Value::Float(2.0)]);

        let inclusive = facade.attribute_history("temp", at(8), at(12));
        assert_eq!(inclusive.len(), 3);
    }

    #[test]
    fn unknown_attributes_have_no_value() {
        let facade = StaticEntityFacade::new();
        assert!(facade.latest_attribute("missing").is_none());
        assert!(!facade.is_known_attribute("missing"));
    }
}
