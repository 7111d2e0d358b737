use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::{EquipmentState, TimeUnit, Value};

/// Observable effects of one behavior run, read back by the caller after
/// interpretation: attribute values for persistence, the state transition if
/// one occurred, timer registrations for the external scheduler, and display
/// messages for rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    /// Final values of all attributes the run touched, keyed by name.
    pub attributes: BTreeMap<String, Value>,
    /// The equipment state written during the run, when a transition
    /// occurred.
    pub state: Option<EquipmentState>,
    /// Timers armed during the run.
    pub timers: Vec<TimerRegistration>,
    /// Display messages produced during the run.
    pub displays: Vec<DisplayMessage>,
}

/// A timer armed by a `start` statement, materialized for the external
/// scheduler. The interpreter never schedules anything itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRegistration {
    /// Timer name as declared in source.
    pub name: String,
    /// Interval unit.
    pub unit: TimeUnit,
    /// Interval amount.
    pub amount: i64,
    /// Whether the scheduler should re-arm the timer after firing.
    pub repeating: bool,
    /// Fully-qualified dotted segments of the behavior to fire.
    pub targets: Vec<String>,
}

/// A message pushed to a display device by a `show` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    /// Display name as declared in source.
    pub display: String,
    /// Device identifier the display is bound to.
    pub device: String,
    /// Rendered message text.
    pub message: String,
}
