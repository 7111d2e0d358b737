use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::lang::ast::TypeName;

/// Operating state of a piece of monitored equipment.
///
/// `SystemDown` is reported by the facade when the surrounding system itself
/// is unavailable; behavior scripts can read it but there is no source token
/// that writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentState {
    /// Producing normally.
    Operative,
    /// Planned downtime.
    SchedDown,
    /// Unplanned downtime.
    UnschedDown,
    /// Starting up.
    Initializing,
    /// The monitoring system itself is down.
    SystemDown,
    /// No known state.
    #[default]
    Undefined,
}

impl EquipmentState {
    /// Map a source-level state token to a state. Unmatched tokens map to
    /// [`EquipmentState::Undefined`]; note that `system_down` is
    /// intentionally not writable from source.
    pub fn from_write_token(token: &str) -> Self {
        match token {
            "operative" => Self::Operative,
            "sched_down" => Self::SchedDown,
            "unsched_down" => Self::UnschedDown,
            "initializing" => Self::Initializing,
            _ => Self::Undefined,
        }
    }

    /// The token form used for display output and serialization.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Operative => "operative",
            Self::SchedDown => "sched_down",
            Self::UnschedDown => "unsched_down",
            Self::Initializing => "initializing",
            Self::SystemDown => "system_down",
            Self::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for EquipmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Interval unit for timer declarations and history windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Seconds.
    Second,
    /// Minutes.
    Minute,
    /// Hours.
    Hour,
}

impl TimeUnit {
    /// Parse a source token. There is deliberately no default: a missing or
    /// unknown unit is the caller's diagnostic to raise.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "second" => Some(Self::Second),
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            _ => None,
        }
    }

    /// The interval covered by `amount` of this unit.
    pub fn duration(&self, amount: i64) -> Duration {
        match self {
            Self::Second => Duration::seconds(amount),
            Self::Minute => Duration::minutes(amount),
            Self::Hour => Duration::hours(amount),
        }
    }
}

/// Scalar type tags used for declarations and assignment checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    Str,
    /// Boolean.
    Bool,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Combined date and time.
    DateTime,
    /// Equipment state.
    State,
    /// No value; never a valid assignment target.
    Void,
}

impl ValueType {
    /// Map a source type annotation to a runtime type tag.
    pub fn from_type_name(name: TypeName) -> Self {
        match name {
            TypeName::Int => Self::Int,
            TypeName::Float => Self::Float,
            TypeName::Str => Self::Str,
            TypeName::Bool => Self::Bool,
            TypeName::Date => Self::Date,
            TypeName::Time => Self::Time,
            TypeName::DateTime => Self::DateTime,
        }
    }

    /// The value a declaration without initializer starts from.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Str => Value::Str(String::new()),
            Self::Bool => Value::Bool(false),
            Self::Date => Value::Date(NaiveDate::MIN),
            Self::Time => Value::Time(NaiveTime::MIN),
            Self::DateTime => Value::DateTime(NaiveDateTime::MIN),
            Self::State => Value::State(EquipmentState::Undefined),
            Self::Void => Value::Void,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::State => "state",
            Self::Void => "void",
        };
        f.write_str(name)
    }
}

/// A runtime value of the behavior language.
///
/// [`Value::Void`] doubles as the first-class "absent" value produced by
/// reading an attribute with no recorded sample; absence is data, not an
/// error, and most operators have an explicit policy for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    Str(String),
    /// Boolean value.
    Bool(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Combined date and time.
    DateTime(NaiveDateTime),
    /// Equipment state.
    State(EquipmentState),
    /// Fixed-length homogeneous array; the tag is the element type.
    Array(ValueType, Vec<Value>),
    /// No value / absent.
    Void,
}

impl Value {
    /// The type tag of this value. Arrays report their element type; use the
    /// structural checks for array-ness.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Str(_) => ValueType::Str,
            Self::Bool(_) => ValueType::Bool,
            Self::Date(_) => ValueType::Date,
            Self::Time(_) => ValueType::Time,
            Self::DateTime(_) => ValueType::DateTime,
            Self::State(_) => ValueType::State,
            Self::Array(elem, _) => *elem,
            Self::Void => ValueType::Void,
        }
    }

    /// Short name for error messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Array(elem, _) => format!("{}[]", elem),
            other => other.value_type().to_string(),
        }
    }

    /// True for the absent value.
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// True for int and float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric view as f64, when numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// The fixed string form used wherever a value becomes text: string
    /// coercion, display output, concatenation. `None` for void and arrays.
    pub fn to_display_string(&self) -> Option<String> {
        match self {
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Str(value) => Some(value.clone()),
            Self::Bool(value) => Some(if *value { "true" } else { "false" }.to_string()),
            Self::Date(value) => Some(value.format("%Y-%m-%d").to_string()),
            Self::Time(value) => Some(value.format("%H:%M:%S").to_string()),
            Self::DateTime(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            Self::State(value) => Some(value.token().to_string()),
            Self::Array(..) | Self::Void => None,
        }
    }
}

/// Coerce `value` for assignment into a slot of type `target`.
///
/// Returns `None` when the combination is not assignable:
/// - `int` accepts int (pass-through) and float (truncation toward zero)
/// - `float` accepts float (pass-through) and int (promotion)
/// - `string` accepts any non-void scalar via its fixed string form
/// - `bool`, `date`, `time`, `datetime`, and `state` accept only their exact
///   type
/// - a `void` target never accepts anything
pub fn coerce_assign(target: ValueType, value: Value) -> Option<Value> {
    match target {
        ValueType::Int => match value {
            Value::Int(_) => Some(value),
            Value::Float(f) => Some(Value::Int(f.trunc() as i64)),
            _ => None,
        },
        ValueType::Float => match value {
            Value::Float(_) => Some(value),
            Value::Int(i) => Some(Value::Float(i as f64)),
            _ => None,
        },
        ValueType::Str => value.to_display_string().map(Value::Str),
        ValueType::Bool => matches!(value, Value::Bool(_)).then_some(value),
        ValueType::Date => matches!(value, Value::Date(_)).then_some(value),
        ValueType::Time => matches!(value, Value::Time(_)).then_some(value),
        ValueType::DateTime => matches!(value, Value::DateTime(_)).then_some(value),
        ValueType::State => matches!(value, Value::State(_)).then_some(value),
        ValueType::Void => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_into_int_truncates_toward_zero() {
        assert_eq!(
            coerce_assign(ValueType::Int, Value::Float(3.7)),
            Some(Value::Int(3))
        );
        assert_eq!(
            coerce_assign(ValueType::Int, Value::Float(-3.7)),
            Some(Value::Int(-3))
        );
    }

    #[test]
    fn int_into_float_promotes() {
        assert_eq!(
            coerce_assign(ValueType::Float, Value::Int(5)),
            Some(Value::Float(5.0))
        );
    }

    #[test]
    fn string_accepts_scalars_with_fixed_forms() {
        assert_eq!(
            coerce_assign(ValueType::Str, Value::Bool(true)),
            Some(Value::Str("true".into()))
        );
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(
            coerce_assign(ValueType::Str, Value::Date(date)),
            Some(Value::Str("2026-03-14".into()))
        );
        assert_eq!(coerce_assign(ValueType::Str, Value::Void), None);
    }

    #[test]
    fn exact_types_reject_coercion() {
        assert_eq!(coerce_assign(ValueType::Bool, Value::Int(1)), None);
        assert_eq!(coerce_assign(ValueType::Date, Value::Str("x".into())), None);
        assert_eq!(coerce_assign(ValueType::Void, Value::Int(1)), None);
    }

    #[test]
    fn write_tokens_map_to_states() {
        assert_eq!(
            EquipmentState::from_write_token("operative"),
            EquipmentState::Operative
        );
        assert_eq!(
            EquipmentState::from_write_token("system_down"),
            EquipmentState::Undefined
        );
    }

    #[test]
    fn time_units_have_no_default() {
        assert_eq!(TimeUnit::from_token("minute"), Some(TimeUnit::Minute));
        assert_eq!(TimeUnit::from_token(""), None);
        assert_eq!(TimeUnit::from_token("fortnight"), None);
    }
}
