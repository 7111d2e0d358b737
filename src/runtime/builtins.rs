//! Built-in functions of the behavior language.
//!
//! Scalar helpers (`round`, `token`, `substring`, `startswith`) operate on
//! evaluated values; the history built-ins (`count_over_time`,
//! `max_over_time`) query the entity facade for all samples of an attribute
//! in a trailing time window and reduce them.

use super::eval::{EvalError, EvalResult};
use super::facade::EntityFacade;
use super::value::{TimeUnit, Value};

/// Separator the `token` built-in splits on.
const TOKEN_SEPARATOR: char = '+';

/// Names of the history built-ins, which take an attribute name and a time
/// unit positionally instead of evaluated values.
const HISTORY_BUILTINS: [&str; 2] = ["count_over_time", "max_over_time"];

/// Names of the value-level built-ins.
const VALUE_BUILTINS: [&str; 4] = ["round", "token", "substring", "startswith"];

/// Whether the name is any built-in.
pub fn is_builtin(name: &str) -> bool {
    is_history_builtin(name) || VALUE_BUILTINS.contains(&name)
}

/// Whether the name is a history built-in.
pub fn is_history_builtin(name: &str) -> bool {
    HISTORY_BUILTINS.contains(&name)
}

/// Dispatch a value-level built-in over evaluated arguments.
pub fn dispatch(name: &str, args: Vec<Value>) -> EvalResult<Value> {
    match name {
        "round" => {
            let [value, digits] = take_args(name, args)?;
            round(value, digits)
        }
        "token" => {
            let [value, index] = take_args(name, args)?;
            token(value, index)
        }
        "substring" => {
            let [value, from, to] = take_args(name, args)?;
            substring(value, from, to)
        }
        "startswith" => {
            let [value, prefix] = take_args(name, args)?;
            startswith(value, prefix)
        }
        other => Err(EvalError::NotCallable(other.to_string())),
    }
}

fn take_args<const N: usize>(name: &str, args: Vec<Value>) -> EvalResult<[Value; N]> {
    let got = args.len();
    args.try_into().map_err(|_| EvalError::Arity {
        name: name.to_string(),
        expected: N,
        got,
    })
}

/// Round a numeric value to `digits` decimal digits. Integers pass through
/// unchanged; floats are scaled, rounded, and unscaled.
fn round(value: Value, digits: Value) -> EvalResult<Value> {
    let Value::Int(digits) = digits else {
        return Err(EvalError::Type(format!(
            "round expects an int digit count, got {}",
            digits.type_name()
        )));
    };
    if digits < 0 {
        return Err(EvalError::Type(
            "round expects a non-negative digit count".to_string(),
        ));
    }
    match value {
        Value::Int(_) => Ok(value),
        Value::Float(v) => {
            let factor = 10f64.powi(digits as i32);
            Ok(Value::Float((v * factor).round() / factor))
        }
        other => Err(EvalError::Type(format!(
            "round expects a numeric value, got {}",
            other.type_name()
        ))),
    }
}

/// Split a string on the token separator and return the n-th token,
/// 0-based. An index at or beyond the token count is a bounds error.
fn token(value: Value, index: Value) -> EvalResult<Value> {
    let Value::Str(text) = value else {
        return Err(EvalError::Type(format!(
            "token expects a string, got {}",
            value.type_name()
        )));
    };
    let Value::Int(index) = index else {
        return Err(EvalError::Type(format!(
            "token expects an int index, got {}",
            index.type_name()
        )));
    };
    let tokens: Vec<&str> = text.split(TOKEN_SEPARATOR).collect();
    if index < 0 || index as usize >= tokens.len() {
        return Err(EvalError::TokenOutOfRange {
            index,
            count: tokens.len(),
        });
    }
    Ok(Value::Str(tokens[index as usize].to_string()))
}

/// Substring by character positions, `from` inclusive and `to` exclusive.
fn substring(value: Value, from: Value, to: Value) -> EvalResult<Value> {
    let Value::Str(text) = value else {
        return Err(EvalError::Type(format!(
            "substring expects a string, got {}",
            value.type_name()
        )));
    };
    let (Value::Int(from), Value::Int(to)) = (&from, &to) else {
        return Err(EvalError::Type(
            "substring expects int bounds".to_string(),
        ));
    };
    let (from, to) = (*from, *to);
    let len = text.chars().count();
    if from < 0 || to < from || to as usize > len {
        return Err(EvalError::IndexOutOfRange {
            name: "substring".to_string(),
            index: if from < 0 { from } else { to },
            len,
        });
    }
    let slice: String = text
        .chars()
        .skip(from as usize)
        .take((to - from) as usize)
        .collect();
    Ok(Value::Str(slice))
}

/// Whether a string starts with the given prefix.
fn startswith(value: Value, prefix: Value) -> EvalResult<Value> {
    match (&value, &prefix) {
        (Value::Str(text), Value::Str(prefix)) => Ok(Value::Bool(text.starts_with(prefix))),
        _ => Err(EvalError::Type(format!(
            "startswith expects two strings, got {} and {}",
            value.type_name(),
            prefix.type_name()
        ))),
    }
}

/// Dispatch a history built-in: query the facade for all samples of
/// `attribute` in the window `[now - amount·unit, now]` and reduce them.
pub fn history(
    name: &str,
    facade: &dyn EntityFacade,
    attribute: &str,
    unit: TimeUnit,
    amount: i64,
) -> EvalResult<Value> {
    let to = facade.now();
    let from = to - unit.duration(amount);
    let samples = facade.attribute_history(attribute, from, to);
    match name {
        "count_over_time" => count_samples(samples),
        "max_over_time" => max_samples(attribute, samples),
        other => Err(EvalError::NotCallable(other.to_string())),
    }
}

/// Numeric samples are summed; every non-numeric sample counts as one. An
/// empty window yields integer zero regardless of the attribute's type.
fn count_samples(samples: Vec<Value>) -> EvalResult<Value> {
    let mut acc = Value::Int(0);
    for sample in samples {
        acc = match (acc, sample) {
            (Value::Int(total), Value::Int(v)) => Value::Int(total + v),
            (Value::Int(total), Value::Float(v)) => Value::Float(total as f64 + v),
            (Value::Float(total), Value::Int(v)) => Value::Float(total + v as f64),
            (Value::Float(total), Value::Float(v)) => Value::Float(total + v),
            (Value::Int(total), _) => Value::Int(total + 1),
            (Value::Float(total), _) => Value::Float(total + 1.0),
            (acc, _) => acc,
        };
    }
    Ok(acc)
}

/// Type-appropriate maximum over the window. Boolean and void samples are
/// not orderable; mixed non-numeric kinds are a type error. An empty window
/// yields the absent value.
fn max_samples(attribute: &str, samples: Vec<Value>) -> EvalResult<Value> {
    let mut best: Option<Value> = None;
    for sample in samples {
        if matches!(sample, Value::Bool(_) | Value::Void) {
            return Err(EvalError::Type(format!(
                "max_over_time: '{}' holds a {} sample, which is not orderable",
                attribute,
                sample.type_name()
            )));
        }
        best = Some(match best {
            None => sample,
            Some(current) => value_max(current, sample)?,
        });
    }
    Ok(best.unwrap_or(Value::Void))
}

fn value_max(current: Value, candidate: Value) -> EvalResult<Value> {
    if let (Some(a), Some(b)) = (current.as_f64(), candidate.as_f64()) {
        return Ok(if b > a { candidate } else { current });
    }
    let keep_current = match (&current, &candidate) {
        (Value::Str(a), Value::Str(b)) => b <= a,
        (Value::Date(a), Value::Date(b)) => b <= a,
        (Value::Time(a), Value::Time(b)) => b <= a,
        (Value::DateTime(a), Value::DateTime(b)) => b <= a,
        _ => {
            return Err(EvalError::Type(format!(
                "max_over_time: cannot order {} against {}",
                candidate.type_name(),
                current.type_name()
            )));
        }
    };
    Ok(if keep_current { current } else { candidate })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_leaves_integers_unchanged() {
        assert_eq!(
            dispatch("round", vec![Value::Int(7), Value::Int(2)]).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn round_scales_floats() {
        assert_eq!(
            dispatch("round", vec![Value::Float(3.14159), Value::Int(2)]).unwrap(),
            Value::Float(3.14)
        );
    }

    #[test]
    fn token_is_zero_based_and_bounds_checked() {
        assert_eq!(
            dispatch(
                "token",
                vec![Value::Str("a+b+c".into()), Value::Int(1)]
            )
            .unwrap(),
            Value::Str("b".into())
        );
        let err = dispatch(
            "token",
            vec![Value::Str("a+b".into()), Value::Int(5)],
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::TokenOutOfRange { count: 2, .. }));
    }

    #[test]
    fn substring_uses_exclusive_end() {
        assert_eq!(
            dispatch(
                "substring",
                vec![Value::Str("sensor-42".into()), Value::Int(0), Value::Int(6)]
            )
            .unwrap(),
            Value::Str("sensor".into())
        );
        assert!(
            dispatch(
                "substring",
                vec![Value::Str("abc".into()), Value::Int(1), Value::Int(9)]
            )
            .is_err()
        );
    }

    #[test]
    fn startswith_checks_prefix() {
        assert_eq!(
            dispatch(
                "startswith",
                vec![Value::Str("line1".into()), Value::Str("line".into())]
            )
            .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn count_sums_numeric_and_counts_other_samples() {
        assert_eq!(count_samples(vec![]).unwrap(), Value::Int(0));
        assert_eq!(
            count_samples(vec![Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            count_samples(vec![Value::Int(2), Value::Float(0.5)]).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            count_samples(vec![
                Value::Str("a".into()),
                Value::Bool(true),
                Value::Int(4)
            ])
            .unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn max_rejects_non_orderable_samples() {
        let err = max_samples("flag", vec![Value::Bool(true)]).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn max_promotes_numeric_samples() {
        assert_eq!(
            max_samples("temp", vec![Value::Int(3), Value::Float(3.5), Value::Int(2)]).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(max_samples("temp", vec![]).unwrap(), Value::Void);
    }
}
