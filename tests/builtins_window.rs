use chrono::{NaiveDate, NaiveDateTime};
use conduct::runtime::{
    BehaviorError, EntityId, EvalError, StaticEntityFacade, Value, run_behavior,
};

fn clock(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 4, 2)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn facade() -> StaticEntityFacade {
    let facade = StaticEntityFacade::new();
    facade.set_now(clock(12, 0));
    facade
}

fn run(source: &str, facade: &StaticEntityFacade) -> conduct::Outcome {
    run_behavior(source, &[], EntityId::new(), facade).expect("run succeeds")
}

#[test]
fn round_truncates_floats_and_passes_integers() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute rounded: float
            attribute untouched: int
            rounded = round(3.14159, 2)
            untouched = round(7, 2)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["rounded"], Value::Float(3.14));
    assert_eq!(outcome.attributes["untouched"], Value::Int(7));
}

#[test]
fn token_splits_on_the_separator() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute second: string
            second = token("a+b+c", 1)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["second"], Value::Str("b".into()));
}

#[test]
fn token_out_of_range_is_fatal() {
    let facade = facade();
    let result = run_behavior(
        "behavior\nattribute t: string\nt = token(\"a+b\", 5)\nend",
        &[],
        EntityId::new(),
        &facade,
    );
    assert!(matches!(
        result,
        Err(BehaviorError::Eval(EvalError::TokenOutOfRange {
            index: 5,
            count: 2
        }))
    ));
}

#[test]
fn substring_and_startswith_compose() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute prefix: string
            attribute matches: bool
            prefix = substring("sensor-42", 0, 6)
            matches = startswith("sensor-42", "sensor")
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["prefix"], Value::Str("sensor".into()));
    assert_eq!(outcome.attributes["matches"], Value::Bool(true));
}

#[test]
fn count_over_time_on_an_empty_window_is_zero() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute temperature: float trend
            attribute total: int
            total = count_over_time(temperature, minute, 10)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["total"], Value::Int(0));
}

#[test]
fn count_over_time_sums_samples_inside_the_window() {
    let facade = facade();
    facade.record_history("temperature", clock(11, 55), Value::Float(2.0));
    facade.record_history("temperature", clock(11, 58), Value::Float(3.5));
    facade.record_history("temperature", clock(10, 0), Value::Float(100.0));
    let outcome = run(
        r#"behavior
            attribute temperature: float trend
            attribute total: float
            total = count_over_time(temperature, minute, 10)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["total"], Value::Float(5.5));
}

#[test]
fn count_over_time_counts_non_numeric_samples() {
    let facade = facade();
    facade.record_history("events", clock(11, 59), Value::Str("started".into()));
    facade.record_history("events", clock(11, 58), Value::Str("stopped".into()));
    let outcome = run(
        r#"behavior
            attribute total: int
            total = count_over_time(events, hour, 1)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["total"], Value::Int(2));
}

#[test]
fn max_over_time_takes_the_window_maximum() {
    let facade = facade();
    facade.record_history("temperature", clock(11, 50), Value::Float(88.0));
    facade.record_history("temperature", clock(11, 55), Value::Float(92.5));
    facade.record_history("temperature", clock(9, 0), Value::Float(120.0));
    let outcome = run(
        r#"behavior
            attribute temperature: float trend
            attribute peak: float
            peak = max_over_time(temperature, hour, 1)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["peak"], Value::Float(92.5));
}

#[test]
fn max_over_time_rejects_boolean_samples() {
    let facade = facade();
    facade.record_history("armed", clock(11, 59), Value::Bool(true));
    let result = run_behavior(
        r#"behavior
            attribute peak: int
            peak = max_over_time(armed, minute, 5)
        end"#,
        &[],
        EntityId::new(),
        &facade,
    );
    assert!(matches!(
        result,
        Err(BehaviorError::Eval(EvalError::Type(_)))
    ));
}

#[test]
fn history_attributes_may_be_known_only_to_the_facade() {
    let facade = facade();
    facade.record_history("vibration", clock(11, 59), Value::Int(4));
    let outcome = run(
        r#"behavior
            attribute total: int
            total = count_over_time(vibration, minute, 5)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["total"], Value::Int(4));
}

#[test]
fn history_builtins_check_their_arity() {
    let facade = facade();
    facade.record_history("vibration", clock(11, 59), Value::Int(4));
    let result = run_behavior(
        "behavior\nattribute t: int\nt = count_over_time(vibration, minute)\nend",
        &[],
        EntityId::new(),
        &facade,
    );
    assert!(matches!(
        result,
        Err(BehaviorError::Eval(EvalError::Arity {
            expected: 3,
            got: 2,
            ..
        }))
    ));
}
