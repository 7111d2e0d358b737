use conduct::runtime::{
    BehaviorError, EntityId, EquipmentState, EvalError, StaticEntityFacade, TimeUnit, Value,
    run_behavior,
};

fn facade() -> StaticEntityFacade {
    let facade = StaticEntityFacade::new();
    facade.define_behavior("site.press.cool", "behavior end");
    facade.register_device("hmi-01");
    facade
}

fn run(source: &str, facade: &StaticEntityFacade) -> conduct::Outcome {
    run_behavior(source, &[], EntityId::new(), facade).expect("run succeeds")
}

fn run_err(source: &str, facade: &StaticEntityFacade) -> EvalError {
    match run_behavior(source, &[], EntityId::new(), facade) {
        Err(BehaviorError::Eval(err)) => err,
        Err(other) => panic!("expected an evaluation failure, got {:?}", other),
        Ok(_) => panic!("expected an evaluation failure, got success"),
    }
}

#[test]
fn float_into_int_attribute_truncates() {
    let facade = facade();
    let outcome = run(
        "behavior\nattribute counter: int\ncounter = 3.7\nend",
        &facade,
    );
    assert_eq!(outcome.attributes["counter"], Value::Int(3));
}

#[test]
fn int_into_float_promotes() {
    let facade = facade();
    let outcome = run(
        "behavior\nattribute level: float\nvar x: float = 5\nlevel = x\nend",
        &facade,
    );
    assert_eq!(outcome.attributes["level"], Value::Float(5.0));
}

#[test]
fn declarations_without_initializer_store_zero_values() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute counter: int
            attribute message: string
            attribute armed: bool
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["counter"], Value::Int(0));
    assert_eq!(outcome.attributes["message"], Value::Str(String::new()));
    assert_eq!(outcome.attributes["armed"], Value::Bool(false));
}

#[test]
fn attribute_reads_come_from_the_facade() {
    let facade = facade();
    facade.insert_attribute("temperature", Value::Float(88.5));
    let outcome = run(
        r#"behavior
            attribute temperature: float
            attribute copy: float
            copy = temperature + 1.0
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["copy"], Value::Float(89.5));
}

#[test]
fn absent_attribute_reads_propagate_through_arithmetic() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute temperature: float
            attribute armed: bool
            armed = temperature + 1.0 == temperature
        end"#,
        &facade,
    );
    // absent + 1.0 is absent, and absent == absent holds
    assert_eq!(outcome.attributes["armed"], Value::Bool(true));
}

#[test]
fn unit_mismatch_fails_attribute_assignment() {
    let facade = facade();
    facade.insert_attribute("inside", Value::Float(20.0));
    let err = run_err(
        r#"behavior
            unit celsius
            unit kelvin
            attribute inside: float in celsius
            attribute outside: float in kelvin
            outside = inside
        end"#,
        &facade,
    );
    assert!(matches!(err, EvalError::UnitMismatch { .. }));
}

#[test]
fn matching_units_assign_cleanly() {
    let facade = facade();
    facade.insert_attribute("inside", Value::Float(20.0));
    let outcome = run(
        r#"behavior
            unit celsius
            attribute inside: float in celsius
            attribute outside: float in celsius
            outside = inside
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["outside"], Value::Float(20.0));
}

#[test]
fn state_write_is_read_back_within_the_run() {
    let facade = facade();
    facade.set_state(EquipmentState::SchedDown);
    let outcome = run(
        r#"behavior
            attribute mirror: string
            state = "operative"
            mirror = state
        end"#,
        &facade,
    );
    assert_eq!(outcome.state, Some(EquipmentState::Operative));
    assert_eq!(outcome.attributes["mirror"], Value::Str("operative".into()));
}

#[test]
fn state_read_falls_back_to_the_facade() {
    let facade = facade();
    facade.set_state(EquipmentState::Initializing);
    let outcome = run(
        r#"behavior
            attribute mirror: string
            mirror = state
        end"#,
        &facade,
    );
    assert_eq!(outcome.state, None);
    assert_eq!(
        outcome.attributes["mirror"],
        Value::Str("initializing".into())
    );
}

#[test]
fn unknown_state_token_stores_undefined() {
    let facade = facade();
    let outcome = run("behavior\nstate = \"exploded\"\nend", &facade);
    assert_eq!(outcome.state, Some(EquipmentState::Undefined));
}

#[test]
fn float_equality_uses_epsilon() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute close: bool
            attribute apart: bool
            close = 3.0000000001 == 3.0
            apart = 3.1 == 3.0
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["close"], Value::Bool(true));
    assert_eq!(outcome.attributes["apart"], Value::Bool(false));
}

#[test]
fn division_of_integers_produces_float() {
    let facade = facade();
    let outcome = run(
        "behavior\nattribute half: float\nhalf = 7 / 2\nend",
        &facade,
    );
    assert_eq!(outcome.attributes["half"], Value::Float(3.5));
}

#[test]
fn string_concatenation_stringifies_the_other_side() {
    let facade = facade();
    facade.insert_attribute("temperature", Value::Float(99.5));
    let outcome = run(
        r#"behavior
            attribute temperature: float
            attribute message: string
            message = "temp: " + temperature
        end"#,
        &facade,
    );
    assert_eq!(
        outcome.attributes["message"],
        Value::Str("temp: 99.5".into())
    );
}

#[test]
fn array_elements_are_assignable_within_bounds() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute first: int
            var buf: int[3]
            buf[0] = 7
            buf[2] = 9
            first = buf[0] + buf[2]
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["first"], Value::Int(16));
}

#[test]
fn out_of_range_element_assignment_fails() {
    let facade = facade();
    let err = run_err(
        "behavior\nvar buf: int[3]\nbuf[3] = 1\nend",
        &facade,
    );
    assert!(matches!(
        err,
        EvalError::IndexOutOfRange { index: 3, len: 3, .. }
    ));
}

#[test]
fn array_elements_reject_wrong_types() {
    let facade = facade();
    let err = run_err(
        "behavior\nvar buf: int[3]\nbuf[0] = \"seven\"\nend",
        &facade,
    );
    assert!(matches!(err, EvalError::Type(_)));
}

#[test]
fn functions_return_through_the_call_boundary() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute result: int
            function pick(a: int, b: int): int {
                if a > b { return a }
                return b
            }
            result = pick(3, 11)
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["result"], Value::Int(11));
}

#[test]
fn return_in_program_body_stops_execution_and_discards_value() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute marker: int
            marker = 1
            return 42
            marker = 2
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["marker"], Value::Int(1));
}

#[test]
fn call_arity_is_checked() {
    let facade = facade();
    let err = run_err(
        r#"behavior
            attribute x: int
            function f(a: int): int { return a }
            x = f(1, 2)
        end"#,
        &facade,
    );
    assert!(matches!(
        err,
        EvalError::Arity {
            expected: 1,
            got: 2,
            ..
        }
    ));
}

#[test]
fn program_parameters_bind_in_order() {
    let facade = facade();
    let outcome = run_behavior(
        r#"behavior (base: int, scale: float)
            attribute result: float
            result = base * scale
        end"#,
        &[Value::Int(4), Value::Float(2.5)],
        EntityId::new(),
        &facade,
    )
    .expect("run succeeds");
    assert_eq!(outcome.attributes["result"], Value::Float(10.0));
}

#[test]
fn program_arity_mismatch_is_fatal() {
    let facade = facade();
    let result = run_behavior(
        "behavior (base: int)\nend",
        &[],
        EntityId::new(),
        &facade,
    );
    assert!(matches!(
        result,
        Err(BehaviorError::Eval(EvalError::Arity { .. }))
    ));
}

#[test]
fn zero_arguments_against_zero_parameters_is_valid() {
    let facade = facade();
    assert!(run_behavior("behavior end", &[], EntityId::new(), &facade).is_ok());
}

#[test]
fn absent_if_guard_is_a_runtime_error() {
    let facade = facade();
    let err = run_err(
        r#"behavior
            attribute flag: bool
            if flag { state = "operative" }
        end"#,
        &facade,
    );
    assert!(matches!(err, EvalError::Absent(_)));
}

#[test]
fn first_true_arm_wins() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute chosen: int
            var x: int = 7
            if x > 10 { chosen = 1 }
            elsif x > 5 { chosen = 2 }
            elsif x > 6 { chosen = 3 }
            else { chosen = 4 }
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["chosen"], Value::Int(2));
}

#[test]
fn timers_materialize_with_resolved_targets() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            import site.press.cool as cool
            timer cooldown 30 second -> cool
            repeat poll 5 minute -> cool
            start cooldown
            start poll
        end"#,
        &facade,
    );
    assert_eq!(outcome.timers.len(), 2);
    let cooldown = &outcome.timers[0];
    assert_eq!(cooldown.name, "cooldown");
    assert_eq!(cooldown.unit, TimeUnit::Second);
    assert_eq!(cooldown.amount, 30);
    assert!(!cooldown.repeating);
    assert_eq!(cooldown.targets, vec!["site", "press", "cool"]);
    assert!(outcome.timers[1].repeating);
}

#[test]
fn show_records_display_messages() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            display panel on "hmi-01"
            show panel "overheat"
            show panel 42
        end"#,
        &facade,
    );
    assert_eq!(outcome.displays.len(), 2);
    assert_eq!(outcome.displays[0].device, "hmi-01");
    assert_eq!(outcome.displays[0].message, "overheat");
    assert_eq!(outcome.displays[1].message, "42");
}

#[test]
fn logical_operators_require_present_booleans() {
    let facade = facade();
    let err = run_err(
        r#"behavior
            attribute flag: bool
            attribute armed: bool
            armed = flag and true
        end"#,
        &facade,
    );
    assert!(matches!(err, EvalError::Absent(_)));
}

#[test]
fn unary_operators_substitute_for_absent_operands() {
    let facade = facade();
    let outcome = run(
        r#"behavior
            attribute flag: bool
            attribute level: float
            attribute inverted: bool
            attribute negated: float
            inverted = not flag
            negated = -level
        end"#,
        &facade,
    );
    assert_eq!(outcome.attributes["inverted"], Value::Bool(true));
    assert_eq!(outcome.attributes["negated"], Value::Float(0.0));
}
