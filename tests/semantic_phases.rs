use conduct::runtime::{EntityId, StaticEntityFacade, check_behavior};

fn facade() -> StaticEntityFacade {
    let facade = StaticEntityFacade::new();
    facade.define_behavior("site.press.cool", "behavior end");
    facade.register_device("hmi-01");
    facade
}

fn diagnostics(source: &str) -> Vec<String> {
    let facade = facade();
    check_behavior(source, EntityId::new(), &facade)
        .expect("source should parse")
        .into_iter()
        .map(|diagnostic| diagnostic.message)
        .collect()
}

#[test]
fn clean_program_has_no_diagnostics() {
    let source = r#"behavior (threshold: float)
        import site.press.cool as cool
        unit celsius
        attribute temperature: float in celsius trend
        timer cooldown 30 second -> cool
        display panel on "hmi-01"
        var x: float = 1.5
        if x > threshold { state = "unsched_down" show panel "hot" }
        else { state = "operative" }
        start cooldown
    end"#;
    assert!(diagnostics(source).is_empty());
}

#[test]
fn undeclared_reference_names_the_identifier() {
    let source = "behavior\nvar x: int = pressure\nend";
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("pressure"));
}

#[test]
fn assignment_to_undefined_name_is_reported() {
    let source = "behavior\ncounter = 1\nend";
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("counter"));
}

#[test]
fn duplicate_attribute_yields_exactly_one_error() {
    let source = r#"behavior
        attribute temperature: float
        attribute temperature: int
    end"#;
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("temperature"));
}

#[test]
fn duplicate_unit_is_an_error() {
    let source = "behavior\nunit celsius\nunit celsius\nend";
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("celsius"));
}

#[test]
fn variable_shadowing_an_attribute_is_an_error() {
    let source = r#"behavior
        attribute temperature: float
        var temperature: int
    end"#;
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("collides"));
}

#[test]
fn timer_without_unit_is_an_error() {
    let source = r#"behavior
        import site.press.cool as cool
        timer t 30 -> cool
    end"#;
    let found = diagnostics(source);
    assert!(found.iter().any(|message| message.contains("time unit")));
}

#[test]
fn timer_with_bad_amount_is_an_error() {
    let source = r#"behavior
        import site.press.cool as cool
        timer t nonsense second -> cool
    end"#;
    let found = diagnostics(source);
    assert!(found.iter().any(|message| message.contains("amount")));
}

#[test]
fn unresolved_import_is_reported() {
    let source = "behavior\nimport site.press.missing\nend";
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("site.press.missing"));
}

#[test]
fn unknown_display_device_is_reported() {
    let source = "behavior\ndisplay panel on \"nope\"\nend";
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("nope"));
}

#[test]
fn redeclaring_a_display_is_a_silent_no_op() {
    let source = r#"behavior
        display panel on "hmi-01"
        display panel on "hmi-01"
    end"#;
    assert!(diagnostics(source).is_empty());
}

#[test]
fn attribute_unit_suffix_must_resolve() {
    let source = "behavior\nattribute temperature: float in kelvin\nend";
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("kelvin"));
}

#[test]
fn timer_target_must_be_an_import() {
    let source = r#"behavior
        var x: int
        timer t 30 second -> x
    end"#;
    let found = diagnostics(source);
    assert!(found.iter().any(|message| message.contains("not an import")));
}

#[test]
fn function_used_as_value_is_reported() {
    let source = r#"behavior
        function f(): int { return 1 }
        var x: int = f
    end"#;
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("used as a value"));
}

#[test]
fn calling_a_variable_is_reported() {
    let source = r#"behavior
        var x: int
        var y: int = x()
    end"#;
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("not callable"));
}

#[test]
fn all_defects_are_reported_in_one_pass() {
    let source = r#"behavior
        import site.press.missing
        attribute temperature: float in kelvin
        display panel on "nope"
        counter = pressure
    end"#;
    let found = diagnostics(source);
    assert_eq!(found.len(), 5);
}

#[test]
fn state_declaration_is_idempotent() {
    let source = r#"behavior
        state = "operative"
        state = "initializing"
    end"#;
    assert!(diagnostics(source).is_empty());
}

#[test]
fn functions_are_callable_from_sibling_statements() {
    let source = r#"behavior
        function twice(a: int): int { return a * 2 }
        var x: int = twice(4)
    end"#;
    assert!(diagnostics(source).is_empty());
}

#[test]
fn block_scopes_do_not_leak() {
    let source = r#"behavior
        if true { var inner: int = 1 }
        var x: int = inner
    end"#;
    let found = diagnostics(source);
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("inner"));
}

#[test]
fn syntax_errors_are_distinct_from_diagnostics() {
    let facade = facade();
    let result = check_behavior("behavior if {", EntityId::new(), &facade);
    assert!(result.is_err());
}
