use conduct::runtime::{
    EntityFacade, EntityId, EquipmentState, FacadeFixture, StaticEntityFacade, Value, run_behavior,
};
use tempfile::TempDir;

const FIXTURE: &str = r#"{
    "attributes": {
        "temperature": { "Float": 91.5 }
    },
    "history": {
        "temperature": [
            ["2026-04-02T11:58:00", { "Float": 91.5 }],
            ["2026-04-02T11:30:00", { "Float": 87.0 }]
        ]
    },
    "state": "operative",
    "behaviors": {
        "site.press.cool": "behavior end"
    },
    "devices": ["hmi-01"],
    "now": "2026-04-02T12:00:00"
}"#;

fn load_fixture(raw: &str) -> StaticEntityFacade {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.json");
    std::fs::write(&path, raw).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    let fixture: FacadeFixture = serde_json::from_str(&raw).expect("fixture parses");
    StaticEntityFacade::from_fixture(fixture)
}

#[test]
fn fixture_round_trips_through_json() {
    let facade = load_fixture(FIXTURE);
    assert_eq!(
        facade.latest_attribute("temperature"),
        Some(Value::Float(91.5))
    );
    assert_eq!(
        facade.current_state(&EntityId::new()),
        EquipmentState::Operative
    );
    assert!(facade.display_device("hmi-01").is_some());
    assert!(facade.display_device("hmi-02").is_none());
    assert!(
        facade
            .behavior_source(&EntityId::new(), "site.press.cool")
            .is_some()
    );
}

#[test]
fn missing_fixture_sections_default_to_empty() {
    let fixture: FacadeFixture = serde_json::from_str("{}").expect("empty fixture parses");
    let facade = StaticEntityFacade::from_fixture(fixture);
    assert!(facade.latest_attribute("anything").is_none());
    assert_eq!(
        facade.current_state(&EntityId::new()),
        EquipmentState::Undefined
    );
}

#[test]
fn behaviors_execute_against_a_loaded_fixture() {
    let facade = load_fixture(FIXTURE);
    let outcome = run_behavior(
        r#"behavior
            import site.press.cool as cool
            attribute temperature: float trend
            attribute peak: float
            display panel on "hmi-01"
            peak = max_over_time(temperature, minute, 45)
            if temperature > 90.0 { show panel "temp: " + temperature }
        end"#,
        &[],
        EntityId::new(),
        &facade,
    )
    .expect("run succeeds");
    assert_eq!(outcome.attributes["peak"], Value::Float(91.5));
    assert_eq!(outcome.displays.len(), 1);
    assert_eq!(outcome.displays[0].message, "temp: 91.5");
}

#[test]
fn outcomes_serialize_for_downstream_consumers() {
    let facade = load_fixture(FIXTURE);
    let outcome = run_behavior(
        r#"behavior
            attribute counter: int
            counter = 3
            state = "sched_down"
        end"#,
        &[],
        EntityId::new(),
        &facade,
    )
    .expect("run succeeds");
    let json = serde_json::to_string(&outcome).expect("outcome serializes");
    assert!(json.contains("\"counter\""));
    assert!(json.contains("sched_down"));
}
