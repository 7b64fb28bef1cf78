use tardiness::{Instance, InstanceBuilder, Schedule, SolverConfig};

const INSTANCE: &str = r#"{
    "orders": [
        { "id": "A", "processing_time": 5, "due_date": 10, "priority": 1 },
        { "id": "B", "processing_time": 3, "due_date": 10, "priority": 2 }
    ],
    "machines": ["M1", "M2"],
    "setup": [
        { "from": "A", "to": "B", "time": 1 },
        { "from": "B", "to": "A", "time": 4 }
    ]
}"#;

#[test]
fn deserialize_instance() {
    let instance: Instance = serde_json::from_str(INSTANCE).unwrap();

    assert_eq!(instance.num_orders(), 2);
    assert_eq!(instance.num_machines(), 2);
    assert_eq!(instance.machines()[1].id, "M2");
    assert_eq!(instance.priority(1), 2.);
    assert_eq!(instance.setup(0, 1), 1.);
    assert_eq!(instance.setup(1, 0), 4.);
}

#[test]
fn instance_round_trip() {
    let instance: Instance = serde_json::from_str(INSTANCE).unwrap();

    let json = serde_json::to_string(&instance).unwrap();
    let restored: Instance = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, instance);
}

#[test]
fn setup_table_is_optional() {
    let instance: Instance = serde_json::from_str(
        r#"{ "orders": [{ "id": "A", "processing_time": 1, "due_date": 0, "priority": 1 }],
             "machines": ["M1"] }"#,
    )
    .unwrap();

    assert_eq!(instance.max_setup(), 0.);
}

#[test]
fn deserialization_validates() {
    let result = serde_json::from_str::<Instance>(
        r#"{ "orders": [{ "id": "A", "processing_time": 0, "due_date": 0, "priority": 1 }],
             "machines": ["M1"] }"#,
    );

    let err = result.unwrap_err().to_string();
    assert!(err.contains("invalid instance"), "{err}");
}

#[test]
fn schedule_round_trip() {
    let instance = InstanceBuilder::new()
        .order("A", 1, 1, 1)
        .machine("M1")
        .build()
        .unwrap();

    let schedule = Schedule::empty(&instance);
    let json = serde_json::to_string(&schedule).unwrap();

    assert_eq!(serde_json::from_str::<Schedule>(&json).unwrap(), schedule);
}

#[test]
fn config_from_json() {
    let config: SolverConfig = serde_json::from_str(
        r#"{ "time_limit": { "secs": 5, "nanos": 0 }, "big_m": 1000.0 }"#,
    )
    .unwrap();

    assert_eq!(config.time_limit, Some(std::time::Duration::from_secs(5)));
    assert_eq!(config.big_m, Some(1000.));
    assert_eq!(config.threshold, 0.5);
}
