use adaptive_thermostat::error::ThermostatError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        ThermostatError::config("x"),
        ThermostatError::Config { .. }
    ));
    assert!(matches!(
        ThermostatError::sensor("x"),
        ThermostatError::Sensor { .. }
    ));
    assert!(matches!(
        ThermostatError::actuator("x"),
        ThermostatError::Actuator { .. }
    ));
    assert!(matches!(ThermostatError::web("x"), ThermostatError::Web { .. }));
}

#[test]
fn error_constructors_group_2() {
    let ser = ThermostatError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, ThermostatError::Serialization { .. }));
    assert!(matches!(ThermostatError::io("x"), ThermostatError::Io { .. }));
    assert!(matches!(
        ThermostatError::timeout("x"),
        ThermostatError::Timeout { .. }
    ));
    assert!(matches!(
        ThermostatError::not_found("x"),
        ThermostatError::NotFound { .. }
    ));
    assert!(matches!(
        ThermostatError::shutdown("x"),
        ThermostatError::Shutdown { .. }
    ));
}

#[test]
fn validation_carries_field_and_code() {
    let e = ThermostatError::validation("price_sensor", "entity_not_found");
    assert_eq!(e.field(), Some("price_sensor"));
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
    assert!(s.contains("entity_not_found"));
    assert_eq!(ThermostatError::io("x").field(), None);
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: ThermostatError = io.into();
    assert!(matches!(e, ThermostatError::Io { .. }));
}

#[tokio::test]
async fn elapsed_converts_to_timeout() {
    let elapsed = tokio::time::timeout(
        std::time::Duration::from_millis(1),
        std::future::pending::<()>(),
    )
    .await
    .unwrap_err();
    let e: ThermostatError = elapsed.into();
    assert!(matches!(e, ThermostatError::Timeout { .. }));
}
