use adaptive_thermostat::config::{Config, EntitySeed, ThermostatConfig};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.web.port = 9090;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();
    cfg.thermostats.push(ThermostatConfig {
        real_thermostat: "climate.living_room".to_string(),
        temperature_sensor: "sensor.living_room_temperature".to_string(),
        price_sensor: Some("sensor.price_diff".to_string()),
        tolerance: 0.3,
        ..Default::default()
    });

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.web.port, 9090);
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert_eq!(loaded.thermostats, cfg.thermostats);
}

#[test]
fn minimal_yaml_fills_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        br#"
entities:
  - entity_id: climate.bedroom
    state: heat
  - entity_id: sensor.bedroom_temperature
thermostats:
  - real_thermostat: climate.bedroom
    temperature_sensor: sensor.bedroom_temperature
    base_shift: -0.5
"#,
    )
    .unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert!(cfg.validate().is_ok());

    let seeds: &[EntitySeed] = &cfg.entities;
    assert_eq!(seeds[1].state, "unknown");

    let t = &cfg.thermostats[0];
    assert_eq!(t.display_name(), "Adaptive Bedroom");
    assert_eq!(t.tolerance, 0.5);
    assert_eq!(t.base_shift, -0.5);
    assert_eq!(t.high_setpoint, 35.0);
    assert_eq!(t.low_setpoint, 5.0);
    assert_eq!(t.update_interval_secs, 30);
    assert_eq!(t.actuator_timeout_ms, 10_000);
    assert!(t.price_sensor.is_none());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    // Disabled web server does not care about its port
    cfg.web.enabled = false;
    assert!(cfg.validate().is_ok());

    cfg = Config::default();
    cfg.thermostats.push(ThermostatConfig::default());
    let err = cfg.validate().unwrap_err();
    assert_eq!(err.field(), Some("thermostats[0].real_thermostat"));
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn from_missing_file_is_io_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(tmp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
