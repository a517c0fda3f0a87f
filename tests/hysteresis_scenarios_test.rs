use adaptive_thermostat::control::{
    ControllerConfig, HvacMode, HysteresisController, Reading, Thresholds,
};

fn controller(config: ControllerConfig) -> HysteresisController {
    HysteresisController::new(config, 20.0).unwrap()
}

fn reading(temperature: f64, price: Option<f64>) -> Reading {
    Reading {
        temperature: Some(temperature),
        price_diff_percent: price,
    }
}

#[test]
fn scenario_cold_room_starts_heating() {
    let c = controller(ControllerConfig::default());
    let result = c.evaluate(&reading(19.3, None)).unwrap();
    assert!(result.should_heat);
    assert!(result.actuation_required);
    assert_eq!(c.setpoint_for(result.should_heat), 35.0);
}

#[test]
fn scenario_expensive_energy_lowers_band() {
    let c = controller(ControllerConfig {
        price_source: true,
        ..Default::default()
    });
    // Shift ~ -1.88: lower threshold drops to ~17.62
    let result = c.evaluate(&reading(18.0, Some(49.0))).unwrap();
    assert!(!result.should_heat);
    assert!(!result.actuation_required);
    assert!((result.total_shift + 1.878).abs() < 1e-3);
}

#[test]
fn scenario_unavailable_temperature_changes_nothing() {
    let mut c = controller(ControllerConfig::default());
    let on = c.evaluate(&reading(15.0, None)).unwrap();
    c.commit(&on);
    let before = c.state().clone();

    assert!(c.evaluate(&Reading::default()).is_none());
    assert_eq!(c.state(), &before);
}

#[test]
fn below_lower_threshold_always_heats() {
    for previous in [false, true] {
        let mut c = controller(ControllerConfig::default());
        if previous {
            let on = c.evaluate(&reading(10.0, None)).unwrap();
            c.commit(&on);
        }
        let r = c.evaluate(&reading(19.49, None)).unwrap();
        c.commit(&r);
        assert!(c.state().is_heating);
    }
}

#[test]
fn inside_band_keeps_state() {
    for previous in [false, true] {
        let mut c = controller(ControllerConfig::default());
        if previous {
            let on = c.evaluate(&reading(10.0, None)).unwrap();
            c.commit(&on);
        }
        for t in [19.6, 19.9, 20.0, 20.2, 20.4] {
            let r = c.evaluate(&reading(t, None)).unwrap();
            assert!(!r.actuation_required);
            c.commit(&r);
            assert_eq!(c.state().is_heating, previous);
        }
    }
}

#[test]
fn off_then_heat_matches_fresh_decision() {
    for t in [18.0, 19.8, 22.0] {
        let fresh = controller(ControllerConfig::default());
        let expected = fresh.evaluate(&reading(t, None)).unwrap().should_heat;

        let mut c = controller(ControllerConfig::default());
        c.set_mode(HvacMode::Off);
        c.set_mode(HvacMode::Heat);
        let r = c.evaluate(&reading(t, None)).unwrap();
        assert_eq!(r.should_heat, expected, "t={t}");
    }
}

#[test]
fn band_width_is_twice_tolerance() {
    for shift in [-3.0, 0.0, 1.25] {
        let th = Thresholds::new(21.0, 0.4, shift);
        assert!((th.upper - th.lower - 0.8).abs() < 1e-12);
    }
}

#[test]
fn options_edit_keeps_runtime_state() {
    let mut c = controller(ControllerConfig::default());
    let on = c.evaluate(&reading(18.0, None)).unwrap();
    c.commit(&on);

    c.replace_config(ControllerConfig {
        tolerance: 1.0,
        ..Default::default()
    })
    .unwrap();
    assert!(c.state().is_heating);
    assert_eq!(c.config().tolerance, 1.0);

    let bad = ControllerConfig {
        high_setpoint: 1.0,
        ..Default::default()
    };
    assert!(c.replace_config(bad).is_err());
    assert_eq!(c.config().tolerance, 1.0);
}
