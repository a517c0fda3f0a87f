use adaptive_thermostat::control::{ControllerConfig, price_shift, total_shift};

fn differentials() -> impl Iterator<Item = f64> {
    (-500..=500).step_by(7).map(f64::from)
}

#[test]
fn bounded_by_max_shift() {
    for max in [0.5, 3.0, 10.0] {
        for steep in [0.1, 1.0, 1.5] {
            for p in differentials() {
                let s = price_shift(p, max, steep);
                assert!(s.abs() < max, "p={p} max={max} steep={steep} -> {s}");
            }
        }
    }
}

#[test]
fn odd_in_the_differential() {
    for p in differentials() {
        let a = price_shift(p, 3.0, 1.5);
        let b = price_shift(-p, 3.0, 1.5);
        assert!((a + b).abs() < 1e-12);
    }
}

#[test]
fn non_increasing_in_price() {
    for steep in [0.0, 0.5, 1.5, 4.0] {
        let mut previous = f64::INFINITY;
        for p in differentials() {
            let s = price_shift(p, 3.0, steep);
            assert!(s <= previous, "steep={steep} p={p}");
            previous = s;
        }
    }
}

#[test]
fn scenario_expensive_energy() {
    let shift = price_shift(49.0, 3.0, 1.5);
    assert!((shift - (-1.88)).abs() < 0.01);
}

#[test]
fn cheap_energy_preheats() {
    let shift = price_shift(-30.0, 3.0, 1.5);
    assert!(shift > 1.0 && shift < 3.0);
}

#[test]
fn total_shift_adds_base_offset() {
    let cfg = ControllerConfig {
        base_shift: -0.5,
        price_source: true,
        ..Default::default()
    };
    assert_eq!(total_shift(&cfg, None), -0.5);
    let expected = -0.5 + price_shift(20.0, 3.0, 1.5);
    assert!((total_shift(&cfg, Some(20.0)) - expected).abs() < 1e-12);
}
