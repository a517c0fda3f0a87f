//! Heating control engine
//!
//! Pure, I/O-free parts of the thermostat: the price-to-shift transfer
//! function, the shift aggregator and the hysteresis state machine. The
//! thermostat actor drives these from its evaluation loop.

pub mod hysteresis;
pub mod shift;

pub use hysteresis::{
    ControllerState, EvaluationResult, HvacAction, HvacMode, HysteresisController, Reading,
    Thresholds,
};
pub use shift::{price_shift, total_shift};

use crate::error::{Result, ThermostatError};
use serde::{Deserialize, Serialize};

/// Tuning of one controller instance.
///
/// Replaced wholesale on an options edit, never mutated field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Half-width of the dead-band in °C
    pub tolerance: f64,

    /// Static offset applied to both thresholds (°C, any sign)
    pub base_shift: f64,

    /// Setpoint sent to the real thermostat to force heating on
    pub high_setpoint: f64,

    /// Setpoint sent to the real thermostat to force heating off
    pub low_setpoint: f64,

    /// Largest price-driven shift magnitude in °C
    pub max_price_shift: f64,

    /// Steepness of the tanh price curve
    pub price_steepness: f64,

    /// Whether a price sensor is configured; price tuning is ignored otherwise
    pub price_source: bool,
}

impl ControllerConfig {
    /// Check the numeric invariants of the tuning.
    ///
    /// Errors carry the same field names and codes as configuration-time
    /// validation so callers can surface them per field.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("tolerance", self.tolerance),
            ("base_shift", self.base_shift),
            ("high_setpoint", self.high_setpoint),
            ("low_setpoint", self.low_setpoint),
            ("max_price_shift", self.max_price_shift),
            ("price_steepness", self.price_steepness),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ThermostatError::validation(field, "must_be_finite"));
            }
        }

        if self.tolerance < 0.0 {
            return Err(ThermostatError::validation(
                "tolerance",
                "must_be_non_negative",
            ));
        }
        if self.high_setpoint <= self.low_setpoint {
            return Err(ThermostatError::validation(
                "high_setpoint",
                "high_must_exceed_low",
            ));
        }
        if self.price_source {
            if self.max_price_shift < 0.0 {
                return Err(ThermostatError::validation(
                    "max_price_shift",
                    "must_be_non_negative",
                ));
            }
            if self.price_steepness < 0.0 {
                return Err(ThermostatError::validation(
                    "price_steepness",
                    "must_be_non_negative",
                ));
            }
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tolerance: crate::config::DEFAULT_TOLERANCE,
            base_shift: crate::config::DEFAULT_BASE_SHIFT,
            high_setpoint: crate::config::DEFAULT_HIGH_SETPOINT,
            low_setpoint: crate::config::DEFAULT_LOW_SETPOINT,
            max_price_shift: crate::config::DEFAULT_MAX_PRICE_SHIFT,
            price_steepness: crate::config::DEFAULT_PRICE_STEEPNESS,
            price_source: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_setpoints() {
        let cfg = ControllerConfig {
            high_setpoint: 5.0,
            low_setpoint: 5.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.field(), Some("high_setpoint"));
        assert!(err.to_string().contains("high_must_exceed_low"));
    }

    #[test]
    fn price_tuning_only_checked_with_price_source() {
        let mut cfg = ControllerConfig {
            max_price_shift: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());

        cfg.price_source = true;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.field(), Some("max_price_shift"));
    }

    #[test]
    fn rejects_negative_tolerance_and_nan() {
        let cfg = ControllerConfig {
            tolerance: -0.1,
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().field(), Some("tolerance"));

        let cfg = ControllerConfig {
            base_shift: f64::NAN,
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().field(), Some("base_shift"));
    }
}
