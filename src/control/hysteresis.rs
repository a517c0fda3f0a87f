//! Hysteresis state machine
//!
//! Holds the heating bit and decides, from a temperature reading, the target
//! and the aggregated shift, whether the real thermostat should be driven to
//! its high or its low setpoint. Decisions inside the dead-band repeat the
//! previous state so the device does not chatter around the target.

use super::{ControllerConfig, shift::total_shift};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User-selectable operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    /// Heating disabled, real thermostat held at the low setpoint
    Off,
    /// Hysteresis control active
    Heat,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HvacMode {
    type Err = crate::error::ThermostatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(HvacMode::Off),
            "heat" => Ok(HvacMode::Heat),
            _ => Err(crate::error::ThermostatError::validation(
                "mode",
                "unsupported_mode",
            )),
        }
    }
}

/// What the thermostat is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacAction {
    Off,
    Heating,
    Idle,
}

/// Latest sensor values, snapshotted once per evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub temperature: Option<f64>,
    pub price_diff_percent: Option<f64>,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationResult {
    pub should_heat: bool,
    pub total_shift: f64,
    /// True iff the decision differs from the current heating bit in HEAT mode
    pub actuation_required: bool,
}

/// Dead-band bounds after the shift has been applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub lower: f64,
    pub upper: f64,
}

impl Thresholds {
    /// `upper - lower` is always `2 * tolerance`; the shift only translates the band.
    pub fn new(target: f64, tolerance: f64, total_shift: f64) -> Self {
        Self {
            lower: target - tolerance + total_shift,
            upper: target + tolerance + total_shift,
        }
    }

    /// Heating decision for `current_temp`, keeping `previous` inside the band
    pub fn decide(&self, current_temp: f64, previous: bool) -> bool {
        if current_temp < self.lower {
            true
        } else if current_temp > self.upper {
            false
        } else {
            previous
        }
    }
}

/// Mutable controller state, owned by a single evaluation context
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub mode: HvacMode,
    pub target_temperature: f64,
    /// Meaningful only in HEAT mode; always false while OFF
    pub is_heating: bool,
    /// Last setpoint the actuator acknowledged, if any
    pub applied_setpoint: Option<f64>,
    /// Whether the most recent actuator command failed or timed out
    pub last_actuation_failed: bool,
}

impl ControllerState {
    pub fn new(target_temperature: f64) -> Self {
        Self {
            mode: HvacMode::Heat,
            target_temperature,
            is_heating: false,
            applied_setpoint: None,
            last_actuation_failed: false,
        }
    }

    pub fn hvac_action(&self) -> HvacAction {
        match (self.mode, self.is_heating) {
            (HvacMode::Off, _) => HvacAction::Off,
            (HvacMode::Heat, true) => HvacAction::Heating,
            (HvacMode::Heat, false) => HvacAction::Idle,
        }
    }

    /// `"heating"` or `"idle"`, as exposed in the status attributes
    pub fn heating_state(&self) -> &'static str {
        if self.is_heating { "heating" } else { "idle" }
    }
}

/// Hysteresis controller for one thermostat
#[derive(Debug, Clone)]
pub struct HysteresisController {
    config: ControllerConfig,
    state: ControllerState,
}

impl HysteresisController {
    /// Build a controller in HEAT mode with heating off.
    pub fn new(config: ControllerConfig, initial_target: f64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: ControllerState::new(initial_target),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Swap in a new tuning; runtime state is kept.
    pub fn replace_config(&mut self, config: ControllerConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Decide without mutating state.
    ///
    /// Returns `None` when HEAT mode has no temperature to work with: no
    /// decision is made and the caller must leave the device alone.
    pub fn evaluate(&self, reading: &Reading) -> Option<EvaluationResult> {
        let shift = total_shift(&self.config, reading.price_diff_percent);

        if self.state.mode == HvacMode::Off {
            return Some(EvaluationResult {
                should_heat: false,
                total_shift: shift,
                actuation_required: false,
            });
        }

        let current = reading.temperature?;
        let thresholds = self.thresholds(shift);
        let should_heat = thresholds.decide(current, self.state.is_heating);

        Some(EvaluationResult {
            should_heat,
            total_shift: shift,
            actuation_required: should_heat != self.state.is_heating,
        })
    }

    /// Dead-band for the current target and tolerance under `total_shift`
    pub fn thresholds(&self, total_shift: f64) -> Thresholds {
        Thresholds::new(
            self.state.target_temperature,
            self.config.tolerance,
            total_shift,
        )
    }

    /// Record the decision. The heating bit follows `should_heat` even when
    /// the actuator did not confirm the command.
    pub fn commit(&mut self, result: &EvaluationResult) {
        if self.state.mode == HvacMode::Heat {
            self.state.is_heating = result.should_heat;
        }
    }

    /// Setpoint that realises `heat` on the real thermostat
    pub fn setpoint_for(&self, heat: bool) -> f64 {
        if heat {
            self.config.high_setpoint
        } else {
            self.config.low_setpoint
        }
    }

    /// Track the outcome of an actuator command.
    pub fn record_actuation(&mut self, setpoint: f64, succeeded: bool) {
        self.state.last_actuation_failed = !succeeded;
        if succeeded {
            self.state.applied_setpoint = Some(setpoint);
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.state.target_temperature = target;
    }

    /// Switch mode.
    ///
    /// Entering OFF clears the heating bit and returns the low setpoint when
    /// it still has to be sent. Entering HEAT returns `None`; the caller
    /// re-evaluates immediately.
    pub fn set_mode(&mut self, mode: HvacMode) -> Option<f64> {
        self.state.mode = mode;
        match mode {
            HvacMode::Off => {
                self.state.is_heating = false;
                let low = self.config.low_setpoint;
                if self.state.applied_setpoint == Some(low) {
                    None
                } else {
                    Some(low)
                }
            }
            HvacMode::Heat => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> HysteresisController {
        HysteresisController::new(ControllerConfig::default(), 20.0).unwrap()
    }

    fn at(temp: f64) -> Reading {
        Reading {
            temperature: Some(temp),
            price_diff_percent: None,
        }
    }

    #[test]
    fn starts_in_heat_mode_idle() {
        let c = controller();
        assert_eq!(c.state().mode, HvacMode::Heat);
        assert!(!c.state().is_heating);
        assert_eq!(c.state().hvac_action(), HvacAction::Idle);
    }

    #[test]
    fn below_lower_threshold_turns_heating_on() {
        let c = controller();
        let r = c.evaluate(&at(19.3)).unwrap();
        assert!(r.should_heat);
        assert!(r.actuation_required);
        assert_eq!(c.setpoint_for(r.should_heat), 35.0);
    }

    #[test]
    fn dead_band_keeps_previous_state() {
        let mut c = controller();
        let on = c.evaluate(&at(19.0)).unwrap();
        c.commit(&on);
        assert!(c.state().is_heating);

        let r = c.evaluate(&at(20.4)).unwrap();
        assert!(r.should_heat);
        assert!(!r.actuation_required);

        let r = c.evaluate(&at(20.6)).unwrap();
        assert!(!r.should_heat);
        assert!(r.actuation_required);
    }

    #[test]
    fn band_boundaries_are_inclusive() {
        let c = controller();
        // lower = 19.5, upper = 20.5
        assert!(!c.evaluate(&at(19.5)).unwrap().should_heat);
        assert!(!c.evaluate(&at(20.5)).unwrap().should_heat);
    }

    #[test]
    fn missing_temperature_makes_no_decision() {
        let c = controller();
        assert!(c.evaluate(&Reading::default()).is_none());
    }

    #[test]
    fn off_mode_never_heats_or_actuates() {
        let mut c = controller();
        let on = c.evaluate(&at(15.0)).unwrap();
        c.commit(&on);
        assert_eq!(c.set_mode(HvacMode::Off), Some(5.0));
        assert!(!c.state().is_heating);

        let r = c.evaluate(&at(10.0)).unwrap();
        assert!(!r.should_heat);
        assert!(!r.actuation_required);
        assert_eq!(c.state().hvac_action(), HvacAction::Off);
    }

    #[test]
    fn off_skips_low_setpoint_already_applied() {
        let mut c = controller();
        c.record_actuation(5.0, true);
        assert_eq!(c.set_mode(HvacMode::Off), None);
    }

    #[test]
    fn failed_actuation_keeps_previous_applied_setpoint() {
        let mut c = controller();
        c.record_actuation(35.0, true);
        c.record_actuation(5.0, false);
        assert_eq!(c.state().applied_setpoint, Some(35.0));
        assert!(c.state().last_actuation_failed);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("HEAT".parse::<HvacMode>().unwrap(), HvacMode::Heat);
        assert_eq!(" off ".parse::<HvacMode>().unwrap(), HvacMode::Off);
        assert!("cool".parse::<HvacMode>().is_err());
    }
}
