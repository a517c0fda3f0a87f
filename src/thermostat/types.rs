use crate::control::{HvacAction, HvacMode};
use serde::{Deserialize, Serialize};

/// Snapshot published after every evaluation and user command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatStatus {
    pub id: String,
    pub name: String,
    pub unique_id: String,
    pub hvac_mode: HvacMode,
    pub hvac_action: HvacAction,
    pub target_temperature: f64,
    /// Room temperature from the latest reading
    pub current_temperature: Option<f64>,
    pub min_temp: f64,
    pub max_temp: f64,
    pub target_temp_step: f64,
    /// Aggregated threshold shift in °C
    pub current_shift: f64,
    /// `"heating"` or `"idle"`
    pub heating_state: String,
    /// Present only with a configured price sensor and a valid last reading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_diff_percent: Option<f64>,
    /// Last setpoint the real thermostat acknowledged
    pub applied_setpoint: Option<f64>,
    pub last_actuation_failed: bool,
    pub evaluations: u64,
    /// Triggers merged into an evaluation that was already running
    pub coalesced_triggers: u64,
    pub updated_at: String,
}

/// Partial edit of the controller tuning; absent fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatOptions {
    pub tolerance: Option<f64>,
    pub base_shift: Option<f64>,
    pub high_setpoint: Option<f64>,
    pub low_setpoint: Option<f64>,
    pub max_price_shift: Option<f64>,
    pub price_steepness: Option<f64>,
}

impl ThermostatOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply over `config` and return the result; `config` is untouched.
    pub fn apply_to(
        &self,
        config: &crate::config::ThermostatConfig,
    ) -> crate::config::ThermostatConfig {
        let mut next = config.clone();
        if let Some(v) = self.tolerance {
            next.tolerance = v;
        }
        if let Some(v) = self.base_shift {
            next.base_shift = v;
        }
        if let Some(v) = self.high_setpoint {
            next.high_setpoint = v;
        }
        if let Some(v) = self.low_setpoint {
            next.low_setpoint = v;
        }
        if let Some(v) = self.max_price_shift {
            next.max_price_shift = v;
        }
        if let Some(v) = self.price_steepness {
            next.price_steepness = v;
        }
        next
    }
}
