//! Configuration management for the adaptive thermostat
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. One file describes the logging and web
//! setup, the entities the built-in host starts with, and any number of
//! independent thermostats.

use crate::control::ControllerConfig;
use crate::error::{Result, ThermostatError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

mod defaults;

pub const DEFAULT_TOLERANCE: f64 = 0.5;
pub const DEFAULT_BASE_SHIFT: f64 = 0.0;
/// Forces the real thermostat to heat
pub const DEFAULT_HIGH_SETPOINT: f64 = 35.0;
/// Forces the real thermostat to stay idle
pub const DEFAULT_LOW_SETPOINT: f64 = 5.0;
pub const DEFAULT_MAX_PRICE_SHIFT: f64 = 3.0;
pub const DEFAULT_PRICE_STEEPNESS: f64 = 1.5;
/// Temperature polling cadence in seconds
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_ACTUATOR_TIMEOUT_MS: u64 = 10_000;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 86_400;
pub const MAX_ACTUATOR_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_MIN_TEMP: f64 = 5.0;
pub const DEFAULT_MAX_TEMP: f64 = 35.0;
pub const DEFAULT_TARGET_TEMP_STEP: f64 = 0.5;
pub const DEFAULT_TARGET_TEMPERATURE: f64 = 20.0;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "ADAPTIVE_THERMOSTAT_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Entities known to the built-in host at startup
    pub entities: Vec<EntitySeed>,

    /// Thermostats to run
    pub thermostats: Vec<ThermostatConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file; its directory receives the daily rolled files
    pub file: String,

    /// Number of rolled files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the HTTP API
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Initial state of a host entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySeed {
    pub entity_id: String,

    #[serde(default = "unknown_state")]
    pub state: String,
}

fn unknown_state() -> String {
    "unknown".to_string()
}

/// One adaptive thermostat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatConfig {
    /// Display name; derived from `real_thermostat` when absent
    pub name: Option<String>,

    /// Climate entity whose setpoint is driven
    pub real_thermostat: String,

    /// Room temperature sensor entity
    pub temperature_sensor: String,

    /// Optional price differential sensor entity (percent)
    pub price_sensor: Option<String>,

    /// Half-width of the dead-band in °C
    pub tolerance: f64,

    /// Static threshold shift in °C
    pub base_shift: f64,

    /// Setpoint that forces heating on
    pub high_setpoint: f64,

    /// Setpoint that forces heating off
    pub low_setpoint: f64,

    /// Largest price-driven shift in °C
    pub max_price_shift: f64,

    /// Steepness of the price curve
    pub price_steepness: f64,

    /// Temperature polling interval in seconds
    pub update_interval_secs: u64,

    /// Upper bound for one actuator command in milliseconds
    pub actuator_timeout_ms: u64,

    /// Lowest user-selectable target
    pub min_temp: f64,

    /// Highest user-selectable target
    pub max_temp: f64,

    /// Target temperature granularity
    pub target_temp_step: f64,

    /// Target temperature after startup
    pub initial_target: f64,
}

/// Existence check for host entities, used by configuration validation
pub trait EntityCatalog {
    fn contains_entity(&self, entity_id: &str) -> bool;
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `$ADAPTIVE_THERMOSTAT_CONFIG` or the first
    /// default location that exists, falling back to built-in defaults.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }

        let default_paths = [
            "adaptive_thermostat.yaml",
            "/data/adaptive_thermostat.yaml",
            "/etc/adaptive-thermostat/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate everything that does not need the host
    pub fn validate(&self) -> Result<()> {
        crate::logging::parse_log_level(&self.logging.level)?;

        if self.web.enabled && self.web.port == 0 {
            return Err(ThermostatError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        let mut ids = HashSet::new();
        for (index, thermostat) in self.thermostats.iter().enumerate() {
            if let Some((field, code)) = thermostat.structural_errors().into_iter().next() {
                return Err(ThermostatError::validation(
                    format!("thermostats[{}].{}", index, field),
                    code,
                ));
            }
            if !ids.insert(thermostat.id()) {
                return Err(ThermostatError::validation(
                    format!("thermostats[{}].name", index),
                    "duplicate_thermostat",
                ));
            }
        }

        let mirrors: HashSet<String> = self
            .thermostats
            .iter()
            .map(ThermostatConfig::status_entity_id)
            .collect();
        for (index, thermostat) in self.thermostats.iter().enumerate() {
            for (field, entity_id) in thermostat.references() {
                if mirrors.contains(entity_id.trim()) {
                    return Err(ThermostatError::validation(
                        format!("thermostats[{}].{}", index, field),
                        "conflicts_with_status_entity",
                    ));
                }
            }
        }

        Ok(())
    }
}

impl ThermostatConfig {
    /// Display name, e.g. `climate.living_room` -> `Adaptive Living Room`
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => derive_display_name(&self.real_thermostat),
        }
    }

    /// URL- and entity-safe identifier derived from the display name
    pub fn id(&self) -> String {
        slugify(&self.display_name())
    }

    /// Stable identifier for hosts that track entities across restarts
    pub fn unique_id(&self) -> String {
        format!("adaptive_thermostat_{}", self.id())
    }

    /// Entity the host mirrors this thermostat's status into
    pub fn status_entity_id(&self) -> String {
        status_entity_id(&self.unique_id())
    }

    /// Field-level errors, keyed by field name, for this thermostat
    /// against the entities the host knows about.
    pub fn field_errors(&self, catalog: &dyn EntityCatalog) -> BTreeMap<String, String> {
        let mut errors: BTreeMap<String, String> = BTreeMap::new();
        for (field, code) in self.structural_errors() {
            errors.entry(field).or_insert(code);
        }

        let status_entity = self.status_entity_id();
        for (field, entity_id) in self.references() {
            if entity_id.trim() == status_entity {
                errors
                    .entry(field.to_string())
                    .or_insert_with(|| "conflicts_with_status_entity".to_string());
            } else if !entity_id.trim().is_empty() && !catalog.contains_entity(entity_id) {
                errors
                    .entry(field.to_string())
                    .or_insert_with(|| "entity_not_found".to_string());
            }
        }

        errors
    }

    /// Validate against the host and produce the controller tuning.
    ///
    /// The first field error is returned; all of them are available through
    /// [`ThermostatConfig::field_errors`].
    pub fn controller_config(&self, catalog: &dyn EntityCatalog) -> Result<ControllerConfig> {
        if let Some((field, code)) = self.field_errors(catalog).into_iter().next() {
            return Err(ThermostatError::validation(field, code));
        }
        Ok(self.tuning())
    }

    /// Controller tuning without any validation
    pub fn tuning(&self) -> ControllerConfig {
        ControllerConfig {
            tolerance: self.tolerance,
            base_shift: self.base_shift,
            high_setpoint: self.high_setpoint,
            low_setpoint: self.low_setpoint,
            max_price_shift: self.max_price_shift,
            price_steepness: self.price_steepness,
            price_source: self.has_price_sensor(),
        }
    }

    /// Entity references keyed by the field that names them
    fn references(&self) -> Vec<(&'static str, &str)> {
        let mut references = vec![
            ("real_thermostat", self.real_thermostat.as_str()),
            ("temperature_sensor", self.temperature_sensor.as_str()),
        ];
        if let Some(price) = self.price_sensor.as_deref() {
            references.push(("price_sensor", price));
        }
        references
    }

    pub fn has_price_sensor(&self) -> bool {
        self.price_sensor
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Checks that need no host: required references, numeric ranges and
    /// the controller invariants.
    fn structural_errors(&self) -> Vec<(String, String)> {
        let mut errors: Vec<(String, String)> = Vec::new();
        let mut push = |field: &str, code: &str| errors.push((field.to_string(), code.to_string()));

        if self.real_thermostat.trim().is_empty() {
            push("real_thermostat", "required");
        }
        if self.temperature_sensor.trim().is_empty() {
            push("temperature_sensor", "required");
        }

        if let Err(ThermostatError::Validation { field, message }) = self.tuning().validate() {
            push(&field, &message);
        }

        if self.update_interval_secs == 0 {
            push("update_interval_secs", "must_be_positive");
        } else if self.update_interval_secs > MAX_UPDATE_INTERVAL_SECS {
            push("update_interval_secs", "out_of_range");
        }
        if self.actuator_timeout_ms == 0 {
            push("actuator_timeout_ms", "must_be_positive");
        } else if self.actuator_timeout_ms > MAX_ACTUATOR_TIMEOUT_MS {
            push("actuator_timeout_ms", "out_of_range");
        }
        if !self.min_temp.is_finite() || !self.max_temp.is_finite() {
            push("max_temp", "must_be_finite");
        } else if self.max_temp <= self.min_temp {
            push("max_temp", "max_must_exceed_min");
        }
        if !(self.target_temp_step.is_finite() && self.target_temp_step > 0.0) {
            push("target_temp_step", "must_be_positive");
        }
        if !(self.initial_target >= self.min_temp && self.initial_target <= self.max_temp) {
            push("initial_target", "out_of_range");
        }

        errors
    }
}

/// `adaptive_thermostat_living_room` -> `climate.adaptive_thermostat_living_room`
pub fn status_entity_id(unique_id: &str) -> String {
    format!("climate.{}", unique_id)
}

/// `climate.living_room` -> `Adaptive Living Room`
pub fn derive_display_name(real_thermostat: &str) -> String {
    let object_id = real_thermostat.rsplit('.').next().unwrap_or(real_thermostat);
    let words: Vec<String> = object_id
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();
    format!("Adaptive {}", words.join(" "))
}

/// Lowercase, with runs of non-alphanumerics collapsed to `_`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}
