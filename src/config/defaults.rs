use super::*;

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/adaptive_thermostat.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            name: None,
            real_thermostat: String::new(),
            temperature_sensor: String::new(),
            price_sensor: None,
            tolerance: DEFAULT_TOLERANCE,
            base_shift: DEFAULT_BASE_SHIFT,
            high_setpoint: DEFAULT_HIGH_SETPOINT,
            low_setpoint: DEFAULT_LOW_SETPOINT,
            max_price_shift: DEFAULT_MAX_PRICE_SHIFT,
            price_steepness: DEFAULT_PRICE_STEEPNESS,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            actuator_timeout_ms: DEFAULT_ACTUATOR_TIMEOUT_MS,
            min_temp: DEFAULT_MIN_TEMP,
            max_temp: DEFAULT_MAX_TEMP,
            target_temp_step: DEFAULT_TARGET_TEMP_STEP,
            initial_target: DEFAULT_TARGET_TEMPERATURE,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            entities: Vec::new(),
            thermostats: Vec::new(),
        }
    }
}
