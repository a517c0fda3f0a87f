//! Error types and handling for the adaptive thermostat
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for thermostat operations
pub type Result<T> = std::result::Result<T, ThermostatError>;

/// Main error type for the adaptive thermostat
#[derive(Debug, Error)]
pub enum ThermostatError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Field-level validation errors; `message` carries a stable error code
    /// such as `entity_not_found` or `high_must_exceed_low`
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Sensor read errors
    #[error("Sensor error: {message}")]
    Sensor { message: String },

    /// Actuator command errors
    #[error("Actuator error: {message}")]
    Actuator { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Unknown thermostat or entity
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// The thermostat task is no longer running
    #[error("Thermostat shut down: {message}")]
    Shutdown { message: String },
}

impl ThermostatError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ThermostatError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        ThermostatError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new sensor error
    pub fn sensor<S: Into<String>>(message: S) -> Self {
        ThermostatError::Sensor {
            message: message.into(),
        }
    }

    /// Create a new actuator error
    pub fn actuator<S: Into<String>>(message: S) -> Self {
        ThermostatError::Actuator {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        ThermostatError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        ThermostatError::NotFound {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ThermostatError::Io {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        ThermostatError::Web {
            message: message.into(),
        }
    }

    /// Create a new shutdown error
    pub fn shutdown<S: Into<String>>(message: S) -> Self {
        ThermostatError::Shutdown {
            message: message.into(),
        }
    }

    /// Field name for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            ThermostatError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ThermostatError {
    fn from(err: std::io::Error) -> Self {
        ThermostatError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ThermostatError {
    fn from(err: serde_yaml::Error) -> Self {
        ThermostatError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ThermostatError {
    fn from(err: serde_json::Error) -> Self {
        ThermostatError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ThermostatError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ThermostatError::timeout(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ThermostatError::config("test config error");
        assert!(matches!(err, ThermostatError::Config { .. }));

        let err = ThermostatError::actuator("test actuator error");
        assert!(matches!(err, ThermostatError::Actuator { .. }));

        let err = ThermostatError::validation("high_setpoint", "high_must_exceed_low");
        assert!(matches!(err, ThermostatError::Validation { .. }));
        assert_eq!(err.field(), Some("high_setpoint"));
    }

    #[test]
    fn test_error_display() {
        let err = ThermostatError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = ThermostatError::validation("real_thermostat", "entity_not_found");
        assert_eq!(
            format!("{}", err),
            "Validation error: real_thermostat - entity_not_found"
        );
    }
}
