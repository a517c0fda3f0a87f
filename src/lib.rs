//! # Adaptive Thermostat
//!
//! A virtual heating thermostat that drives a real one. The room temperature
//! is compared against a target inside a hysteresis dead-band, and the band
//! is shifted by a static offset plus a price-driven component: when energy
//! is expensive the thermostat tolerates a cooler room, when it is cheap it
//! pre-heats. The real thermostat is commanded with one of two fixed
//! setpoints, high to force heating and low to keep it idle.
//!
//! ## Architecture
//!
//! - `control`: price shift, threshold aggregation and the hysteresis state machine
//! - `thermostat`: per-thermostat task, coalescing update scheduler and command handle
//! - `ports`: sensor, actuator and status interfaces to the host
//! - `registry`: in-memory host implementing the ports
//! - `config`: YAML configuration and validation
//! - `logging`: structured logging and tracing
//! - `web`: HTTP API
//! - `error`: crate error type

pub mod config;
pub mod control;
pub mod error;
pub mod logging;
pub mod ports;
pub mod registry;
pub mod thermostat;
pub mod web;


// Re-export commonly used types
pub use config::{Config, ThermostatConfig};
pub use control::{HvacMode, HysteresisController};
pub use error::{Result, ThermostatError};
pub use registry::EntityRegistry;
pub use thermostat::{AdaptiveThermostat, ThermostatHandle, ThermostatPorts, ThermostatStatus};
