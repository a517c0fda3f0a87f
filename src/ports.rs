//! Interfaces between the control engine and its host
//!
//! The thermostat never touches the host's object model directly. It reads
//! sensor states and subscribes to their changes through [`SensorPort`],
//! commands the real thermostat through [`ActuatorPort`] and publishes its
//! status through [`StatusSink`].

use crate::error::Result;
use crate::thermostat::ThermostatStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// A state change of one host entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: String,
    pub old_state: Option<String>,
    /// `None` when the change was inferred from a lagged subscription
    pub new_state: Option<String>,
}

/// Read access to sensor entities
#[async_trait::async_trait]
pub trait SensorPort: Send + Sync {
    /// Raw state of `entity_id`, or `None` when the host does not know it
    async fn state_of(&self, entity_id: &str) -> Option<String>;

    /// Stream of state changes for every entity
    fn subscribe_changes(&self) -> broadcast::Receiver<StateChange>;

    /// Subscription filtered to a single entity
    fn subscribe(&self, entity_id: &str) -> ChangeSubscription {
        ChangeSubscription::new(entity_id, self.subscribe_changes())
    }
}

/// Command sink for the real thermostat
#[async_trait::async_trait]
pub trait ActuatorPort: Send + Sync {
    /// Set the target temperature of `entity_id` to `temperature` °C
    async fn set_setpoint(&self, entity_id: &str, temperature: f64) -> Result<()>;
}

/// Receiver of status snapshots, called after every evaluation
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: &ThermostatStatus);
}

/// Change subscription for one entity; dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeSubscription {
    entity_id: String,
    rx: broadcast::Receiver<StateChange>,
}

impl ChangeSubscription {
    pub fn new(entity_id: &str, rx: broadcast::Receiver<StateChange>) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            rx,
        }
    }

    /// Wait for the next change of the subscribed entity.
    ///
    /// A lagged receiver may have dropped a change of interest, so lag is
    /// reported as a change with unknown states. Returns `None` once the
    /// host closes the channel.
    pub async fn changed(&mut self) -> Option<StateChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.entity_id == self.entity_id => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => return Some(self.lagged()),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Discard queued changes without waiting; returns how many concerned
    /// the subscribed entity.
    pub fn drain(&mut self) -> u64 {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(change) if change.entity_id == self.entity_id => drained += 1,
                Ok(_) => continue,
                Err(TryRecvError::Lagged(_)) => drained += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        drained
    }

    fn lagged(&self) -> StateChange {
        StateChange {
            entity_id: self.entity_id.clone(),
            old_state: None,
            new_state: None,
        }
    }
}

/// Parse a raw entity state as a finite number.
///
/// States such as `unavailable`, `unknown`, empty strings, `NaN` and
/// infinities yield `None`.
pub fn parse_numeric_state(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(entity_id: &str, state: &str) -> StateChange {
        StateChange {
            entity_id: entity_id.to_string(),
            old_state: None,
            new_state: Some(state.to_string()),
        }
    }

    #[test]
    fn parses_numeric_states_only() {
        assert_eq!(parse_numeric_state(" 21.5 "), Some(21.5));
        assert_eq!(parse_numeric_state("-30"), Some(-30.0));
        assert_eq!(parse_numeric_state("unavailable"), None);
        assert_eq!(parse_numeric_state(""), None);
        assert_eq!(parse_numeric_state("NaN"), None);
        assert_eq!(parse_numeric_state("inf"), None);
    }

    #[tokio::test]
    async fn subscription_filters_other_entities() {
        let (tx, rx) = broadcast::channel(16);
        let mut sub = ChangeSubscription::new("sensor.price", rx);
        tx.send(change("sensor.temp", "20")).unwrap();
        tx.send(change("sensor.price", "12")).unwrap();

        let got = sub.changed().await.unwrap();
        assert_eq!(got.new_state.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn drain_counts_matching_changes() {
        let (tx, rx) = broadcast::channel(16);
        let mut sub = ChangeSubscription::new("sensor.price", rx);
        tx.send(change("sensor.price", "1")).unwrap();
        tx.send(change("sensor.temp", "20")).unwrap();
        tx.send(change("sensor.price", "2")).unwrap();

        assert_eq!(sub.drain(), 2);
        assert_eq!(sub.drain(), 0);
    }

    #[tokio::test]
    async fn closed_channel_ends_subscription() {
        let (tx, rx) = broadcast::channel::<StateChange>(4);
        let mut sub = ChangeSubscription::new("sensor.price", rx);
        drop(tx);
        assert!(sub.changed().await.is_none());
    }
}
