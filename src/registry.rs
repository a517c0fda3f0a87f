//! In-memory entity registry
//!
//! Stands in for a home-automation host: it stores entity states with their
//! attributes, broadcasts state changes, accepts setpoint commands for
//! climate entities and mirrors every adaptive thermostat as a
//! `climate.<unique_id>` entity.

use crate::config::{EntityCatalog, EntitySeed, status_entity_id};
use crate::error::{Result, ThermostatError};
use crate::logging::{StructuredLogger, get_logger};
use crate::ports::{ActuatorPort, SensorPort, StateChange, StatusSink};
use crate::thermostat::ThermostatStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Attribute that carries a climate entity's setpoint
pub const TEMPERATURE_ATTRIBUTE: &str = "temperature";

/// State value the registry treats as an unreachable device
pub const UNAVAILABLE_STATE: &str = "unavailable";

/// One entity as stored by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub last_changed: DateTime<Utc>,
}

pub struct EntityRegistry {
    entities: RwLock<HashMap<String, EntityState>>,
    changes_tx: broadcast::Sender<StateChange>,
    logger: StructuredLogger,
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.read().len())
            .finish()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entities: RwLock::new(HashMap::new()),
            changes_tx,
            logger: get_logger("registry"),
        }
    }

    /// Registry pre-populated from configuration
    pub fn from_seeds(seeds: &[EntitySeed]) -> Self {
        let registry = Self::new();
        for seed in seeds {
            registry.set_state(&seed.entity_id, &seed.state);
        }
        registry
    }

    /// Set the state of an entity, creating it when unknown.
    ///
    /// Subscribers are notified only when the state string actually changes.
    /// Returns whether a change was broadcast.
    pub fn set_state(&self, entity_id: &str, state: &str) -> bool {
        let change = {
            let mut entities = self.write();
            match entities.get_mut(entity_id) {
                Some(entity) if entity.state == state => None,
                Some(entity) => {
                    let old = std::mem::replace(&mut entity.state, state.to_string());
                    entity.last_changed = Utc::now();
                    Some(StateChange {
                        entity_id: entity_id.to_string(),
                        old_state: Some(old),
                        new_state: Some(state.to_string()),
                    })
                }
                None => {
                    entities.insert(
                        entity_id.to_string(),
                        EntityState {
                            entity_id: entity_id.to_string(),
                            state: state.to_string(),
                            attributes: Map::new(),
                            last_changed: Utc::now(),
                        },
                    );
                    Some(StateChange {
                        entity_id: entity_id.to_string(),
                        old_state: None,
                        new_state: Some(state.to_string()),
                    })
                }
            }
        };

        match change {
            Some(change) => {
                self.logger.trace(&format!(
                    "{} changed: {:?} -> {}",
                    entity_id, change.old_state, state
                ));
                // No receivers is fine
                let _ = self.changes_tx.send(change);
                true
            }
            None => false,
        }
    }

    /// Replace the attributes of an existing entity without touching its state
    pub fn set_attributes(&self, entity_id: &str, attributes: Map<String, Value>) -> Result<()> {
        let mut entities = self.write();
        let entity = entities
            .get_mut(entity_id)
            .ok_or_else(|| ThermostatError::not_found(format!("Entity {}", entity_id)))?;
        entity.attributes = attributes;
        Ok(())
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.read().get(entity_id).cloned()
    }

    /// All entities sorted by id
    pub fn all(&self) -> Vec<EntityState> {
        let mut all: Vec<EntityState> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        all
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.read().contains_key(entity_id)
    }

    /// Setpoint attribute of a climate entity
    pub fn setpoint_of(&self, entity_id: &str) -> Option<f64> {
        self.read()
            .get(entity_id)
            .and_then(|e| e.attributes.get(TEMPERATURE_ATTRIBUTE))
            .and_then(Value::as_f64)
    }

    // A panic while holding the lock leaves the map itself consistent
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, EntityState>> {
        self.entities.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, EntityState>> {
        self.entities.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl EntityCatalog for EntityRegistry {
    fn contains_entity(&self, entity_id: &str) -> bool {
        self.contains(entity_id)
    }
}

#[async_trait::async_trait]
impl SensorPort for EntityRegistry {
    async fn state_of(&self, entity_id: &str) -> Option<String> {
        self.read().get(entity_id).map(|e| e.state.clone())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes_tx.subscribe()
    }
}

#[async_trait::async_trait]
impl ActuatorPort for EntityRegistry {
    async fn set_setpoint(&self, entity_id: &str, temperature: f64) -> Result<()> {
        let mut entities = self.write();
        let entity = entities.get_mut(entity_id).ok_or_else(|| {
            ThermostatError::actuator(format!("Entity {} does not exist", entity_id))
        })?;
        if entity.state == UNAVAILABLE_STATE {
            return Err(ThermostatError::actuator(format!(
                "Entity {} is unavailable",
                entity_id
            )));
        }
        entity
            .attributes
            .insert(TEMPERATURE_ATTRIBUTE.to_string(), Value::from(temperature));
        drop(entities);

        self.logger
            .debug(&format!("{} setpoint -> {:.1}", entity_id, temperature));
        Ok(())
    }
}

impl StatusSink for EntityRegistry {
    fn publish(&self, status: &ThermostatStatus) {
        let entity_id = status_entity_id(&status.unique_id);
        let attributes = match serde_json::to_value(status) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to serialize status of {}: {}", entity_id, e));
                Map::new()
            }
        };
        self.set_state(&entity_id, status.hvac_mode.as_str());
        let _ = self.set_attributes(&entity_id, attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_state_only_notifies_on_change() {
        let registry = EntityRegistry::new();
        let mut rx = registry.subscribe_changes();

        assert!(registry.set_state("sensor.temp", "20.0"));
        assert!(!registry.set_state("sensor.temp", "20.0"));
        assert!(registry.set_state("sensor.temp", "20.5"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.old_state, None);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.old_state.as_deref(), Some("20.0"));
        assert_eq!(second.new_state.as_deref(), Some("20.5"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn all_is_sorted() {
        let registry = EntityRegistry::from_seeds(&[
            EntitySeed {
                entity_id: "sensor.b".to_string(),
                state: "1".to_string(),
            },
            EntitySeed {
                entity_id: "climate.a".to_string(),
                state: "heat".to_string(),
            },
        ]);
        let ids: Vec<String> = registry.all().into_iter().map(|e| e.entity_id).collect();
        assert_eq!(ids, vec!["climate.a", "sensor.b"]);
    }

    #[tokio::test]
    async fn setpoint_is_stored_as_attribute() {
        let registry = EntityRegistry::new();
        registry.set_state("climate.living_room", "heat");
        registry
            .set_setpoint("climate.living_room", 35.0)
            .await
            .unwrap();
        assert_eq!(registry.setpoint_of("climate.living_room"), Some(35.0));
    }

    #[tokio::test]
    async fn setpoint_rejected_for_missing_or_unavailable_entity() {
        let registry = EntityRegistry::new();
        let err = registry.set_setpoint("climate.nope", 35.0).await.unwrap_err();
        assert!(matches!(err, ThermostatError::Actuator { .. }));

        registry.set_state("climate.attic", UNAVAILABLE_STATE);
        assert!(registry.set_setpoint("climate.attic", 35.0).await.is_err());
        assert_eq!(registry.setpoint_of("climate.attic"), None);
    }
}
