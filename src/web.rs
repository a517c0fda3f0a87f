//! Axum-based HTTP API
//!
//! Exposes thermostat status and user commands, and lets external
//! integrations push entity states into the built-in registry.

use crate::control::HvacMode;
use crate::error::ThermostatError;
use crate::registry::{EntityRegistry, EntityState};
use crate::thermostat::{ThermostatHandle, ThermostatOptions, ThermostatStatus};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub thermostats: Arc<BTreeMap<String, ThermostatHandle>>,
    pub registry: Arc<EntityRegistry>,
}

impl AppState {
    pub fn new(thermostats: Vec<ThermostatHandle>, registry: Arc<EntityRegistry>) -> Self {
        let thermostats = thermostats
            .into_iter()
            .map(|h| (h.id().to_string(), h))
            .collect();
        Self {
            thermostats: Arc::new(thermostats),
            registry,
        }
    }

    fn thermostat(&self, id: &str) -> Result<&ThermostatHandle, ThermostatError> {
        self.thermostats
            .get(id)
            .ok_or_else(|| ThermostatError::not_found(format!("Thermostat {}", id)))
    }
}

#[derive(Deserialize)]
pub struct TemperatureBody {
    pub temperature: f64,
}

#[derive(Deserialize)]
pub struct ModeBody {
    pub mode: String,
}

#[derive(Deserialize)]
pub struct EntityStateBody {
    pub state: String,
}

impl IntoResponse for ThermostatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ThermostatError::Validation { .. } => StatusCode::BAD_REQUEST,
            ThermostatError::NotFound { .. } => StatusCode::NOT_FOUND,
            ThermostatError::Shutdown { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match &self {
            ThermostatError::Validation { field, message } => {
                serde_json::json!({ "field": field, "error": message })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("APP_VERSION") }))
}

async fn list_thermostats(State(state): State<AppState>) -> Json<Vec<ThermostatStatus>> {
    Json(
        state
            .thermostats
            .values()
            .map(|h| ThermostatStatus::clone(&h.status()))
            .collect(),
    )
}

async fn get_thermostat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThermostatStatus>, ThermostatError> {
    let handle = state.thermostat(&id)?;
    Ok(Json(ThermostatStatus::clone(&handle.status())))
}

async fn set_temperature(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TemperatureBody>,
) -> Result<impl IntoResponse, ThermostatError> {
    let applied = state
        .thermostat(&id)?
        .set_target_temperature(body.temperature)
        .await?;
    Ok(Json(
        serde_json::json!({ "ok": true, "target_temperature": applied }),
    ))
}

async fn set_mode(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ModeBody>,
) -> Result<impl IntoResponse, ThermostatError> {
    let handle = state.thermostat(&id)?;
    let mode: HvacMode = body.mode.parse()?;
    handle.set_mode(mode).await?;
    Ok(Json(serde_json::json!({ "ok": true, "hvac_mode": mode })))
}

async fn put_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(options): Json<ThermostatOptions>,
) -> Result<impl IntoResponse, ThermostatError> {
    state.thermostat(&id)?.update_options(options).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn list_entities(State(state): State<AppState>) -> Json<Vec<EntityState>> {
    Json(state.registry.all())
}

async fn get_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<EntityState>, ThermostatError> {
    state
        .registry
        .get(&entity_id)
        .map(Json)
        .ok_or_else(|| ThermostatError::not_found(format!("Entity {}", entity_id)))
}

async fn put_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Json(body): Json<EntityStateBody>,
) -> Result<Json<EntityState>, ThermostatError> {
    if entity_id.trim().is_empty() {
        return Err(ThermostatError::validation("entity_id", "required"));
    }
    state.registry.set_state(&entity_id, &body.state);
    state
        .registry
        .get(&entity_id)
        .map(Json)
        .ok_or_else(|| ThermostatError::not_found(format!("Entity {}", entity_id)))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/thermostats", get(list_thermostats))
        .route("/api/thermostats/{id}", get(get_thermostat))
        .route("/api/thermostats/{id}/temperature", post(set_temperature))
        .route("/api/thermostats/{id}/mode", post(set_mode))
        .route("/api/thermostats/{id}/options", put(put_options))
        .route("/api/entities", get(list_entities))
        .route("/api/entities/{entity_id}", get(get_entity).put(put_entity))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
