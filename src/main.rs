use adaptive_thermostat::config::Config;
use adaptive_thermostat::registry::EntityRegistry;
use adaptive_thermostat::thermostat::{AdaptiveThermostat, ThermostatPorts};
use adaptive_thermostat::web::{self, AppState};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    adaptive_thermostat::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Adaptive thermostat {} starting up", env!("APP_VERSION"));

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let registry = Arc::new(EntityRegistry::from_seeds(&config.entities));

    let mut handles = Vec::with_capacity(config.thermostats.len());
    for thermostat in &config.thermostats {
        let name = thermostat.display_name();
        match AdaptiveThermostat::new(
            thermostat.clone(),
            registry.as_ref(),
            ThermostatPorts::shared(registry.clone()),
        ) {
            Ok(t) => handles.push(t.start()),
            // One bad thermostat must not take the others down
            Err(e) => error!("Skipping {}: {}", name, e),
        }
    }
    if handles.is_empty() {
        warn!("No thermostats running");
    }

    let web_task = if config.web.enabled {
        let state = AppState::new(handles.clone(), registry.clone());
        let host = config.web.host.clone();
        let port = config.web.port;
        Some(tokio::spawn(async move {
            if let Err(e) = web::serve(state, &host, port).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    for handle in &handles {
        if let Err(e) = handle.shutdown().await {
            error!("{}", e);
        }
    }
    if let Some(task) = web_task {
        task.abort();
    }

    info!("Shutdown complete");
    Ok(())
}
