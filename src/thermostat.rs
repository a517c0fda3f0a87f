//! Adaptive thermostat runtime
//!
//! Each thermostat is a single tokio task that owns its controller state.
//! Evaluations, user commands and teardown are all serialized through that
//! task; everything else talks to it through a cloneable [`ThermostatHandle`].

use crate::config::{EntityCatalog, ThermostatConfig};
use crate::control::{HvacMode, HysteresisController, Reading, total_shift};
use crate::error::{Result, ThermostatError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::ports::{ActuatorPort, SensorPort, StatusSink, parse_numeric_state};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub mod commands;
pub mod scheduler;
mod types;

pub use commands::{ThermostatCommand, snap_target};
pub use scheduler::{Trigger, UpdateScheduler};
pub use types::{ThermostatOptions, ThermostatStatus};

use commands::Handled;

/// Host connections of one thermostat
#[derive(Clone)]
pub struct ThermostatPorts {
    pub sensors: Arc<dyn SensorPort>,
    pub actuator: Arc<dyn ActuatorPort>,
    pub status: Arc<dyn StatusSink>,
}

impl ThermostatPorts {
    /// All three ports served by one host object
    pub fn shared<H>(host: Arc<H>) -> Self
    where
        H: SensorPort + ActuatorPort + StatusSink + 'static,
    {
        Self {
            sensors: host.clone(),
            actuator: host.clone(),
            status: host,
        }
    }
}

/// One thermostat before it is started
pub struct AdaptiveThermostat {
    id: String,
    name: String,
    unique_id: String,
    config: ThermostatConfig,
    controller: HysteresisController,
    ports: ThermostatPorts,
    logger: StructuredLogger,
    last_reading: Reading,
    current_shift: f64,
    evaluations: u64,
    coalesced_triggers: u64,
}

impl AdaptiveThermostat {
    /// Validate `config` against the host and build the controller.
    pub fn new(
        config: ThermostatConfig,
        catalog: &dyn EntityCatalog,
        ports: ThermostatPorts,
    ) -> Result<Self> {
        let tuning = config.controller_config(catalog)?;
        let controller = HysteresisController::new(tuning, config.initial_target)?;

        let id = config.id();
        let logger = get_logger_with_context(
            LogContext::new("thermostat")
                .with_thermostat(&id)
                .with_field("actuator", config.real_thermostat.clone()),
        );

        Ok(Self {
            name: config.display_name(),
            unique_id: config.unique_id(),
            current_shift: total_shift(controller.config(), None),
            id,
            config,
            controller,
            ports,
            logger,
            last_reading: Reading::default(),
            evaluations: 0,
            coalesced_triggers: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Spawn the thermostat task.
    ///
    /// The task evaluates once immediately, then on every trigger until
    /// [`ThermostatHandle::shutdown`] or until every handle is dropped.
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> ThermostatHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        // One pending refresh is enough; more would be coalesced anyway
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(Arc::new(self.status()));

        let price = self
            .config
            .price_sensor
            .as_deref()
            .filter(|_| self.config.has_price_sensor())
            .map(|entity_id| self.ports.sensors.subscribe(entity_id));
        let scheduler = UpdateScheduler::new(
            Duration::from_secs(self.config.update_interval_secs),
            price,
            refresh_rx,
        );

        let id = self.id.clone();
        let task = tokio::spawn(self.run(scheduler, commands_rx, shutdown_rx, status_tx));

        ThermostatHandle {
            id,
            commands_tx,
            refresh_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            status_rx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(
        mut self,
        mut scheduler: UpdateScheduler,
        mut commands_rx: mpsc::UnboundedReceiver<ThermostatCommand>,
        mut shutdown_rx: watch::Receiver<bool>,
        status_tx: watch::Sender<Arc<ThermostatStatus>>,
    ) {
        self.logger.info(&format!(
            "Starting {} (sensor: {}, price: {}, interval: {}s)",
            self.name,
            self.config.temperature_sensor,
            self.config.price_sensor.as_deref().unwrap_or("none"),
            scheduler.period().as_secs()
        ));

        self.evaluate(Trigger::Startup).await;
        self.finish_cycle(&mut scheduler, &status_tx);

        let mut commands_open = true;
        loop {
            let fired = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => None,
                cmd = commands_rx.recv(), if commands_open => Some(Event::Command(cmd)),
                trigger = scheduler.next_trigger() => Some(Event::Trigger(trigger)),
            };

            match fired {
                None => break,
                Some(Event::Command(None)) => commands_open = false,
                Some(Event::Command(Some(cmd))) => match self.handle_command(cmd).await {
                    Handled::Evaluated => self.finish_cycle(&mut scheduler, &status_tx),
                    Handled::Updated => self.publish(&status_tx),
                    Handled::Rejected => {}
                },
                Some(Event::Trigger(trigger)) => {
                    self.evaluate(trigger).await;
                    self.finish_cycle(&mut scheduler, &status_tx);
                }
            }
        }

        // Dropping the scheduler cancels the timer and the price subscription
        drop(scheduler);
        self.logger.info(&format!(
            "Stopped after {} evaluations ({} coalesced triggers)",
            self.evaluations, self.coalesced_triggers
        ));
    }

    fn finish_cycle(
        &mut self,
        scheduler: &mut UpdateScheduler,
        status_tx: &watch::Sender<Arc<ThermostatStatus>>,
    ) {
        let merged = scheduler.coalesce();
        if merged > 0 {
            self.logger
                .debug(&format!("Coalesced {} trigger(s) into last evaluation", merged));
        }
        self.coalesced_triggers = scheduler.coalesced_total();
        self.publish(status_tx);
    }

    fn publish(&self, status_tx: &watch::Sender<Arc<ThermostatStatus>>) {
        let status = self.status();
        self.ports.status.publish(&status);
        status_tx.send_replace(Arc::new(status));
    }

    /// One evaluation: snapshot sensors, decide, actuate on edges.
    pub(crate) async fn evaluate(&mut self, trigger: Trigger) {
        self.evaluations += 1;
        self.logger.trace(&format!("Evaluating on {}", trigger));

        let reading = self.read_sensors().await;
        self.last_reading = reading;
        self.current_shift = total_shift(self.controller.config(), reading.price_diff_percent);

        let Some(result) = self.controller.evaluate(&reading) else {
            self.logger
                .warn("Temperature sensor unavailable - maintaining current state");
            return;
        };

        if !result.actuation_required {
            self.controller.commit(&result);
            return;
        }

        let setpoint = self.controller.setpoint_for(result.should_heat);
        let succeeded = self.actuate(setpoint).await;
        // The heating bit follows the decision even if the device did not
        self.controller.commit(&result);
        self.controller.record_actuation(setpoint, succeeded);

        self.logger.info(&format!(
            "Heating state changed: {} (current: {:.1}°C, target: {:.1}°C, shift: {:+.2}°C)",
            if result.should_heat { "ON" } else { "OFF" },
            reading.temperature.unwrap_or_default(),
            self.controller.state().target_temperature,
            result.total_shift
        ));
    }

    async fn read_sensors(&self) -> Reading {
        let temperature = self
            .read_numeric("Temperature", &self.config.temperature_sensor)
            .await;
        let price_diff_percent = match self.config.price_sensor.as_deref() {
            Some(entity_id) if self.config.has_price_sensor() => {
                self.read_numeric("Price", entity_id).await
            }
            _ => None,
        };
        Reading {
            temperature,
            price_diff_percent,
        }
    }

    async fn read_numeric(&self, kind: &str, entity_id: &str) -> Option<f64> {
        let Some(raw) = self.ports.sensors.state_of(entity_id).await else {
            self.logger
                .warn(&format!("{} sensor {} not found", kind, entity_id));
            return None;
        };
        let value = parse_numeric_state(&raw);
        if value.is_none() {
            self.logger
                .warn(&format!("Invalid {} value from {}: {}", kind, entity_id, raw));
        }
        value
    }

    /// Send `setpoint` to the real thermostat; failures and timeouts are
    /// logged and reported as `false`.
    pub(crate) async fn actuate(&self, setpoint: f64) -> bool {
        let entity_id = &self.config.real_thermostat;
        let limit = Duration::from_millis(self.config.actuator_timeout_ms);
        let outcome =
            match tokio::time::timeout(limit, self.ports.actuator.set_setpoint(entity_id, setpoint))
                .await
            {
                Ok(result) => result,
                Err(elapsed) => Err(ThermostatError::from(elapsed)),
            };

        match outcome {
            Ok(()) => {
                self.logger
                    .debug(&format!("Set {} to {:.1}°C", entity_id, setpoint));
                true
            }
            Err(e) => {
                self.logger
                    .error(&format!("Failed to set {} temperature: {}", entity_id, e));
                false
            }
        }
    }

    pub fn status(&self) -> ThermostatStatus {
        let state = self.controller.state();
        ThermostatStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            unique_id: self.unique_id.clone(),
            hvac_mode: state.mode,
            hvac_action: state.hvac_action(),
            target_temperature: state.target_temperature,
            current_temperature: self.last_reading.temperature,
            min_temp: self.config.min_temp,
            max_temp: self.config.max_temp,
            target_temp_step: self.config.target_temp_step,
            current_shift: self.current_shift,
            heating_state: state.heating_state().to_string(),
            price_diff_percent: if self.config.has_price_sensor() {
                self.last_reading.price_diff_percent
            } else {
                None
            },
            applied_setpoint: state.applied_setpoint,
            last_actuation_failed: state.last_actuation_failed,
            evaluations: self.evaluations,
            coalesced_triggers: self.coalesced_triggers,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

enum Event {
    Command(Option<ThermostatCommand>),
    Trigger(Trigger),
}

/// Cloneable handle to a running thermostat
#[derive(Clone)]
pub struct ThermostatHandle {
    id: String,
    commands_tx: mpsc::UnboundedSender<ThermostatCommand>,
    refresh_tx: mpsc::Sender<()>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    status_rx: watch::Receiver<Arc<ThermostatStatus>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for ThermostatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermostatHandle")
            .field("id", &self.id)
            .finish()
    }
}

impl ThermostatHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest published status
    pub fn status(&self) -> Arc<ThermostatStatus> {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Arc<ThermostatStatus>> {
        self.status_rx.clone()
    }

    /// Returns the target actually applied after clamping and snapping.
    pub async fn set_target_temperature(&self, temperature: f64) -> Result<f64> {
        self.request(|reply| ThermostatCommand::SetTargetTemperature { temperature, reply })
            .await
    }

    pub async fn set_mode(&self, mode: HvacMode) -> Result<()> {
        self.request(|reply| ThermostatCommand::SetMode { mode, reply })
            .await
    }

    pub async fn update_options(&self, options: ThermostatOptions) -> Result<()> {
        self.request(|reply| ThermostatCommand::UpdateOptions { options, reply })
            .await
    }

    /// Ask for an evaluation outside the timer; returns `false` when one is
    /// already pending.
    pub fn request_refresh(&self) -> bool {
        self.refresh_tx.try_send(()).is_ok()
    }

    pub fn is_running(&self) -> bool {
        !self.commands_tx.is_closed()
    }

    /// Stop the thermostat and wait for its task to finish.
    ///
    /// An evaluation in flight completes first; no actuation happens after
    /// this returns. Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        let mut task = self.task.lock().await;
        if let Some(task) = task.take() {
            task.await.map_err(|e| {
                ThermostatError::shutdown(format!("Thermostat {} task failed: {}", self.id, e))
            })?;
        }
        Ok(())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> ThermostatCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands_tx
            .send(build(reply_tx))
            .map_err(|_| ThermostatError::shutdown(format!("Thermostat {} is stopped", self.id)))?;
        reply_rx.await.map_err(|_| {
            ThermostatError::shutdown(format!("Thermostat {} stopped before replying", self.id))
        })?
    }
}
