use super::{AdaptiveThermostat, ThermostatOptions};
use crate::control::HvacMode;
use crate::error::{Result, ThermostatError};
use crate::thermostat::scheduler::Trigger;
use tokio::sync::oneshot;

/// Commands accepted by a running thermostat
#[derive(Debug)]
pub enum ThermostatCommand {
    /// Reply carries the target after clamping and snapping
    SetTargetTemperature {
        temperature: f64,
        reply: oneshot::Sender<Result<f64>>,
    },
    SetMode {
        mode: HvacMode,
        reply: oneshot::Sender<Result<()>>,
    },
    UpdateOptions {
        options: ThermostatOptions,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Outcome of a handled command, as seen by the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handled {
    /// Sensors were read or the actuator was driven
    Evaluated,
    /// Only the state changed
    Updated,
    Rejected,
}

impl AdaptiveThermostat {
    pub(crate) async fn handle_command(&mut self, cmd: ThermostatCommand) -> Handled {
        match cmd {
            ThermostatCommand::SetTargetTemperature { temperature, reply } => {
                let result = self.set_target_temperature(temperature).await;
                let handled = outcome(&result, Handled::Evaluated);
                let _ = reply.send(result);
                handled
            }
            ThermostatCommand::SetMode { mode, reply } => {
                let handled = self.set_hvac_mode(mode).await;
                let _ = reply.send(Ok(()));
                handled
            }
            ThermostatCommand::UpdateOptions { options, reply } => {
                let result = self.update_options(options).await;
                let handled = outcome(&result, Handled::Evaluated);
                let _ = reply.send(result);
                handled
            }
        }
    }

    async fn set_target_temperature(&mut self, requested: f64) -> Result<f64> {
        if !requested.is_finite() {
            return Err(ThermostatError::validation("temperature", "must_be_finite"));
        }
        let target = snap_target(
            requested,
            self.config.min_temp,
            self.config.max_temp,
            self.config.target_temp_step,
        );
        if target != requested {
            self.logger.debug(&format!(
                "Requested target {} adjusted to {:.1}°C",
                requested, target
            ));
        }

        self.controller.set_target(target);
        self.logger
            .info(&format!("Target temperature set to {:.1}°C", target));
        self.evaluate(Trigger::TargetChanged).await;
        Ok(target)
    }

    async fn set_hvac_mode(&mut self, mode: HvacMode) -> Handled {
        self.logger.info(&format!("HVAC mode set to {}", mode));
        match (mode, self.controller.set_mode(mode)) {
            (HvacMode::Off, Some(low)) => {
                let succeeded = self.actuate(low).await;
                self.controller.record_actuation(low, succeeded);
                Handled::Evaluated
            }
            (HvacMode::Off, None) => Handled::Updated,
            (HvacMode::Heat, _) => {
                self.evaluate(Trigger::ModeChanged).await;
                Handled::Evaluated
            }
        }
    }

    async fn update_options(&mut self, options: ThermostatOptions) -> Result<()> {
        if options.is_empty() {
            return Ok(());
        }
        let next = options.apply_to(&self.config);
        self.controller.replace_config(next.tuning())?;
        self.config = next;
        self.logger.info(&format!(
            "Options updated (tolerance: {}, base shift: {}, setpoints: {}/{})",
            self.config.tolerance,
            self.config.base_shift,
            self.config.high_setpoint,
            self.config.low_setpoint
        ));
        self.evaluate(Trigger::OptionsChanged).await;
        Ok(())
    }
}

fn outcome<T>(result: &Result<T>, on_success: Handled) -> Handled {
    if result.is_ok() {
        on_success
    } else {
        Handled::Rejected
    }
}

/// Clamp `requested` into `[min, max]` and round it to the nearest `step`.
pub fn snap_target(requested: f64, min: f64, max: f64, step: f64) -> f64 {
    let clamped = requested.clamp(min, max);
    let snapped = (clamped / step).round() * step;
    // Keep 20.5 from turning into 20.499999999999996
    let snapped = (snapped * 1000.0).round() / 1000.0;
    snapped.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_clamps_and_rounds() {
        assert_eq!(snap_target(21.3, 5.0, 35.0, 0.5), 21.5);
        assert_eq!(snap_target(21.2, 5.0, 35.0, 0.5), 21.0);
        assert_eq!(snap_target(40.0, 5.0, 35.0, 0.5), 35.0);
        assert_eq!(snap_target(-3.0, 5.0, 35.0, 0.5), 5.0);
        assert_eq!(snap_target(20.1, 5.0, 35.0, 0.1), 20.1);
    }
}
