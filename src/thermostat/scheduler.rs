//! Dual-trigger update scheduler
//!
//! Merges the periodic timer, price-sensor changes and explicit refresh
//! requests into a single stream of triggers for the owning thermostat task.
//! Because the task awaits each evaluation before asking for the next
//! trigger, evaluations are serialized; whatever queued up in the meantime is
//! folded into the evaluation that just finished by [`UpdateScheduler::coalesce`].

use crate::ports::ChangeSubscription;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};

/// Why an evaluation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Timer,
    PriceChanged,
    Refresh,
    TargetChanged,
    ModeChanged,
    OptionsChanged,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Startup => "startup",
            Trigger::Timer => "timer",
            Trigger::PriceChanged => "price change",
            Trigger::Refresh => "refresh",
            Trigger::TargetChanged => "target change",
            Trigger::ModeChanged => "mode change",
            Trigger::OptionsChanged => "options change",
        };
        f.write_str(s)
    }
}

enum Fired {
    Timer,
    Price(bool),
    Refresh(bool),
}

pub struct UpdateScheduler {
    period: Duration,
    timer: Interval,
    armed_at: Instant,
    price: Option<ChangeSubscription>,
    refresh_rx: mpsc::Receiver<()>,
    refresh_open: bool,
    coalesced: u64,
}

/// Longest timer period; longer requests are clamped so deadlines stay
/// representable.
pub const MAX_PERIOD: Duration = Duration::from_secs(86_400);

impl UpdateScheduler {
    /// The first timer tick is due one `period` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        period: Duration,
        price: Option<ChangeSubscription>,
        refresh_rx: mpsc::Receiver<()>,
    ) -> Self {
        let period = period.clamp(Duration::from_millis(1), MAX_PERIOD);
        let now = Instant::now();
        let mut timer = interval_at(now + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            period,
            timer,
            armed_at: now,
            price,
            refresh_rx,
            refresh_open: true,
            coalesced: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn has_price_subscription(&self) -> bool {
        self.price.is_some()
    }

    /// Total number of triggers merged into earlier evaluations
    pub fn coalesced_total(&self) -> u64 {
        self.coalesced
    }

    /// Wait for the next trigger.
    ///
    /// A closed price subscription or refresh channel is dropped from the
    /// set of sources; the timer keeps firing regardless.
    pub async fn next_trigger(&mut self) -> Trigger {
        loop {
            let fired = tokio::select! {
                _ = self.timer.tick() => Fired::Timer,
                change = next_change(&mut self.price) => Fired::Price(change),
                msg = self.refresh_rx.recv(), if self.refresh_open => Fired::Refresh(msg.is_some()),
            };

            match fired {
                Fired::Timer => {
                    self.armed_at = Instant::now();
                    return Trigger::Timer;
                }
                Fired::Price(true) => return Trigger::PriceChanged,
                Fired::Price(false) => {
                    tracing::debug!("Price subscription closed; continuing on timer only");
                    self.price = None;
                }
                Fired::Refresh(true) => return Trigger::Refresh,
                Fired::Refresh(false) => self.refresh_open = false,
            }
        }
    }

    /// Fold every trigger that queued up during the last evaluation into it
    /// and re-arm the timer. Returns how many were merged.
    pub fn coalesce(&mut self) -> u64 {
        let mut merged = 0;

        if let Some(price) = self.price.as_mut() {
            merged += price.drain();
        }

        if self.refresh_open {
            loop {
                match self.refresh_rx.try_recv() {
                    Ok(()) => merged += 1,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.refresh_open = false;
                        break;
                    }
                }
            }
        }

        // A tick fell due while evaluating
        if self.armed_at.elapsed() >= self.period {
            merged += 1;
        }
        self.rearm();

        self.coalesced += merged;
        merged
    }

    fn rearm(&mut self) {
        self.timer.reset();
        self.armed_at = Instant::now();
    }
}

async fn next_change(price: &mut Option<ChangeSubscription>) -> bool {
    match price {
        Some(sub) => sub.changed().await.is_some(),
        None => std::future::pending().await,
    }
}
