use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

use crate::{TickConfig, TickPolicy};

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Counts from 1 and keeps counting across stop/start.
    pub tick: u64,
    /// Always the configured tick length; simulations step by this, never
    /// by wall-clock time.
    pub dt: Duration,
    /// The tick woke up more than 10% of a tick late.
    pub overrun: bool,
    pub ticks_skipped: u64,
}

/// Counters and timings, updated per tick.
///
/// Timings cover the work between `wait_for_tick` returning and
/// [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average, alpha 0.1.
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last tick's work as a fraction of the budget; above 1.0 is an overrun.
    pub budget_utilization: f64,
}

/// Fixed-rate tick driver for one room.
///
/// Created stopped. [`start`](Self::start) arms the first tick one tick
/// length (plus jitter) from now; [`stop`](Self::stop) disarms it. While
/// stopped, `wait_for_tick` never resolves.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        debug!(
            rate_hz = config.tick_rate_hz,
            policy = ?config.policy,
            "tick scheduler created"
        );
        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick: None,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Arms the loop. A no-op if already running.
    pub fn start(&mut self) {
        if self.next_tick.is_some() {
            return;
        }
        let jitter = match self.config.initial_jitter_us {
            0 => Duration::ZERO,
            max => Duration::from_micros(rand::rng().random_range(0..max)),
        };
        self.next_tick = Some(TokioInstant::now() + self.tick_duration + jitter);
        debug!(tick = self.tick_count, "tick scheduler started");
    }

    /// Disarms the loop. Idempotent.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            self.tick_start = None;
            debug!(tick = self.tick_count, "tick scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Sleeps until the next tick is due.
    ///
    /// Cancel-safe: if the future is dropped before it resolves, no tick is
    /// consumed.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(due) = self.next_tick else {
            return std::future::pending().await;
        };
        time::sleep_until(due).await;

        let now = TokioInstant::now();
        let dur = self.tick_duration;
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > dur / 10;
        let behind = (late_by.as_nanos() / dur.as_nanos()) as u64;
        let mut ticks_skipped = 0;

        let next = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = behind;
                }
                now + dur
            }
            TickPolicy::CatchUp { max_catchup } => {
                if behind <= u64::from(max_catchup) {
                    due + dur
                } else {
                    ticks_skipped = behind - u64::from(max_catchup);
                    now + dur
                }
            }
            TickPolicy::Drop => due + dur,
        };
        self.next_tick = Some(next);

        if overrun {
            warn!(
                tick = self.tick_count,
                late_ms = late_by.as_secs_f64() * 1000.0,
                skipped = ticks_skipped,
                policy = ?self.config.policy,
                "tick overrun"
            );
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: dur,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of this tick's work, feeding budget warnings and
    /// metrics. Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.tick_duration;
        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                "tick exceeded its budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching its budget"
            );
        }

        if self.config.metrics_enabled {
            let m = &mut self.metrics;
            m.budget_utilization = utilization;
            m.max_tick_time = m.max_tick_time.max(elapsed);
            let avg = m.avg_tick_time.as_secs_f64() * 0.9 + elapsed.as_secs_f64() * 0.1;
            m.avg_tick_time = Duration::from_secs_f64(avg);
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
