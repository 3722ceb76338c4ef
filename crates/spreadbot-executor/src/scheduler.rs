//! Wall-clock aligned tick scheduler.
//!
//! Boundaries are multiples of the interval since the Unix epoch, so timing
//! is the same across restarts. The handler runs to completion before the
//! next boundary is computed; boundaries that passed during an overrun are
//! skipped, never queued.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use spreadbot_telemetry::Metrics;

use crate::cycle::CycleReport;
use crate::error::CycleFailure;
use crate::fills::DynNotifier;
use crate::gateway::BoxFuture;

/// Trait for obtaining current time, enabling testability.
pub trait Clock: Send + Sync {
    /// Returns current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// First boundary strictly after `now_ms`.
pub fn next_boundary_ms(now_ms: u64, interval_ms: u64) -> u64 {
    let interval_ms = interval_ms.max(1);
    (now_ms / interval_ms + 1) * interval_ms
}

/// Work driven by the scheduler.
pub trait CycleHandler: Send + Sync {
    /// Run one cycle for `tick` (boundary, Unix seconds).
    fn on_tick(&self, tick: u64) -> BoxFuture<'_, CycleReport>;

    /// Called once after the last cycle, before `run` returns.
    fn on_shutdown(&self) -> BoxFuture<'_, ()>;
}

/// Periodic driver for one pair.
pub struct TickScheduler<C: Clock = SystemClock> {
    interval: Duration,
    clock: C,
    notifier: DynNotifier,
}

impl TickScheduler<SystemClock> {
    pub fn new(interval: Duration, notifier: DynNotifier) -> Self {
        Self::with_clock(interval, SystemClock, notifier)
    }
}

impl<C: Clock> TickScheduler<C> {
    pub fn with_clock(interval: Duration, clock: C, notifier: DynNotifier) -> Self {
        Self {
            interval,
            clock,
            notifier,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fire `handler` on every boundary until `shutdown` is cancelled, then
    /// run its shutdown hook. Returns the number of cycles run.
    pub async fn run<H>(&self, handler: &H, shutdown: CancellationToken) -> u64
    where
        H: CycleHandler + ?Sized,
    {
        let interval_ms = (self.interval.as_millis() as u64).max(1);
        let mut last_boundary: Option<u64> = None;
        let mut cycles = 0u64;

        info!(interval_secs = self.interval.as_secs(), "Tick scheduler started");

        loop {
            let now = self.clock.now_ms();
            let boundary = next_boundary_ms(now, interval_ms);

            if let Some(prev) = last_boundary {
                let skipped = (boundary - prev) / interval_ms - 1;
                if skipped > 0 {
                    warn!(
                        skipped,
                        last_tick = prev / 1000,
                        next_tick = boundary / 1000,
                        "Cycle overran interval, skipping boundaries"
                    );
                    Metrics::ticks_skipped(skipped);
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(boundary - now)) => {}
            }

            let report = handler.on_tick(boundary / 1000).await;
            cycles += 1;
            self.report_errors(&report);
            last_boundary = Some(boundary);
        }

        info!(cycles, "Tick scheduler stopping");
        handler.on_shutdown().await;
        cycles
    }

    fn report_errors(&self, report: &CycleReport) {
        let pair_label = report.pair.to_string();
        for error in &report.errors {
            warn!(
                pair = %report.pair,
                tick = report.tick,
                kind = error.kind(),
                error = %error,
                "Cycle error recovered"
            );
            Metrics::cycle_error(&pair_label, error.kind());
            self.notifier.notify_error(&CycleFailure {
                tick: report.tick,
                pair: report.pair.clone(),
                error: error.clone(),
            });
        }
    }
}
