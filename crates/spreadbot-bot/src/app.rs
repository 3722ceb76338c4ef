//! Main application orchestration.
//!
//! Coordinates all components:
//! - Paper venue (price oracle, balance ledger, order gateway)
//! - Order lifecycle and the quoting cycle
//! - Tick scheduler
//! - Fill handler on its own task
//! - Periodic status reports

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use spreadbot_core::Price;
use spreadbot_executor::{
    BoxFuture, Clock, CycleHandler, CycleReport, DynNotifier, FillHandler, LogNotifier,
    OrderGateway, OrderLifecycleManager, PaperVenue, QuoteCycle, SharedLifecycle,
    StatusSnapshot, SystemClock, TickScheduler,
};
use spreadbot_mm::{QuotePolicy, SharedSignals, SignalSkewSpread};
use spreadbot_telemetry::Metrics;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    venue: Arc<PaperVenue>,
    notifier: DynNotifier,
    lifecycle: SharedLifecycle,
    cycle: Arc<QuoteCycle>,
    signals: Arc<SharedSignals>,
}

impl Application {
    /// Create the application against a paper venue seeded from `[paper]`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let venue = Arc::new(PaperVenue::new());
        let pair = config.trading_pair()?;
        venue.set_reference_price(&pair, Price::new(config.paper.reference_price));
        for (asset, amount) in &config.paper.balances {
            venue.set_balance(asset, *amount);
        }
        Self::with_parts(config, venue, Arc::new(LogNotifier))
    }

    /// Create the application with an injected venue and notifier.
    pub fn with_parts(
        config: AppConfig,
        venue: Arc<PaperVenue>,
        notifier: DynNotifier,
    ) -> AppResult<Self> {
        config.validate()?;
        let pair = config.trading_pair()?;

        let lifecycle = OrderLifecycleManager::with_dedupe_capacity(
            pair.clone(),
            venue.clone(),
            config.call_timeout(),
            config.scheduler.fill_dedupe_capacity,
        )
        .into_shared();

        let signals = Arc::new(SharedSignals::new());
        let policy = if config.signal.enabled {
            info!(
                candle_interval = %config.signal.candle_interval,
                candles_length = config.signal.candles_length,
                max_records = config.signal.max_records,
                "Signal-skewed spread enabled"
            );
            QuotePolicy::with_signals(
                pair,
                config.strategy.clone(),
                signals.clone(),
                Arc::new(SignalSkewSpread::from_config(&config.strategy)),
            )
        } else {
            QuotePolicy::new(pair, config.strategy.clone())
        };

        let cycle = Arc::new(
            QuoteCycle::new(
                lifecycle.clone(),
                policy,
                venue.clone(),
                venue.clone(),
                config.call_timeout(),
            )
            .with_venue(config.venue_id())
            .with_cycle_budget(config.refresh_interval()),
        );

        Ok(Self {
            config,
            venue,
            notifier,
            lifecycle,
            cycle,
            signals,
        })
    }

    pub fn venue(&self) -> &Arc<PaperVenue> {
        &self.venue
    }

    pub fn cycle(&self) -> &Arc<QuoteCycle> {
        &self.cycle
    }

    /// Publish point for an external indicator feed.
    pub fn signals(&self) -> &Arc<SharedSignals> {
        &self.signals
    }

    /// Adopt orders the venue still holds from a previous run.
    ///
    /// A failed read is not fatal: the first cycle retries it before
    /// quoting.
    pub async fn startup(&self, tick: u64) {
        if !self.config.scheduler.reconcile_on_start {
            debug!("Startup reconciliation disabled");
            return;
        }

        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.reconcile(tick).await {
            Ok(report) => info!(
                kept = report.kept,
                adopted = report.adopted,
                dropped = report.dropped,
                "Startup reconciliation complete"
            ),
            Err(e) => {
                warn!(error = %e, "Startup reconciliation failed, retrying on first cycle");
                lifecycle.mark_needs_reconcile();
            }
        }
    }

    /// Run until Ctrl+C.
    pub async fn run(self) -> AppResult<()> {
        let shutdown = CancellationToken::new();
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
                }
                shutdown.cancel();
            });
        }

        self.run_until(SystemClock, shutdown).await?;
        Ok(())
    }

    /// Run the scheduler and fill handler until `shutdown` is cancelled.
    ///
    /// Quotes are canceled before returning. Returns the final status.
    pub async fn run_until<C>(self, clock: C, shutdown: CancellationToken) -> AppResult<StatusSnapshot>
    where
        C: Clock + 'static,
    {
        let pair = self.cycle.pair().clone();
        self.startup(clock.now_ms() / 1000).await;

        let fill_shutdown = CancellationToken::new();
        let fill_task = {
            let fills = self.venue.subscribe_fills(&pair);
            let handler = FillHandler::new(
                self.lifecycle.clone(),
                self.notifier.clone(),
                self.cycle.status_board(),
            );
            tokio::spawn(handler.run(fills, fill_shutdown.clone()))
        };

        let scheduler =
            TickScheduler::with_clock(self.config.refresh_interval(), clock, self.notifier.clone());
        let reporter = StatusReporter {
            cycle: self.cycle.clone(),
            every: self.config.scheduler.status_every_cycles,
        };

        info!(pair = %pair, "Quoting started");
        let cycles = scheduler.run(&reporter, shutdown).await;

        fill_shutdown.cancel();
        if let Err(e) = fill_task.await {
            warn!(error = %e, "Fill handler task failed");
        }

        let status = self.cycle.status().await;
        info!(cycles, "Shutdown complete\n{status}");
        let metrics = Metrics::render()?;
        debug!("Final metrics\n{metrics}");
        Ok(status)
    }
}

/// Runs the cycle and logs the status every `every` cycles.
struct StatusReporter {
    cycle: Arc<QuoteCycle>,
    every: u64,
}

impl StatusReporter {
    async fn report(&self) {
        let status = self.cycle.status().await;
        info!("{status}");
        match serde_json::to_string(&status) {
            Ok(json) => debug!(status = %json, "Status snapshot"),
            Err(e) => warn!(error = %e, "Failed to serialize status"),
        }
    }
}

impl CycleHandler for StatusReporter {
    fn on_tick(&self, tick: u64) -> BoxFuture<'_, CycleReport> {
        Box::pin(async move {
            let report = self.cycle.run(tick).await;
            if self.every > 0 && self.cycle.status_board().cycles() % self.every == 0 {
                self.report().await;
            }
            report
        })
    }

    fn on_shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.cycle.shutdown().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use spreadbot_executor::{CycleOutcome, RecordingNotifier};

    #[tokio::test]
    async fn test_new_seeds_paper_venue() {
        let app = Application::new(AppConfig::default()).unwrap();
        assert_eq!(app.venue().balance("USDT"), dec!(1000));
        assert_eq!(app.venue().balance("ETH"), dec!(1));

        let report = app.cycle().run(20).await;
        assert_eq!(report.outcome, CycleOutcome::Quoted);
        assert_eq!(report.reference_price, Some(Price::new(dec!(2000))));

        let status = app.cycle().status().await;
        assert_eq!(status.venue.as_str(), "okx");
        assert_eq!(status.open_orders.len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.scheduler.refresh_interval_secs = 0;
        let result = Application::with_parts(
            config,
            Arc::new(PaperVenue::new()),
            Arc::new(RecordingNotifier::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_startup_without_reconcile_tracks_nothing() {
        let mut config = AppConfig::default();
        config.scheduler.reconcile_on_start = false;
        let app = Application::new(config).unwrap();
        app.startup(0).await;
        assert_eq!(app.lifecycle.lock().await.tracked_count(), 0);
        assert!(!app.lifecycle.lock().await.needs_reconcile());
    }

    #[tokio::test]
    async fn test_signals_widen_spread_when_enabled() {
        let mut config = AppConfig::default();
        config.signal.enabled = true;
        let app = Application::new(config).unwrap();
        app.signals().publish(spreadbot_mm::SignalSnapshot {
            volatility_bps: Some(dec!(100)),
            ..Default::default()
        });

        let report = app.cycle().run(20).await;
        let spread = report.spread.unwrap();
        assert!(spread.bid > dec!(0.001));
        assert!(spread.ask > dec!(0.001));
    }
}
