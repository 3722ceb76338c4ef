//! One cancel → quote → adjust → submit cycle.
//!
//! The cycle holds the pair's lifecycle lock from the reconciliation read to
//! the last submission, so fill handling never interleaves with a
//! read-modify-write of the tracked set. With a cycle budget set, a cycle
//! that runs past it is abandoned and the lock released; the venue state is
//! then unknown and the next cycle reconciles first.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use spreadbot_core::{Price, TradingPair, VenueId};
use spreadbot_mm::{BudgetAdjuster, BudgetSnapshot, QuotePolicy, Spread};
use spreadbot_telemetry::Metrics;

use crate::error::CycleError;
use crate::gateway::{BoxFuture, DynBalanceLedger, DynPriceOracle};
use crate::lifecycle::{CancelReport, OrderLifecycleManager, SharedLifecycle};
use crate::scheduler::CycleHandler;
use crate::status::{StatusBoard, StatusSnapshot};

/// Why a cycle submitted nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOnlyReason {
    /// Some cancels failed or timed out; no new generation until they clear.
    CancelsOutstanding { count: usize },
    /// Venue state unknown and the reconciliation read failed.
    ReconcileFailed,
    OracleUnavailable,
    /// The spread left no positive bid.
    NoQuotes,
    BudgetUnavailable,
    /// The budget policy dropped every candidate.
    BudgetExhausted,
    /// The cycle ran past its time budget and was abandoned.
    CycleTimedOut,
}

impl fmt::Display for CancelOnlyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CancelsOutstanding { count } => write!(f, "{count} cancel(s) outstanding"),
            Self::ReconcileFailed => write!(f, "reconciliation failed"),
            Self::OracleUnavailable => write!(f, "reference price unavailable"),
            Self::NoQuotes => write!(f, "no valid quotes"),
            Self::BudgetUnavailable => write!(f, "balances unavailable"),
            Self::BudgetExhausted => write!(f, "budget exhausted"),
            Self::CycleTimedOut => write!(f, "cycle time budget exceeded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum CycleOutcome {
    /// Candidates reached the gateway (some may have been rejected).
    Quoted,
    CancelOnly(CancelOnlyReason),
}

impl CycleOutcome {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quoted => "quoted",
            Self::CancelOnly(_) => "cancel_only",
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quoted => write!(f, "quoted"),
            Self::CancelOnly(reason) => write!(f, "cancel-only ({reason})"),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub pair: TradingPair,
    /// Cycle boundary, Unix seconds.
    pub tick: u64,
    /// Tracked orders removed by cancellation (`NotFound` included).
    pub canceled: usize,
    pub submitted: usize,
    pub rejected: usize,
    pub dropped_by_budget: usize,
    pub reference_price: Option<Price>,
    pub spread: Option<Spread>,
    /// Orders tracked when the cycle released the lock.
    pub tracked: usize,
    pub outcome: CycleOutcome,
    /// Errors recovered during the cycle.
    pub errors: Vec<CycleError>,
}

impl CycleReport {
    pub fn new(pair: TradingPair, tick: u64) -> Self {
        Self {
            pair,
            tick,
            canceled: 0,
            submitted: 0,
            rejected: 0,
            dropped_by_budget: 0,
            reference_price: None,
            spread: None,
            tracked: 0,
            outcome: CycleOutcome::Quoted,
            errors: Vec::new(),
        }
    }
}

/// Quoting cycle for one pair.
pub struct QuoteCycle {
    lifecycle: SharedLifecycle,
    policy: QuotePolicy,
    adjuster: BudgetAdjuster,
    oracle: DynPriceOracle,
    ledger: DynBalanceLedger,
    call_timeout: Duration,
    cycle_budget: Option<Duration>,
    venue: VenueId,
    status: Arc<StatusBoard>,
}

impl QuoteCycle {
    pub fn new(
        lifecycle: SharedLifecycle,
        policy: QuotePolicy,
        oracle: DynPriceOracle,
        ledger: DynBalanceLedger,
        call_timeout: Duration,
    ) -> Self {
        let config = policy.config();
        let adjuster = BudgetAdjuster::new(config.budget_mode(), config.lot_size);
        Self {
            lifecycle,
            policy,
            adjuster,
            oracle,
            ledger,
            call_timeout,
            cycle_budget: None,
            venue: VenueId::new("paper"),
            status: Arc::new(StatusBoard::new()),
        }
    }

    /// Venue name shown in status reports.
    pub fn with_venue(mut self, venue: VenueId) -> Self {
        self.venue = venue;
        self
    }

    /// Bound a whole cycle, normally to one tick interval.
    pub fn with_cycle_budget(mut self, budget: Duration) -> Self {
        self.cycle_budget = Some(budget);
        self
    }

    pub fn pair(&self) -> &TradingPair {
        self.policy.pair()
    }

    /// Board shared with the fill handler.
    pub fn status_board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    /// Current tracked orders plus the last cycle's observations.
    pub async fn status(&self) -> StatusSnapshot {
        let open_orders = self.lifecycle.lock().await.open_orders();
        self.status
            .snapshot(self.pair().clone(), self.venue.clone(), open_orders)
    }

    /// Run one full cycle for `tick`.
    pub async fn run(&self, tick: u64) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(self.pair().clone(), tick);

        let budget = {
            let mut lifecycle = self.lifecycle.lock().await;
            let finished = match self.cycle_budget {
                Some(limit) => timeout(limit, self.execute(&mut lifecycle, &mut report))
                    .await
                    .ok(),
                None => Some(self.execute(&mut lifecycle, &mut report).await),
            };
            let (outcome, budget) = match finished {
                Some(result) => result,
                None => {
                    warn!(
                        pair = %report.pair,
                        tick,
                        "Cycle exceeded its time budget, abandoning remaining steps"
                    );
                    lifecycle.mark_needs_reconcile();
                    report.errors.push(CycleError::GatewayTimeout("cycle"));
                    cancel_only(CancelOnlyReason::CycleTimedOut)
                }
            };
            report.outcome = outcome;
            report.tracked = lifecycle.tracked_count();
            budget
        };

        self.status.record_cycle(&report, budget);
        Metrics::cycle_completed(
            &report.pair.to_string(),
            report.outcome.as_str(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        info!(
            pair = %report.pair,
            tick,
            outcome = %report.outcome,
            canceled = report.canceled,
            submitted = report.submitted,
            rejected = report.rejected,
            dropped_by_budget = report.dropped_by_budget,
            tracked = report.tracked,
            "Cycle complete"
        );
        report
    }

    async fn execute(
        &self,
        lifecycle: &mut OrderLifecycleManager,
        report: &mut CycleReport,
    ) -> (CycleOutcome, Option<BudgetSnapshot>) {
        let tick = report.tick;

        let reconciled = if lifecycle.needs_reconcile() {
            match lifecycle.reconcile(tick).await {
                Ok(_) => true,
                Err(e) => {
                    report.errors.push(e);
                    false
                }
            }
        } else {
            true
        };

        // Cancel-then-replace: every tracked order gets a cancel first.
        let cancel = lifecycle.cancel_all().await;
        report.canceled = cancel.removed();
        let outstanding = cancel.outstanding;
        report.errors.extend(cancel.errors);
        if outstanding > 0 {
            return cancel_only(CancelOnlyReason::CancelsOutstanding { count: outstanding });
        }
        if !reconciled {
            return cancel_only(CancelOnlyReason::ReconcileFailed);
        }

        let reference = match self.reference_price().await {
            Ok(price) => price,
            Err(e) => {
                report.errors.push(e);
                return cancel_only(CancelOnlyReason::OracleUnavailable);
            }
        };
        report.reference_price = Some(reference);

        let quote = self.policy.quote(reference);
        report.spread = Some(quote.spread);
        let Some(quotes) = quote.pair else {
            return cancel_only(CancelOnlyReason::NoQuotes);
        };
        let candidates = quotes.into_candidates();

        let budget = match self.fetch_budget().await {
            Ok(budget) => budget,
            Err(e) => {
                report.errors.push(e);
                return cancel_only(CancelOnlyReason::BudgetUnavailable);
            }
        };

        let decision = self.adjuster.adjust(&candidates, &budget);
        report.dropped_by_budget = decision.dropped.len();
        let scaled = decision.scaled_count(&candidates);
        if scaled > 0 {
            debug!(pair = %report.pair, tick, scaled, "Candidates scaled down by budget");
        }
        if !decision.dropped.is_empty() {
            let pair_label = report.pair.to_string();
            for (candidate, reason) in &decision.dropped {
                Metrics::budget_dropped(&pair_label, candidate.side.as_str());
                debug!(
                    pair = %report.pair,
                    tick,
                    side = %candidate.side,
                    reason = ?reason,
                    "Candidate dropped by budget"
                );
            }
            report.errors.push(CycleError::BudgetExceeded {
                dropped: decision.dropped.len(),
            });
        }
        if decision.accepted.is_empty() {
            return (
                CycleOutcome::CancelOnly(CancelOnlyReason::BudgetExhausted),
                Some(budget),
            );
        }

        let submit = lifecycle.submit(&decision.accepted, tick).await;
        report.submitted = submit.accepted.len();
        report.rejected = submit.rejected;
        report.errors.extend(submit.errors);

        (CycleOutcome::Quoted, Some(budget))
    }

    async fn reference_price(&self) -> Result<Price, CycleError> {
        match timeout(self.call_timeout, self.oracle.reference_price(self.pair())).await {
            Ok(Ok(price)) if price.is_positive() => Ok(price),
            Ok(Ok(price)) => Err(CycleError::OracleUnavailable(format!(
                "non-positive reference price {price}"
            ))),
            Ok(Err(e)) => Err(CycleError::OracleUnavailable(e.to_string())),
            Err(_) => Err(CycleError::OracleUnavailable(
                "price lookup timed out".to_string(),
            )),
        }
    }

    /// Fresh balances of both assets of the pair.
    async fn fetch_budget(&self) -> Result<BudgetSnapshot, CycleError> {
        let pair = self.pair();
        let mut budget = BudgetSnapshot::new();
        for asset in [pair.base(), pair.quote()] {
            let amount = match timeout(self.call_timeout, self.ledger.available(asset)).await {
                Ok(Ok(amount)) => amount,
                Ok(Err(e)) => {
                    return Err(CycleError::BudgetUnavailable {
                        asset: asset.to_string(),
                        reason: e.to_string(),
                    })
                }
                Err(_) => {
                    return Err(CycleError::BudgetUnavailable {
                        asset: asset.to_string(),
                        reason: "balance lookup timed out".to_string(),
                    })
                }
            };
            budget.set(asset, amount);
        }
        Ok(budget)
    }

    /// Best-effort cancel of everything tracked, for shutdown.
    pub async fn shutdown(&self) -> CancelReport {
        let report = self.lifecycle.lock().await.cancel_all().await;
        info!(
            pair = %self.pair(),
            canceled = report.canceled,
            not_found = report.not_found,
            outstanding = report.outstanding,
            "Shutdown cancel-all complete"
        );
        report
    }
}

fn cancel_only(reason: CancelOnlyReason) -> (CycleOutcome, Option<BudgetSnapshot>) {
    (CycleOutcome::CancelOnly(reason), None)
}

impl CycleHandler for QuoteCycle {
    fn on_tick(&self, tick: u64) -> BoxFuture<'_, CycleReport> {
        Box::pin(self.run(tick))
    }

    fn on_shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.shutdown().await;
        })
    }
}
