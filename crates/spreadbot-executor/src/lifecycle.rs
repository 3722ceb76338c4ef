//! Order lifecycle management for one trading pair.
//!
//! Owns the tracked open-order set and drives cancel-then-replace:
//! - `cancel_all` issues every cancellation concurrently
//! - `submit` places candidates one by one (partial success allowed)
//! - `on_fill` applies fills idempotently
//! - `reconcile` replaces the tracked set with the venue's view after a
//!   call whose outcome is unknown
//!
//! The tracked set is keyed by venue order id, so two entries with the same
//! id cannot exist. Every gateway call is bounded by `call_timeout`.
//!
//! # Concurrency
//!
//! The manager is not internally synchronized. The quoting cycle and the
//! fill handler share it behind one `tokio::sync::Mutex` ([`SharedLifecycle`]).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use spreadbot_core::{
    ClientOrderId, FillEvent, FillId, GatewayOrderId, OpenOrder, OrderCandidate, OrderState, Size,
    TradingPair,
};
use spreadbot_telemetry::Metrics;

use crate::error::CycleError;
use crate::gateway::{CancelOutcome, DynOrderGateway, SubmitOutcome};

/// Default number of fill ids remembered for dedupe.
pub const DEFAULT_FILL_DEDUPE_CAPACITY: usize = 10_000;

/// Lifecycle manager shared between the cycle and the fill handler.
pub type SharedLifecycle = Arc<tokio::sync::Mutex<OrderLifecycleManager>>;

// ============================================================================
// Reports
// ============================================================================

/// Result of one `cancel_all`.
#[derive(Debug, Default)]
pub struct CancelReport {
    /// Cancellations acknowledged.
    pub canceled: usize,
    /// Orders the venue no longer knew (benign).
    pub not_found: usize,
    /// Orders still tracked because their cancel failed or timed out.
    pub outstanding: usize,
    pub errors: Vec<CycleError>,
}

impl CancelReport {
    /// Orders removed from the tracked set.
    pub fn removed(&self) -> usize {
        self.canceled + self.not_found
    }
}

/// Result of one `submit`.
#[derive(Debug, Default)]
pub struct SubmitReport {
    /// Venue ids of acknowledged orders, in submission order.
    pub accepted: Vec<GatewayOrderId>,
    /// State of each attempted candidate, in submission order. `Pending`
    /// means the outcome is unknown until the next reconciliation.
    pub states: Vec<OrderState>,
    pub rejected: usize,
    /// Candidates not attempted because an earlier call timed out.
    pub skipped: usize,
    pub errors: Vec<CycleError>,
}

/// Result of one `reconcile`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tracked orders the venue still has.
    pub kept: usize,
    /// Venue orders we were not tracking.
    pub adopted: usize,
    /// Tracked orders the venue no longer has.
    pub dropped: usize,
}

/// How a fill delivery changed the tracked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Order stays tracked with `remaining` left.
    PartiallyFilled { remaining: Size },
    /// Order completely filled and no longer tracked.
    Filled,
    /// No tracked order matches, usually because a cancel raced the fill.
    Untracked,
    /// The last reconciliation read already counted this fill.
    AlreadyReconciled,
    /// Already applied; nothing changed.
    Duplicate,
}

// ============================================================================
// Fill dedupe
// ============================================================================

/// Bounded memory of applied fill ids, oldest evicted first.
#[derive(Debug)]
struct FillDedupe {
    capacity: usize,
    seen: HashSet<FillId>,
    order: VecDeque<FillId>,
}

impl FillDedupe {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns false if `id` was already recorded.
    fn insert(&mut self, id: &FillId) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(id.clone());
        self.order.push_back(id.clone());
        true
    }
}

// ============================================================================
// OrderLifecycleManager
// ============================================================================

/// Tracked open orders of one pair and the calls that change them.
pub struct OrderLifecycleManager {
    pair: TradingPair,
    gateway: DynOrderGateway,
    call_timeout: Duration,
    tracked: HashMap<GatewayOrderId, OpenOrder>,
    fills: FillDedupe,
    needs_reconcile: bool,
}

impl OrderLifecycleManager {
    pub fn new(pair: TradingPair, gateway: DynOrderGateway, call_timeout: Duration) -> Self {
        Self::with_dedupe_capacity(pair, gateway, call_timeout, DEFAULT_FILL_DEDUPE_CAPACITY)
    }

    pub fn with_dedupe_capacity(
        pair: TradingPair,
        gateway: DynOrderGateway,
        call_timeout: Duration,
        fill_dedupe_capacity: usize,
    ) -> Self {
        Self {
            pair,
            gateway,
            call_timeout,
            tracked: HashMap::new(),
            fills: FillDedupe::new(fill_dedupe_capacity),
            needs_reconcile: false,
        }
    }

    /// Wrap for sharing with the fill handler.
    pub fn into_shared(self) -> SharedLifecycle {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn get(&self, order_id: &GatewayOrderId) -> Option<&OpenOrder> {
        self.tracked.get(order_id)
    }

    /// Tracked orders sorted by venue id.
    pub fn open_orders(&self) -> Vec<OpenOrder> {
        let mut orders: Vec<OpenOrder> = self.tracked.values().cloned().collect();
        orders.sort_by(|a, b| a.gateway_order_id.cmp(&b.gateway_order_id));
        orders
    }

    /// True when an earlier call left the venue state unknown.
    pub fn needs_reconcile(&self) -> bool {
        self.needs_reconcile
    }

    /// Force a reconciliation read before the next cycle quotes.
    pub fn mark_needs_reconcile(&mut self) {
        self.needs_reconcile = true;
    }

    /// Stop tracking an order that left the book.
    fn close(&mut self, order_id: &GatewayOrderId, state: OrderState) -> Option<OpenOrder> {
        let mut order = self.tracked.remove(order_id)?;
        order.state = state;
        debug!(
            pair = %self.pair,
            order_id = %order_id,
            side = %order.side,
            state = %order.state,
            filled = %order.filled(),
            "Order closed"
        );
        Some(order)
    }

    /// Start tracking an order. Refuses an id that is already tracked.
    pub fn track(&mut self, order: OpenOrder) -> bool {
        if self.tracked.contains_key(&order.gateway_order_id) {
            warn!(
                pair = %self.pair,
                order_id = %order.gateway_order_id,
                "Refusing to track duplicate venue order id"
            );
            return false;
        }
        self.tracked.insert(order.gateway_order_id.clone(), order);
        true
    }

    /// Replace the tracked set with the orders the venue reports as resting.
    ///
    /// Known orders keep their local record with the venue's remaining
    /// quantity; unknown venue orders are adopted; tracked orders missing
    /// at the venue are dropped. On error the flag stays set.
    ///
    /// The venue's view is authoritative: fills stamped at or before the
    /// read are not applied again when their delivery arrives later.
    pub async fn reconcile(&mut self, tick: u64) -> Result<ReconcileReport, CycleError> {
        let venue_orders = match timeout(self.call_timeout, self.gateway.open_orders(&self.pair))
            .await
        {
            Ok(Ok(orders)) => orders,
            Ok(Err(e)) => {
                return Err(CycleError::Gateway {
                    op: "open_orders",
                    source: e,
                })
            }
            Err(_) => return Err(CycleError::GatewayTimeout("open_orders")),
        };
        let read_at = Utc::now();

        let mut report = ReconcileReport::default();
        let mut previous = std::mem::take(&mut self.tracked);
        for venue_order in venue_orders {
            if venue_order.pair != self.pair {
                continue;
            }
            let id = venue_order.gateway_order_id.clone();
            let order = match previous.remove(&id) {
                Some(mut local) => {
                    report.kept += 1;
                    local.sync_remaining(venue_order.remaining, read_at);
                    local
                }
                None => {
                    report.adopted += 1;
                    let mut adopted = venue_order.into_open_order(tick);
                    adopted.synced_at = Some(read_at);
                    adopted
                }
            };
            self.tracked.insert(id, order);
        }
        report.dropped = previous.len();
        for (id, order) in previous {
            debug!(
                pair = %self.pair,
                order_id = %id,
                side = %order.side,
                filled = %order.filled(),
                "Order gone from venue"
            );
        }
        self.needs_reconcile = false;

        Metrics::tracked_orders(&self.pair.to_string(), self.tracked.len());
        info!(
            pair = %self.pair,
            tick,
            kept = report.kept,
            adopted = report.adopted,
            dropped = report.dropped,
            "Reconciled tracked orders with venue"
        );
        Ok(report)
    }

    /// Cancel every tracked order concurrently.
    ///
    /// `Canceled` and `NotFound` both remove the order. Failed or timed-out
    /// cancels leave it tracked; a timeout also flags reconciliation.
    pub async fn cancel_all(&mut self) -> CancelReport {
        let mut report = CancelReport::default();
        if self.tracked.is_empty() {
            return report;
        }

        let ids: Vec<GatewayOrderId> = self.tracked.keys().cloned().collect();
        let pair = &self.pair;
        let gateway = &self.gateway;
        let call_timeout = self.call_timeout;
        let results = join_all(ids.iter().map(|id| async move {
            (id, timeout(call_timeout, gateway.cancel_order(pair, id)).await)
        }))
        .await;

        let pair_label = self.pair.to_string();
        for (id, result) in results {
            match result {
                Ok(Ok(CancelOutcome::Canceled)) => {
                    self.close(id, OrderState::Canceled);
                    report.canceled += 1;
                    Metrics::order_canceled(&pair_label, "canceled");
                }
                Ok(Ok(CancelOutcome::NotFound)) => {
                    self.close(id, OrderState::Canceled);
                    report.not_found += 1;
                    Metrics::order_canceled(&pair_label, "not_found");
                    debug!(pair = %self.pair, order_id = %id, "Cancel: order unknown at venue, treating as done");
                }
                Ok(Err(e)) => {
                    warn!(pair = %self.pair, order_id = %id, error = %e, "Cancel failed");
                    report.errors.push(CycleError::Gateway {
                        op: "cancel_order",
                        source: e,
                    });
                }
                Err(_) => {
                    warn!(pair = %self.pair, order_id = %id, "Cancel timed out, outcome unknown");
                    self.needs_reconcile = true;
                    report.errors.push(CycleError::GatewayTimeout("cancel_order"));
                }
            }
        }

        report.outstanding = self.tracked.len();
        Metrics::tracked_orders(&pair_label, self.tracked.len());
        debug!(
            pair = %self.pair,
            canceled = report.canceled,
            not_found = report.not_found,
            outstanding = report.outstanding,
            "Cancel-all complete"
        );
        report
    }

    /// Submit candidates one by one.
    ///
    /// Acknowledged orders become tracked; rejections are reported and not
    /// retried. A timeout aborts the remaining submissions and flags
    /// reconciliation, since the venue may have accepted the order.
    pub async fn submit(&mut self, candidates: &[OrderCandidate], tick: u64) -> SubmitReport {
        let mut report = SubmitReport::default();
        let pair_label = self.pair.to_string();

        for (i, candidate) in candidates.iter().enumerate() {
            let client_order_id = ClientOrderId::new();
            let result = timeout(
                self.call_timeout,
                self.gateway.submit_order(candidate, client_order_id.clone()),
            )
            .await;

            match result {
                Ok(Ok(SubmitOutcome::Accepted(order_id))) => {
                    let order =
                        OpenOrder::from_candidate(candidate, order_id.clone(), client_order_id, tick);
                    report.states.push(OrderState::Open);
                    if self.track(order) {
                        Metrics::order_submitted(&pair_label, candidate.side.as_str());
                        info!(
                            pair = %self.pair,
                            tick,
                            order_id = %order_id,
                            side = %candidate.side,
                            price = %candidate.price,
                            quantity = %candidate.quantity,
                            "Order placed"
                        );
                        report.accepted.push(order_id);
                    } else {
                        self.needs_reconcile = true;
                    }
                }
                Ok(Ok(SubmitOutcome::Rejected(reason))) => {
                    Metrics::order_rejected(&pair_label, candidate.side.as_str());
                    warn!(
                        pair = %self.pair,
                        tick,
                        side = %candidate.side,
                        price = %candidate.price,
                        reason = %reason,
                        "Order rejected"
                    );
                    report.rejected += 1;
                    report.states.push(OrderState::Rejected);
                    report.errors.push(CycleError::GatewayRejected {
                        side: candidate.side,
                        reason,
                    });
                }
                Ok(Err(e)) => {
                    warn!(pair = %self.pair, tick, side = %candidate.side, error = %e, "Submit failed");
                    report.states.push(OrderState::Rejected);
                    report.errors.push(CycleError::Gateway {
                        op: "submit_order",
                        source: e,
                    });
                }
                Err(_) => {
                    warn!(
                        pair = %self.pair,
                        tick,
                        side = %candidate.side,
                        "Submit timed out, aborting remaining submissions"
                    );
                    self.needs_reconcile = true;
                    report.states.push(OrderState::Pending);
                    report.skipped = candidates.len() - i - 1;
                    report.errors.push(CycleError::GatewayTimeout("submit_order"));
                    break;
                }
            }
        }

        Metrics::tracked_orders(&pair_label, self.tracked.len());
        report
    }

    /// Apply a fill delivery. Idempotent per fill id.
    pub fn on_fill(&mut self, event: &FillEvent) -> FillOutcome {
        if !self.fills.insert(&event.fill_id) {
            debug!(fill_id = %event.fill_id, "Duplicate fill delivery ignored");
            return FillOutcome::Duplicate;
        }

        let Some(order) = self.tracked.get_mut(&event.gateway_order_id) else {
            debug!(
                fill_id = %event.fill_id,
                order_id = %event.gateway_order_id,
                "Fill for untracked order"
            );
            return FillOutcome::Untracked;
        };

        if order.covers_fill(event.timestamp) {
            debug!(
                fill_id = %event.fill_id,
                order_id = %event.gateway_order_id,
                remaining = %order.remaining,
                "Fill already counted by reconciliation"
            );
            return FillOutcome::AlreadyReconciled;
        }

        if event.filled_quantity > order.remaining {
            warn!(
                order_id = %event.gateway_order_id,
                filled = %event.filled_quantity,
                remaining = %order.remaining,
                "Fill exceeds remaining quantity, clamping"
            );
        }

        let outcome = if order.apply_fill(event.filled_quantity).is_terminal() {
            self.close(&event.gateway_order_id, OrderState::Filled);
            FillOutcome::Filled
        } else {
            FillOutcome::PartiallyFilled {
                remaining: order.remaining,
            }
        };
        Metrics::tracked_orders(&self.pair.to_string(), self.tracked.len());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::OrderGateway;
    use crate::paper::PaperVenue;
    use rust_decimal_macros::dec;
    use spreadbot_core::{OrderSide, Price};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn pair() -> TradingPair {
        "ETH-USDT".parse().unwrap()
    }

    fn setup() -> (Arc<PaperVenue>, OrderLifecycleManager) {
        let venue = Arc::new(PaperVenue::new());
        venue.set_balance("USDT", dec!(1000));
        venue.set_balance("ETH", dec!(1));
        let manager = OrderLifecycleManager::new(pair(), venue.clone(), TIMEOUT);
        (venue, manager)
    }

    fn quotes() -> Vec<OrderCandidate> {
        vec![
            OrderCandidate::maker_limit(
                pair(),
                OrderSide::Buy,
                Price::new(dec!(1998)),
                Size::new(dec!(0.01)),
            ),
            OrderCandidate::maker_limit(
                pair(),
                OrderSide::Sell,
                Price::new(dec!(2002)),
                Size::new(dec!(0.01)),
            ),
        ]
    }

    fn fill(id: &str, order_id: &GatewayOrderId, qty: rust_decimal::Decimal) -> FillEvent {
        FillEvent {
            fill_id: FillId::new(id),
            gateway_order_id: order_id.clone(),
            pair: pair(),
            side: OrderSide::Buy,
            filled_quantity: Size::new(qty),
            filled_price: Price::new(dec!(1998)),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_submit_tracks_accepted_orders() {
        let (venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 100).await;

        assert_eq!(report.accepted.len(), 2);
        assert_eq!(manager.tracked_count(), 2);
        let order = manager.get(&report.accepted[0]).unwrap();
        assert_eq!(order.state, OrderState::Open);
        assert_eq!(order.submitted_at_tick, 100);
        assert_eq!(venue.resting_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_reported_not_retried() {
        let (venue, mut manager) = setup();
        venue.reject_next_submission("price out of band");
        let report = manager.submit(&quotes(), 100).await;

        assert_eq!(report.rejected, 1);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.states, vec![OrderState::Rejected, OrderState::Open]);
        assert_eq!(venue.submissions().len(), 2);
        assert!(matches!(
            report.errors[0],
            CycleError::GatewayRejected { side: OrderSide::Buy, .. }
        ));
    }

    #[tokio::test]
    async fn test_cancel_all_then_submit_never_duplicates_ids() {
        let (venue, mut manager) = setup();
        for tick in 0..5 {
            let cancel = manager.cancel_all().await;
            assert_eq!(cancel.outstanding, 0);
            manager.submit(&quotes(), tick).await;

            let ids: HashSet<GatewayOrderId> = manager
                .open_orders()
                .into_iter()
                .map(|o| o.gateway_order_id)
                .collect();
            assert_eq!(ids.len(), manager.tracked_count());
            assert_eq!(manager.tracked_count(), 2);
        }
        assert_eq!(venue.resting_orders().len(), 2);
        assert_eq!(venue.cancel_request_count(), 8);
    }

    #[tokio::test]
    async fn test_not_found_cancel_is_benign() {
        let (venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 1).await;
        // Bid fills at the venue before our cancel reaches it
        venue.fill_order(&report.accepted[0], None);

        let cancel = manager.cancel_all().await;
        assert_eq!(cancel.canceled, 1);
        assert_eq!(cancel.not_found, 1);
        assert_eq!(cancel.outstanding, 0);
        assert!(cancel.errors.is_empty());
        assert_eq!(manager.tracked_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_timeout_keeps_order_and_flags_reconcile() {
        let (venue, mut manager) = setup();
        manager.submit(&quotes(), 1).await;
        venue.set_hang_cancels(true);

        let cancel = manager.cancel_all().await;
        assert_eq!(cancel.outstanding, 2);
        assert_eq!(cancel.errors.len(), 2);
        assert!(manager.needs_reconcile());
        assert_eq!(manager.tracked_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_timeout_aborts_rest_and_reconcile_recovers() {
        let (venue, mut manager) = setup();
        venue.set_hang_submits(true);

        let report = manager.submit(&quotes(), 1).await;
        assert!(report.accepted.is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.states, vec![OrderState::Pending]);
        assert_eq!(
            report.errors,
            vec![CycleError::GatewayTimeout("submit_order")]
        );
        assert!(manager.needs_reconcile());

        // The venue holds an order we never heard back about
        venue.set_hang_submits(false);
        let candidates = quotes();
        venue
            .submit_order(&candidates[0], ClientOrderId::new())
            .await
            .unwrap();

        let reconciled = manager.reconcile(2).await.unwrap();
        assert_eq!(reconciled.adopted, 1);
        assert!(!manager.needs_reconcile());
        let adopted = &manager.open_orders()[0];
        assert!(adopted.client_order_id.is_none());
        assert_eq!(adopted.submitted_at_tick, 2);
    }

    #[tokio::test]
    async fn test_reconcile_drops_orders_gone_from_venue() {
        let (venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 1).await;
        venue.fill_order(&report.accepted[1], Some(Size::new(dec!(0.004))));
        venue.fill_order(&report.accepted[0], None);

        let reconciled = manager.reconcile(2).await.unwrap();
        assert_eq!(
            reconciled,
            ReconcileReport {
                kept: 1,
                adopted: 0,
                dropped: 1
            }
        );
        let kept = manager.get(&report.accepted[1]).unwrap();
        assert_eq!(kept.remaining.inner(), dec!(0.006));
        assert_eq!(kept.state, OrderState::PartiallyFilled);
        assert!(kept.client_order_id.is_some());
    }

    #[tokio::test]
    async fn test_fill_delivered_after_reconcile_counts_once() {
        let (venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 1).await;
        let bid = report.accepted[0].clone();

        // Partial fill still queued when reconciliation reads the venue
        let held = venue.fill_order(&bid, Some(Size::new(dec!(0.004)))).unwrap();
        manager.reconcile(2).await.unwrap();
        assert_eq!(manager.get(&bid).unwrap().remaining.inner(), dec!(0.006));

        assert_eq!(manager.on_fill(&held), FillOutcome::AlreadyReconciled);
        assert_eq!(manager.get(&bid).unwrap().remaining.inner(), dec!(0.006));

        // A later fill applies on top of the venue's view
        let mut later = venue.fill_order(&bid, Some(Size::new(dec!(0.003)))).unwrap();
        later.timestamp = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(
            manager.on_fill(&later),
            FillOutcome::PartiallyFilled {
                remaining: Size::new(dec!(0.003))
            }
        );
        let resting = venue
            .resting_orders()
            .into_iter()
            .find(|o| o.gateway_order_id == bid)
            .unwrap();
        assert_eq!(resting.remaining, manager.get(&bid).unwrap().remaining);
    }

    #[tokio::test]
    async fn test_partial_then_full_fill() {
        let (_venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 1).await;
        let bid = report.accepted[0].clone();

        assert_eq!(
            manager.on_fill(&fill("f-1", &bid, dec!(0.004))),
            FillOutcome::PartiallyFilled {
                remaining: Size::new(dec!(0.006))
            }
        );
        assert_eq!(manager.tracked_count(), 2);

        assert_eq!(
            manager.on_fill(&fill("f-2", &bid, dec!(0.006))),
            FillOutcome::Filled
        );
        assert!(manager.get(&bid).is_none());
        assert_eq!(manager.tracked_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_fill_applies_once() {
        let (_venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 1).await;
        let bid = report.accepted[0].clone();
        let event = fill("f-1", &bid, dec!(0.004));

        manager.on_fill(&event);
        let after_first = manager.get(&bid).cloned();
        assert_eq!(manager.on_fill(&event), FillOutcome::Duplicate);
        assert_eq!(manager.get(&bid).cloned(), after_first);
    }

    #[tokio::test]
    async fn test_overfill_and_untracked_fill() {
        let (_venue, mut manager) = setup();
        let report = manager.submit(&quotes(), 1).await;

        assert_eq!(
            manager.on_fill(&fill("f-1", &report.accepted[0], dec!(5))),
            FillOutcome::Filled
        );
        assert_eq!(
            manager.on_fill(&fill("f-2", &GatewayOrderId::new("gone"), dec!(0.01))),
            FillOutcome::Untracked
        );
    }

    #[test]
    fn test_fill_dedupe_evicts_oldest() {
        let mut dedupe = FillDedupe::new(2);
        assert!(dedupe.insert(&FillId::new("a")));
        assert!(dedupe.insert(&FillId::new("b")));
        assert!(!dedupe.insert(&FillId::new("a")));
        assert!(dedupe.insert(&FillId::new("c")));
        // "a" evicted
        assert!(dedupe.insert(&FillId::new("a")));
        assert!(!dedupe.insert(&FillId::new("c")));
    }

    #[tokio::test]
    async fn test_track_refuses_duplicate_id() {
        let (_venue, mut manager) = setup();
        let candidates = quotes();
        let order = OpenOrder::from_candidate(
            &candidates[0],
            GatewayOrderId::new("dup"),
            ClientOrderId::new(),
            1,
        );
        assert!(manager.track(order.clone()));
        assert!(!manager.track(order));
        assert_eq!(manager.tracked_count(), 1);
    }
}
