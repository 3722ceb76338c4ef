//! In-memory paper venue.
//!
//! Implements [`PriceOracle`], [`BalanceLedger`] and [`OrderGateway`] against
//! a simulated book so the agent runs end to end without an exchange
//! connector. Submissions lock funds, cancels release them, and fills move
//! balances and are broadcast to fill subscribers.
//!
//! Failure controls (rejections, hung calls, an offline switch, `NotFound`
//! cancels, fill redelivery) exist so the control loop can be exercised under the partial
//! failures it must survive.
//!
//! Emitted fills and submission attempts are kept for inspection and
//! redelivery, bounded to the most recent `history_capacity` of each.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use spreadbot_core::{
    ClientOrderId, FillEvent, FillId, GatewayOrderId, OrderCandidate, OrderSide, Price, Size,
    TradingPair,
};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    BalanceLedger, BoxFuture, CancelOutcome, OrderGateway, PriceOracle, SubmitOutcome, VenueOrder,
};

/// Buffer of each fill subscription.
const FILL_CHANNEL_CAPACITY: usize = 1024;

/// Fills and submissions remembered by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

/// Append to a bounded history, evicting the oldest entry when full.
fn push_bounded<T>(history: &mut VecDeque<T>, capacity: usize, item: T) {
    if history.len() == capacity {
        history.pop_front();
    }
    history.push_back(item);
}

#[derive(Default)]
struct PaperBook {
    reference_prices: HashMap<TradingPair, Price>,
    balances: HashMap<String, Decimal>,
    resting: BTreeMap<GatewayOrderId, VenueOrder>,
    next_order_seq: u64,
    next_fill_seq: u64,
    reject_next: Option<String>,
    cancels_not_found: bool,
    history_capacity: usize,
    fills: VecDeque<FillEvent>,
    submissions: VecDeque<(ClientOrderId, OrderCandidate)>,
    cancel_requests: usize,
    subscribers: Vec<(TradingPair, mpsc::Sender<FillEvent>)>,
}

impl PaperBook {
    fn credit(&mut self, asset: &str, amount: Decimal) {
        *self.balances.entry(asset.to_string()).or_default() += amount;
    }

    /// Give back the funds still locked by the unfilled part of an order.
    fn release(&mut self, order: &VenueOrder) {
        match order.side {
            OrderSide::Buy => self.credit(order.pair.quote(), order.remaining.notional(order.price)),
            OrderSide::Sell => self.credit(order.pair.base(), order.remaining.inner()),
        }
    }

    fn fill(&mut self, order_id: &GatewayOrderId, quantity: Option<Size>) -> Option<FillEvent> {
        let order = self.resting.get_mut(order_id)?;
        let quantity = quantity.unwrap_or(order.remaining).min(order.remaining);
        if !quantity.is_positive() {
            return None;
        }
        order.remaining = order.remaining.saturating_sub(quantity);
        let (pair, side, price, done) = (
            order.pair.clone(),
            order.side,
            order.price,
            order.remaining.is_zero(),
        );
        if done {
            self.resting.remove(order_id);
        }

        // The locked side of the trade was debited at submission.
        match side {
            OrderSide::Buy => self.credit(pair.base(), quantity.inner()),
            OrderSide::Sell => self.credit(pair.quote(), quantity.notional(price)),
        }

        self.next_fill_seq += 1;
        let event = FillEvent {
            fill_id: FillId::new(format!("paper-fill-{}", self.next_fill_seq)),
            gateway_order_id: order_id.clone(),
            pair,
            side,
            filled_quantity: quantity,
            filled_price: price,
            timestamp: Utc::now(),
        };
        push_bounded(&mut self.fills, self.history_capacity, event.clone());
        self.broadcast(&event);
        Some(event)
    }

    fn broadcast(&mut self, event: &FillEvent) {
        self.subscribers.retain(|(pair, tx)| {
            if pair != &event.pair {
                return !tx.is_closed();
            }
            match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(fill_id = %event.fill_id, "Paper fill channel full, delivery dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }
}

/// Simulated venue. Cheap to share behind an `Arc`.
pub struct PaperVenue {
    book: Mutex<PaperBook>,
    hang_submits: AtomicBool,
    hang_cancels: AtomicBool,
    hang_prices: AtomicBool,
    offline: AtomicBool,
}

impl Default for PaperVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperVenue {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Venue remembering at most `capacity` fills and submissions.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            book: Mutex::new(PaperBook {
                history_capacity: capacity.max(1),
                ..Default::default()
            }),
            hang_submits: AtomicBool::new(false),
            hang_cancels: AtomicBool::new(false),
            hang_prices: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Market and balances
    // =========================================================================

    pub fn set_reference_price(&self, pair: &TradingPair, price: Price) {
        self.book.lock().reference_prices.insert(pair.clone(), price);
    }

    /// Make the oracle fail for `pair` until a price is set again.
    pub fn clear_reference_price(&self, pair: &TradingPair) {
        self.book.lock().reference_prices.remove(pair);
    }

    /// Move the reference price and fully fill every resting order it
    /// crosses: bids at or above the new price, asks at or below it.
    pub fn set_reference_price_and_cross(&self, pair: &TradingPair, price: Price) -> Vec<FillEvent> {
        let mut book = self.book.lock();
        book.reference_prices.insert(pair.clone(), price);
        let crossed: Vec<GatewayOrderId> = book
            .resting
            .values()
            .filter(|o| &o.pair == pair)
            .filter(|o| match o.side {
                OrderSide::Buy => price <= o.price,
                OrderSide::Sell => price >= o.price,
            })
            .map(|o| o.gateway_order_id.clone())
            .collect();
        crossed
            .iter()
            .filter_map(|id| book.fill(id, None))
            .collect()
    }

    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        self.book.lock().balances.insert(asset.to_string(), amount);
    }

    /// Free balance of `asset` (funds locked in resting orders excluded).
    pub fn balance(&self, asset: &str) -> Decimal {
        self.book
            .lock()
            .balances
            .get(asset)
            .copied()
            .unwrap_or_default()
    }

    // =========================================================================
    // Failure controls
    // =========================================================================

    /// Refuse the next submission with `reason`.
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.book.lock().reject_next = Some(reason.into());
    }

    /// Submissions never complete while set.
    pub fn set_hang_submits(&self, hang: bool) {
        self.hang_submits.store(hang, Ordering::SeqCst);
    }

    /// Cancellations never complete while set.
    pub fn set_hang_cancels(&self, hang: bool) {
        self.hang_cancels.store(hang, Ordering::SeqCst);
    }

    /// Price lookups never complete while set.
    pub fn set_hang_prices(&self, hang: bool) {
        self.hang_prices.store(hang, Ordering::SeqCst);
    }

    /// Every collaborator call fails with a connection error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> GatewayResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Connection("paper venue offline".to_string()));
        }
        Ok(())
    }

    /// Cancels report `NotFound` while set, and the order leaves the book
    /// as if it had filled or expired just before.
    pub fn set_cancels_not_found(&self, not_found: bool) {
        self.book.lock().cancels_not_found = not_found;
    }

    // =========================================================================
    // Fills
    // =========================================================================

    /// Fill a resting order. `None` fills the whole remainder.
    ///
    /// Returns the emitted event, or `None` when the order is unknown.
    pub fn fill_order(&self, order_id: &GatewayOrderId, quantity: Option<Size>) -> Option<FillEvent> {
        self.book.lock().fill(order_id, quantity)
    }

    /// Send an already-emitted fill again, as an at-least-once feed may.
    pub fn redeliver_fill(&self, fill_id: &FillId) -> bool {
        let mut book = self.book.lock();
        let Some(event) = book.fills.iter().find(|f| &f.fill_id == fill_id).cloned() else {
            return false;
        };
        book.broadcast(&event);
        true
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn resting_orders(&self) -> Vec<VenueOrder> {
        self.book.lock().resting.values().cloned().collect()
    }

    /// Recent submission attempts, oldest first.
    pub fn submissions(&self) -> Vec<(ClientOrderId, OrderCandidate)> {
        self.book.lock().submissions.iter().cloned().collect()
    }

    pub fn cancel_request_count(&self) -> usize {
        self.book.lock().cancel_requests
    }
}

impl PriceOracle for PaperVenue {
    fn reference_price<'a>(&'a self, pair: &'a TradingPair) -> BoxFuture<'a, GatewayResult<Price>> {
        Box::pin(async move {
            if self.hang_prices.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.check_online()?;
            self.book
                .lock()
                .reference_prices
                .get(pair)
                .copied()
                .ok_or_else(|| GatewayError::PriceUnavailable(pair.to_string()))
        })
    }
}

impl BalanceLedger for PaperVenue {
    fn available<'a>(&'a self, asset: &'a str) -> BoxFuture<'a, GatewayResult<Decimal>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.balance(asset))
        })
    }
}

impl OrderGateway for PaperVenue {
    fn submit_order<'a>(
        &'a self,
        candidate: &'a OrderCandidate,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'a, GatewayResult<SubmitOutcome>> {
        Box::pin(async move {
            if self.hang_submits.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.check_online()?;
            let mut book = self.book.lock();
            let capacity = book.history_capacity;
            push_bounded(
                &mut book.submissions,
                capacity,
                (client_order_id, candidate.clone()),
            );

            if let Some(reason) = book.reject_next.take() {
                return Ok(SubmitOutcome::Rejected(reason));
            }
            if !candidate.price.is_positive() || !candidate.quantity.is_positive() {
                return Ok(SubmitOutcome::Rejected(
                    "invalid price or quantity".to_string(),
                ));
            }

            let (asset, required) = candidate.required_funds();
            let available = book.balances.get(asset).copied().unwrap_or_default();
            if required > available {
                return Ok(SubmitOutcome::Rejected(format!(
                    "insufficient {asset} balance: need {required}, have {available}"
                )));
            }
            book.balances.insert(asset.to_string(), available - required);

            book.next_order_seq += 1;
            let order_id = GatewayOrderId::new(format!("paper-{}", book.next_order_seq));
            book.resting.insert(
                order_id.clone(),
                VenueOrder {
                    gateway_order_id: order_id.clone(),
                    pair: candidate.pair.clone(),
                    side: candidate.side,
                    price: candidate.price,
                    quantity: candidate.quantity,
                    remaining: candidate.quantity,
                },
            );
            debug!(
                order_id = %order_id,
                side = %candidate.side,
                price = %candidate.price,
                quantity = %candidate.quantity,
                "Paper order resting"
            );
            Ok(SubmitOutcome::Accepted(order_id))
        })
    }

    fn cancel_order<'a>(
        &'a self,
        pair: &'a TradingPair,
        order_id: &'a GatewayOrderId,
    ) -> BoxFuture<'a, GatewayResult<CancelOutcome>> {
        Box::pin(async move {
            if self.hang_cancels.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.check_online()?;
            let mut book = self.book.lock();
            book.cancel_requests += 1;

            if let Some(order) = book.resting.get(order_id).filter(|o| &o.pair != pair) {
                return Err(GatewayError::Venue(format!(
                    "order {order_id} rests on {}, not {pair}",
                    order.pair
                )));
            }
            let Some(order) = book.resting.remove(order_id) else {
                return Ok(CancelOutcome::NotFound);
            };
            book.release(&order);
            if book.cancels_not_found {
                Ok(CancelOutcome::NotFound)
            } else {
                Ok(CancelOutcome::Canceled)
            }
        })
    }

    fn open_orders<'a>(
        &'a self,
        pair: &'a TradingPair,
    ) -> BoxFuture<'a, GatewayResult<Vec<VenueOrder>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self
                .book
                .lock()
                .resting
                .values()
                .filter(|o| &o.pair == pair)
                .cloned()
                .collect())
        })
    }

    fn subscribe_fills(&self, pair: &TradingPair) -> mpsc::Receiver<FillEvent> {
        let (tx, rx) = mpsc::channel(FILL_CHANNEL_CAPACITY);
        self.book.lock().subscribers.push((pair.clone(), tx));
        rx
    }
}
