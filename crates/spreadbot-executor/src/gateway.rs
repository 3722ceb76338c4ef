//! Collaborator interfaces the quoting core calls.
//!
//! Exchange connectivity, balances and reference prices live outside this
//! crate. These traits are the seam: dyn-compatible (boxed futures) so that
//! a venue connector, the in-memory [`crate::PaperVenue`] or a test double
//! can be injected as `Arc<dyn Trait>`.

use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use spreadbot_core::{
    ClientOrderId, FillEvent, GatewayOrderId, OpenOrder, OrderCandidate, OrderSide, OrderState,
    Price, Size, TradingPair,
};

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Venue answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Acknowledged and resting under this id.
    Accepted(GatewayOrderId),
    /// Refused (insufficient balance, invalid price or quantity, venue error).
    Rejected(String),
}

/// Venue answer to a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Canceled,
    /// The venue does not know the order, usually because a fill raced the
    /// cancel. Treated as success.
    NotFound,
}

/// An order resting at the venue, as reported by a reconciliation read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueOrder {
    pub gateway_order_id: GatewayOrderId,
    pub pair: TradingPair,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub remaining: Size,
}

impl VenueOrder {
    /// Tracked record for an order adopted from the venue.
    pub fn into_open_order(self, tick: u64) -> OpenOrder {
        let state = if self.remaining < self.quantity {
            OrderState::PartiallyFilled
        } else {
            OrderState::Open
        };
        OpenOrder {
            pair: self.pair,
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            remaining: self.remaining,
            gateway_order_id: self.gateway_order_id,
            client_order_id: None,
            submitted_at_tick: tick,
            state,
            synced_at: None,
        }
    }
}

/// Supplies the quoting midpoint.
pub trait PriceOracle: Send + Sync {
    fn reference_price<'a>(&'a self, pair: &'a TradingPair) -> BoxFuture<'a, GatewayResult<Price>>;
}

/// Supplies available balances.
pub trait BalanceLedger: Send + Sync {
    /// Amount of `asset` free to lock in new orders.
    fn available<'a>(&'a self, asset: &'a str) -> BoxFuture<'a, GatewayResult<Decimal>>;
}

/// Order routing.
///
/// Fills are delivered at least once on the channel returned by
/// [`OrderGateway::subscribe_fills`]; consumers dedupe by fill id.
pub trait OrderGateway: Send + Sync {
    fn submit_order<'a>(
        &'a self,
        candidate: &'a OrderCandidate,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'a, GatewayResult<SubmitOutcome>>;

    fn cancel_order<'a>(
        &'a self,
        pair: &'a TradingPair,
        order_id: &'a GatewayOrderId,
    ) -> BoxFuture<'a, GatewayResult<CancelOutcome>>;

    /// Orders currently resting for `pair`.
    fn open_orders<'a>(&'a self, pair: &'a TradingPair)
        -> BoxFuture<'a, GatewayResult<Vec<VenueOrder>>>;

    fn subscribe_fills(&self, pair: &TradingPair) -> mpsc::Receiver<FillEvent>;
}

pub type DynPriceOracle = Arc<dyn PriceOracle>;
pub type DynBalanceLedger = Arc<dyn BalanceLedger>;
pub type DynOrderGateway = Arc<dyn OrderGateway>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_adopted_order_state_reflects_remaining() {
        let venue = VenueOrder {
            gateway_order_id: GatewayOrderId::new("v-9"),
            pair: "ETH-USDT".parse().unwrap(),
            side: OrderSide::Sell,
            price: Price::new(dec!(2002)),
            quantity: Size::new(dec!(0.01)),
            remaining: Size::new(dec!(0.004)),
        };
        let order = venue.clone().into_open_order(42);
        assert_eq!(order.state, OrderState::PartiallyFilled);
        assert!(order.client_order_id.is_none());
        assert_eq!(order.submitted_at_tick, 42);

        let untouched = VenueOrder {
            remaining: venue.quantity,
            ..venue
        };
        assert_eq!(untouched.into_open_order(42).state, OrderState::Open);
    }
}
