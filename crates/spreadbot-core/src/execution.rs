//! Execution-related types for order lifecycle management.
//!
//! This module provides types for:
//! - Order candidates produced each quoting cycle
//! - Open orders tracked after venue acknowledgement
//! - Fill events and the human-readable fill summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::market::TradingPair;
use crate::order::{ClientOrderId, FillId, GatewayOrderId, OrderKind, OrderSide};
use crate::{Price, Size};

// ============================================================================
// Order Candidate
// ============================================================================

/// Order proposed by the quote policy, not yet submitted.
///
/// Candidates are never edited in place: budget scaling returns a new
/// candidate via [`OrderCandidate::with_quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCandidate {
    pub pair: TradingPair,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub kind: OrderKind,
    /// Priced to rest on the book rather than take liquidity.
    pub is_maker: bool,
}

impl OrderCandidate {
    /// Create a maker-intent limit candidate.
    #[must_use]
    pub fn maker_limit(pair: TradingPair, side: OrderSide, price: Price, quantity: Size) -> Self {
        Self {
            pair,
            side,
            price,
            quantity,
            kind: OrderKind::Limit,
            is_maker: true,
        }
    }

    /// Copy of this candidate with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: Size) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Asset this order locks and the amount of it required.
    ///
    /// Buys lock `price * quantity` of the quote asset, sells lock
    /// `quantity` of the base asset.
    #[must_use]
    pub fn required_funds(&self) -> (&str, rust_decimal::Decimal) {
        match self.side {
            OrderSide::Buy => (self.pair.quote(), self.quantity.notional(self.price)),
            OrderSide::Sell => (self.pair.base(), self.quantity.inner()),
        }
    }
}

// ============================================================================
// Order Tracking Types
// ============================================================================

/// State of an order in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Submitted, not yet acknowledged.
    Pending,
    /// Acknowledged by the venue and resting.
    Open,
    /// Some quantity filled, remainder resting.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Cancellation acknowledged.
    Canceled,
    /// Submission refused by the venue.
    Rejected,
}

impl OrderState {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// Order acknowledged by the venue and tracked until it leaves the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub pair: TradingPair,
    pub side: OrderSide,
    pub price: Price,
    /// Quantity originally placed.
    pub quantity: Size,
    /// Quantity still resting.
    pub remaining: Size,
    pub gateway_order_id: GatewayOrderId,
    /// None for orders adopted from the venue during reconciliation.
    pub client_order_id: Option<ClientOrderId>,
    /// Tick (Unix seconds of the cycle boundary) that placed the order.
    pub submitted_at_tick: u64,
    pub state: OrderState,
    /// When the venue last confirmed `remaining`. Fills stamped at or
    /// before this instant are already counted in it.
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl OpenOrder {
    /// Build the tracked record for an acknowledged candidate.
    #[must_use]
    pub fn from_candidate(
        candidate: &OrderCandidate,
        gateway_order_id: GatewayOrderId,
        client_order_id: ClientOrderId,
        tick: u64,
    ) -> Self {
        Self {
            pair: candidate.pair.clone(),
            side: candidate.side,
            price: candidate.price,
            quantity: candidate.quantity,
            remaining: candidate.quantity,
            gateway_order_id,
            client_order_id: Some(client_order_id),
            submitted_at_tick: tick,
            state: OrderState::Open,
            synced_at: None,
        }
    }

    /// Quantity filled so far.
    #[must_use]
    pub fn filled(&self) -> Size {
        self.quantity.saturating_sub(self.remaining)
    }

    /// Take the venue's view of the order as of `at`.
    pub fn sync_remaining(&mut self, remaining: Size, at: DateTime<Utc>) {
        if remaining < self.remaining {
            self.remaining = remaining;
            self.state = OrderState::PartiallyFilled;
        }
        self.synced_at = Some(at);
    }

    /// True if the venue's last confirmed view already includes a fill
    /// stamped `timestamp`.
    #[must_use]
    pub fn covers_fill(&self, timestamp: DateTime<Utc>) -> bool {
        self.synced_at.is_some_and(|at| timestamp <= at)
    }

    /// Apply a fill and move to `PartiallyFilled` or `Filled`.
    ///
    /// Fills larger than the remaining quantity clamp to zero.
    pub fn apply_fill(&mut self, filled: Size) -> OrderState {
        self.remaining = self.remaining.saturating_sub(filled);
        self.state = if self.remaining.is_zero() {
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };
        self.state
    }
}

// ============================================================================
// Fills
// ============================================================================

/// One partial or full fill, delivered at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    /// Delivery identifier; redeliveries carry the same id.
    pub fill_id: FillId,
    pub gateway_order_id: GatewayOrderId,
    pub pair: TradingPair,
    pub side: OrderSide,
    pub filled_quantity: Size,
    pub filled_price: Price,
    pub timestamp: DateTime<Utc>,
}

impl FillEvent {
    /// Human-readable summary handed to the notification sink.
    #[must_use]
    pub fn summary(&self) -> FillSummary {
        FillSummary {
            side: self.side,
            quantity: self.filled_quantity,
            pair: self.pair.clone(),
            price: self.filled_price,
        }
    }
}

/// Fill summary, rendered as `BUY 0.01 ETH-USDT at 1998.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillSummary {
    pub side: OrderSide,
    pub quantity: Size,
    pub pair: TradingPair,
    pub price: Price,
}

impl fmt::Display for FillSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} at {}",
            self.side, self.quantity, self.pair, self.price
        )
    }
}
