//! Quoting strategy configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::budget::BudgetMode;
use crate::quote_engine::Spread;

/// Quoting strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Quantity of each quote, in base units.
    #[serde(default = "default_order_amount")]
    pub order_amount: Decimal,

    /// Fractional offset below the reference price for the bid.
    #[serde(default = "default_spread")]
    pub bid_spread: Decimal,

    /// Fractional offset above the reference price for the ask.
    #[serde(default = "default_spread")]
    pub ask_spread: Decimal,

    /// Accept both quotes or neither when the budget cannot fund the pair.
    #[serde(default = "default_true")]
    pub all_or_none: bool,

    /// Price tick. Bids round down, asks round up. Zero disables rounding.
    #[serde(default)]
    pub price_tick: Decimal,

    /// Lot size for quantities (round down). Zero disables rounding.
    #[serde(default)]
    pub lot_size: Decimal,

    // --- Signal-derived spread adjustment ---
    /// Inventory skew factor (0.0 = no skew, 1.0 = full skew).
    /// When inventory is long, the bid widens and the ask tightens.
    #[serde(default = "default_inventory_skew_factor")]
    pub inventory_skew_factor: Decimal,

    /// Momentum skew factor. A rising market widens the bid and tightens the ask.
    #[serde(default = "default_momentum_skew_factor")]
    pub momentum_skew_factor: Decimal,

    /// Volatility (bps) below which spreads are not widened.
    #[serde(default = "default_volatility_floor_bps")]
    pub volatility_floor_bps: Decimal,

    /// Widening per unit of volatility excess over the floor.
    #[serde(default = "default_volatility_widen_factor")]
    pub volatility_widen_factor: Decimal,

    /// Upper clamp for any derived spread. Must stay below 1.
    #[serde(default = "default_max_spread")]
    pub max_spread: Decimal,
}

impl StrategyConfig {
    /// Configured base spread.
    pub fn base_spread(&self) -> Spread {
        Spread::new(self.bid_spread, self.ask_spread)
    }

    /// Budget policy selected by `all_or_none`.
    pub fn budget_mode(&self) -> BudgetMode {
        if self.all_or_none {
            BudgetMode::AllOrNone
        } else {
            BudgetMode::BestEffort
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            order_amount: default_order_amount(),
            bid_spread: default_spread(),
            ask_spread: default_spread(),
            all_or_none: true,
            price_tick: Decimal::ZERO,
            lot_size: Decimal::ZERO,
            inventory_skew_factor: default_inventory_skew_factor(),
            momentum_skew_factor: default_momentum_skew_factor(),
            volatility_floor_bps: default_volatility_floor_bps(),
            volatility_widen_factor: default_volatility_widen_factor(),
            max_spread: default_max_spread(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_order_amount() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_spread() -> Decimal {
    Decimal::new(1, 3) // 0.001 = 10 bps
}
fn default_inventory_skew_factor() -> Decimal {
    Decimal::new(3, 1) // 0.3
}
fn default_momentum_skew_factor() -> Decimal {
    Decimal::new(3, 1) // 0.3
}
fn default_volatility_floor_bps() -> Decimal {
    Decimal::new(10, 0)
}
fn default_volatility_widen_factor() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_max_spread() -> Decimal {
    Decimal::new(5, 2) // 5%
}
