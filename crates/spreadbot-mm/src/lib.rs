//! Market making strategy for spreadbot.
//!
//! Pure computations, no I/O:
//! - Quote calculation around a reference price
//! - Pluggable signal-derived spread adjustment
//! - Budget-constrained filtering of candidate orders
//!
//! # Architecture
//!
//! ```text
//! reference price ─┐
//! SignalSource ────┼─ SpreadModel ─ compute_quotes ─ BudgetAdjuster ─ accepted candidates
//! base Spread ─────┘                                     ↑
//!                                                 BudgetSnapshot
//! ```

pub mod budget;
pub mod config;
pub mod quote_engine;
pub mod signal;

pub use budget::{BudgetAdjuster, BudgetDecision, BudgetMode, BudgetSnapshot, DropReason};
pub use config::StrategyConfig;
pub use quote_engine::{compute_quotes, Quote, QuotePair, QuotePolicy, Spread};
pub use signal::{
    FixedSpread, NoSignals, SharedSignals, SignalSkewSpread, SignalSnapshot, SignalSource,
    SpreadModel,
};
