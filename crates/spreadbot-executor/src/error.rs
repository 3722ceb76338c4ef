//! Gateway and cycle error types.

use std::fmt;

use thiserror::Error;

use spreadbot_core::{OrderSide, TradingPair};

/// Failure reported by an external collaborator call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Reference price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Venue error: {0}")]
    Venue(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error recovered at the cycle boundary. None of these stop the scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// No usable reference price; the cycle degrades to cancel-only.
    #[error("Reference price unavailable: {0}")]
    OracleUnavailable(String),

    /// A balance could not be read; nothing is submitted.
    #[error("Balance unavailable for {asset}: {reason}")]
    BudgetUnavailable { asset: String, reason: String },

    /// Candidates dropped by the budget policy.
    #[error("Budget exceeded: {dropped} candidate(s) dropped")]
    BudgetExceeded { dropped: usize },

    /// Submission refused by the venue. Not retried this cycle.
    #[error("Gateway rejected {side} order: {reason}")]
    GatewayRejected { side: OrderSide, reason: String },

    /// A call exceeded its bound; outcome unknown until reconciled.
    #[error("Gateway call timed out: {0}")]
    GatewayTimeout(&'static str),

    #[error("Gateway {op} failed: {source}")]
    Gateway {
        op: &'static str,
        #[source]
        source: GatewayError,
    },
}

impl CycleError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OracleUnavailable(_) => "oracle_unavailable",
            Self::BudgetUnavailable { .. } => "budget_unavailable",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::GatewayRejected { .. } => "gateway_rejected",
            Self::GatewayTimeout(_) => "gateway_timeout",
            Self::Gateway { .. } => "gateway",
        }
    }
}

/// A recovered error together with the cycle it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleFailure {
    /// Cycle boundary, Unix seconds.
    pub tick: u64,
    pub pair: TradingPair,
    pub error: CycleError,
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[tick {}] {}: {}", self.tick, self.pair, self.error)
    }
}
