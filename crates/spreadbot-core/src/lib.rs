//! Core domain types for the spreadbot market maker.
//!
//! This crate provides the vocabulary shared by the strategy and the
//! execution layer:
//! - `TradingPair`, `VenueId`: what is quoted and where
//! - `Price`, `Size`: precision-safe numeric types
//! - `OrderSide`, `OrderKind`: closed trading enums
//! - `OrderCandidate`, `OpenOrder`, `FillEvent`: order lifecycle records

pub mod decimal;
pub mod error;
pub mod execution;
pub mod market;
pub mod order;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::{TradingPair, VenueId};
pub use order::{ClientOrderId, FillId, GatewayOrderId, OrderKind, OrderSide};

pub use execution::{FillEvent, FillSummary, OpenOrder, OrderCandidate, OrderState};
