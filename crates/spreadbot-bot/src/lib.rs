//! Single-pair spread market maker.
//!
//! Wires the quoting core to its collaborators:
//! - TOML configuration with startup validation
//! - Paper venue as price oracle, balance ledger and order gateway
//! - Optional reconciliation with the venue before the first tick
//! - Tick scheduler, fill handler and periodic status reports
//! - Best-effort cancel of all quotes on shutdown

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
