//! Order lifecycle, quoting cycle and scheduling for spreadbot.
//!
//! # Key Components
//!
//! - [`OrderLifecycleManager`]: tracked open orders, cancel-then-replace, fills
//! - [`QuoteCycle`]: one cancel → quote → adjust → submit pass under the pair lock
//! - [`TickScheduler`]: epoch-aligned periodic driver with overrun skipping
//! - [`FillHandler`]: serializes fill deliveries against the cycle
//! - [`PaperVenue`]: in-memory venue implementing every collaborator trait
//!
//! # Cycle order (in `QuoteCycle::run`)
//!
//! 1. Reconcile with the venue if an earlier call timed out
//! 2. Cancel every tracked order -> CancelOnly if any cancel is outstanding
//! 3. Reference price -> CancelOnly(OracleUnavailable) on failure
//! 4. Spread from signals, bid/ask candidates
//! 5. Fresh balances, budget adjustment
//! 6. Submit survivors

pub mod cycle;
pub mod error;
pub mod fills;
pub mod gateway;
pub mod lifecycle;
pub mod paper;
pub mod scheduler;
pub mod status;

// Errors
pub use error::{CycleError, CycleFailure, GatewayError, GatewayResult};

// Collaborator interfaces
pub use gateway::{
    BalanceLedger, BoxFuture, CancelOutcome, DynBalanceLedger, DynOrderGateway, DynPriceOracle,
    OrderGateway, PriceOracle, SubmitOutcome, VenueOrder,
};

// Lifecycle
pub use lifecycle::{
    CancelReport, FillOutcome, OrderLifecycleManager, ReconcileReport, SharedLifecycle,
    SubmitReport, DEFAULT_FILL_DEDUPE_CAPACITY,
};

// Cycle and scheduling
pub use cycle::{CancelOnlyReason, CycleOutcome, CycleReport, QuoteCycle};
pub use scheduler::{next_boundary_ms, Clock, CycleHandler, SystemClock, TickScheduler};

// Fills and notifications
pub use fills::{DynNotifier, FillHandler, LogNotifier, Notifier, RecordingNotifier};

// Status
pub use status::{StatusBoard, StatusSnapshot};

// Paper venue
pub use paper::PaperVenue;
