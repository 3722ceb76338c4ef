//! Fill handling and the notification sink.
//!
//! Fill deliveries arrive on their own channel. The handler takes the same
//! lifecycle lock as the quoting cycle, applies the fill, then forwards a
//! human-readable summary to the [`Notifier`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use spreadbot_core::{FillEvent, FillSummary};
use spreadbot_telemetry::Metrics;

use crate::error::CycleFailure;
use crate::lifecycle::{FillOutcome, SharedLifecycle};
use crate::status::StatusBoard;

/// Sink for fill summaries and recovered errors.
pub trait Notifier: Send + Sync {
    fn notify_fill(&self, summary: &FillSummary);

    fn notify_error(&self, failure: &CycleFailure);
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_fill(&self, summary: &FillSummary) {
        info!(target: "spreadbot::notify", "{summary}");
    }

    fn notify_error(&self, failure: &CycleFailure) {
        warn!(target: "spreadbot::notify", kind = failure.error.kind(), "{failure}");
    }
}

/// Keeps every notification in memory for inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    fills: Mutex<Vec<FillSummary>>,
    errors: Mutex<Vec<CycleFailure>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> Vec<FillSummary> {
        self.fills.lock().clone()
    }

    pub fn errors(&self) -> Vec<CycleFailure> {
        self.errors.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_fill(&self, summary: &FillSummary) {
        self.fills.lock().push(summary.clone());
    }

    fn notify_error(&self, failure: &CycleFailure) {
        self.errors.lock().push(failure.clone());
    }
}

/// Applies fill deliveries to the tracked set.
pub struct FillHandler {
    lifecycle: SharedLifecycle,
    notifier: DynNotifier,
    status: Arc<StatusBoard>,
}

impl FillHandler {
    pub fn new(lifecycle: SharedLifecycle, notifier: DynNotifier, status: Arc<StatusBoard>) -> Self {
        Self {
            lifecycle,
            notifier,
            status,
        }
    }

    /// Apply one delivery. Duplicates change nothing and are not notified;
    /// fills for untracked orders, or already counted by reconciliation, are
    /// still notified.
    pub async fn handle(&self, event: &FillEvent) -> FillOutcome {
        let outcome = self.lifecycle.lock().await.on_fill(event);

        if outcome == FillOutcome::Duplicate {
            Metrics::duplicate_fill();
            return outcome;
        }

        Metrics::fill_applied(&event.pair.to_string(), event.side.as_str());
        self.status.record_fill();
        debug!(
            fill_id = %event.fill_id,
            order_id = %event.gateway_order_id,
            outcome = ?outcome,
            "Fill applied"
        );
        self.notifier.notify_fill(&event.summary());
        outcome
    }

    /// Consume deliveries until shutdown or until the stream closes.
    pub async fn run(self, mut fills: mpsc::Receiver<FillEvent>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                delivery = fills.recv() => match delivery {
                    Some(event) => {
                        self.handle(&event).await;
                    }
                    None => {
                        warn!("Fill stream closed");
                        break;
                    }
                },
            }
        }
        debug!("Fill handler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal_macros::dec;
    use spreadbot_core::{
        ClientOrderId, FillId, GatewayOrderId, OpenOrder, OrderCandidate, OrderSide, Price, Size,
        TradingPair,
    };

    use crate::lifecycle::OrderLifecycleManager;
    use crate::paper::PaperVenue;

    fn pair() -> TradingPair {
        "ETH-USDT".parse().unwrap()
    }

    fn setup() -> (SharedLifecycle, Arc<RecordingNotifier>, FillHandler) {
        let venue = Arc::new(PaperVenue::new());
        let mut manager = OrderLifecycleManager::new(pair(), venue, Duration::from_secs(1));
        let candidate = OrderCandidate::maker_limit(
            pair(),
            OrderSide::Buy,
            Price::new(dec!(1998.0)),
            Size::new(dec!(0.01)),
        );
        manager.track(OpenOrder::from_candidate(
            &candidate,
            GatewayOrderId::new("v-1"),
            ClientOrderId::new(),
            20,
        ));
        let lifecycle = manager.into_shared();
        let notifier = Arc::new(RecordingNotifier::new());
        let handler = FillHandler::new(
            lifecycle.clone(),
            notifier.clone(),
            Arc::new(StatusBoard::new()),
        );
        (lifecycle, notifier, handler)
    }

    fn fill(id: &str, order: &str) -> FillEvent {
        FillEvent {
            fill_id: FillId::new(id),
            gateway_order_id: GatewayOrderId::new(order),
            pair: pair(),
            side: OrderSide::Buy,
            filled_quantity: Size::new(dec!(0.01)),
            filled_price: Price::new(dec!(1998.0)),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fill_notified_once_under_redelivery() {
        let (lifecycle, notifier, handler) = setup();
        let event = fill("f-1", "v-1");

        assert_eq!(handler.handle(&event).await, FillOutcome::Filled);
        assert_eq!(handler.handle(&event).await, FillOutcome::Duplicate);

        assert_eq!(lifecycle.lock().await.tracked_count(), 0);
        let fills = notifier.fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].to_string(), "BUY 0.01 ETH-USDT at 1998.0");
    }

    #[tokio::test]
    async fn test_untracked_fill_still_notified() {
        let (lifecycle, notifier, handler) = setup();
        assert_eq!(
            handler.handle(&fill("f-9", "raced-cancel")).await,
            FillOutcome::Untracked
        );
        assert_eq!(notifier.fills().len(), 1);
        assert_eq!(lifecycle.lock().await.tracked_count(), 1);
    }

    #[tokio::test]
    async fn test_run_drains_channel_until_closed() {
        let (lifecycle, notifier, handler) = setup();
        let (tx, rx) = mpsc::channel(8);
        tx.send(fill("f-1", "v-1")).await.unwrap();
        tx.send(fill("f-1", "v-1")).await.unwrap();
        drop(tx);

        handler.run(rx, CancellationToken::new()).await;
        assert_eq!(notifier.fills().len(), 1);
        assert_eq!(lifecycle.lock().await.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_lifecycle, _notifier, handler) = setup();
        let (_tx, rx) = mpsc::channel::<FillEvent>(8);
        let token = CancellationToken::new();
        token.cancel();
        tokio_test::assert_ready!(tokio_test::task::spawn(handler.run(rx, token)).poll());
    }
}
