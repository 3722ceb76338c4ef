//! Status query for external reporting.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use spreadbot_core::{OpenOrder, Price, TradingPair, VenueId};
use spreadbot_mm::{BudgetSnapshot, Spread};

use crate::cycle::{CycleOutcome, CycleReport};

#[derive(Debug, Default)]
struct Observations {
    last_tick: Option<u64>,
    cycles: u64,
    fills_applied: u64,
    reference_price: Option<Price>,
    spread: Option<Spread>,
    balances: Option<BudgetSnapshot>,
    last_outcome: Option<CycleOutcome>,
}

/// Last observations of the cycle and fill handler.
///
/// Reference price and spread keep their last known value when a later
/// cycle could not obtain one.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<Observations>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, report: &CycleReport, balances: Option<BudgetSnapshot>) {
        let mut obs = self.inner.lock();
        obs.last_tick = Some(report.tick);
        obs.cycles += 1;
        obs.last_outcome = Some(report.outcome);
        if report.reference_price.is_some() {
            obs.reference_price = report.reference_price;
        }
        if report.spread.is_some() {
            obs.spread = report.spread;
        }
        if balances.is_some() {
            obs.balances = balances;
        }
    }

    pub fn record_fill(&self) {
        self.inner.lock().fills_applied += 1;
    }

    pub fn cycles(&self) -> u64 {
        self.inner.lock().cycles
    }

    pub fn snapshot(
        &self,
        pair: TradingPair,
        venue: VenueId,
        open_orders: Vec<OpenOrder>,
    ) -> StatusSnapshot {
        let obs = self.inner.lock();
        StatusSnapshot {
            pair,
            venue,
            last_tick: obs.last_tick,
            cycles: obs.cycles,
            fills_applied: obs.fills_applied,
            reference_price: obs.reference_price,
            spread: obs.spread,
            balances: obs.balances.clone(),
            last_outcome: obs.last_outcome,
            open_orders,
        }
    }
}

/// Point-in-time view of the agent.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub pair: TradingPair,
    pub venue: VenueId,
    pub last_tick: Option<u64>,
    pub cycles: u64,
    pub fills_applied: u64,
    pub reference_price: Option<Price>,
    pub spread: Option<Spread>,
    /// Balances fetched by the last cycle that reached the budget step.
    pub balances: Option<BudgetSnapshot>,
    pub last_outcome: Option<CycleOutcome>,
    pub open_orders: Vec<OpenOrder>,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bot Status: {} on {}", self.pair, self.venue)?;
        write!(f, "  Cycles: {}  Fills: {}", self.cycles, self.fills_applied)?;
        if let Some(outcome) = &self.last_outcome {
            write!(f, "  Last cycle: {outcome}")?;
        }
        writeln!(f)?;
        match (&self.reference_price, &self.spread) {
            (Some(price), Some(spread)) => {
                writeln!(f, "  Reference price: {price}  Spread: {spread}")?
            }
            (Some(price), None) => writeln!(f, "  Reference price: {price}")?,
            _ => writeln!(f, "  Reference price: n/a")?,
        }

        writeln!(f, "  Balances:")?;
        match &self.balances {
            Some(balances) => {
                for (asset, amount) in balances.iter() {
                    writeln!(f, "    {asset}: {amount}")?;
                }
            }
            None => writeln!(f, "    n/a")?,
        }

        if self.open_orders.is_empty() {
            write!(f, "  No active maker orders.")
        } else {
            write!(f, "  Orders:")?;
            for order in &self.open_orders {
                write!(
                    f,
                    "\n    {} {} @ {} remaining {} ({}, {})",
                    order.side,
                    order.quantity,
                    order.price,
                    order.remaining,
                    order.gateway_order_id,
                    order.state
                )?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use spreadbot_core::{ClientOrderId, GatewayOrderId, OrderCandidate, OrderSide, Size};

    use crate::cycle::CancelOnlyReason;

    fn pair() -> TradingPair {
        "ETH-USDT".parse().unwrap()
    }

    fn venue() -> VenueId {
        VenueId::new("okx")
    }

    #[test]
    fn test_empty_status_display() {
        let board = StatusBoard::new();
        let text = board.snapshot(pair(), venue(), Vec::new()).to_string();
        assert!(text.starts_with("Bot Status: ETH-USDT on okx"));
        assert!(text.contains("Reference price: n/a"));
        assert!(text.ends_with("No active maker orders."));
    }

    #[test]
    fn test_cancel_only_cycle_keeps_last_price() {
        let board = StatusBoard::new();
        let mut quoted = CycleReport::new(pair(), 20);
        quoted.reference_price = Some(Price::new(dec!(2000)));
        quoted.spread = Some(Spread::symmetric(dec!(0.001)));
        board.record_cycle(
            &quoted,
            Some(BudgetSnapshot::new().with_balance("USDT", dec!(100))),
        );

        let mut outage = CycleReport::new(pair(), 40);
        outage.outcome = CycleOutcome::CancelOnly(CancelOnlyReason::OracleUnavailable);
        board.record_cycle(&outage, None);
        board.record_fill();

        let candidate = OrderCandidate::maker_limit(
            pair(),
            OrderSide::Buy,
            Price::new(dec!(1998)),
            Size::new(dec!(0.01)),
        );
        let order = OpenOrder::from_candidate(
            &candidate,
            GatewayOrderId::new("paper-1"),
            ClientOrderId::new(),
            20,
        );
        let status = board.snapshot(pair(), venue(), vec![order]);

        assert_eq!(status.cycles, 2);
        assert_eq!(status.last_tick, Some(40));
        assert_eq!(status.reference_price, Some(Price::new(dec!(2000))));
        assert_eq!(status.fills_applied, 1);

        let text = status.to_string();
        assert!(text.contains("Last cycle: cancel-only (reference price unavailable)"));
        assert!(text.contains("USDT: 100"));
        assert!(text.contains("BUY 0.01 @ 1998 remaining 0.01 (paper-1, open)"));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["pair"], "ETH-USDT");
        assert_eq!(json["venue"], "okx");
        assert_eq!(json["last_outcome"]["outcome"], "cancel_only");
    }
}
