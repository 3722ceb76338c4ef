//! Budget-constrained filtering of candidate orders.
//!
//! Pure computation over a [`BudgetSnapshot`] fetched for the current cycle.
//! Candidates are funded in order; each accepted candidate consumes the
//! balance it locks so two buys never double-count the quote asset.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use spreadbot_core::{OrderCandidate, OrderSide, Size};

/// Decimal places kept when scaling without a configured lot size.
const UNLOTTED_SCALE_DP: u32 = 8;

/// Read-only view of available balance per asset.
///
/// Valid for one adjustment call only; fetch a fresh one every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    balances: BTreeMap<String, Decimal>,
}

impl BudgetSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style balance insertion.
    #[must_use]
    pub fn with_balance(mut self, asset: impl Into<String>, amount: Decimal) -> Self {
        self.set(asset, amount);
        self
    }

    pub fn set(&mut self, asset: impl Into<String>, amount: Decimal) {
        self.balances.insert(asset.into(), amount);
    }

    /// Available amount; unknown assets have none.
    pub fn available(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.balances.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Budget policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// Accept every candidate or none of them.
    AllOrNone,
    /// Accept, scale down, or drop each candidate independently.
    BestEffort,
}

/// Why a candidate was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not enough of `asset` to fund even one lot.
    Unaffordable {
        asset: String,
        required: Decimal,
        available: Decimal,
    },
    /// Affordable on its own, dropped because another candidate was not.
    BatchRejected,
    /// Zero or negative quantity.
    EmptyQuantity,
}

/// Outcome of one adjustment.
#[derive(Debug, Clone, Default)]
pub struct BudgetDecision {
    /// Candidates to submit, possibly with reduced quantity.
    pub accepted: Vec<OrderCandidate>,
    /// Candidates dropped this cycle.
    pub dropped: Vec<(OrderCandidate, DropReason)>,
}

impl BudgetDecision {
    /// Number of accepted candidates whose quantity was reduced.
    pub fn scaled_count(&self, original: &[OrderCandidate]) -> usize {
        self.accepted
            .iter()
            .filter(|a| {
                original
                    .iter()
                    .any(|o| o.side == a.side && o.price == a.price && o.quantity > a.quantity)
            })
            .count()
    }
}

/// Filters candidates against available balance.
#[derive(Debug, Clone)]
pub struct BudgetAdjuster {
    mode: BudgetMode,
    lot_size: Decimal,
}

impl BudgetAdjuster {
    pub fn new(mode: BudgetMode, lot_size: Decimal) -> Self {
        Self { mode, lot_size }
    }

    /// Check each candidate's required funds against `budget`.
    pub fn adjust(&self, candidates: &[OrderCandidate], budget: &BudgetSnapshot) -> BudgetDecision {
        let mut remaining = budget.clone();
        let mut decision = BudgetDecision::default();

        for candidate in candidates {
            if !candidate.quantity.is_positive() {
                decision
                    .dropped
                    .push((candidate.clone(), DropReason::EmptyQuantity));
                continue;
            }

            let (asset, required) = candidate.required_funds();
            let available = remaining.available(asset);

            if required <= available {
                remaining.set(asset, available - required);
                decision.accepted.push(candidate.clone());
                continue;
            }

            let shortfall = DropReason::Unaffordable {
                asset: asset.to_string(),
                required,
                available,
            };

            match self.mode {
                BudgetMode::AllOrNone => {
                    debug!(
                        side = %candidate.side,
                        asset,
                        %required,
                        %available,
                        "Budget: candidate unaffordable, rejecting whole batch"
                    );
                    return Self::reject_all(candidates, candidate, shortfall);
                }
                BudgetMode::BestEffort => match self.max_affordable(candidate, available) {
                    Some(quantity) => {
                        let scaled = candidate.with_quantity(quantity);
                        let (_, locked) = scaled.required_funds();
                        remaining.set(asset, available - locked);
                        debug!(
                            side = %candidate.side,
                            from = %candidate.quantity,
                            to = %quantity,
                            "Budget: candidate scaled down"
                        );
                        decision.accepted.push(scaled);
                    }
                    None => {
                        debug!(
                            side = %candidate.side,
                            asset,
                            %required,
                            %available,
                            "Budget: candidate dropped"
                        );
                        decision.dropped.push((candidate.clone(), shortfall));
                    }
                },
            }
        }

        decision
    }

    /// Largest quantity `available` can fund, rounded down to the lot.
    fn max_affordable(&self, candidate: &OrderCandidate, available: Decimal) -> Option<Size> {
        if available <= Decimal::ZERO {
            return None;
        }
        let raw = match candidate.side {
            OrderSide::Buy => {
                if !candidate.price.is_positive() {
                    return None;
                }
                available / candidate.price.inner()
            }
            OrderSide::Sell => available,
        };

        let quantity = if self.lot_size.is_zero() {
            Size::new(raw.round_dp_with_strategy(UNLOTTED_SCALE_DP, RoundingStrategy::ToZero))
        } else {
            Size::new(raw).round_to_lot(self.lot_size)
        };

        let quantity = quantity.min(candidate.quantity);
        quantity.is_positive().then_some(quantity)
    }

    fn reject_all(
        candidates: &[OrderCandidate],
        culprit: &OrderCandidate,
        shortfall: DropReason,
    ) -> BudgetDecision {
        let mut shortfall = Some(shortfall);
        let dropped = candidates
            .iter()
            .map(|c| {
                let reason = if c == culprit { shortfall.take() } else { None };
                (c.clone(), reason.unwrap_or(DropReason::BatchRejected))
            })
            .collect();
        BudgetDecision {
            accepted: Vec::new(),
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use spreadbot_core::{Price, TradingPair};

    fn quotes() -> Vec<OrderCandidate> {
        let pair: TradingPair = "ETH-USDT".parse().unwrap();
        vec![
            OrderCandidate::maker_limit(
                pair.clone(),
                OrderSide::Buy,
                Price::new(dec!(1998)),
                Size::new(dec!(0.01)),
            ),
            OrderCandidate::maker_limit(
                pair,
                OrderSide::Sell,
                Price::new(dec!(2002)),
                Size::new(dec!(0.01)),
            ),
        ]
    }

    fn funded() -> BudgetSnapshot {
        BudgetSnapshot::new()
            .with_balance("USDT", dec!(100))
            .with_balance("ETH", dec!(1))
    }

    #[test]
    fn test_fully_funded_accepts_both() {
        for mode in [BudgetMode::AllOrNone, BudgetMode::BestEffort] {
            let decision = BudgetAdjuster::new(mode, Decimal::ZERO).adjust(&quotes(), &funded());
            assert_eq!(decision.accepted, quotes());
            assert!(decision.dropped.is_empty());
        }
    }

    #[test]
    fn test_quote_only_budget_all_or_none_accepts_nothing() {
        // Covers the bid (19.98 USDT) but holds no ETH for the ask
        let budget = BudgetSnapshot::new().with_balance("USDT", dec!(100));
        let decision =
            BudgetAdjuster::new(BudgetMode::AllOrNone, Decimal::ZERO).adjust(&quotes(), &budget);

        assert!(decision.accepted.is_empty());
        assert_eq!(decision.dropped.len(), 2);
        assert_eq!(decision.dropped[0].1, DropReason::BatchRejected);
        assert!(matches!(
            decision.dropped[1].1,
            DropReason::Unaffordable { ref asset, .. } if asset == "ETH"
        ));
    }

    #[test]
    fn test_quote_only_budget_best_effort_keeps_bid() {
        let budget = BudgetSnapshot::new().with_balance("USDT", dec!(100));
        let decision =
            BudgetAdjuster::new(BudgetMode::BestEffort, Decimal::ZERO).adjust(&quotes(), &budget);

        assert_eq!(decision.accepted.len(), 1);
        assert_eq!(decision.accepted[0].side, OrderSide::Buy);
        assert_eq!(decision.accepted[0].quantity.inner(), dec!(0.01));
        assert_eq!(decision.dropped.len(), 1);
    }

    #[test]
    fn test_best_effort_scales_down_to_affordable() {
        let budget = BudgetSnapshot::new()
            .with_balance("USDT", dec!(9.99))
            .with_balance("ETH", dec!(0.004));
        let candidates = quotes();
        let decision =
            BudgetAdjuster::new(BudgetMode::BestEffort, dec!(0.001)).adjust(&candidates, &budget);

        assert_eq!(decision.accepted.len(), 2);
        // 9.99 / 1998 = 0.005
        assert_eq!(decision.accepted[0].quantity.inner(), dec!(0.005));
        assert_eq!(decision.accepted[1].quantity.inner(), dec!(0.004));
        assert_eq!(decision.scaled_count(&candidates), 2);
        // originals untouched
        assert_eq!(candidates[0].quantity.inner(), dec!(0.01));
    }

    #[test]
    fn test_best_effort_without_lot_never_overspends() {
        let budget = BudgetSnapshot::new()
            .with_balance("USDT", dec!(10))
            .with_balance("ETH", dec!(1));
        let decision =
            BudgetAdjuster::new(BudgetMode::BestEffort, Decimal::ZERO).adjust(&quotes(), &budget);

        let (_, locked) = decision.accepted[0].required_funds();
        assert!(locked <= dec!(10));
        assert!(decision.accepted[0].quantity.inner() < dec!(0.01));
    }

    #[test]
    fn test_candidates_share_the_same_balance() {
        let pair: TradingPair = "ETH-USDT".parse().unwrap();
        let buy = |px| {
            OrderCandidate::maker_limit(
                pair.clone(),
                OrderSide::Buy,
                Price::new(px),
                Size::new(dec!(1)),
            )
        };
        let candidates = vec![buy(dec!(60)), buy(dec!(50))];
        let budget = BudgetSnapshot::new().with_balance("USDT", dec!(100));

        let all = BudgetAdjuster::new(BudgetMode::AllOrNone, Decimal::ZERO)
            .adjust(&candidates, &budget);
        assert!(all.accepted.is_empty());

        let best = BudgetAdjuster::new(BudgetMode::BestEffort, dec!(0.1))
            .adjust(&candidates, &budget);
        assert_eq!(best.accepted.len(), 2);
        assert_eq!(best.accepted[1].quantity.inner(), dec!(0.8));
    }

    #[test]
    fn test_empty_quantity_dropped() {
        let mut candidates = quotes();
        candidates[0] = candidates[0].with_quantity(Size::ZERO);
        let decision = BudgetAdjuster::new(BudgetMode::BestEffort, Decimal::ZERO)
            .adjust(&candidates, &funded());

        assert_eq!(decision.accepted.len(), 1);
        assert_eq!(decision.dropped[0].1, DropReason::EmptyQuantity);
    }
}
