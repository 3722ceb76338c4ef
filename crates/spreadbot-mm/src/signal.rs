//! Pluggable signal inputs for spread selection.
//!
//! Indicator computation (candles, momentum, volatility) lives outside this
//! crate. A [`SignalSource`] hands over its latest values and a
//! [`SpreadModel`] maps `(base spread, signals) -> spread`.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::quote_engine::Spread;

/// Latest auxiliary signal values. Missing values leave the spread alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Directional trend in [-1, 1]. Positive = rising.
    pub momentum: Option<Decimal>,
    /// Recent volatility in basis points.
    pub volatility_bps: Option<Decimal>,
    /// Inventory position as a fraction of the maximum, in [-1, 1].
    /// Positive = long.
    pub inventory_skew: Option<Decimal>,
}

/// Capability that supplies the latest signals.
pub trait SignalSource: Send + Sync {
    fn latest_signals(&self) -> SignalSnapshot;
}

/// Source with no signals; the base spread is used unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignals;

impl SignalSource for NoSignals {
    fn latest_signals(&self) -> SignalSnapshot {
        SignalSnapshot::default()
    }
}

/// Latest values published by an external indicator feed.
#[derive(Debug, Default)]
pub struct SharedSignals {
    latest: RwLock<SignalSnapshot>,
}

impl SharedSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current values.
    pub fn publish(&self, snapshot: SignalSnapshot) {
        *self.latest.write() = snapshot;
    }
}

impl SignalSource for SharedSignals {
    fn latest_signals(&self) -> SignalSnapshot {
        self.latest.read().clone()
    }
}

/// Pure mapping from the base spread and signals to this cycle's spread.
pub trait SpreadModel: Send + Sync {
    fn derive(&self, base: Spread, signals: &SignalSnapshot) -> Spread;
}

/// Ignores signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSpread;

impl SpreadModel for FixedSpread {
    fn derive(&self, base: Spread, _signals: &SignalSnapshot) -> Spread {
        base
    }
}

/// Skews and widens the base spread from inventory, momentum and volatility.
#[derive(Debug, Clone)]
pub struct SignalSkewSpread {
    pub inventory_skew_factor: Decimal,
    pub momentum_skew_factor: Decimal,
    pub volatility_floor_bps: Decimal,
    pub volatility_widen_factor: Decimal,
    pub max_spread: Decimal,
}

impl SignalSkewSpread {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            inventory_skew_factor: config.inventory_skew_factor,
            momentum_skew_factor: config.momentum_skew_factor,
            volatility_floor_bps: config.volatility_floor_bps,
            volatility_widen_factor: config.volatility_widen_factor,
            max_spread: config.max_spread,
        }
    }
}

fn clamp_unit(v: Decimal) -> Decimal {
    v.max(dec!(-1)).min(dec!(1))
}

impl SpreadModel for SignalSkewSpread {
    fn derive(&self, base: Spread, signals: &SignalSnapshot) -> Spread {
        let mut bid = base.bid;
        let mut ask = base.ask;

        // Long inventory: widen bid (buy less eagerly), tighten ask
        if let Some(inv) = signals.inventory_skew {
            let skew = self.inventory_skew_factor * clamp_unit(inv);
            bid *= Decimal::ONE + skew;
            ask *= Decimal::ONE - skew;
        }

        // Rising market: tighten ask (sell into strength), widen bid
        if let Some(momentum) = signals.momentum {
            let skew = self.momentum_skew_factor * clamp_unit(momentum);
            bid *= Decimal::ONE + skew;
            ask *= Decimal::ONE - skew;
        }

        if let Some(vol) = signals.volatility_bps {
            if self.volatility_floor_bps > Decimal::ZERO && vol > self.volatility_floor_bps {
                let excess = (vol - self.volatility_floor_bps) / self.volatility_floor_bps;
                let widen = Decimal::ONE + self.volatility_widen_factor * excess;
                bid *= widen;
                ask *= widen;
            }
        }

        Spread::new(bid, ask).clamp(self.max_spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SignalSkewSpread {
        SignalSkewSpread::from_config(&StrategyConfig::default())
    }

    #[test]
    fn test_fixed_spread_ignores_signals() {
        let base = Spread::symmetric(dec!(0.001));
        let signals = SignalSnapshot {
            momentum: Some(dec!(1)),
            volatility_bps: Some(dec!(500)),
            inventory_skew: Some(dec!(-1)),
        };
        assert_eq!(FixedSpread.derive(base, &signals), base);
    }

    #[test]
    fn test_shared_signals_returns_last_published() {
        let shared = SharedSignals::new();
        assert_eq!(shared.latest_signals(), SignalSnapshot::default());

        let snapshot = SignalSnapshot {
            momentum: Some(dec!(0.2)),
            ..Default::default()
        };
        shared.publish(snapshot.clone());
        assert_eq!(shared.latest_signals(), snapshot);
    }

    #[test]
    fn test_no_signals_keeps_base() {
        let base = Spread::new(dec!(0.001), dec!(0.002));
        assert_eq!(model().derive(base, &NoSignals.latest_signals()), base);
    }

    #[test]
    fn test_short_inventory_widens_ask() {
        let base = Spread::symmetric(dec!(0.001));
        let signals = SignalSnapshot {
            inventory_skew: Some(dec!(-0.5)),
            ..Default::default()
        };
        let spread = model().derive(base, &signals);
        // skew = 0.3 * -0.5 = -0.15
        assert_eq!(spread.bid, dec!(0.00085));
        assert_eq!(spread.ask, dec!(0.00115));
    }

    #[test]
    fn test_momentum_is_clamped() {
        let base = Spread::symmetric(dec!(0.001));
        let strong = SignalSnapshot {
            momentum: Some(dec!(7)),
            ..Default::default()
        };
        let unit = SignalSnapshot {
            momentum: Some(dec!(1)),
            ..Default::default()
        };
        assert_eq!(model().derive(base, &strong), model().derive(base, &unit));
        assert_eq!(model().derive(base, &unit).ask, dec!(0.0007));
    }

    #[test]
    fn test_volatility_widens_both_sides_above_floor() {
        let base = Spread::symmetric(dec!(0.001));
        let calm = SignalSnapshot {
            volatility_bps: Some(dec!(8)),
            ..Default::default()
        };
        assert_eq!(model().derive(base, &calm), base);

        let wild = SignalSnapshot {
            volatility_bps: Some(dec!(30)),
            ..Default::default()
        };
        // excess = (30 - 10) / 10 = 2, widen = 1 + 0.5 * 2 = 2
        let spread = model().derive(base, &wild);
        assert_eq!(spread, Spread::symmetric(dec!(0.002)));
    }

    #[test]
    fn test_result_clamped_to_max_spread() {
        let base = Spread::symmetric(dec!(0.04));
        let signals = SignalSnapshot {
            volatility_bps: Some(dec!(1000)),
            ..Default::default()
        };
        let spread = model().derive(base, &signals);
        assert_eq!(spread, Spread::symmetric(dec!(0.05)));
    }
}
