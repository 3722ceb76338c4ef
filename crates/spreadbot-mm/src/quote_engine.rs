//! Quote price calculation engine.
//!
//! Computes bid/ask candidates from:
//! - Reference price (quoting midpoint)
//! - Spread (fractional offsets, optionally derived from signals)
//! - Fixed order quantity

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use spreadbot_core::{OrderCandidate, OrderSide, Price, Size, TradingPair};

use crate::config::StrategyConfig;
use crate::signal::{FixedSpread, NoSignals, SignalSnapshot, SignalSource, SpreadModel};

/// Fractional offsets applied multiplicatively to the reference price.
///
/// `bid = ref * (1 - bid)`, `ask = ref * (1 + ask)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spread {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Spread {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }

    /// Same offset on both sides.
    pub fn symmetric(offset: Decimal) -> Self {
        Self::new(offset, offset)
    }

    /// Clamp both sides into `[0, max]`.
    #[must_use]
    pub fn clamp(self, max: Decimal) -> Self {
        Self {
            bid: self.bid.max(Decimal::ZERO).min(max),
            ask: self.ask.max(Decimal::ZERO).min(max),
        }
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bid={} ask={}", self.bid, self.ask)
    }
}

/// Bid and ask candidates for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePair {
    pub bid: OrderCandidate,
    pub ask: OrderCandidate,
}

impl QuotePair {
    /// Candidates in submission order (bid first).
    pub fn into_candidates(self) -> Vec<OrderCandidate> {
        vec![self.bid, self.ask]
    }
}

/// Calculate maker quotes around a reference price.
///
/// Returns `None` when the reference price is not positive or the spread
/// would push the bid to zero or below; the caller then quotes nothing.
///
/// # Arguments
/// * `pair` - Pair being quoted
/// * `reference_price` - Quoting midpoint
/// * `spread` - Fractional offsets
/// * `quantity` - Size of each quote in base units
/// * `price_tick` - Tick size (bid rounds down, ask rounds up). Zero disables.
pub fn compute_quotes(
    pair: &TradingPair,
    reference_price: Price,
    spread: Spread,
    quantity: Size,
    price_tick: Decimal,
) -> Option<QuotePair> {
    if !reference_price.is_positive() || !quantity.is_positive() {
        return None;
    }

    let reference = reference_price.inner();
    let bid_price =
        Price::new(reference * (Decimal::ONE - spread.bid)).floor_to_tick(price_tick);
    let ask_price =
        Price::new(reference * (Decimal::ONE + spread.ask)).ceil_to_tick(price_tick);

    if !bid_price.is_positive() {
        return None;
    }

    Some(QuotePair {
        bid: OrderCandidate::maker_limit(pair.clone(), OrderSide::Buy, bid_price, quantity),
        ask: OrderCandidate::maker_limit(pair.clone(), OrderSide::Sell, ask_price, quantity),
    })
}

/// Result of one quoting decision.
#[derive(Debug, Clone)]
pub struct Quote {
    /// Spread actually used after signal adjustment.
    pub spread: Spread,
    /// Candidates, or `None` when nothing can be quoted.
    pub pair: Option<QuotePair>,
}

/// Quote policy: base spread, pluggable signal source and spread model.
pub struct QuotePolicy {
    pair: TradingPair,
    config: StrategyConfig,
    signals: Arc<dyn SignalSource>,
    model: Arc<dyn SpreadModel>,
}

impl QuotePolicy {
    /// Policy with the configured fixed spread and no signals.
    pub fn new(pair: TradingPair, config: StrategyConfig) -> Self {
        Self::with_signals(pair, config, Arc::new(NoSignals), Arc::new(FixedSpread))
    }

    /// Policy with an injected signal source and spread model.
    pub fn with_signals(
        pair: TradingPair,
        config: StrategyConfig,
        signals: Arc<dyn SignalSource>,
        model: Arc<dyn SpreadModel>,
    ) -> Self {
        Self {
            pair,
            config,
            signals,
            model,
        }
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Spread for this cycle, from the base spread and the latest signals.
    ///
    /// Bounding signal adjustments is the model's job; the configured base
    /// spread passes through [`FixedSpread`] unchanged.
    pub fn current_spread(&self) -> Spread {
        let signals: SignalSnapshot = self.signals.latest_signals();
        self.model.derive(self.config.base_spread(), &signals)
    }

    /// Produce this cycle's candidates for a reference price.
    pub fn quote(&self, reference_price: Price) -> Quote {
        let spread = self.current_spread();
        let quantity = Size::new(self.config.order_amount).round_to_lot(self.config.lot_size);
        let pair = compute_quotes(
            &self.pair,
            reference_price,
            spread,
            quantity,
            self.config.price_tick,
        );

        if let Some(ref q) = pair {
            debug!(
                pair = %self.pair,
                reference = %reference_price,
                spread = %spread,
                bid = %q.bid.price,
                ask = %q.ask.price,
                quantity = %quantity,
                "Quotes computed"
            );
        }

        Quote { spread, pair }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalSkewSpread;
    use rust_decimal_macros::dec;

    fn eth_usdt() -> TradingPair {
        "ETH-USDT".parse().unwrap()
    }

    struct StaticSignals(SignalSnapshot);

    impl SignalSource for StaticSignals {
        fn latest_signals(&self) -> SignalSnapshot {
            self.0.clone()
        }
    }

    #[test]
    fn test_reference_scenario() {
        let quotes = compute_quotes(
            &eth_usdt(),
            Price::new(dec!(2000)),
            Spread::symmetric(dec!(0.001)),
            Size::new(dec!(0.01)),
            Decimal::ZERO,
        )
        .unwrap();

        assert_eq!(quotes.bid.price.inner(), dec!(1998.0));
        assert_eq!(quotes.ask.price.inner(), dec!(2002.0));
        assert_eq!(quotes.bid.side, OrderSide::Buy);
        assert_eq!(quotes.ask.side, OrderSide::Sell);
        assert_eq!(quotes.bid.quantity, quotes.ask.quantity);
        assert!(quotes.bid.is_maker && quotes.ask.is_maker);
    }

    #[test]
    fn test_bid_below_reference_below_ask() {
        let pair = eth_usdt();
        let prices = [dec!(0.0001), dec!(1), dec!(1998.37), dec!(65000.5)];
        let spreads = [dec!(0), dec!(0.0005), dec!(0.01), dec!(0.5), dec!(0.999)];

        for p in prices {
            for b in spreads {
                for a in spreads {
                    let Some(q) = compute_quotes(
                        &pair,
                        Price::new(p),
                        Spread::new(b, a),
                        Size::new(dec!(1)),
                        Decimal::ZERO,
                    ) else {
                        panic!("no quotes for p={p} b={b} a={a}");
                    };
                    assert!(q.bid.price.inner() <= p);
                    assert!(p <= q.ask.price.inner());
                    assert_eq!(q.bid.price.inner(), p * (dec!(1) - b));
                    assert_eq!(q.ask.price.inner(), p * (dec!(1) + a));
                }
            }
        }
    }

    #[test]
    fn test_no_quotes_without_positive_reference() {
        let pair = eth_usdt();
        let spread = Spread::symmetric(dec!(0.001));
        let qty = Size::new(dec!(0.01));

        assert!(compute_quotes(&pair, Price::ZERO, spread, qty, Decimal::ZERO).is_none());
        assert!(compute_quotes(&pair, Price::new(dec!(-5)), spread, qty, Decimal::ZERO).is_none());
        assert!(compute_quotes(&pair, Price::new(dec!(100)), spread, Size::ZERO, Decimal::ZERO)
            .is_none());
    }

    #[test]
    fn test_tick_rounding_keeps_quotes_outside_reference() {
        let quotes = compute_quotes(
            &eth_usdt(),
            Price::new(dec!(2000.03)),
            Spread::symmetric(dec!(0.001)),
            Size::new(dec!(0.01)),
            dec!(0.1),
        )
        .unwrap();

        // raw bid 1998.02997, raw ask 2002.03003
        assert_eq!(quotes.bid.price.inner(), dec!(1998.0));
        assert_eq!(quotes.ask.price.inner(), dec!(2002.1));
    }

    #[test]
    fn test_policy_uses_configured_spread_without_signals() {
        let policy = QuotePolicy::new(eth_usdt(), StrategyConfig::default());
        let quote = policy.quote(Price::new(dec!(2000)));

        assert_eq!(quote.spread, Spread::symmetric(dec!(0.001)));
        let q = quote.pair.unwrap();
        assert_eq!(q.bid.price.inner(), dec!(1998));
        assert_eq!(q.ask.quantity.inner(), dec!(0.01));
    }

    #[test]
    fn test_policy_applies_signal_model() {
        let config = StrategyConfig::default();
        let signals = SignalSnapshot {
            inventory_skew: Some(dec!(1)),
            ..Default::default()
        };
        let policy = QuotePolicy::with_signals(
            eth_usdt(),
            config.clone(),
            Arc::new(StaticSignals(signals)),
            Arc::new(SignalSkewSpread::from_config(&config)),
        );

        let spread = policy.current_spread();
        // Long inventory: bid 0.001 * 1.3, ask 0.001 * 0.7
        assert_eq!(spread.bid, dec!(0.0013));
        assert_eq!(spread.ask, dec!(0.0007));
    }

    #[test]
    fn test_policy_keeps_wide_configured_spread() {
        let config = StrategyConfig {
            bid_spread: dec!(0.08),
            ask_spread: dec!(0.08),
            ..Default::default()
        };
        assert!(config.bid_spread > config.max_spread);

        let quote = QuotePolicy::new(eth_usdt(), config).quote(Price::new(dec!(2000)));
        assert_eq!(quote.spread, Spread::symmetric(dec!(0.08)));
        let q = quote.pair.unwrap();
        assert_eq!(q.bid.price.inner(), dec!(1840));
        assert_eq!(q.ask.price.inner(), dec!(2160));
    }

    #[test]
    fn test_policy_lot_rounds_quantity() {
        let config = StrategyConfig {
            order_amount: dec!(0.0123),
            lot_size: dec!(0.01),
            ..Default::default()
        };
        let policy = QuotePolicy::new(eth_usdt(), config);
        let q = policy.quote(Price::new(dec!(2000))).pair.unwrap();
        assert_eq!(q.bid.quantity.inner(), dec!(0.01));
    }
}
