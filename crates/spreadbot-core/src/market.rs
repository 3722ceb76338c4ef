//! Trading pair and venue identification.
//!
//! A pair is written `BASE-QUOTE` (e.g. `ETH-USDT`). Buying consumes the
//! quote asset, selling consumes the base asset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Base/quote instrument pair being quoted.
///
/// Immutable once parsed. Serialized as its `BASE-QUOTE` string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Create a pair from its two asset symbols.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Result<Self, CoreError> {
        let base = base.into().trim().to_uppercase();
        let quote = quote.into().trim().to_uppercase();

        if base.is_empty() || quote.is_empty() {
            return Err(CoreError::InvalidPair(format!(
                "empty asset symbol in {base}-{quote}"
            )));
        }
        if base == quote {
            return Err(CoreError::InvalidPair(format!(
                "base and quote are the same asset: {base}"
            )));
        }
        if base.contains('-') || quote.contains('-') {
            return Err(CoreError::InvalidPair(format!(
                "asset symbol contains separator: {base}-{quote}"
            )));
        }

        Ok(Self { base, quote })
    }

    /// Asset received on a buy, given up on a sell.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Asset given up on a buy, received on a sell.
    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('-')
            .ok_or_else(|| CoreError::InvalidPair(format!("expected BASE-QUOTE, got {s:?}")))?;
        Self::new(base, quote)
    }
}

impl TryFrom<String> for TradingPair {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

/// Venue (exchange connector) identifier, e.g. `okx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        let pair: TradingPair = "eth-usdt".parse().unwrap();
        assert_eq!(pair.base(), "ETH");
        assert_eq!(pair.quote(), "USDT");
        assert_eq!(pair.to_string(), "ETH-USDT");
    }

    #[test]
    fn test_parse_pair_rejects_malformed() {
        assert!("ETHUSDT".parse::<TradingPair>().is_err());
        assert!("-USDT".parse::<TradingPair>().is_err());
        assert!("ETH-".parse::<TradingPair>().is_err());
        assert!("ETH-ETH".parse::<TradingPair>().is_err());
        assert!("ETH-USDT-PERP".parse::<TradingPair>().is_err());
    }

    #[test]
    fn test_pair_serde_as_string() {
        let pair = TradingPair::new("BTC", "USDC").unwrap();
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, "\"BTC-USDC\"");

        let back: TradingPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
        assert!(serde_json::from_str::<TradingPair>("\"BTCUSDC\"").is_err());
    }
}
