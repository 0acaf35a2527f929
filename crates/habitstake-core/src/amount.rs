//! Token amounts in the ledger's smallest unit.
//!
//! Amounts are integers end to end. Conversion to a decimal string happens
//! only at presentation boundaries via [`Amount::format_units`] and
//! [`Amount::parse_units`].

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Decimals of the HTK reward token.
pub const TOKEN_DECIMALS: u32 = 18;

/// A non-negative token quantity in the smallest ledger unit.
///
/// Held in a `u128`. The ledger stores 256-bit integers; values at or above
/// 2^128 smallest units are not representable and fail to deserialize.
///
/// Serialized as a decimal string of smallest units, the way ledger
/// JSON-RPC responses carry 256-bit integers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Create from a raw smallest-unit quantity.
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Whole tokens at [`TOKEN_DECIMALS`].
    pub const fn tokens(whole: u64) -> Self {
        Self(whole as u128 * 10u128.pow(TOKEN_DECIMALS))
    }

    /// A fraction of one token: `numerator / 10^scale` tokens.
    ///
    /// `Amount::token_fraction(2, 2)` is 0.02 tokens.
    pub const fn token_fraction(numerator: u64, scale: u32) -> Self {
        Self(numerator as u128 * 10u128.pow(TOKEN_DECIMALS - scale))
    }

    /// The raw smallest-unit quantity.
    pub const fn units(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Multiply by a plain count, saturating at the numeric maximum.
    pub fn saturating_mul(self, count: u64) -> Self {
        Self(self.0.saturating_mul(count as u128))
    }

    /// Render as a decimal token string with trailing zeros trimmed.
    ///
    /// `1_500_000_000_000_000_000` at 18 decimals renders as `"1.5"`.
    ///
    /// Past 38 decimals every representable amount is below one whole unit.
    pub fn format_units(&self, decimals: u32) -> String {
        let (whole, frac) = match 10u128.checked_pow(decimals) {
            Some(scale) => (self.0 / scale, self.0 % scale),
            None => (0, self.0),
        };
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:0width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }

    /// Parse a decimal token string into smallest units.
    pub fn parse_units(s: &str, decimals: u32) -> Result<Self, CoreError> {
        let s = s.trim();
        let invalid = || CoreError::InvalidAmount(s.to_string());

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac.len() > decimals as usize {
            return Err(CoreError::InvalidAmount(format!(
                "{} has more than {} fractional digits",
                s, decimals
            )));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let whole_units = if whole == 0 {
            0
        } else {
            10u128
                .checked_pow(decimals)
                .and_then(|scale| whole.checked_mul(scale))
                .ok_or_else(invalid)?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            10u128
                .checked_pow(decimals - frac.len() as u32)
                .and_then(|padded| frac.parse::<u128>().ok()?.checked_mul(padded))
                .ok_or_else(invalid)?
        };

        whole_units
            .checked_add(frac_units)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// [`Amount::format_units`] at [`TOKEN_DECIMALS`].
    pub fn to_token_string(&self) -> String {
        self.format_units(TOKEN_DECIMALS)
    }

    /// [`Amount::parse_units`] at [`TOKEN_DECIMALS`].
    pub fn from_token_str(s: &str) -> Result<Self, CoreError> {
        Self::parse_units(s, TOKEN_DECIMALS)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} HTK", self.to_token_string())
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    /// Parse a raw smallest-unit integer string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|_| CoreError::InvalidAmount(s.to_string()))
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tokens_and_fractions() {
        assert_eq!(Amount::tokens(1).units(), 1_000_000_000_000_000_000);
        assert_eq!(Amount::token_fraction(2, 2).units(), 20_000_000_000_000_000);
    }

    #[test]
    fn test_units_beyond_u128_scale() {
        assert_eq!(
            Amount::tokens(1).format_units(39),
            format!("0.{}1", "0".repeat(20))
        );
        assert_eq!(Amount::ZERO.format_units(100), "0");

        assert!(Amount::parse_units("1", 39).is_err());
        assert!(Amount::parse_units("1", 200).is_err());
        assert!(Amount::parse_units("0.5", 39).is_err());
        assert_eq!(
            Amount::parse_units("0.1", 39).unwrap(),
            Amount::from_units(10u128.pow(38))
        );
        assert_eq!(Amount::parse_units("0", 39).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(Amount::ZERO.to_token_string(), "0");
        assert_eq!(Amount::tokens(10).to_token_string(), "10");
        assert_eq!(Amount::from_units(1_500_000_000_000_000_000).to_token_string(), "1.5");
        assert_eq!(Amount::from_units(1).to_token_string(), "0.000000000000000001");
        assert_eq!(Amount::from_units(1234).format_units(2), "12.34");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(Amount::from_token_str("1.5").unwrap().units(), 1_500_000_000_000_000_000);
        assert_eq!(Amount::from_token_str(".5").unwrap(), Amount::token_fraction(5, 1));
        assert_eq!(Amount::from_token_str("7.").unwrap(), Amount::tokens(7));
        assert_eq!(Amount::parse_units("12.34", 2).unwrap().units(), 1234);
    }

    #[test]
    fn test_parse_units_rejects_bad_input() {
        for bad in ["", ".", "-1", "+1", "1.2.3", "abc", "1e18", "0.0000000000000000001"] {
            assert!(Amount::from_token_str(bad).is_err(), "accepted {:?}", bad);
        }
        assert!(Amount::parse_units("340282366920938463463374607431768211456", 0).is_err());
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&Amount::tokens(2)).unwrap();
        assert_eq!(json, "\"2000000000000000000\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::tokens(2));
        assert!(serde_json::from_str::<Amount>("\"-5\"").is_err());
        // 2^128 smallest units.
        assert!(serde_json::from_str::<Amount>("\"340282366920938463463374607431768211456\"").is_err());
    }

    proptest! {
        #[test]
        fn test_format_then_parse_is_identity(units in any::<u128>()) {
            let amount = Amount::from_units(units);
            let parsed = Amount::from_token_str(&amount.to_token_string()).unwrap();
            prop_assert_eq!(parsed, amount);
        }
    }
}
