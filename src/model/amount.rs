//! Monetary values.
//!
//! The input workbook mostly stores bare numbers, but amounts copied in by
//! hand sometimes carry a trailing euro sign or thousands separators. The
//! `Amount` type wraps `Decimal` and keeps track of how the value was
//! formatted so it can be written back the same way.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents how an amount was (or should be) formatted.
///
/// # Examples
///  - `AmountFormat{ euro: true, commas: true }` -> `-60,000.00 €`
///  - `AmountFormat{ euro: false, commas: true }` -> `-60,000.00`
///  - `AmountFormat{ euro: false, commas: false }` -> `-60000.00`
///  - `AmountFormat{ euro: true, commas: false }` -> `-60000.00 €`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountFormat {
    /// Whether a trailing euro sign is present in the formatting.
    euro: bool,
    /// Whether commas are present as thousands separators in the formatting.
    commas: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        DEFAULT_FORMAT
    }
}

/// The default format is a bare number, the way calculated cells are stored.
const DEFAULT_FORMAT: AmountFormat = AmountFormat {
    euro: false,
    commas: false,
};

/// A euro amount.
///
/// Formatting is considered significant for the purposes of equality, so for
/// numeric comparisons access the `Decimal` value and compare that.
///
/// ```
/// # use nebenkosten::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("-5000.00").unwrap();
/// let b = Amount::from_str("-5,000.00 €").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value.
    value: Decimal,
    /// The way the value was parsed from, or should be written to, a `String`.
    format: AmountFormat,
}

impl Amount {
    /// Creates a new Amount from a Decimal value with default formatting.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            format: DEFAULT_FORMAT,
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.value().is_sign_negative()
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        // Strip a trailing euro sign if present.
        let (without_euro, euro) = match trimmed.strip_suffix('€') {
            Some(rest) => (rest.trim_end(), true),
            None => (trimmed, false),
        };

        // Remove commas (thousands separators).
        let without_commas = without_euro.replace(',', "");
        let commas = without_commas.len() < without_euro.len();

        let value = Decimal::from_str(&without_commas)
            .map_err(|e| anyhow::anyhow!("'{s}' is not an amount: {e}"))?;
        Ok(Amount {
            value,
            format: AmountFormat { euro, commas },
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, num) = if self.is_negative() && !self.is_zero() {
            (String::from("-"), self.value().abs())
        } else {
            (String::new(), self.value())
        };

        let suffix = if self.format.euro { " €" } else { "" };

        if self.format.commas {
            write!(
                f,
                "{sign}{}{suffix}",
                format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
            )
        } else {
            write!(f, "{sign}{num}{suffix}")
        }
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_number() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_parse_with_euro_sign() {
        let amount = Amount::from_str("50.00 €").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
        assert_eq!(amount.to_string(), "50.00 €");
    }

    #[test]
    fn test_parse_negative() {
        let amount = Amount::from_str("-50.00").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("-50.00").unwrap());
        assert!(amount.is_negative());
    }

    #[test]
    fn test_parse_empty_string() {
        let amount = Amount::from_str("").unwrap();
        assert_eq!(amount.value(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  50.00 €  ").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_parse_with_commas() {
        let amount = Amount::from_str("1,234,567.89").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("1234567.89").unwrap());
        assert_eq!(amount.to_string(), "1,234,567.89");
    }

    #[test]
    fn test_display_retains_format() {
        let s = "-1,000,000.00 €";
        let amount = Amount::from_str(s).unwrap();
        assert_eq!(amount.to_string(), s);
    }

    #[test]
    fn test_equality_is_format_sensitive() {
        let a1 = Amount::from_str("50.00 €").unwrap();
        let a2 = Amount::from_str("50.00").unwrap();
        assert_ne!(a1, a2);
        assert_eq!(a1.value(), a2.value());
    }

    #[test]
    fn test_serde_round_trip() {
        let amount = Amount::from_str("42.50 €").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"42.50 €\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(Amount::from_str("abc").is_err());
        assert!(Amount::from_str("€").is_err());
    }
}
