//! Type-safe price representation using decimal arithmetic.
//!
//! The catalog is priced in Korean won, which has no minor unit. The product
//! API sends prices as decimal strings (`"lprice": "220"`), and an empty
//! string where a price is absent (`"hprice": ""`).

use std::fmt;
use std::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A price in won.
///
/// Displays with thousands separators and the won suffix, e.g. `12,300원`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price {
    /// Amount in won.
    pub amount: Decimal,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self { amount }
    }

    /// Create a price from a whole number of won.
    #[must_use]
    pub fn won(amount: u64) -> Self {
        Self {
            amount: Decimal::from(amount),
        }
    }

    /// Price of `quantity` units, saturating at the largest representable amount.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self {
            amount: self.amount.saturating_mul(Decimal::from(quantity)),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.amount.round();
        let digits = rounded.abs().trunc().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if rounded.is_sign_negative() && !rounded.is_zero() {
            f.write_str("-")?;
        }
        write!(f, "{grouped}원")
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self {
            amount: iter.fold(Decimal::ZERO, |total, p| total.saturating_add(p.amount)),
        }
    }
}

/// Serde helper for optional prices that the API encodes as `""` when missing.
pub mod optional {
    use super::{Decimal, Deserialize, Deserializer, Price};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(Decimal),
    }

    /// Deserialize an optional price, mapping empty strings and `null` to `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty value is not a decimal number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Price>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(amount)) => Ok(Some(Price::new(amount))),
            Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Raw::Text(text)) => text
                .trim()
                .parse::<Decimal>()
                .map(|amount| Some(Price::new(amount)))
                .map_err(serde::de::Error::custom),
        }
    }

    /// Serialize an optional price as its decimal string, or `""` when missing.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(price: &Option<Price>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match price {
            Some(price) => serializer.serialize_str(&price.amount.to_string()),
            None => serializer.serialize_str(""),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::won(0).to_string(), "0원");
        assert_eq!(Price::won(220).to_string(), "220원");
        assert_eq!(Price::won(1_000).to_string(), "1,000원");
        assert_eq!(Price::won(1_234_567).to_string(), "1,234,567원");
    }

    #[test]
    fn test_display_rounds_fractions() {
        let price = Price::new(Decimal::new(12_345, 1)); // 1234.5
        assert_eq!(price.to_string(), "1,234원");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::won(220).times(3), Price::won(1_000)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::won(1_660));
    }

    #[test]
    fn test_times_and_sum_saturate() {
        let huge: Price = serde_json::from_str("\"20000000000000000000\"").unwrap();
        let line = huge.times(u32::MAX);
        assert_eq!(line.amount, Decimal::MAX);

        let total: Price = [line, line, Price::won(1)].into_iter().sum();
        assert_eq!(total.amount, Decimal::MAX);
        assert!(total.to_string().ends_with('원'));
    }

    #[test]
    fn test_deserialize_from_string() {
        let price: Price = serde_json::from_str("\"230\"").unwrap();
        assert_eq!(price, Price::won(230));
    }

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "optional::deserialize")]
        hprice: Option<Price>,
    }

    #[test]
    fn test_optional_empty_string_is_none() {
        let w: Wrapper = serde_json::from_str(r#"{"hprice": ""}"#).unwrap();
        assert_eq!(w.hprice, None);

        let w: Wrapper = serde_json::from_str(r"{}").unwrap();
        assert_eq!(w.hprice, None);

        let w: Wrapper = serde_json::from_str(r#"{"hprice": "5900"}"#).unwrap();
        assert_eq!(w.hprice, Some(Price::won(5_900)));
    }
}
