//! Type-safe price representation using decimal arithmetic.
//!
//! Every amount handled by the catalog and order services is a [`Price`]:
//! non-negative, with exactly two decimal places. The currency is a store-wide
//! setting ([`CurrencyCode`]) and is only used for display.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("amount must not be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("amount must have at most 2 decimal places (got {scale})")]
    TooPrecise {
        /// Scale of the rejected amount.
        scale: u32,
    },
    /// The amount does not fit the target column.
    #[error("amount must not be greater than {max}")]
    TooLarge {
        /// Largest accepted amount.
        max: Decimal,
    },
}

/// A monetary amount with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Number of decimal places stored for every amount.
    pub const SCALE: u32 = 2;

    /// Largest amount a product price column holds (`NUMERIC(10,2)`).
    pub const MAX_PRODUCT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Largest amount an order total column holds (`NUMERIC(8,2)`).
    pub const MAX_ORDER: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

    /// Create a price from a decimal amount.
    ///
    /// Trailing zeros beyond two places are accepted (`10.500` is `10.50`);
    /// significant digits beyond two places are not.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] or [`PriceError::TooPrecise`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(PriceError::TooPrecise {
                scale: normalized.scale(),
            });
        }

        let mut amount = normalized;
        amount.rescale(Self::SCALE);
        Ok(Self(amount))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), Self::SCALE))
    }

    /// Zero, with two decimal places.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Check that the amount does not exceed `max`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::TooLarge`] if it does.
    pub fn ensure_at_most(self, max: Decimal) -> Result<Self, PriceError> {
        if self.0 > max {
            return Err(PriceError::TooLarge { max });
        }
        Ok(self)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        let mut amount = self.0 * Decimal::from(quantity);
        amount.rescale(Self::SCALE);
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let mut amount = self.0 + rhs.0;
        amount.rescale(Self::SCALE);
        Self(amount)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// Amounts travel as strings ("28.00") so clients never see float rounding.
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

/// ISO 4217 currency codes supported for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    MYR,
    SGD,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display prefix used in tables and summaries.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::MYR => "RM",
            Self::SGD => "S$",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// The ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MYR => "MYR",
            Self::SGD => "SGD",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Format an amount for display, e.g. `RM 28.00`.
    #[must_use]
    pub fn format(&self, price: Price) -> String {
        format!("{} {price}", self.symbol())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MYR" => Ok(Self::MYR),
            "SGD" => Ok(Self::SGD),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_rescales_to_two_places() {
        assert_eq!(Price::new(dec("10")).unwrap().to_string(), "10.00");
        assert_eq!(Price::new(dec("10.5")).unwrap().to_string(), "10.50");
        assert_eq!(Price::new(dec("10.500")).unwrap().to_string(), "10.50");
    }

    #[test]
    fn test_new_rejects_negative() {
        assert_eq!(Price::new(dec("-0.01")), Err(PriceError::Negative));
    }

    #[test]
    fn test_new_accepts_negative_zero() {
        assert_eq!(Price::new(dec("-0")).unwrap(), Price::zero());
    }

    #[test]
    fn test_new_rejects_three_decimals() {
        assert_eq!(
            Price::new(dec("1.005")),
            Err(PriceError::TooPrecise { scale: 3 })
        );
    }

    #[test]
    fn test_ensure_at_most() {
        let price = Price::new(dec("1000000.00")).unwrap();
        assert!(price.ensure_at_most(Price::MAX_ORDER).is_err());
        assert!(price.ensure_at_most(Price::MAX_PRODUCT).is_ok());
        assert_eq!(Price::MAX_ORDER.to_string(), "999999.99");
        assert_eq!(Price::MAX_PRODUCT.to_string(), "99999999.99");
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [
            Price::from_cents(1000).times(2),
            Price::from_cents(500).times(1),
            Price::from_cents(300),
        ];
        let total: Price = lines.into_iter().sum();
        assert_eq!(total.to_string(), "28.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Price::from_cents(2800)).unwrap();
        assert_eq!(json, "\"28.00\"");
    }

    #[test]
    fn test_deserializes_from_string_and_number() {
        let from_str: Price = serde_json::from_str("\"12.3\"").unwrap();
        let from_num: Price = serde_json::from_str("12.3").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_str.to_string(), "12.30");
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }

    #[test]
    fn test_currency_format() {
        assert_eq!(CurrencyCode::MYR.format(Price::from_cents(2800)), "RM 28.00");
        assert_eq!(CurrencyCode::USD.format(Price::from_cents(5)), "$ 0.05");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("myr".parse::<CurrencyCode>().unwrap(), CurrencyCode::MYR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    proptest! {
        #[test]
        fn prop_sum_matches_cents(lines in proptest::collection::vec((0u32..100_000, 1u32..100), 0..20)) {
            let total: Price = lines
                .iter()
                .map(|&(cents, qty)| Price::from_cents(cents).times(qty))
                .sum();
            let expected: u64 = lines.iter().map(|&(c, q)| u64::from(c) * u64::from(q)).sum();
            prop_assert_eq!(total.amount(), Decimal::new(i64::try_from(expected).unwrap(), 2));
            prop_assert_eq!(total.amount().scale(), Price::SCALE);
        }
    }
}
