//! Minor-unit money values.
//!
//! Amounts are stored in cents to keep arithmetic exact. The collaborator
//! speaks decimal major units on the wire (`45.5` meaning $45.50), so the
//! serde representation converts at the boundary and accepts integer or
//! float JSON numbers.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Largest wire amount accepted when converting from a decimal number.
///
/// Beyond this, `f64` can no longer represent cents exactly, so the value
/// is rejected rather than silently rounded.
const MAX_WIRE_CENTS: f64 = 9_007_199_254_740_992.0; // 2^53

/// Error produced when a wire amount cannot become a [`Money`] value.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MoneyError {
    /// The amount was negative, NaN, or infinite.
    #[error("monetary amount {0} is not representable")]
    InvalidAmount(f64),
    /// The amount exceeds the exactly-representable range.
    #[error("monetary amount {0} overflows the supported range")]
    Overflow(f64),
}

/// Money stored in minor units (cents) to avoid floating point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(u64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a value from a cent count.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Converts a decimal major-unit amount as the collaborator emits it.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidAmount`] for negative or non-finite
    /// input and [`MoneyError::Overflow`] for amounts too large to hold
    /// exact cents.
    pub fn from_major_units(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() || value < 0.0 {
            return Err(MoneyError::InvalidAmount(value));
        }
        let cents = (value * 100.0).round();
        if cents > MAX_WIRE_CENTS {
            return Err(MoneyError::Overflow(value));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(cents as u64))
    }

    /// Returns the amount in major units for display and wire encoding.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_major_units(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Checked subtraction; `None` when `other` exceeds `self`.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Subtraction clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Sums an iterator of amounts, `None` on overflow.
    pub fn checked_total<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.as_major_units())
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_major_units())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Self::from_major_units(raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn converts_decimal_major_units_to_cents() {
        let money = Money::from_major_units(45.5).unwrap();
        assert_eq!(money.cents(), 4550);
    }

    #[test]
    fn rounds_sub_cent_amounts() {
        let money = Money::from_major_units(10.005).unwrap();
        assert_eq!(money.cents(), 1001);
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        assert!(matches!(
            Money::from_major_units(-1.0),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert!(matches!(
            Money::from_major_units(f64::NAN),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert!(matches!(
            Money::from_major_units(f64::INFINITY),
            Err(MoneyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn checked_arithmetic_guards_overflow() {
        let max = Money::from_cents(u64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(100).checked_sub(Money::from_cents(150)),
            None
        );
        assert_eq!(
            Money::from_cents(100).saturating_sub(Money::from_cents(150)),
            Money::ZERO
        );
    }

    #[test]
    fn totals_an_iterator_of_amounts() {
        let total = Money::checked_total([
            Money::from_cents(1000),
            Money::from_cents(2550),
            Money::from_cents(50),
        ])
        .unwrap();
        assert_eq!(total, Money::from_cents(3600));
    }

    #[test]
    fn deserializes_integer_and_float_json_numbers() {
        let from_int: Money = serde_json::from_str("45").unwrap();
        let from_float: Money = serde_json::from_str("45.5").unwrap();
        assert_eq!(from_int, Money::from_cents(4500));
        assert_eq!(from_float, Money::from_cents(4550));
    }

    #[test]
    fn serializes_as_decimal_major_units() {
        let json = serde_json::to_string(&Money::from_cents(4550)).unwrap();
        assert_eq!(json, "45.5");
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Money::from_cents(4550).to_string(), "45.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }
}
