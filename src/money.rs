//! Monetary amounts.
//!
//! Prices and budgets are held as whole cents so that totals are exact
//! sums and never drift the way repeated floating point additions do.
//! On the wire an amount is a plain decimal number (`49.99`).
//!
//! Amounts are bounded by [`Money::MAX`] in either direction.  Anything
//! that arrives from outside goes through [`Money::try_from_decimal`],
//! and arithmetic saturates, so sums and tolerances never overflow.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Largest magnitude, in cents, of an accepted amount.
const MAX_CENTS: i64 = 1_000_000_000_000_000;

/// An amount of money in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// Largest amount accepted from the outside (ten trillion).
    pub const MAX: Money = Money(MAX_CENTS);

    /// Create an amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Create an amount from a decimal value, rounding to the nearest cent.
    ///
    /// ```
    /// use pcbuild_engine::money::Money;
    /// assert_eq!(Money::from_decimal(49.99).cents(), 4999);
    /// ```
    ///
    /// Values beyond [`Money::MAX`] are clamped; use
    /// [`Money::try_from_decimal`] for untrusted input.
    pub fn from_decimal(amount: f64) -> Self {
        let cents = (amount * 100.0).round() as i64;
        Money(cents.clamp(-MAX_CENTS, MAX_CENTS))
    }

    /// Like [`Money::from_decimal`], but `None` for non-finite values and
    /// values whose magnitude exceeds [`Money::MAX`].
    ///
    /// ```
    /// use pcbuild_engine::money::Money;
    /// assert_eq!(Money::try_from_decimal(1e13), Some(Money::MAX));
    /// assert_eq!(Money::try_from_decimal(1e17), None);
    /// ```
    pub fn try_from_decimal(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        if !cents.is_finite() || cents.abs() > MAX_CENTS as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scale by a fraction (a weight or tolerance), rounding to the nearest cent.
    pub fn scale(self, factor: f64) -> Money {
        Money((self.0 as f64 * factor).round() as i64)
    }

    /// Difference that never goes below zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::try_from_decimal(amount).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "amount must be a finite number no larger than {}, got {amount}",
                Money::MAX
            ))
        })
    }
}
