//! Exact monetary amounts.
//!
//! GnuCash stores split values as rationals (`"12345/100"`). They are
//! converted once into a `rust_decimal::Decimal` so that running balances
//! over thousands of postings never drift.

use crate::error::AmountError;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg};
use std::str::FromStr;

/// A signed, exact decimal amount.
///
/// Positive values are debits and negative values are credits, following
/// GnuCash's sign convention for split values.
///
/// Parsed amounts never exceed `i64::MAX` in magnitude, the largest
/// numerator GnuCash can store, so sums over any realistic number of
/// postings stay within `Decimal` range.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use gnucash_ledger::Amount;
///
/// let amount = Amount::from_str("-12345/100").unwrap();
/// assert_eq!(amount.to_string(), "-123.45");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Amount(Decimal::ZERO);

    /// Parses a GnuCash `numerator/denominator` rational.
    pub fn from_rational(text: &str) -> Result<Self, AmountError> {
        let invalid = || AmountError::Invalid(text.to_string());
        let (num, denom) = text.trim().split_once('/').ok_or_else(invalid)?;
        let num = Decimal::from_str(num.trim()).map_err(|_| invalid())?;
        let denom = Decimal::from_str(denom.trim()).map_err(|_| invalid())?;
        if denom.is_zero() {
            return Err(AmountError::ZeroDenominator(text.to_string()));
        }
        let value = num.checked_div(denom).ok_or_else(invalid)?;
        Amount::bounded(value, text)
    }

    fn bounded(value: Decimal, text: &str) -> Result<Self, AmountError> {
        if value.abs() > Decimal::from(i64::MAX) {
            return Err(AmountError::OutOfRange(text.to_string()));
        }
        Ok(Amount(value))
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Amount(self.0.abs())
    }

    /// Rounds to `places` decimal places and pads to exactly that many.
    pub fn to_fixed(&self, places: u32) -> String {
        let mut rounded = self.0.round_dp(places);
        rounded.rescale(places);
        rounded.to_string()
    }
}

/// Accepts both GnuCash rationals and plain decimals (`"1.50"`).
impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.contains('/') {
            return Amount::from_rational(trimmed);
        }
        let value = Decimal::from_str(trimmed).map_err(|_| AmountError::Invalid(s.to_string()))?;
        Amount::bounded(value, s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + *a)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_fixed(2))
    }
}
