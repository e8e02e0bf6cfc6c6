//! Money in integer minor currency units
//!
//! Every amount in the system is stored and summed as an `i64` count of minor
//! units (cents). Major units only appear at presentation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Number of minor units in one major unit
pub const MINOR_PER_MAJOR: i64 = 100;

/// An amount of money in minor units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Create from a minor-unit count
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Minor-unit count
    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiply by a line quantity, `None` on overflow
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Value in major units as a float (for JSON presentation)
    pub fn to_major(self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    /// Fixed two-decimal rendering in major units, e.g. `25.00`
    ///
    /// Uses integer arithmetic so the output is exact.
    pub fn format_major(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        format!("{}{}.{:02}", sign, abs / per, abs % per)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_major())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_major() {
        assert_eq!(Money::from_minor(2500).format_major(), "25.00");
        assert_eq!(Money::from_minor(5).format_major(), "0.05");
        assert_eq!(Money::from_minor(-1234).format_major(), "-12.34");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_checked_mul() {
        assert_eq!(Money::from_minor(1000).checked_mul(2), Some(Money::from_minor(2000)));
        assert_eq!(Money::from_minor(i64::MAX).checked_mul(2), None);
    }

    #[test]
    fn test_sum_and_serde() {
        let total: Money = [Money::from_minor(1000), Money::from_minor(500)].iter().sum();
        assert_eq!(total.minor(), 1500);
        assert_eq!(serde_json::to_string(&total).unwrap(), "1500");
        assert_eq!(total.to_major(), 15.0);
    }
}
