use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Number of fraction digits carried by every amount.
pub const SCALE: u32 = 2;

const MINOR_PER_MAJOR: i64 = 10i64.pow(SCALE);

/// Signed money amount represented as **integer minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (payments,
/// obligations, settlements, balances) so that folding many facts together
/// never drifts: the sum of a ledger is exact.
///
/// The value is signed:
/// - positive = the user is owed money (creditor)
/// - negative = the user owes money (debtor)
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing accepts `.` or `,` as decimal separator and rounds half-up to two
/// decimals:
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert_eq!("12.345".parse::<Money>().unwrap().minor(), 1235);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

/// Sign of an amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
    Zero,
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns the sign of the amount.
    ///
    /// Half a minor unit is the zero tolerance; since values are whole minor
    /// units, only an exact `0` falls inside it.
    #[must_use]
    pub const fn sign(self) -> Sign {
        if self.0 > 0 {
            Sign::Positive
        } else if self.0 < 0 {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        matches!(self.sign(), Sign::Zero)
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self.sign(), Sign::Positive)
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self.sign(), Sign::Negative)
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sums `amounts`, returning `None` if any partial sum overflows.
    #[must_use]
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }

    /// Converts a major-unit number (e.g. `10.5`) into an amount, rounding
    /// half-up to two decimals.
    ///
    /// The conversion goes through the shortest decimal representation of
    /// the float, so `1.005` rounds to `1.01` rather than to whatever its
    /// binary approximation would give.
    ///
    /// Fails with [`EngineError::InvalidMoney`] for `NaN`, infinities and
    /// values that do not fit in minor units.
    pub fn try_from_major(value: f64) -> ResultEngine<Money> {
        if !value.is_finite() {
            return Err(EngineError::InvalidMoney(format!(
                "non-finite amount: {value}"
            )));
        }
        value
            .to_string()
            .parse::<Money>()
            .map_err(|_| EngineError::InvalidMoney(format!("amount out of range: {value}")))
    }

    /// Like [`Money::try_from_major`] but coerces invalid input to zero.
    ///
    /// This is the documented lossy fallback at the ledger boundary: a bad
    /// amount never aborts a whole computation, it is logged and counted as
    /// nothing.
    #[must_use]
    pub fn from_major_lossy(value: f64) -> Money {
        Self::try_from_major(value).unwrap_or_else(|err| {
            tracing::warn!("coercing amount to zero: {err}");
            Money::ZERO
        })
    }

    /// Splits the amount into `parts` amounts that add back up exactly.
    ///
    /// Leftover minor units go one each to the first parts, so
    /// `100.00 / 3` yields `33.34, 33.33, 33.33`.
    #[must_use]
    pub fn split_evenly(self, parts: usize) -> Vec<Money> {
        let Ok(count) = i64::try_from(parts) else {
            return Vec::new();
        };
        if count == 0 {
            return Vec::new();
        }

        let base = self.0 / count;
        let remainder = self.0 % count;
        let extra = remainder.signum();
        let extra_parts = remainder.unsigned_abs();

        (0..parts)
            .map(|idx| {
                if (idx as u64) < extra_parts {
                    Money(base + extra)
                } else {
                    Money(base)
                }
            })
            .collect()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / MINOR_PER_MAJOR as u64;
        let minor = abs % MINOR_PER_MAJOR as u64;
        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
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

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// Extra fraction digits are rounded half-up on the magnitude, so
    /// `-0.005` becomes `-0.01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidMoney("empty amount".to_string());
        let invalid = || EngineError::InvalidMoney(format!("invalid amount: {s}"));
        let overflow = || EngineError::InvalidMoney("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next().unwrap_or("");

        if parts.next().is_some() {
            return Err(invalid());
        }

        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let major: i64 = major_str.parse().map_err(|_| overflow())?;

        let mut digits = frac_str.bytes().map(|b| i64::from(b - b'0'));
        let mut minor = 0i64;
        for _ in 0..SCALE {
            minor = minor * 10 + digits.next().unwrap_or(0);
        }
        let round_up = digits.next().is_some_and(|d| d >= 5);

        let magnitude = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|v| v.checked_add(minor))
            .and_then(|v| if round_up { v.checked_add(1) } else { Some(v) })
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -magnitude } else { magnitude }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(10).to_string(), "0.10");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let amounts = [Money::new(100), Money::new(-30), Money::new(5)];
        assert_eq!(Money::checked_sum(amounts), Some(Money::new(75)));
        assert_eq!(Money::checked_sum(Vec::<Money>::new()), Some(Money::ZERO));
        assert_eq!(Money::checked_sum([Money::new(i64::MAX), Money::new(1)]), None);
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().minor(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
        assert_eq!("7.".parse::<Money>().unwrap().minor(), 700);
    }

    #[test]
    fn parse_rounds_half_up() {
        assert_eq!("12.345".parse::<Money>().unwrap().minor(), 1235);
        assert_eq!("12.344".parse::<Money>().unwrap().minor(), 1234);
        assert_eq!("0.005".parse::<Money>().unwrap().minor(), 1);
        assert_eq!("-0.005".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("9.999".parse::<Money>().unwrap().minor(), 1000);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".5".parse::<Money>().is_err());
        assert!("NaN".parse::<Money>().is_err());
    }

    #[test]
    fn major_conversion_is_exact_on_decimal_literals() {
        assert_eq!(Money::try_from_major(1.005).unwrap().minor(), 101);
        assert_eq!(Money::try_from_major(0.1 + 0.2).unwrap().minor(), 30);
        assert_eq!(Money::try_from_major(-2.5).unwrap().minor(), -250);
        assert_eq!(Money::try_from_major(300.0).unwrap().minor(), 30_000);
    }

    #[test]
    fn non_finite_major_is_invalid_and_lossy_coerces_to_zero() {
        assert!(matches!(
            Money::try_from_major(f64::NAN),
            Err(EngineError::InvalidMoney(_))
        ));
        assert!(Money::try_from_major(f64::INFINITY).is_err());
        assert!(Money::try_from_major(1e300).is_err());
        assert_eq!(Money::from_major_lossy(f64::NEG_INFINITY), Money::ZERO);
        assert_eq!(Money::from_major_lossy(f64::NAN), Money::ZERO);
        assert_eq!(Money::from_major_lossy(4.2), Money::new(420));
    }

    #[test]
    fn sign_and_arithmetic() {
        let a = Money::new(500);
        let b = Money::new(-200);
        assert_eq!(a.sign(), Sign::Positive);
        assert_eq!(b.sign(), Sign::Negative);
        assert_eq!((a + b).minor(), 300);
        assert_eq!((a - a).sign(), Sign::Zero);
        assert_eq!((-b).minor(), 200);
        assert_eq!(b.abs(), Money::new(200));
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
        assert_eq!([a, b, a].iter().sum::<Money>(), Money::new(800));
    }

    #[test]
    fn split_evenly_conserves_the_total() {
        let parts = Money::new(10_000).split_evenly(3);
        assert_eq!(parts, vec![Money::new(3334), Money::new(3333), Money::new(3333)]);
        assert_eq!(parts.iter().sum::<Money>(), Money::new(10_000));

        let parts = Money::new(-101).split_evenly(2);
        assert_eq!(parts, vec![Money::new(-51), Money::new(-50)]);

        assert!(Money::new(100).split_evenly(0).is_empty());
        assert_eq!(Money::new(30_000).split_evenly(3), vec![Money::new(10_000); 3]);
    }
}
