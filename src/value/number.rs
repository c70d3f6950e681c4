//! Arbitrary-precision decimal numbers.
//!
//! Literals keep every digit they were written with. Sums, differences,
//! products and remainders are exact; a quotient that does not terminate is
//! rounded to [`DIVISION_PRECISION`] significant digits.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Significant digits kept by a non-terminating division.
pub const DIVISION_PRECISION: u64 = 100;

/// Largest decimal exponent, either way, a parsed number may carry.
pub const MAX_EXPONENT: i64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(BigDecimal);

impl Number {
    /// `digits × 10^-scale`.
    pub fn new(digits: impl Into<BigInt>, scale: i64) -> Self {
        Number(BigDecimal::new(digits.into(), scale))
    }

    pub fn zero() -> Self {
        Number::from(0)
    }

    pub fn one() -> Self {
        Number::from(1)
    }

    /// Parses decimal or scientific notation: an optional sign, digits with
    /// an optional fraction, and an optional exponent. Numbers whose
    /// exponent exceeds [`MAX_EXPONENT`] are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if !is_number_text(s) {
            return None;
        }
        let n = BigDecimal::from_str(s).ok()?;
        let (_, scale) = n.normalized().as_bigint_and_exponent();
        (scale.abs() <= MAX_EXPONENT).then_some(Number(n))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_integer(&self) -> bool {
        let (_, scale) = self.0.normalized().as_bigint_and_exponent();
        scale <= 0
    }

    pub fn abs(&self) -> Self {
        Number(self.0.abs())
    }

    /// The largest integer not greater than `self`.
    pub fn floor(&self) -> Self {
        let (quotient, remainder) = self.split_integer();
        match remainder {
            Some(r) if r.is_negative() => Number::new(quotient - BigInt::from(1), 0),
            _ => Number::new(quotient, 0),
        }
    }

    /// The smallest integer not less than `self`.
    pub fn ceil(&self) -> Self {
        let (quotient, remainder) = self.split_integer();
        match remainder {
            Some(r) if r.is_positive() => Number::new(quotient + BigInt::from(1), 0),
            _ => Number::new(quotient, 0),
        }
    }

    /// `None` when dividing by zero.
    pub fn checked_div(&self, divisor: &Number) -> Option<Self> {
        if divisor.is_zero() {
            return None;
        }
        Some(Number((&self.0 / &divisor.0).with_prec(DIVISION_PRECISION)))
    }

    /// Remainder of truncated division; the sign follows the dividend.
    /// `None` when dividing by zero.
    pub fn checked_rem(&self, divisor: &Number) -> Option<Self> {
        if divisor.is_zero() {
            return None;
        }
        let (a, a_scale) = self.0.as_bigint_and_exponent();
        let (b, b_scale) = divisor.0.as_bigint_and_exponent();
        let scale = a_scale.max(b_scale);
        let a = a * pow10(scale - a_scale)?;
        let b = b * pow10(scale - b_scale)?;
        Some(Number::new(a % b, scale))
    }

    pub fn to_usize(&self) -> Option<usize> {
        self.to_integer()?.to_usize()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_integer()?.to_i64()
    }

    /// Nearest binary float; `None` when out of range.
    pub fn to_f64(&self) -> Option<f64> {
        self.to_string().parse::<f64>().ok().filter(|f| f.is_finite())
    }

    /// The value as an integer, or `None` when it has a fraction or does
    /// not fit comfortably in a machine word.
    fn to_integer(&self) -> Option<BigInt> {
        let (digits, scale) = self.0.normalized().as_bigint_and_exponent();
        if scale > 0 || scale < -40 {
            return None;
        }
        Some(digits * pow10(-scale)?)
    }

    /// Integer part truncated toward zero, and the remainder digits when
    /// there is a fraction.
    fn split_integer(&self) -> (BigInt, Option<BigInt>) {
        let (digits, scale) = self.0.as_bigint_and_exponent();
        if scale <= 0 {
            let whole = match pow10(-scale) {
                Some(p) => digits * p,
                None => digits,
            };
            return (whole, None);
        }
        match pow10(scale) {
            Some(p) => (&digits / &p, Some(&digits % &p)),
            None => (BigInt::zero(), Some(digits)),
        }
    }
}

/// `10^n`, or `None` for a negative or absurdly large `n`.
fn pow10(n: i64) -> Option<BigInt> {
    let n = u32::try_from(n).ok()?;
    Some(BigInt::from(10u8).pow(n))
}

fn is_number_text(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((w, f)) => (w, f),
        None => (mantissa, ""),
    };
    let digits = |t: &str| t.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return false;
    }
    if !digits(whole) || !digits(fraction) {
        return false;
    }
    match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['+', '-']).unwrap_or(e);
            !e.is_empty() && digits(e)
        }
    }
}

/// Plain notation without trailing zeros: `1e3` renders as `1000`, `2.50`
/// as `2.5`.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (digits, scale) = self.0.normalized().as_bigint_and_exponent();
        if digits.is_negative() {
            f.write_str("-")?;
        }
        let mut text = digits.abs().to_string();
        if scale <= 0 {
            text.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
        } else {
            let scale = scale as usize;
            if text.len() <= scale {
                let pad = "0".repeat(scale + 1 - text.len());
                text.insert_str(0, &pad);
            }
            text.insert(text.len() - scale, '.');
        }
        f.write_str(&text)
    }
}

impl<'a> Add<&'a Number> for &'a Number {
    type Output = Number;

    fn add(self, rhs: &'a Number) -> Number {
        Number(&self.0 + &rhs.0)
    }
}

impl<'a> Sub<&'a Number> for &'a Number {
    type Output = Number;

    fn sub(self, rhs: &'a Number) -> Number {
        Number(&self.0 - &rhs.0)
    }
}

impl<'a> Mul<&'a Number> for &'a Number {
    type Output = Number;

    fn mul(self, rhs: &'a Number) -> Number {
        Number(&self.0 * &rhs.0)
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number(-self.0)
    }
}

impl Neg for &Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number(-self.0.clone())
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(n: $t) -> Self {
                    Number(BigDecimal::from(n))
                }
            }
        )*
    };
}

number_from_int!(i32, i64, u32, u64);

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number::new(BigInt::from(n), 0)
    }
}

impl From<BigInt> for Number {
    fn from(n: BigInt) -> Self {
        Number::new(n, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn n(s: &str) -> Number {
        Number::parse(s).unwrap()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(n("1e3"), Number::from(1000));
        assert_eq!(n("-2.50"), Number::new(-25, 1));
        assert_eq!(n("+0.5"), Number::new(5, 1));
        for bad in ["", " 1", "1 ", "e3", "1e", "1_000", "0x10", ".", "1.2.3", "inf", "1e5000"] {
            assert_eq!(Number::parse(bad), None, "{:?}", bad);
        }
    }

    #[test]
    fn test_display_is_plain_and_normalized() {
        assert_eq!(n("1e30").to_string(), "1000000000000000000000000000000");
        assert_eq!(n("2.500").to_string(), "2.5");
        assert_eq!(n("-0.00125").to_string(), "-0.00125");
        assert_eq!(n("1.5e-3").to_string(), "0.0015");
        assert_eq!(n("0.000").to_string(), "0");
    }

    #[test]
    fn test_digits_beyond_machine_precision_are_kept() {
        let long = "0.12345678901234567890123456789012";
        assert_eq!(n(long).to_string(), long);
        let big = &n("10000000000000000") * &n("10000000000000000");
        assert_eq!(big.to_string(), "100000000000000000000000000000000");
    }

    #[test]
    fn test_floor_and_ceil() {
        assert_eq!(n("2.5").floor(), Number::from(2));
        assert_eq!(n("-2.5").floor(), Number::from(-3));
        assert_eq!(n("2.5").ceil(), Number::from(3));
        assert_eq!(n("-2.5").ceil(), Number::from(-2));
        assert_eq!(n("4").ceil(), Number::from(4));
        assert_eq!(n("1e2").floor(), Number::from(100));
    }

    #[test]
    fn test_division_and_remainder() {
        assert_eq!(n("10").checked_div(&n("4")), Some(n("2.5")));
        assert_eq!(n("1").checked_div(&Number::zero()), None);
        let third = n("1").checked_div(&n("3")).unwrap().to_string();
        assert_eq!(third.len(), 2 + DIVISION_PRECISION as usize);
        assert_eq!(n("7").checked_rem(&n("3")), Some(n("1")));
        assert_eq!(n("-7").checked_rem(&n("3")), Some(n("-1")));
        assert_eq!(n("5.5").checked_rem(&n("2")), Some(n("1.5")));
        assert_eq!(n("1").checked_rem(&Number::zero()), None);
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(n("3").to_usize(), Some(3));
        assert_eq!(n("3.5").to_usize(), None);
        assert_eq!(n("-1").to_usize(), None);
        assert_eq!(n("3.0").to_usize(), Some(3));
        assert_eq!(n("-12").to_i64(), Some(-12));
    }

    #[test]
    fn test_equality_ignores_trailing_zeros() {
        assert_eq!(n("1.0"), n("1"));
        assert!(n("0.1") < n("0.12"));
    }
}
