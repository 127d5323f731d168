// ABOUTME: Numeric tower with exact integers/rationals and inexact reals/complexes

use crate::error::SchemeError;
use std::cmp::Ordering;
use std::fmt;

/// A Scheme number. Exact variants are `Int` and `Rational`; `Real` and
/// `Complex` are inexact. Invariant: a `Rational` always has a positive
/// denominator, is reduced to lowest terms, and never has denominator 1
/// (that collapses to `Int`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Rational(i64, i64),
    Real(f64),
    Complex(f64, f64),
}

fn overflow() -> SchemeError {
    SchemeError::runtime("integer overflow in exact arithmetic")
}

fn div_by_zero() -> SchemeError {
    SchemeError::runtime("division by zero")
}

fn complex_not_real(function: &str) -> SchemeError {
    SchemeError::Type {
        function: function.to_string(),
        expected: "real number".to_string(),
        actual: "complex number".to_string(),
    }
}

pub fn gcd_i64(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a as i64
}

fn gcd_i128(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Build a normalized rational from wide intermediates, collapsing to `Int`
/// when the reduced denominator is 1.
fn rational_i128(p: i128, q: i128) -> Result<Number, SchemeError> {
    if q == 0 {
        return Err(div_by_zero());
    }
    let (p, q) = if q < 0 { (-p, -q) } else { (p, q) };
    let g = gcd_i128(p, q);
    let (p, q) = if g == 0 { (0, 1) } else { (p / g, q / g) };
    let p = i64::try_from(p).map_err(|_| overflow())?;
    let q = i64::try_from(q).map_err(|_| overflow())?;
    if q == 1 {
        Ok(Number::Int(p))
    } else {
        Ok(Number::Rational(p, q))
    }
}

impl Number {
    pub fn rational(p: i64, q: i64) -> Result<Number, SchemeError> {
        rational_i128(p as i128, q as i128)
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Int(_) | Number::Rational(_, _))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => *n == 0,
            Number::Rational(p, _) => *p == 0,
            Number::Real(x) => *x == 0.0,
            Number::Complex(re, im) => *re == 0.0 && *im == 0.0,
        }
    }

    /// Exact numerator/denominator view of an exact number.
    fn as_ratio(&self) -> Option<(i64, i64)> {
        match self {
            Number::Int(n) => Some((*n, 1)),
            Number::Rational(p, q) => Some((*p, *q)),
            _ => None,
        }
    }

    /// Real-axis value; fails for complex numbers.
    pub fn to_f64(&self, function: &str) -> Result<f64, SchemeError> {
        match self {
            Number::Int(n) => Ok(*n as f64),
            Number::Rational(p, q) => Ok(*p as f64 / *q as f64),
            Number::Real(x) => Ok(*x),
            Number::Complex(_, _) => Err(complex_not_real(function)),
        }
    }

    pub fn as_complex(&self) -> (f64, f64) {
        match self {
            Number::Int(n) => (*n as f64, 0.0),
            Number::Rational(p, q) => (*p as f64 / *q as f64, 0.0),
            Number::Real(x) => (*x, 0.0),
            Number::Complex(re, im) => (*re, *im),
        }
    }

    pub fn add(&self, other: &Number) -> Result<Number, SchemeError> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(*b).map(Number::Int).ok_or_else(overflow),
            _ => {
                if let (Some((p, q)), Some((r, s))) = (self.as_ratio(), other.as_ratio()) {
                    let (p, q, r, s) = (p as i128, q as i128, r as i128, s as i128);
                    rational_i128(p * s + r * q, q * s)
                } else if let (Number::Complex(_, _), _) | (_, Number::Complex(_, _)) = (self, other) {
                    let (a, b) = self.as_complex();
                    let (c, d) = other.as_complex();
                    Ok(Number::Complex(a + c, b + d))
                } else {
                    Ok(Number::Real(self.to_f64("+")? + other.to_f64("+")?))
                }
            }
        }
    }

    pub fn sub(&self, other: &Number) -> Result<Number, SchemeError> {
        self.add(&other.neg()?)
    }

    pub fn neg(&self) -> Result<Number, SchemeError> {
        match self {
            Number::Int(n) => n.checked_neg().map(Number::Int).ok_or_else(overflow),
            Number::Rational(p, q) => Ok(Number::Rational(-p, *q)),
            Number::Real(x) => Ok(Number::Real(-x)),
            Number::Complex(re, im) => Ok(Number::Complex(-re, -im)),
        }
    }

    pub fn mul(&self, other: &Number) -> Result<Number, SchemeError> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(*b).map(Number::Int).ok_or_else(overflow),
            _ => {
                if let (Some((p, q)), Some((r, s))) = (self.as_ratio(), other.as_ratio()) {
                    let (p, q, r, s) = (p as i128, q as i128, r as i128, s as i128);
                    rational_i128(p * r, q * s)
                } else if let (Number::Complex(_, _), _) | (_, Number::Complex(_, _)) = (self, other) {
                    let (a, b) = self.as_complex();
                    let (c, d) = other.as_complex();
                    Ok(Number::Complex(a * c - b * d, a * d + b * c))
                } else {
                    Ok(Number::Real(self.to_f64("*")? * other.to_f64("*")?))
                }
            }
        }
    }

    pub fn div(&self, other: &Number) -> Result<Number, SchemeError> {
        if let (Some((p, q)), Some((r, s))) = (self.as_ratio(), other.as_ratio()) {
            if r == 0 {
                return Err(div_by_zero());
            }
            let (p, q, r, s) = (p as i128, q as i128, r as i128, s as i128);
            return rational_i128(p * s, q * r);
        }
        if let (Number::Complex(_, _), _) | (_, Number::Complex(_, _)) = (self, other) {
            let (a, b) = self.as_complex();
            let (c, d) = other.as_complex();
            let denom = c * c + d * d;
            if denom == 0.0 {
                return Err(div_by_zero());
            }
            return Ok(Number::Complex((a * c + b * d) / denom, (b * c - a * d) / denom));
        }
        let divisor = other.to_f64("/")?;
        if divisor == 0.0 {
            return Err(div_by_zero());
        }
        Ok(Number::Real(self.to_f64("/")? / divisor))
    }

    pub fn recip(&self) -> Result<Number, SchemeError> {
        Number::Int(1).div(self)
    }

    /// Numeric equality across exactness: `(= 1 1.0)` is true.
    pub fn numeric_eq(&self, other: &Number) -> bool {
        if let (Some((p, q)), Some((r, s))) = (self.as_ratio(), other.as_ratio()) {
            return p as i128 * s as i128 == r as i128 * q as i128;
        }
        let (a, b) = self.as_complex();
        let (c, d) = other.as_complex();
        a == c && b == d
    }

    fn partial_order(&self, other: &Number, function: &str) -> Result<Option<Ordering>, SchemeError> {
        if matches!(self, Number::Complex(_, _)) || matches!(other, Number::Complex(_, _)) {
            return Err(complex_not_real(function));
        }
        if let (Some((p, q)), Some((r, s))) = (self.as_ratio(), other.as_ratio()) {
            return Ok(Some((p as i128 * s as i128).cmp(&(r as i128 * q as i128))));
        }
        Ok(self
            .to_f64(function)?
            .partial_cmp(&other.to_f64(function)?))
    }

    pub fn lt(&self, other: &Number) -> Result<bool, SchemeError> {
        Ok(self.partial_order(other, "<")? == Some(Ordering::Less))
    }

    pub fn le(&self, other: &Number) -> Result<bool, SchemeError> {
        Ok(matches!(
            self.partial_order(other, "<=")?,
            Some(Ordering::Less | Ordering::Equal)
        ))
    }

    pub fn gt(&self, other: &Number) -> Result<bool, SchemeError> {
        Ok(self.partial_order(other, ">")? == Some(Ordering::Greater))
    }

    pub fn ge(&self, other: &Number) -> Result<bool, SchemeError> {
        Ok(matches!(
            self.partial_order(other, ">=")?,
            Some(Ordering::Greater | Ordering::Equal)
        ))
    }

    pub fn abs(&self) -> Result<Number, SchemeError> {
        match self {
            Number::Int(n) => n.checked_abs().map(Number::Int).ok_or_else(overflow),
            Number::Rational(p, q) => Ok(Number::Rational(p.abs(), *q)),
            Number::Real(x) => Ok(Number::Real(x.abs())),
            Number::Complex(_, _) => Err(complex_not_real("abs")),
        }
    }

    pub fn floor(&self) -> Result<Number, SchemeError> {
        match self {
            Number::Int(_) => Ok(*self),
            Number::Rational(p, q) => Ok(Number::Int(p.div_euclid(*q))),
            Number::Real(x) => Ok(Number::Real(x.floor())),
            Number::Complex(_, _) => Err(complex_not_real("floor")),
        }
    }

    pub fn ceiling(&self) -> Result<Number, SchemeError> {
        match self {
            Number::Int(_) => Ok(*self),
            Number::Rational(p, q) => {
                let fl = p.div_euclid(*q);
                Ok(Number::Int(if p % q == 0 { fl } else { fl + 1 }))
            }
            Number::Real(x) => Ok(Number::Real(x.ceil())),
            Number::Complex(_, _) => Err(complex_not_real("ceiling")),
        }
    }

    pub fn truncate(&self) -> Result<Number, SchemeError> {
        match self {
            Number::Int(_) => Ok(*self),
            Number::Rational(p, q) => Ok(Number::Int(p / q)),
            Number::Real(x) => Ok(Number::Real(x.trunc())),
            Number::Complex(_, _) => Err(complex_not_real("truncate")),
        }
    }

    /// Round to the nearest integer, ties to even.
    pub fn round(&self) -> Result<Number, SchemeError> {
        match self {
            Number::Int(_) => Ok(*self),
            Number::Rational(p, q) => {
                let fl = p.div_euclid(*q);
                let twice_rem = 2 * (p - fl * q);
                let up = match twice_rem.cmp(q) {
                    Ordering::Less => false,
                    Ordering::Greater => true,
                    Ordering::Equal => fl % 2 != 0,
                };
                Ok(Number::Int(if up { fl + 1 } else { fl }))
            }
            Number::Real(x) => Ok(Number::Real(x.round_ties_even())),
            Number::Complex(_, _) => Err(complex_not_real("round")),
        }
    }

    /// Square root: negative reals yield a complex result.
    pub fn sqrt(&self) -> Result<Number, SchemeError> {
        let x = self.to_f64("sqrt")?;
        if x < 0.0 {
            Ok(Number::Complex(0.0, (-x).sqrt()))
        } else {
            Ok(Number::Real(x.sqrt()))
        }
    }

    pub fn expt(&self, exponent: &Number) -> Result<Number, SchemeError> {
        match (self.as_ratio(), exponent) {
            (Some((p, q)), Number::Int(e)) => {
                if *e >= 0 {
                    let e = u32::try_from(*e).map_err(|_| overflow())?;
                    let np = p.checked_pow(e).ok_or_else(overflow)?;
                    let nq = q.checked_pow(e).ok_or_else(overflow)?;
                    Number::rational(np, nq)
                } else {
                    if p == 0 {
                        return Err(div_by_zero());
                    }
                    let e = u32::try_from(e.checked_neg().ok_or_else(overflow)?)
                        .map_err(|_| overflow())?;
                    let np = p.checked_pow(e).ok_or_else(overflow)?;
                    let nq = q.checked_pow(e).ok_or_else(overflow)?;
                    Number::rational(nq, np)
                }
            }
            _ => Ok(Number::Real(
                self.to_f64("expt")?.powf(exponent.to_f64("expt")?),
            )),
        }
    }

    /// Integer view for quotient/remainder/modulo/gcd/lcm and friends.
    pub fn to_int(&self, function: &str) -> Result<i64, SchemeError> {
        match self {
            Number::Int(n) => Ok(*n),
            _ => Err(SchemeError::Type {
                function: function.to_string(),
                expected: "integer".to_string(),
                actual: "number".to_string(),
            }),
        }
    }
}

/// Truncating integer division.
pub fn quotient(a: i64, b: i64) -> Result<Number, SchemeError> {
    if b == 0 {
        return Err(div_by_zero());
    }
    a.checked_div(b).map(Number::Int).ok_or_else(overflow)
}

/// Remainder taking the sign of the dividend.
pub fn remainder(a: i64, b: i64) -> Result<Number, SchemeError> {
    if b == 0 {
        return Err(div_by_zero());
    }
    a.checked_rem(b).map(Number::Int).ok_or_else(overflow)
}

/// Modulo taking the sign of the divisor.
pub fn modulo(a: i64, b: i64) -> Result<Number, SchemeError> {
    if b == 0 {
        return Err(div_by_zero());
    }
    let r = a.checked_rem(b).ok_or_else(overflow)?;
    if r != 0 && (r < 0) != (b < 0) {
        Ok(Number::Int(r + b))
    } else {
        Ok(Number::Int(r))
    }
}

pub fn lcm_i64(a: i64, b: i64) -> Result<i64, SchemeError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    let g = gcd_i64(a, b);
    (a / g).checked_mul(b).map(i64::abs).ok_or_else(overflow)
}

// ============================================================================
// Literal parsing
// ============================================================================

/// Parse a numeric literal. `Ok(None)` means the token is not a number and
/// should be read as a symbol; `Err` is reserved for malformed radix
/// literals, which are hard errors rather than symbols.
pub fn parse_literal(token: &str) -> Result<Option<Number>, SchemeError> {
    for (prefix, radix) in [("#b", 2), ("#o", 8), ("#d", 10), ("#x", 16)] {
        if let Some(digits) = token.strip_prefix(prefix) {
            return match i64::from_str_radix(digits, radix) {
                Ok(n) => Ok(Some(Number::Int(n))),
                Err(_) => Err(SchemeError::Syntax {
                    form: token.to_string(),
                    message: format!("invalid base-{} literal", radix),
                }),
            };
        }
    }
    if let Ok(n) = token.parse::<i64>() {
        return Ok(Some(Number::Int(n)));
    }
    if let Ok(x) = token.parse::<f64>() {
        return Ok(Some(Number::Real(x)));
    }
    if let Some(c) = parse_complex(token) {
        return Ok(Some(c));
    }
    Ok(parse_rational(token))
}

/// Accepts `a+bi` and `a-bi` with an explicit interior sign and a numeric
/// imaginary part. Bare `i` and `2i` are not complex literals.
fn parse_complex(token: &str) -> Option<Number> {
    let body = token.strip_suffix('i')?;
    let bytes = body.as_bytes();
    let mut split = None;
    for idx in (1..bytes.len()).rev() {
        if (bytes[idx] == b'+' || bytes[idx] == b'-')
            && bytes[idx - 1] != b'e'
            && bytes[idx - 1] != b'E'
        {
            split = Some(idx);
            break;
        }
    }
    let idx = split?;
    let re: f64 = body[..idx].parse().ok()?;
    let im: f64 = body[idx..].parse().ok()?;
    Some(Number::Complex(re, im))
}

fn parse_rational(token: &str) -> Option<Number> {
    let (num, den) = token.split_once('/')?;
    let p: i64 = num.parse().ok()?;
    let q: i64 = den.parse().ok()?;
    Number::rational(p, q).ok()
}

// ============================================================================
// Printing
// ============================================================================

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Rational(p, q) => write!(f, "{}/{}", p, q),
            // Debug formatting keeps the trailing ".0" on whole floats, so
            // inexact numbers stay visibly inexact
            Number::Real(x) => write!(f, "{:?}", x),
            Number::Complex(re, im) => {
                if *im < 0.0 {
                    write!(f, "{}-{}i", re, -im)
                } else {
                    write!(f, "{}+{}i", re, im)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_normalization() {
        assert_eq!(Number::rational(2, 4).unwrap(), Number::Rational(1, 2));
        assert_eq!(Number::rational(4, 2).unwrap(), Number::Int(2));
        assert_eq!(Number::rational(1, -2).unwrap(), Number::Rational(-1, 2));
        assert_eq!(Number::rational(0, 5).unwrap(), Number::Int(0));
        assert!(Number::rational(1, 0).is_err());
    }

    #[test]
    fn test_exact_division_yields_rational() {
        let third = Number::Int(1).div(&Number::Int(3)).unwrap();
        assert_eq!(third, Number::Rational(1, 3));

        // (* 3 (/ 1 3)) comes back to an exact 1
        let one = Number::Int(3).mul(&third).unwrap();
        assert_eq!(one, Number::Int(1));
    }

    #[test]
    fn test_float_contaminates() {
        let half = Number::rational(1, 2).unwrap();
        let sum = Number::Real(1.0).add(&half).unwrap();
        assert_eq!(sum, Number::Real(1.5));
    }

    #[test]
    fn test_complex_contaminates() {
        let z = Number::Complex(1.0, 2.0);
        let sum = Number::Int(1).add(&z).unwrap();
        assert_eq!(sum, Number::Complex(2.0, 2.0));

        let prod = Number::Complex(0.0, 1.0).mul(&Number::Complex(0.0, 1.0)).unwrap();
        assert_eq!(prod, Number::Complex(-1.0, 0.0));
    }

    #[test]
    fn test_numeric_eq_across_exactness() {
        assert!(Number::Int(1).numeric_eq(&Number::Real(1.0)));
        assert!(Number::Rational(1, 2).numeric_eq(&Number::Real(0.5)));
        assert!(!Number::Int(1).numeric_eq(&Number::Int(2)));
    }

    #[test]
    fn test_ordering_rejects_complex() {
        assert!(Number::Int(1).lt(&Number::Complex(2.0, 0.0)).is_err());
        assert!(Number::Rational(1, 3).lt(&Number::Rational(1, 2)).unwrap());
    }

    #[test]
    fn test_quotient_remainder_modulo_signs() {
        assert_eq!(quotient(7, 2).unwrap(), Number::Int(3));
        assert_eq!(quotient(-7, 2).unwrap(), Number::Int(-3));
        assert_eq!(remainder(-7, 2).unwrap(), Number::Int(-1));
        assert_eq!(remainder(7, -2).unwrap(), Number::Int(1));
        assert_eq!(modulo(-7, 2).unwrap(), Number::Int(1));
        assert_eq!(modulo(7, -2).unwrap(), Number::Int(-1));
        assert!(quotient(1, 0).is_err());
    }

    #[test]
    fn test_rounding_family() {
        let neg_half = Number::Rational(-1, 2);
        assert_eq!(neg_half.floor().unwrap(), Number::Int(-1));
        assert_eq!(neg_half.ceiling().unwrap(), Number::Int(0));
        assert_eq!(neg_half.truncate().unwrap(), Number::Int(0));
        // ties to even
        assert_eq!(Number::Rational(1, 2).round().unwrap(), Number::Int(0));
        assert_eq!(Number::Rational(3, 2).round().unwrap(), Number::Int(2));
        assert_eq!(Number::Real(2.5).round().unwrap(), Number::Real(2.0));
    }

    #[test]
    fn test_sqrt_negative_is_complex() {
        assert_eq!(Number::Int(4).sqrt().unwrap(), Number::Real(2.0));
        assert_eq!(Number::Int(-4).sqrt().unwrap(), Number::Complex(0.0, 2.0));
    }

    #[test]
    fn test_expt_exact() {
        assert_eq!(Number::Int(2).expt(&Number::Int(10)).unwrap(), Number::Int(1024));
        assert_eq!(
            Number::Int(2).expt(&Number::Int(-2)).unwrap(),
            Number::Rational(1, 4)
        );
        assert_eq!(
            Number::Rational(2, 3).expt(&Number::Int(2)).unwrap(),
            Number::Rational(4, 9)
        );
    }

    #[test]
    fn test_parse_literal_order() {
        assert_eq!(parse_literal("42").unwrap(), Some(Number::Int(42)));
        assert_eq!(parse_literal("-2.5").unwrap(), Some(Number::Real(-2.5)));
        assert_eq!(parse_literal("1/3").unwrap(), Some(Number::Rational(1, 3)));
        assert_eq!(parse_literal("#x1f").unwrap(), Some(Number::Int(31)));
        assert_eq!(parse_literal("#b101").unwrap(), Some(Number::Int(5)));
        assert_eq!(
            parse_literal("3+4i").unwrap(),
            Some(Number::Complex(3.0, 4.0))
        );
        assert_eq!(
            parse_literal("3-4i").unwrap(),
            Some(Number::Complex(3.0, -4.0))
        );
        // not numbers
        assert_eq!(parse_literal("i").unwrap(), None);
        assert_eq!(parse_literal("2i").unwrap(), None);
        assert_eq!(parse_literal("1/0").unwrap(), None);
        assert_eq!(parse_literal("foo").unwrap(), None);
        // malformed radix literals are hard errors
        assert!(parse_literal("#bxyz").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Number::Int(42).to_string(), "42");
        assert_eq!(Number::Rational(1, 3).to_string(), "1/3");
        assert_eq!(Number::Real(2.0).to_string(), "2.0");
        assert_eq!(Number::Real(1.5).to_string(), "1.5");
        assert_eq!(Number::Complex(3.0, 4.0).to_string(), "3+4i");
        assert_eq!(Number::Complex(3.0, -4.0).to_string(), "3-4i");
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(Number::Int(i64::MAX).add(&Number::Int(1)).is_err());
        assert!(Number::Int(2).expt(&Number::Int(64)).is_err());
    }
}
