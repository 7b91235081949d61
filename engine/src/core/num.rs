//! Exact rational arithmetic: decimal parsing and printing.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Arbitrary-precision rational, the numeric type of the symbolic domains.
pub type Rational = num_rational::BigRational;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumError {
    #[error("invalid decimal literal `{0}`")]
    InvalidLiteral(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Parses a decimal literal such as `-1.05`, `.2` or `3` into an exact
/// rational.
pub fn parse_decimal(input: &str) -> Result<Rational, NumError> {
    let invalid = || NumError::InvalidLiteral(input.to_string());
    let mut chars = input.trim().chars().peekable();
    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };
    let mut numerator = BigInt::zero();
    let mut denominator = BigInt::one();
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in chars {
        match c {
            '.' if !seen_dot => seen_dot = true,
            '0'..='9' => {
                seen_digit = true;
                numerator = numerator * 10 + u32::from(c as u8 - b'0');
                if seen_dot {
                    denominator = denominator * 10;
                }
            }
            _ => return Err(invalid()),
        }
    }
    if !seen_digit {
        return Err(invalid());
    }
    if negative {
        numerator = -numerator;
    }
    Ok(Rational::new(numerator, denominator))
}

/// Nearest `f64`, for handing exact constants to the concrete-valued modes.
pub fn to_f64(r: &Rational) -> Option<f64> {
    num_traits::ToPrimitive::to_f64(r)
}

/// Prints a rational as a finite decimal when its denominator divides a power
/// of ten, and as `p/q` otherwise.
pub fn format_decimal(r: &Rational) -> String {
    if r.denom().is_one() {
        return r.numer().to_string();
    }
    let mut q = r.denom().clone();
    let (mut twos, mut fives) = (0u32, 0u32);
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    while (&q % &two).is_zero() {
        q /= &two;
        twos += 1;
    }
    while (&q % &five).is_zero() {
        q /= &five;
        fives += 1;
    }
    if !q.is_one() {
        return format!("{}/{}", r.numer(), r.denom());
    }
    let width = twos.max(fives);
    let mut scale = BigInt::one();
    for _ in 0..width {
        scale = scale * 10;
    }
    // Exact because the denominator divides 10^width.
    let scaled = r.numer() * &scale / r.denom();
    let sign = if scaled.is_negative() { "-" } else { "" };
    let scaled = scaled.abs();
    let int = &scaled / &scale;
    let mut frac = (&scaled % &scale).to_string();
    while frac.len() < width as usize {
        frac.insert(0, '0');
    }
    format!("{sign}{int}.{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimals() {
        assert_eq!(parse_decimal("1.05").unwrap(), Rational::new(21.into(), 20.into()));
        assert_eq!(parse_decimal("-1.05").unwrap(), Rational::new((-21).into(), 20.into()));
        assert_eq!(parse_decimal(".2").unwrap(), Rational::new(1.into(), 5.into()));
        assert_eq!(parse_decimal("3").unwrap(), Rational::from_integer(3.into()));
        assert_eq!(parse_decimal("+4.5").unwrap(), Rational::new(9.into(), 2.into()));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("-").is_err());
        assert!(parse_decimal("1.2.3").is_err());
        assert!(parse_decimal("12a").is_err());
    }

    #[test]
    fn format_decimals() {
        assert_eq!(format_decimal(&Rational::new(21.into(), 20.into())), "1.05");
        assert_eq!(format_decimal(&Rational::new((-1).into(), 5.into())), "-0.2");
        assert_eq!(format_decimal(&Rational::from_integer(7.into())), "7");
        assert_eq!(format_decimal(&Rational::new(1.into(), 3.into())), "1/3");
    }

    #[test]
    fn parse_format_roundtrip() {
        for s in ["0.1", "445.01", "-2.125"] {
            assert_eq!(format_decimal(&parse_decimal(s).unwrap()), s);
        }
    }
}
