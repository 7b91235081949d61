//! Linear expressions over a fixed-size tuple of rational dimensions.

use std::ops::{Add, Neg, Sub};

use itertools::Itertools;
use num_traits::Zero;

use crate::core::{format_decimal, Rational};

/// `c0*x0 + c1*x1 + … + k` over a fixed number of dimensions.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LinearExpr {
    coeffs: Vec<Rational>,
    constant: Rational,
}

impl LinearExpr {
    pub fn zero(dim: usize) -> Self {
        LinearExpr {
            coeffs: vec![Rational::zero(); dim],
            constant: Rational::zero(),
        }
    }

    pub fn constant(dim: usize, value: Rational) -> Self {
        let mut e = Self::zero(dim);
        e.constant = value;
        e
    }

    pub fn variable(dim: usize, index: usize) -> Self {
        Self::term(dim, index, Rational::from_integer(1.into()))
    }

    pub fn term(dim: usize, index: usize, coeff: Rational) -> Self {
        assert!(index < dim);
        let mut e = Self::zero(dim);
        e.coeffs[index] = coeff;
        e
    }

    pub fn dim(&self) -> usize {
        self.coeffs.len()
    }

    pub fn coeff(&self, index: usize) -> &Rational {
        &self.coeffs[index]
    }

    pub fn set_coeff(&mut self, index: usize, coeff: Rational) {
        self.coeffs[index] = coeff;
    }

    pub fn constant_term(&self) -> &Rational {
        &self.constant
    }

    pub fn set_constant(&mut self, constant: Rational) {
        self.constant = constant;
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.iter().all(Rational::is_zero)
    }

    /// Index of the lowest dimension with a nonzero coefficient.
    pub fn leading_dim(&self) -> Option<usize> {
        self.coeffs.iter().position(|c| !c.is_zero())
    }

    /// Appends `count` fresh dimensions with zero coefficients.
    pub fn add_dims(&mut self, count: usize) {
        self.coeffs.extend(std::iter::repeat(Rational::zero()).take(count));
    }

    /// Inserts `count` fresh dimensions starting at position `at`.
    pub fn insert_dims(&mut self, at: usize, count: usize) {
        assert!(at <= self.dim());
        self.coeffs
            .splice(at..at, std::iter::repeat(Rational::zero()).take(count));
    }

    /// Drops all dimensions at and above `dim`. Their coefficients must be
    /// zero.
    pub fn truncate_dims(&mut self, dim: usize) {
        debug_assert!(self.coeffs[dim..].iter().all(Rational::is_zero));
        self.coeffs.truncate(dim);
    }

    pub fn swap_dims(&mut self, a: usize, b: usize) {
        self.coeffs.swap(a, b);
    }

    /// `self += factor * other`.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: &Rational) {
        assert_eq!(self.dim(), other.dim());
        for (c, o) in self.coeffs.iter_mut().zip(&other.coeffs) {
            *c += o * factor;
        }
        self.constant += &other.constant * factor;
    }

    pub fn scaled(&self, factor: &Rational) -> LinearExpr {
        LinearExpr {
            coeffs: self.coeffs.iter().map(|c| c * factor).collect(),
            constant: &self.constant * factor,
        }
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.add_scaled(&rhs, &Rational::from_integer(1.into()));
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self.add_scaled(&rhs, &Rational::from_integer((-1).into()));
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(&Rational::from_integer((-1).into()))
    }
}

impl std::fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (i, c) in self.coeffs.iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            let one = Rational::from_integer(1.into());
            let minus_one = Rational::from_integer((-1).into());
            if first {
                if *c == one {
                    write!(f, "x{i}")?;
                } else if *c == minus_one {
                    write!(f, "-x{i}")?;
                } else {
                    write!(f, "{}*x{i}", format_decimal(c))?;
                }
                first = false;
            } else if c > &Rational::zero() {
                if *c == one {
                    write!(f, " + x{i}")?;
                } else {
                    write!(f, " + {}*x{i}", format_decimal(c))?;
                }
            } else {
                let abs = -c.clone();
                if abs == one {
                    write!(f, " - x{i}")?;
                } else {
                    write!(f, " - {}*x{i}", format_decimal(&abs))?;
                }
            }
        }
        if first {
            write!(f, "{}", format_decimal(&self.constant))?;
        } else if !self.constant.is_zero() {
            if self.constant > Rational::zero() {
                write!(f, " + {}", format_decimal(&self.constant))?;
            } else {
                write!(f, " - {}", format_decimal(&-self.constant.clone()))?;
            }
        }
        Ok(())
    }
}

/// Formats several expressions, for diagnostics.
pub(crate) fn display_joined(exprs: &[impl std::fmt::Display]) -> String {
    exprs.iter().map(|e| e.to_string()).join(", ")
}
