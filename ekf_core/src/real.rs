//! The arithmetic capability set a model function may rely on.
//!
//! Models are written once against `T: Real` and instantiated twice:
//! with `f64` for direct evaluation and with [`Dual`] for Jacobian extraction.
//!
//! Mixing with plain reals goes through `T + f64`, `T * f64`, … or
//! [`Real::from_f64`]. Prefer typed `f64` bindings over bare float literals
//! next to a `T` operand so operator selection stays unambiguous.

use crate::dual::Dual;
use nalgebra::Scalar;
use num_traits::{One, Zero};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Numeric element type accepted by [`VectorFunction`](crate::jacobian::VectorFunction).
pub trait Real:
    Scalar
    + Copy
    + Zero
    + One
    + From<f64>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// Promote a constant. Its derivative part, if any, is zero.
    fn from_f64(v: f64) -> Self {
        Self::from(v)
    }

    /// Plain value with derivative information dropped.
    ///
    /// Use this for branch decisions only; arithmetic on the result is not
    /// differentiated.
    fn value(self) -> f64;

    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tan(self) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn sqrt(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn powf(self, p: f64) -> Self;
    fn abs(self) -> Self;
    /// `self` is the y coordinate.
    fn atan2(self, x: Self) -> Self;
    fn hypot(self, other: Self) -> Self;
}

impl Real for f64 {
    #[inline]
    fn value(self) -> f64 {
        self
    }
    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }
    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }
    #[inline]
    fn tan(self) -> Self {
        f64::tan(self)
    }
    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }
    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }
    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
    #[inline]
    fn powf(self, p: f64) -> Self {
        f64::powf(self, p)
    }
    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }
    #[inline]
    fn atan2(self, x: Self) -> Self {
        f64::atan2(self, x)
    }
    #[inline]
    fn hypot(self, other: Self) -> Self {
        f64::hypot(self, other)
    }
}

impl Real for Dual {
    #[inline]
    fn value(self) -> f64 {
        self.re
    }
    #[inline]
    fn sin(self) -> Self {
        Dual::sin(self)
    }
    #[inline]
    fn cos(self) -> Self {
        Dual::cos(self)
    }
    #[inline]
    fn tan(self) -> Self {
        Dual::tan(self)
    }
    #[inline]
    fn exp(self) -> Self {
        Dual::exp(self)
    }
    #[inline]
    fn ln(self) -> Self {
        Dual::ln(self)
    }
    #[inline]
    fn sqrt(self) -> Self {
        Dual::sqrt(self)
    }
    #[inline]
    fn powi(self, n: i32) -> Self {
        Dual::powi(self, n)
    }
    #[inline]
    fn powf(self, p: f64) -> Self {
        Dual::powf(self, p)
    }
    #[inline]
    fn abs(self) -> Self {
        Dual::abs(self)
    }
    #[inline]
    fn atan2(self, x: Self) -> Self {
        Dual::atan2(self, x)
    }
    #[inline]
    fn hypot(self, other: Self) -> Self {
        Dual::hypot(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic<T: Real>(x: T) -> T {
        let one = T::one();
        one / (one + (-x).exp())
    }

    #[test]
    fn same_code_runs_on_both_instantiations() {
        let x0 = 0.3;
        let plain = logistic(x0);
        let dual = logistic(Dual::variable(x0));
        assert_eq!(plain, dual.value());
        // σ'(x) = σ(x)(1 − σ(x))
        assert!((dual.eps - plain * (1.0 - plain)).abs() < 1e-15);
    }
}
