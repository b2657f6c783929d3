//! Dual numbers for forward-mode automatic differentiation.
//!
//! A [`Dual`] is `re + eps·ε` with `ε² = 0`. Evaluating a function on
//! `Dual::variable(x)` yields `f(x)` in `re` and `f'(x)` in `eps`: every
//! operation below applies its analytic derivative through the chain rule,
//! so the derivative is exact rather than a finite-difference estimate.
//!
//! Only one direction is carried at a time. The Jacobian driver seeds one
//! input coordinate per evaluation, which keeps the type `Copy` and two words
//! wide.

use num_traits::{One, Zero};
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A real value paired with its derivative along one seeded direction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dual {
    /// Value part.
    pub re: f64,
    /// Derivative part.
    pub eps: f64,
}

impl Dual {
    pub const fn new(re: f64, eps: f64) -> Self {
        Self { re, eps }
    }

    /// A constant: derivative zero.
    pub const fn constant(re: f64) -> Self {
        Self { re, eps: 0.0 }
    }

    /// The differentiation variable itself: derivative one.
    pub const fn variable(re: f64) -> Self {
        Self { re, eps: 1.0 }
    }

    /// Apply a scalar function given its value and derivative at `re`.
    #[inline]
    fn chain(self, value: f64, derivative: f64) -> Self {
        Self::new(value, self.eps * derivative)
    }

    pub fn sin(self) -> Self {
        self.chain(self.re.sin(), self.re.cos())
    }

    pub fn cos(self) -> Self {
        self.chain(self.re.cos(), -self.re.sin())
    }

    pub fn tan(self) -> Self {
        let t = self.re.tan();
        self.chain(t, 1.0 + t * t)
    }

    pub fn exp(self) -> Self {
        let e = self.re.exp();
        self.chain(e, e)
    }

    /// Natural logarithm.
    pub fn ln(self) -> Self {
        self.chain(self.re.ln(), 1.0 / self.re)
    }

    /// Derivative is infinite at zero.
    pub fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        self.chain(s, 0.5 / s)
    }

    pub fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Self::constant(1.0);
        }
        // n - 1 overflows at i32::MIN
        let d = n
            .checked_sub(1)
            .map_or_else(|| self.re.powf(f64::from(n) - 1.0), |m| self.re.powi(m));
        self.chain(self.re.powi(n), f64::from(n) * d)
    }

    pub fn powf(self, p: f64) -> Self {
        self.chain(self.re.powf(p), p * self.re.powf(p - 1.0))
    }

    /// `|x|`. At zero the positive branch is taken (`f64::signum(0.0) == 1.0`).
    pub fn abs(self) -> Self {
        self.chain(self.re.abs(), self.re.signum())
    }

    /// Four-quadrant arctangent of `self / x` (`self` is the y coordinate).
    pub fn atan2(self, x: Dual) -> Self {
        let r2 = x.re * x.re + self.re * self.re;
        Self::new(
            self.re.atan2(x.re),
            (x.re * self.eps - self.re * x.eps) / r2,
        )
    }

    /// `sqrt(self² + other²)` without intermediate overflow in the value.
    pub fn hypot(self, other: Dual) -> Self {
        let h = self.re.hypot(other.re);
        Self::new(h, (self.re * self.eps + other.re * other.eps) / h)
    }
}

impl From<f64> for Dual {
    fn from(re: f64) -> Self {
        Self::constant(re)
    }
}

impl fmt::Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl Add for Dual {
    type Output = Dual;
    #[inline]
    fn add(self, rhs: Dual) -> Dual {
        Dual::new(self.re + rhs.re, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Dual;
    #[inline]
    fn sub(self, rhs: Dual) -> Dual {
        Dual::new(self.re - rhs.re, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Dual;
    #[inline]
    fn mul(self, rhs: Dual) -> Dual {
        Dual::new(self.re * rhs.re, self.eps * rhs.re + self.re * rhs.eps)
    }
}

impl Div for Dual {
    type Output = Dual;
    #[inline]
    fn div(self, rhs: Dual) -> Dual {
        let re = self.re / rhs.re;
        Dual::new(re, (self.eps - re * rhs.eps) / rhs.re)
    }
}

impl Neg for Dual {
    type Output = Dual;
    #[inline]
    fn neg(self) -> Dual {
        Dual::new(-self.re, -self.eps)
    }
}

// Mixed operations promote the f64 operand to a constant.
macro_rules! impl_mixed_ops {
    ($($Op:ident::$op:ident, $OpAssign:ident::$op_assign:ident);* $(;)?) => {$(
        impl $Op<f64> for Dual {
            type Output = Dual;
            #[inline]
            fn $op(self, rhs: f64) -> Dual {
                $Op::$op(self, Dual::constant(rhs))
            }
        }

        impl $Op<Dual> for f64 {
            type Output = Dual;
            #[inline]
            fn $op(self, rhs: Dual) -> Dual {
                $Op::$op(Dual::constant(self), rhs)
            }
        }

        impl $OpAssign for Dual {
            #[inline]
            fn $op_assign(&mut self, rhs: Dual) {
                *self = $Op::$op(*self, rhs);
            }
        }

        impl $OpAssign<f64> for Dual {
            #[inline]
            fn $op_assign(&mut self, rhs: f64) {
                *self = $Op::$op(*self, Dual::constant(rhs));
            }
        }
    )*};
}

impl_mixed_ops! {
    Add::add, AddAssign::add_assign;
    Sub::sub, SubAssign::sub_assign;
    Mul::mul, MulAssign::mul_assign;
    Div::div, DivAssign::div_assign;
}

impl Zero for Dual {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.re == 0.0 && self.eps == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
