//! Jacobian driver: dense Jacobians of arbitrary model code via dual numbers.
//!
//! # Algorithm
//! For each input coordinate `i` in `0..NI` the input is lifted to
//! `SVector<Dual, NI>` with a one-hot seed (`eps = 1` on `i`, `0` elsewhere),
//! the function is evaluated once, and the `eps` parts of the output become
//! column `i` of the `NO × NI` Jacobian. That is exactly `NI` evaluations;
//! no column can reuse another since the model is arbitrary code.
//!
//! Auxiliary arguments (a time step, a sensor id, a tuple of both) travel in
//! `A` and are passed through untouched, so they are never differentiated.
//!
//! Non-differentiable branches give the derivative of the branch taken at the
//! evaluation point. Nothing detects them.

use crate::dual::Dual;
use crate::real::Real;
use nalgebra::{SMatrix, SVector};
use tracing::trace;

/// A vector-valued function generic over its element type.
///
/// `A` is the auxiliary, non-differentiated argument; use `()` when there is
/// none.
pub trait VectorFunction<A, const NI: usize, const NO: usize> {
    fn call<T: Real>(&self, x: &SVector<T, NI>, args: A) -> SVector<T, NO>;
}

/// Evaluate `f` with plain reals.
pub fn evaluate<F, A, const NI: usize, const NO: usize>(
    input: &SVector<f64, NI>,
    f: &F,
    args: A,
) -> SVector<f64, NO>
where
    F: VectorFunction<A, NI, NO>,
{
    f.call(input, args)
}

/// Dense Jacobian `∂f/∂x` at `input`.
pub fn jacobian<F, A, const NI: usize, const NO: usize>(
    input: &SVector<f64, NI>,
    f: &F,
    args: A,
) -> SMatrix<f64, NO, NI>
where
    F: VectorFunction<A, NI, NO>,
    A: Copy,
{
    let mut jac = SMatrix::<f64, NO, NI>::zeros();
    seeded_columns(input, f, args, &mut jac);
    jac
}

/// `f(input)` together with `∂f/∂x` at `input`.
///
/// The value is read off the real parts of the first seeded evaluation, so
/// this costs the same `NI` evaluations as [`jacobian`]. Only a function with
/// no inputs at all is evaluated once more with plain reals.
pub fn value_and_jacobian<F, A, const NI: usize, const NO: usize>(
    input: &SVector<f64, NI>,
    f: &F,
    args: A,
) -> (SVector<f64, NO>, SMatrix<f64, NO, NI>)
where
    F: VectorFunction<A, NI, NO>,
    A: Copy,
{
    let mut jac = SMatrix::<f64, NO, NI>::zeros();
    let value = match seeded_columns(input, f, args, &mut jac) {
        Some(value) => value,
        None => f.call(input, args),
    };
    (value, jac)
}

/// Lift `input` to dual numbers with derivative one on `direction` only.
fn seed<const N: usize>(input: &SVector<f64, N>, direction: usize) -> SVector<Dual, N> {
    SVector::from_fn(|r, _| {
        if r == direction {
            Dual::variable(input[r])
        } else {
            Dual::constant(input[r])
        }
    })
}

/// Fill every column of `jac`; returns the value from the first evaluation.
fn seeded_columns<F, A, const NI: usize, const NO: usize>(
    input: &SVector<f64, NI>,
    f: &F,
    args: A,
    jac: &mut SMatrix<f64, NO, NI>,
) -> Option<SVector<f64, NO>>
where
    F: VectorFunction<A, NI, NO>,
    A: Copy,
{
    let mut value = None;
    for col in 0..NI {
        let out = f.call(&seed(input, col), args);
        jac.set_column(col, &out.map(|d| d.eps));
        if value.is_none() {
            value = Some(out.map(|d| d.re));
        }
    }
    trace!(inputs = NI, outputs = NO, "jacobian evaluated");
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix3x2, Matrix4x2, Vector1, Vector2, Vector3, Vector4};
    use std::cell::Cell;

    /// [x0², x1·x0, x1², cos(x0)·exp(x1)]
    struct MixedProducts;

    impl VectorFunction<(), 2, 4> for MixedProducts {
        fn call<T: Real>(&self, x: &SVector<T, 2>, _: ()) -> SVector<T, 4> {
            Vector4::new(x[0] * x[0], x[1] * x[0], x[1] * x[1], x[0].cos() * x[1].exp())
        }
    }

    /// [0.5·x0², x1·c, x0·x1·c] with a non-differentiated constant c.
    struct ScaledProducts;

    impl VectorFunction<f64, 2, 3> for ScaledProducts {
        fn call<T: Real>(&self, x: &SVector<T, 2>, c: f64) -> SVector<T, 3> {
            let c = T::from_f64(c);
            Vector3::new(T::from_f64(0.5) * x[0] * x[0], x[1] * c, x[0] * x[1] * c)
        }
    }

    #[test]
    fn two_by_four_matches_analytic() {
        let input = Vector2::new(10.0, -5.0);
        let j = jacobian(&input, &MixedProducts, ());

        let (x0, x1) = (input[0], input[1]);
        #[rustfmt::skip]
        let expected = Matrix4x2::new(
            2.0 * x0,               0.0,
            x1,                     x0,
            0.0,                    2.0 * x1,
            -x0.sin() * x1.exp(),   x0.cos() * x1.exp(),
        );
        assert_abs_diff_eq!((expected - j).norm(), 0.0);
    }

    #[test]
    fn auxiliary_argument_is_not_differentiated() {
        let input = Vector2::new(10.0, -5.0);
        let c = 3.0;
        let j = jacobian(&input, &ScaledProducts, c);

        let (x0, x1) = (input[0], input[1]);
        #[rustfmt::skip]
        let expected = Matrix3x2::new(
            x0,      0.0,
            0.0,     c,
            x1 * c,  x0 * c,
        );
        assert_abs_diff_eq!((expected - j).norm(), 0.0);
    }

    #[test]
    fn value_matches_plain_evaluation() {
        let input = Vector2::new(0.4, 1.7);
        let (value, j) = value_and_jacobian(&input, &MixedProducts, ());
        assert_eq!(value, evaluate(&input, &MixedProducts, ()));
        assert_eq!(j, jacobian(&input, &MixedProducts, ()));
    }

    struct Counting<'a>(&'a Cell<usize>);

    impl VectorFunction<(), 3, 1> for Counting<'_> {
        fn call<T: Real>(&self, x: &SVector<T, 3>, _: ()) -> SVector<T, 1> {
            self.0.set(self.0.get() + 1);
            Vector1::new(x[0] * x[1] + x[2])
        }
    }

    #[test]
    fn one_evaluation_per_input_column() {
        let calls = Cell::new(0);
        let f = Counting(&calls);
        let j = jacobian(&Vector3::new(2.0, 3.0, 4.0), &f, ());
        assert_eq!(calls.get(), 3);
        assert_eq!(j, nalgebra::RowVector3::new(3.0, 2.0, 1.0));

        calls.set(0);
        let _ = value_and_jacobian(&Vector3::new(2.0, 3.0, 4.0), &f, ());
        assert_eq!(calls.get(), 3);
    }

    /// Scalar to scalar: |x|, which has a kink at 0.
    struct Kink;

    impl VectorFunction<(), 1, 1> for Kink {
        fn call<T: Real>(&self, x: &SVector<T, 1>, _: ()) -> SVector<T, 1> {
            Vector1::new(x[0].abs())
        }
    }

    #[test]
    fn single_dimension_and_branch_taken() {
        assert_eq!(jacobian(&Vector1::new(-2.0), &Kink, ())[(0, 0)], -1.0);
        assert_eq!(jacobian(&Vector1::new(2.0), &Kink, ())[(0, 0)], 1.0);
        // No detection at the kink: the positive branch is reported.
        assert_eq!(jacobian(&Vector1::new(0.0), &Kink, ())[(0, 0)], 1.0);
    }
}
