use num_traits::{Float, FromPrimitive, Zero};
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

/// A trait for numeric types that can be used as scalars in vector algebra
/// and in the bytecode VM.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A vector component: anything that forms a ring under `+`, `-` and `*`.
///
/// Implemented for the float types and for symbolic [`Expr`](crate::expr::Expr),
/// so dot and cross products work on numeric vectors, on gradients, and on a
/// mix of the two once the numbers are lifted into expressions.
pub trait Component:
    Clone + Zero + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Neg<Output = Self>
{
}

impl<T> Component for T where
    T: Clone
        + Zero
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Neg<Output = T>
{
}
