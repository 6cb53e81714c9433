//! The `vecalc_core` crate is a small vector-calculus toolkit.
//! Numeric vectors use any float type, and fields are symbolic expressions in `x`, `y`, `z` and `t`.
//!
//! Key components:
//! - **Expressions**: `Expr` trees with a parser, symbolic differentiation and substitution.
//! - **Equation Engine**: A bytecode VM that evaluates compiled expressions in hot loops.
//! - **Vector algebra**: magnitude, dot/cross/triple products, angles.
//! - **Differential operators**: gradient, Hessian, directional derivative, tangent plane, divergence, curl.
//! - **Eigen-analysis and stationary points**: eigenpairs, multi-start Newton, second-derivative test.
//! - **Integration**: adaptive Gauss-Kronrod quadrature, path integrals, double and triple integrals.
pub mod differential;
pub mod eigen;
pub mod equation_engine;
pub mod error;
pub mod expr;
pub mod integrals;
pub mod parser;
pub mod quadrature;
pub mod solvers;
pub mod stationary;
pub mod traits;
pub mod vector;

pub use error::{CalculusError, Result};
pub use expr::Expr;
