//! Stationary points of scalar fields and their second-derivative test.

use crate::differential::{gradient, hessian};
use crate::eigen::symmetric_eigenvalues;
use crate::equation_engine::EquationSystem;
use crate::error::{CalculusError, Result};
use crate::expr::symbols::{X, Y, Z};
use crate::expr::Expr;
use crate::solvers::{solve_system, NewtonSettings, SearchSettings};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Minimum,
    Maximum,
    Saddle,
    /// The Hessian test cannot decide: a zero eigenvalue in two variables, or a Hessian that does not evaluate to finite numbers.
    Indeterminate,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Classification::Minimum => "a minimum",
            Classification::Maximum => "a maximum",
            Classification::Saddle => "a saddle point",
            Classification::Indeterminate => "indeterminate",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationaryPoint {
    pub point: Vec<f64>,
    /// Hessian eigenvalues in ascending order; empty when the Hessian is not finite.
    pub eigenvalues: Vec<f64>,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StationarySettings {
    pub search: SearchSettings,
    pub newton: NewtonSettings,
    /// Eigenvalues within `zero_tolerance * max(1, max |eigenvalue|)` of zero
    /// count as zero.
    pub zero_tolerance: f64,
}

impl Default for StationarySettings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            newton: NewtonSettings::default(),
            zero_tolerance: 1e-9,
        }
    }
}

/// Stationary points of `f(x, y)`.
pub fn stationary_values_2variables(f: &Expr) -> Result<Vec<StationaryPoint>> {
    stationary_values_with(f, &[X, Y], &StationarySettings::default())
}

/// Stationary points of `f(x, y, z)`.
pub fn stationary_values_3variables(f: &Expr) -> Result<Vec<StationaryPoint>> {
    stationary_values_with(f, &[X, Y, Z], &StationarySettings::default())
}

/// Solves `grad f = 0` over `vars` (2 or 3 of them) and classifies every
/// solution by the eigenvalues of the Hessian there.
pub fn stationary_values_with(
    f: &Expr,
    vars: &[&str],
    settings: &StationarySettings,
) -> Result<Vec<StationaryPoint>> {
    let dim = vars.len();
    if dim != 2 && dim != 3 {
        return Err(CalculusError::invalid(format!(
            "Stationary points are classified in 2 or 3 variables, got {dim}."
        )));
    }

    let grad = gradient(f, vars);
    let solutions = solve_system(&grad, vars, &settings.search, settings.newton)?;

    let entries: Vec<Expr> = hessian(f, vars).into_iter().flatten().collect();
    let compiled = EquationSystem::<f64>::compile(&entries, vars)?;
    let mut values = vec![0.0; dim * dim];

    let mut points = Vec::with_capacity(solutions.len());
    for point in solutions {
        compiled.apply(&point, &mut values);
        let (eigenvalues, classification) = second_derivative_test(dim, &values, settings.zero_tolerance);

        log::info!(
            "Stationary point {:?}, has the eigenvalues {:?}, therefore is {}",
            point,
            eigenvalues,
            classification
        );
        points.push(StationaryPoint {
            point,
            eigenvalues,
            classification,
        });
    }
    Ok(points)
}

/// Eigenvalues and classification of a row-major `dim x dim` Hessian.
fn second_derivative_test(dim: usize, hessian: &[f64], zero_tolerance: f64) -> (Vec<f64>, Classification) {
    if !hessian.iter().all(|v| v.is_finite()) {
        return (Vec::new(), Classification::Indeterminate);
    }
    let mut eigenvalues = symmetric_eigenvalues(&DMatrix::from_row_slice(dim, dim, hessian));
    eigenvalues.sort_by(|a, b| a.total_cmp(b));
    let classification = classify(&eigenvalues, zero_tolerance);
    (eigenvalues, classification)
}

/// Eigenvalues are compared with zero relative to the largest one, so the
/// test does not depend on the overall scale of `f`.
fn classify(eigenvalues: &[f64], zero_tolerance: f64) -> Classification {
    let largest = eigenvalues.iter().fold(1.0_f64, |acc, e| acc.max(e.abs()));
    let threshold = zero_tolerance * largest;
    let sign = |e: f64| {
        if e.abs() <= threshold {
            0
        } else if e > 0.0 {
            1
        } else {
            -1
        }
    };

    if let [a, b] = eigenvalues {
        match sign(*a) * sign(*b) {
            0 => Classification::Indeterminate,
            -1 => Classification::Saddle,
            _ if *a + *b > 0.0 => Classification::Minimum,
            _ => Classification::Maximum,
        }
    } else if eigenvalues.iter().all(|&e| sign(e) > 0) {
        Classification::Minimum
    } else if eigenvalues.iter().all(|&e| sign(e) < 0) {
        Classification::Maximum
    } else {
        // Zero eigenvalues fall through here as well.
        Classification::Saddle
    }
}
