//! Numeric solution of symbolic equation systems `F(x) = 0`.
//!
//! The system and its symbolic Jacobian are compiled to bytecode once, then a
//! damped Newton iteration is started from every seed of a uniform grid.
//! Roots reached from different seeds are merged, so callers always receive
//! one ordered list of distinct solutions.

use crate::equation_engine::EquationSystem;
use crate::error::{CalculusError, Result};
use crate::expr::Expr;
use anyhow::{anyhow, bail, Context};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_steps: usize,
    pub damping: f64,
    /// Residual norm below which the iteration may stop.
    pub tolerance: f64,
    /// The last Newton step must also be shorter than this, which keeps
    /// iterating through the slow, linear approach to degenerate roots.
    pub step_tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 100,
            damping: 1.0,
            tolerance: 1e-10,
            step_tolerance: 1e-9,
        }
    }
}

/// Where multi-start Newton looks for roots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchSettings {
    pub lower: f64,
    pub upper: f64,
    /// Grid seeds per coordinate; the total is `seeds_per_axis ^ dimension`.
    pub seeds_per_axis: usize,
    /// Roots closer than this (max-norm) are the same root.
    pub merge_tolerance: f64,
    /// Coordinates this close to an integer are snapped to it.
    pub snap_tolerance: f64,
    /// Extra passes, each over a box twice as wide about the same centre.
    /// Searching stops early once a widened pass finds no new root.
    pub max_expansions: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            lower: -10.0,
            upper: 10.0,
            seeds_per_axis: 7,
            merge_tolerance: 1e-6,
            snap_tolerance: 1e-8,
            max_expansions: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewtonResult {
    pub state: Vec<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
}

/// A square system of expressions with its compiled Jacobian.
pub struct CompiledSystem {
    residual: EquationSystem<f64>,
    /// Row-major `dim x dim` partial derivatives.
    jacobian: EquationSystem<f64>,
    dim: usize,
}

impl CompiledSystem {
    pub fn new(equations: &[Expr], vars: &[&str]) -> Result<Self> {
        let dim = vars.len();
        if dim == 0 {
            return Err(CalculusError::invalid("System has zero dimension."));
        }
        if equations.len() != dim {
            return Err(CalculusError::invalid(format!(
                "System needs one equation per unknown: {} equations, {} unknowns.",
                equations.len(),
                dim
            )));
        }
        let partials: Vec<Expr> = equations
            .iter()
            .flat_map(|eq| vars.iter().map(move |var| eq.diff(var)))
            .collect();
        Ok(Self {
            residual: EquationSystem::compile(equations, vars)?,
            jacobian: EquationSystem::compile(&partials, vars)?,
            dim,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }
}

/// Damped Newton iteration from a single starting point.
pub fn newton(
    system: &CompiledSystem,
    initial_guess: &[f64],
    settings: NewtonSettings,
) -> anyhow::Result<NewtonResult> {
    let dim = system.dim;
    if initial_guess.len() != dim {
        bail!(
            "Initial guess dimension mismatch. Expected {}, got {}.",
            dim,
            initial_guess.len()
        );
    }
    if settings.max_steps == 0 {
        bail!("max_steps must be greater than zero.");
    }
    if settings.damping <= 0.0 {
        bail!("damping must be positive.");
    }
    if settings.tolerance <= 0.0 || settings.step_tolerance <= 0.0 {
        bail!("tolerances must be positive.");
    }

    let mut state = initial_guess.to_vec();
    let mut residual = vec![0.0; dim];
    let mut jacobian = vec![0.0; dim * dim];
    system.residual.apply(&state, &mut residual);
    let mut residual_norm = l2_norm(&residual);
    let mut step_norm = f64::INFINITY;
    let mut iterations = 0usize;

    loop {
        if !residual_norm.is_finite() {
            bail!("Residual is not finite at {:?}.", state);
        }
        if residual_norm == 0.0 || (residual_norm <= settings.tolerance && step_norm <= settings.step_tolerance) {
            break;
        }
        if iterations >= settings.max_steps {
            bail!(
                "Newton solver failed to converge in {} steps (‖f(x)‖ = {}).",
                settings.max_steps,
                residual_norm
            );
        }

        system.jacobian.apply(&state, &mut jacobian);
        let delta = solve_linear_system(dim, &jacobian, &residual)
            .context("Failed to solve linear system during Newton iteration.")?;

        for i in 0..dim {
            state[i] -= settings.damping * delta[i];
        }
        step_norm = settings.damping * l2_norm(&delta);

        iterations += 1;
        system.residual.apply(&state, &mut residual);
        residual_norm = l2_norm(&residual);
    }

    Ok(NewtonResult {
        state,
        residual_norm,
        iterations,
    })
}

/// Newton from one starting point, with errors mapped into [`CalculusError`].
pub fn find_root(
    equations: &[Expr],
    vars: &[&str],
    initial_guess: &[f64],
    settings: NewtonSettings,
) -> Result<NewtonResult> {
    let system = CompiledSystem::new(equations, vars)?;
    Ok(newton(&system, initial_guess, settings)?)
}

/// All distinct roots of `equations = 0` reachable from the search grid,
/// sorted lexicographically. An empty list means no seed converged.
///
/// The grid is re-seeded over a doubled box until a widened pass adds no
/// root or `max_expansions` is used up.
pub fn solve_system(
    equations: &[Expr],
    vars: &[&str],
    search: &SearchSettings,
    newton_settings: NewtonSettings,
) -> Result<Vec<Vec<f64>>> {
    if !(search.lower.is_finite() && search.upper.is_finite()) || search.lower > search.upper {
        return Err(CalculusError::invalid("Search box bounds must be finite and ordered."));
    }
    if search.seeds_per_axis == 0 {
        return Err(CalculusError::invalid("seeds_per_axis must be at least 1."));
    }
    let system = CompiledSystem::new(equations, vars)?;
    let centre = 0.5 * (search.lower + search.upper);
    let mut half_width = 0.5 * (search.upper - search.lower);
    let mut roots: Vec<Vec<f64>> = Vec::new();
    let mut failures = 0usize;

    for pass in 0..=search.max_expansions {
        let (lower, upper) = (centre - half_width, centre + half_width);
        let mut found = 0usize;
        for seed in seed_grid(system.dimension(), lower, upper, search.seeds_per_axis) {
            match newton(&system, &seed, newton_settings) {
                Ok(result) => {
                    let root: Vec<f64> = result
                        .state
                        .iter()
                        .map(|&v| snap(v, search.snap_tolerance))
                        .collect();
                    let known = roots
                        .iter()
                        .any(|existing| max_distance(existing, &root) <= search.merge_tolerance);
                    if !known {
                        log::debug!(
                            "Root {:?} found from seed {:?} after {} iterations",
                            root,
                            seed,
                            result.iterations
                        );
                        roots.push(root);
                        found += 1;
                    }
                }
                Err(err) => {
                    failures += 1;
                    log::trace!("Seed {:?} discarded: {:#}", seed, err);
                }
            }
        }
        log::debug!("Search pass {} over [{}, {}]: {} new roots", pass, lower, upper, found);

        if pass > 0 && found == 0 && !roots.is_empty() {
            break;
        }
        if pass == search.max_expansions && pass > 0 && found > 0 {
            log::warn!(
                "Root search over [{}, {}] was still finding new roots when it stopped; \
                 widen the search box to look further",
                lower,
                upper
            );
        }
        half_width *= 2.0;
    }
    log::debug!(
        "Multi-start Newton: {} distinct roots, {} seeds discarded",
        roots.len(),
        failures
    );

    roots.sort_by(|a, b| lexicographic(a, b));
    Ok(roots)
}

fn seed_grid(dim: usize, lower: f64, upper: f64, n: usize) -> Vec<Vec<f64>> {
    let axis: Vec<f64> = if n == 1 {
        vec![0.5 * (lower + upper)]
    } else {
        let step = (upper - lower) / (n - 1) as f64;
        (0..n).map(|i| lower + step * i as f64).collect()
    };

    let mut seeds = vec![Vec::with_capacity(dim)];
    for _ in 0..dim {
        seeds = seeds
            .into_iter()
            .flat_map(|prefix| {
                axis.iter().map(move |&value| {
                    let mut seed = prefix.clone();
                    seed.push(value);
                    seed
                })
            })
            .collect();
    }
    seeds
}

fn solve_linear_system(dim: usize, jacobian: &[f64], residual: &[f64]) -> anyhow::Result<Vec<f64>> {
    let j_matrix = DMatrix::from_row_slice(dim, dim, jacobian);
    let rhs = DVector::from_column_slice(residual);
    j_matrix
        .lu()
        .solve(&rhs)
        .filter(|v| v.iter().all(|x| x.is_finite()))
        .map(|v| v.iter().cloned().collect())
        .ok_or_else(|| anyhow!("Jacobian is singular."))
}

fn snap(value: f64, tolerance: f64) -> f64 {
    let nearest = value.round();
    let snapped = if (value - nearest).abs() <= tolerance { nearest } else { value };
    // Avoid reporting -0.
    if snapped == 0.0 {
        0.0
    } else {
        snapped
    }
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn max_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

fn lexicographic(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.partial_cmp(y) {
            Some(Ordering::Equal) | None => continue,
            Some(order) => return order,
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(inputs: &[&str]) -> Vec<Expr> {
        inputs
            .iter()
            .map(|s| Expr::parse(s).expect("expression should parse"))
            .collect()
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn newton_converges_on_linear_system() {
        let equations = parse_all(&["2*x + y - 3", "x - y"]);
        let system = CompiledSystem::new(&equations, &["x", "y"]).expect("compile");
        let result = newton(&system, &[5.0, -4.0], NewtonSettings::default()).expect("newton");
        assert!((result.state[0] - 1.0).abs() < 1e-12);
        assert!((result.state[1] - 1.0).abs() < 1e-12);
        assert!(result.iterations <= 2);
    }

    #[test]
    fn newton_rejects_invalid_settings() {
        let equations = parse_all(&["x"]);
        let system = CompiledSystem::new(&equations, &["x"]).expect("compile");
        assert_err_contains(newton(&system, &[1.0, 2.0], NewtonSettings::default()), "dimension mismatch");
        let settings = NewtonSettings {
            max_steps: 0,
            ..NewtonSettings::default()
        };
        assert_err_contains(newton(&system, &[1.0], settings), "max_steps");
        let settings = NewtonSettings {
            damping: 0.0,
            ..NewtonSettings::default()
        };
        assert_err_contains(newton(&system, &[1.0], settings), "damping");
    }

    #[test]
    fn newton_reports_singular_jacobian() {
        let equations = parse_all(&["x^2 + 1"]);
        let system = CompiledSystem::new(&equations, &["x"]).expect("compile");
        assert_err_contains(newton(&system, &[0.0], NewtonSettings::default()), "singular");
    }

    #[test]
    fn find_root_maps_errors_to_solver_variant() {
        let equations = parse_all(&["x^2 + 1"]);
        let err = find_root(&equations, &["x"], &[0.0], NewtonSettings::default())
            .expect_err("no real root");
        assert!(matches!(err, CalculusError::Solver(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn solve_system_finds_every_root_once() {
        let equations = parse_all(&["x^2 - 4", "y^2 - 1"]);
        let roots = solve_system(
            &equations,
            &["x", "y"],
            &SearchSettings::default(),
            NewtonSettings::default(),
        )
        .expect("solve");
        assert_eq!(
            roots,
            vec![
                vec![-2.0, -1.0],
                vec![-2.0, 1.0],
                vec![2.0, -1.0],
                vec![2.0, 1.0]
            ]
        );
    }

    #[test]
    fn solve_system_handles_degenerate_root() {
        let equations = parse_all(&["4*x^3", "4*y^3"]);
        let roots = solve_system(
            &equations,
            &["x", "y"],
            &SearchSettings::default(),
            NewtonSettings::default(),
        )
        .expect("solve");
        assert_eq!(roots, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn solve_system_widens_the_box_for_distant_roots() {
        // Gradient of (x^2 - 900)^2 + y^2: roots at x = -30, 0, 30.
        let equations = parse_all(&["4*x^3 - 3600*x", "2*y"]);
        let roots = solve_system(
            &equations,
            &["x", "y"],
            &SearchSettings::default(),
            NewtonSettings::default(),
        )
        .expect("solve");
        assert_eq!(
            roots,
            vec![vec![-30.0, 0.0], vec![0.0, 0.0], vec![30.0, 0.0]]
        );

        let fixed_box = SearchSettings {
            max_expansions: 0,
            ..SearchSettings::default()
        };
        let roots = solve_system(&equations, &["x", "y"], &fixed_box, NewtonSettings::default())
            .expect("solve");
        assert!(!roots.contains(&vec![30.0, 0.0]));
    }

    #[test]
    fn solve_system_rejects_unknown_symbols_and_bad_shapes() {
        let equations = parse_all(&["x + a"]);
        let err = solve_system(&equations, &["x"], &SearchSettings::default(), NewtonSettings::default())
            .expect_err("a is not an unknown");
        assert!(matches!(err, CalculusError::UnknownSymbol(_)));

        let equations = parse_all(&["x", "y"]);
        let err = solve_system(&equations, &["x"], &SearchSettings::default(), NewtonSettings::default())
            .expect_err("two equations, one unknown");
        assert!(matches!(err, CalculusError::InvalidArgument(_)));
    }

    #[test]
    fn seed_grid_covers_the_box() {
        let seeds = seed_grid(2, -1.0, 1.0, 3);
        assert_eq!(seeds.len(), 9);
        assert_eq!(seeds[0], vec![-1.0, -1.0]);
        assert_eq!(seeds[4], vec![0.0, 0.0]);
        assert_eq!(seeds[8], vec![1.0, 1.0]);
    }

    #[test]
    fn snap_cleans_negative_zero_and_near_integers() {
        assert_eq!(snap(-0.0, 1e-8).to_bits(), 0.0_f64.to_bits());
        assert_eq!(snap(2.000000000001, 1e-8), 2.0);
        assert_eq!(snap(0.5, 1e-8), 0.5);
    }
}
