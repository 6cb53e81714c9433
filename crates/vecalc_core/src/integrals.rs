//! Line integrals along parametrised curves and multiple integrals over
//! regions with constant or curved bounds.
//!
//! Curves are expressions in `t`. The path integrands are built
//! symbolically, compiled to bytecode once and handed to the adaptive
//! quadrature in [`crate::quadrature`].

use crate::equation_engine::EquationSystem;
use crate::error::{CalculusError, Result};
use crate::expr::symbols::{T, X, Y, Z};
use crate::expr::Expr;
use crate::quadrature::{dblquad, quad, tplquad, Limit, QuadSettings, SurfaceLimit};
use crate::vector::dot_product;

const COORDINATES: [&str; 3] = [X, Y, Z];

/// Length of the curve `r(t)` for `t` in `[a, b]`: `∫ |r'(t)| dt`.
pub fn arc_length(r: &[Expr], a: f64, b: f64) -> Result<f64> {
    arc_length_with(r, a, b, &QuadSettings::default())
}

pub fn arc_length_with(r: &[Expr], a: f64, b: f64, settings: &QuadSettings) -> Result<f64> {
    if r.is_empty() {
        return Err(CalculusError::invalid("Curve must have at least one component."));
    }
    integrate_in_t(&speed(r), (a, b), settings)
}

/// `∫ f(r(t)) |r'(t)| dt` for a curve in the plane or in space.
pub fn scalar_path_integral(f: &Expr, r: &[Expr], bounds: (f64, f64)) -> Result<f64> {
    scalar_path_integral_with(f, r, bounds, &QuadSettings::default())
}

pub fn scalar_path_integral_with(
    f: &Expr,
    r: &[Expr],
    bounds: (f64, f64),
    settings: &QuadSettings,
) -> Result<f64> {
    let along_curve = restrict_to_curve(f, r)?;
    integrate_in_t(&(along_curve * speed(r)), bounds, settings)
}

/// Work done by `field` along `r`: `∫ F(r(t)) . r'(t) dt`.
/// The field has as many components as the curve.
pub fn work_integral(field: &[Expr], r: &[Expr], bounds: (f64, f64)) -> Result<f64> {
    work_integral_with(field, r, bounds, &QuadSettings::default())
}

pub fn work_integral_with(
    field: &[Expr],
    r: &[Expr],
    bounds: (f64, f64),
    settings: &QuadSettings,
) -> Result<f64> {
    if field.len() != r.len() {
        return Err(CalculusError::invalid(format!(
            "Field has {} components but the curve has {}.",
            field.len(),
            r.len()
        )));
    }
    let velocity: Vec<Expr> = r.iter().map(|component| component.diff(T)).collect();
    let power = dot_product(field, &velocity)?;
    integrate_in_t(&restrict_to_curve(&power, r)?, bounds, settings)
}

/// `∫_{x_bounds} ∫_{y_lower(x)}^{y_upper(x)} f(x, y) dy dx`.
pub fn double_integral<F>(f: F, x_bounds: (f64, f64), y_bounds: (Limit<'_>, Limit<'_>)) -> Result<f64>
where
    F: FnMut(f64, f64) -> f64,
{
    double_integral_with(f, x_bounds, y_bounds, &QuadSettings::default())
}

pub fn double_integral_with<F>(
    f: F,
    x_bounds: (f64, f64),
    (y_lower, y_upper): (Limit<'_>, Limit<'_>),
    settings: &QuadSettings,
) -> Result<f64>
where
    F: FnMut(f64, f64) -> f64,
{
    Ok(dblquad(f, x_bounds, &y_lower, &y_upper, settings)?.value)
}

/// Double integral in polar coordinates, `f(r, theta)` with `r` outermost.
/// The area element is not added: include the factor `r` in `f`.
pub fn double_integral_parametrised<F>(
    f: F,
    r_bounds: (f64, f64),
    theta_bounds: (Limit<'_>, Limit<'_>),
) -> Result<f64>
where
    F: FnMut(f64, f64) -> f64,
{
    double_integral_with(f, r_bounds, theta_bounds, &QuadSettings::default())
}

/// Triple integral of `f(x, y, z)`; returns `(value, estimated error)`.
pub fn triple_integral<F>(
    f: F,
    x_bounds: (f64, f64),
    y_bounds: (Limit<'_>, Limit<'_>),
    z_bounds: (SurfaceLimit<'_>, SurfaceLimit<'_>),
) -> Result<(f64, f64)>
where
    F: FnMut(f64, f64, f64) -> f64,
{
    triple_integral_with(f, x_bounds, y_bounds, z_bounds, &QuadSettings::default())
}

pub fn triple_integral_with<F>(
    f: F,
    x_bounds: (f64, f64),
    (y_lower, y_upper): (Limit<'_>, Limit<'_>),
    (z_lower, z_upper): (SurfaceLimit<'_>, SurfaceLimit<'_>),
    settings: &QuadSettings,
) -> Result<(f64, f64)>
where
    F: FnMut(f64, f64, f64) -> f64,
{
    let result = tplquad(f, x_bounds, &y_lower, &y_upper, &z_lower, &z_upper, settings)?;
    Ok((result.value, result.error))
}

/// `|r'(t)|`.
fn speed(r: &[Expr]) -> Expr {
    r.iter()
        .map(|component| component.diff(T).pow(2.0))
        .fold(Expr::number(0.0), |acc, term| acc + term)
        .sqrt()
}

/// Substitutes the curve into the coordinates of `f`. Plane curves bind `x`
/// and `y` only.
fn restrict_to_curve(f: &Expr, r: &[Expr]) -> Result<Expr> {
    if r.len() != 2 && r.len() != 3 {
        return Err(CalculusError::invalid(format!(
            "Curve must have 2 or 3 components, got {}.",
            r.len()
        )));
    }
    let bindings: Vec<(&str, Expr)> = COORDINATES
        .iter()
        .zip(r)
        .map(|(&var, component)| (var, component.clone()))
        .collect();
    Ok(f.subs_all(&bindings))
}

fn integrate_in_t(integrand: &Expr, (a, b): (f64, f64), settings: &QuadSettings) -> Result<f64> {
    let compiled = EquationSystem::<f64>::compile(std::slice::from_ref(integrand), &[T])?;
    let result = quad(|t| compiled.evaluate(0, &[t]), a, b, settings)?;
    log::debug!(
        "∫ {} dt over [{}, {}] = {} (error {:e}, {} evaluations)",
        integrand,
        a,
        b,
        result.value,
        result.error,
        result.evaluations
    );
    Ok(result.value)
}
