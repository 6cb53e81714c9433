//! Symbolic differential operators on scalar and vector fields.
//!
//! Fields are expressions in the coordinate symbols `x`, `y` and `z`.
//! Operators that take a point pick the dimension from the point's length.

use crate::error::{CalculusError, Result};
use crate::expr::symbols::{X, Y, Z};
use crate::expr::Expr;
use crate::vector::{dot_product, magnitude};
use serde::{Deserialize, Serialize};

const PLANE: [&str; 2] = [X, Y];
const SPACE: [&str; 3] = [X, Y, Z];

/// Partial derivatives of `f` with respect to each of `vars`, in order.
pub fn gradient(f: &Expr, vars: &[&str]) -> Vec<Expr> {
    vars.iter().map(|var| f.diff(var)).collect()
}

pub fn two_dimensional_gradient(f: &Expr) -> Vec<Expr> {
    gradient(f, &PLANE)
}

pub fn three_dimensional_gradient(f: &Expr) -> Vec<Expr> {
    gradient(f, &SPACE)
}

/// Matrix of second partial derivatives, `H[i][j] = d/dvar_j (d f/dvar_i)`.
pub fn hessian(f: &Expr, vars: &[&str]) -> Vec<Vec<Expr>> {
    gradient(f, vars)
        .iter()
        .map(|partial| gradient(partial, vars))
        .collect()
}

/// Rate of change of `f` at `point` along `direction` (normalized first).
pub fn directional_derivative(f: &Expr, point: &[f64], direction: &[f64]) -> Result<Expr> {
    let vars = coordinates_for(point)?;
    if direction.len() != point.len() {
        return Err(CalculusError::invalid(format!(
            "Direction has {} components but the point has {}.",
            direction.len(),
            point.len()
        )));
    }
    let length = magnitude(direction);
    if length == 0.0 {
        return Err(CalculusError::DivisionByZero(
            "direction vector has zero length".to_string(),
        ));
    }
    let direction: Vec<Expr> = direction.iter().map(|&d| Expr::number(d)).collect();
    let slope = dot_product(&direction, &gradient(f, vars))? / Expr::number(length);
    Ok(slope.subs_all(&bindings(vars, point)))
}

/// Gradient of a scalar field evaluated at `point`.
pub fn gradient_of_scalar(f: &Expr, point: &[f64]) -> Result<Vec<Expr>> {
    let vars = coordinates_for(point)?;
    let at = bindings(vars, point);
    Ok(gradient(f, vars)
        .iter()
        .map(|partial| partial.subs_all(&at))
        .collect())
}

/// Normal/offset pair returned by [`tangent_plane_of_surface`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangentPlane {
    /// Gradient of the surface function at the point.
    pub normal: Vec<Expr>,
    /// `normal . point`.
    pub offset: Expr,
}

/// Plane `normal . (x, y, z) = offset` through `point` on the level surface.
pub fn tangent_plane_of_surface(surface: &Expr, point: &[f64]) -> Result<TangentPlane> {
    let normal = gradient_of_scalar(surface, point)?;
    let coordinates: Vec<Expr> = point.iter().map(|&c| Expr::number(c)).collect();
    let offset = dot_product(&normal, &coordinates)?;
    Ok(TangentPlane { normal, offset })
}

/// Divergence `dFx/dx + dFy/dy + dFz/dz` of a 3-component field.
pub fn divergent(field: &[Expr]) -> Result<Expr> {
    let [fx, fy, fz] = as_field(field)?;
    Ok(fx.diff(X) + fy.diff(Y) + fz.diff(Z))
}

pub fn curl(field: &[Expr]) -> Result<[Expr; 3]> {
    let [fx, fy, fz] = as_field(field)?;
    Ok([
        fz.diff(Y) - fy.diff(Z),
        fx.diff(Z) - fz.diff(X),
        fy.diff(X) - fx.diff(Y),
    ])
}

fn coordinates_for(point: &[f64]) -> Result<&'static [&'static str]> {
    match point.len() {
        2 => Ok(&PLANE),
        3 => Ok(&SPACE),
        n => Err(CalculusError::invalid(format!(
            "Point must have 2 or 3 coordinates, got {n}."
        ))),
    }
}

fn bindings<'a>(vars: &[&'a str], point: &[f64]) -> Vec<(&'a str, Expr)> {
    vars.iter()
        .zip(point)
        .map(|(&var, &value)| (var, Expr::number(value)))
        .collect()
}

fn as_field(field: &[Expr]) -> Result<&[Expr; 3]> {
    field.try_into().map_err(|_| {
        CalculusError::invalid(format!(
            "Vector field must have 3 components, got {}.",
            field.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::symbols::{x, y, z};
    use num_traits::Zero;

    fn parse(input: &str) -> Expr {
        Expr::parse(input).expect("expression should parse")
    }

    fn numbers(exprs: &[Expr]) -> Vec<f64> {
        exprs
            .iter()
            .map(|e| e.as_number().unwrap_or_else(|| panic!("{e} is not numeric")))
            .collect()
    }

    #[test]
    fn gradient_of_paraboloid() {
        let grad = two_dimensional_gradient(&parse("x^2 + y^2"));
        assert_eq!(grad, vec![parse("2*x"), parse("2*y")]);
        let grad3 = three_dimensional_gradient(&parse("x*y*z"));
        assert_eq!(grad3, vec![parse("y*z"), parse("x*z"), parse("x*y")]);
    }

    #[test]
    fn hessian_of_mixed_polynomial() {
        let h = hessian(&parse("x^2*y + y^3"), &[X, Y]);
        let at = [("x", 1.5), ("y", -2.0)];
        let eval = |e: &Expr| e.eval(&at).expect("hessian entry should evaluate");
        assert_eq!(eval(&h[0][0]), 2.0 * -2.0);
        assert_eq!(eval(&h[0][1]), 2.0 * 1.5);
        assert_eq!(eval(&h[1][0]), 2.0 * 1.5);
        assert_eq!(eval(&h[1][1]), 6.0 * -2.0);
    }

    #[test]
    fn directional_derivative_normalizes_direction() {
        let f = parse("x^2 + y^2");
        let slope = directional_derivative(&f, &[1.0, 2.0], &[3.0, 4.0]).expect("derivative");
        // grad = (2, 4); unit direction = (0.6, 0.8)
        let value = slope.as_number().expect("numeric");
        assert!((value - 4.4).abs() < 1e-12);

        let f3 = parse("x*y*z");
        let slope = directional_derivative(&f3, &[1.0, 2.0, 3.0], &[0.0, 0.0, 2.0]).expect("3d");
        assert_eq!(slope.as_number(), Some(2.0));
    }

    #[test]
    fn directional_derivative_validates_inputs() {
        let f = parse("x + y");
        let err = directional_derivative(&f, &[1.0], &[1.0]).expect_err("1-d point");
        assert!(matches!(err, CalculusError::InvalidArgument(_)));
        let err = directional_derivative(&f, &[1.0, 2.0], &[1.0, 0.0, 0.0]).expect_err("mismatch");
        assert!(matches!(err, CalculusError::InvalidArgument(_)));
        let err = directional_derivative(&f, &[1.0, 2.0], &[0.0, 0.0]).expect_err("zero");
        assert!(matches!(err, CalculusError::DivisionByZero(_)));
    }

    #[test]
    fn directional_derivative_keeps_free_parameters() {
        let f = parse("a*x + y");
        let slope = directional_derivative(&f, &[1.0, 1.0], &[1.0, 0.0]).expect("derivative");
        assert_eq!(slope, Expr::symbol("a"));
    }

    #[test]
    fn gradient_of_scalar_substitutes_point() {
        let grad = gradient_of_scalar(&parse("x^2*y + z"), &[1.0, 3.0, 5.0]).expect("gradient");
        assert_eq!(numbers(&grad), vec![6.0, 1.0, 1.0]);
        let grad2 = gradient_of_scalar(&parse("x*y"), &[2.0, 3.0]).expect("gradient");
        assert_eq!(numbers(&grad2), vec![3.0, 2.0]);
    }

    #[test]
    fn tangent_plane_dots_gradient_with_point() {
        let plane = tangent_plane_of_surface(&parse("x^2 + y^2 + z^2"), &[1.0, 2.0, 2.0])
            .expect("plane");
        assert_eq!(numbers(&plane.normal), vec![2.0, 4.0, 4.0]);
        assert_eq!(plane.offset.as_number(), Some(18.0));
    }

    #[test]
    fn divergence_of_position_field_is_three() {
        let div = divergent(&[x(), y(), z()]).expect("divergence");
        assert_eq!(div, Expr::number(3.0));
        let err = divergent(&[x(), y()]).expect_err("two components");
        assert!(err.to_string().contains("3 components"));
    }

    #[test]
    fn curl_of_gradient_field_vanishes() {
        let field = three_dimensional_gradient(&parse("x^2*y + y*z"));
        let rotation = curl(&field).expect("curl");
        assert!(rotation.iter().all(|c| c.is_zero()), "curl was {rotation:?}");
    }

    #[test]
    fn curl_of_gradient_field_vanishes_numerically() {
        let field = three_dimensional_gradient(&parse("sin(x*y)*exp(z) + x^3*z^2"));
        let rotation = curl(&field).expect("curl");
        let at = [("x", 0.3), ("y", -1.2), ("z", 0.7)];
        for component in &rotation {
            let value = component.eval(&at).expect("curl component should evaluate");
            assert!(value.abs() < 1e-12, "component {component} = {value}");
        }
    }

    #[test]
    fn curl_of_rotation_field() {
        let field = [-y(), x(), Expr::zero()];
        let rotation = curl(&field).expect("curl");
        assert_eq!(numbers(&rotation), vec![0.0, 0.0, 2.0]);
    }
}
