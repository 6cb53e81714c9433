//! Vector algebra on numeric or symbolic components.

use crate::error::{CalculusError, Result};
use crate::traits::{Component, Scalar};

/// Euclidean length: `sqrt(sum v_i^2)`.
pub fn magnitude<T: Scalar>(vector: &[T]) -> T {
    vector
        .iter()
        .fold(T::zero(), |acc, &component| acc + component * component)
        .sqrt()
}

/// Sum of pairwise products. Works for symbolic components too, which is how
/// directional derivatives and work integrals are assembled.
pub fn dot_product<T: Component>(vector1: &[T], vector2: &[T]) -> Result<T> {
    if vector1.len() != vector2.len() {
        return Err(CalculusError::invalid(format!(
            "Vector dimensions must be consistent (got {} and {}).",
            vector1.len(),
            vector2.len()
        )));
    }
    Ok(vector1
        .iter()
        .zip(vector2)
        .fold(T::zero(), |acc, (a, b)| acc + a.clone() * b.clone()))
}

pub fn cross_product<T: Component>(vector1: &[T], vector2: &[T]) -> Result<[T; 3]> {
    let [a1, a2, a3] = as_three(vector1)?;
    let [b1, b2, b3] = as_three(vector2)?;
    Ok([
        a2.clone() * b3.clone() - a3.clone() * b2.clone(),
        a3.clone() * b1.clone() - a1.clone() * b3.clone(),
        a1.clone() * b2.clone() - a2.clone() * b1.clone(),
    ])
}

/// Volume of the parallelepiped spanned by the three vectors,
/// `|v3 . (v1 x v2)|`.
pub fn triple_scalar_product<T: Scalar>(vector1: &[T], vector2: &[T], vector3: &[T]) -> Result<T> {
    let cross = cross_product(vector1, vector2)?;
    as_three(vector3)?;
    Ok(dot_product(vector3, &cross)?.abs())
}

/// Angle between two vectors in degrees, rounded to 3 decimal places.
///
/// Each vector is divided by its largest component first, so very large or
/// very small magnitudes do not overflow the norms.
pub fn find_angle<T: Scalar>(vector1: &[T], vector2: &[T]) -> Result<T> {
    if vector1.len() != vector2.len() {
        return Err(CalculusError::invalid(format!(
            "Vector dimensions must be consistent (got {} and {}).",
            vector1.len(),
            vector2.len()
        )));
    }
    let unit1 = rescaled(vector1)?;
    let unit2 = rescaled(vector2)?;
    let dot = dot_product(&unit1, &unit2)?;
    let norms = magnitude(&unit1) * magnitude(&unit2);
    let cos_theta = dot / norms;
    if !cos_theta.is_finite() {
        return Err(CalculusError::invalid("angle is undefined for these vectors"));
    }
    // Rounding can push |cos| just past 1 for parallel vectors.
    let cos_theta = cos_theta.max(-T::one()).min(T::one());
    let scale = T::from_f64(1000.0).unwrap_or_else(T::one);
    Ok((cos_theta.acos().to_degrees() * scale).round() / scale)
}

/// `vector / max |component|`.
fn rescaled<T: Scalar>(vector: &[T]) -> Result<Vec<T>> {
    if vector.iter().any(|c| !c.is_finite()) {
        return Err(CalculusError::invalid(format!(
            "Vector components must be finite, got {vector:?}."
        )));
    }
    let largest = vector.iter().fold(T::zero(), |acc, c| acc.max(c.abs()));
    if largest == T::zero() {
        return Err(CalculusError::DivisionByZero(
            "cannot measure the angle to a zero-length vector".to_string(),
        ));
    }
    Ok(vector.iter().map(|&c| c / largest).collect())
}

fn as_three<T>(vector: &[T]) -> Result<&[T; 3]> {
    vector.try_into().map_err(|_| {
        CalculusError::invalid(format!(
            "Vector must have 3 dimensions (got {}).",
            vector.len()
        ))
    })
}
