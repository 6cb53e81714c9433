use crate::error::{CalculusError, Result};
use nalgebra::linalg::SVD;
use nalgebra::DMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative tolerance for treating two eigenvalues as a repeated root.
const REPEATED_ROOT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

impl fmt::Display for ComplexNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im == 0.0 {
            write!(f, "{}", self.re)
        } else if self.im < 0.0 {
            write!(f, "{}-{}i", self.re, -self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}

/// An eigenvalue together with its unit eigenvector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenPair {
    pub value: ComplexNumber,
    pub vector: Vec<ComplexNumber>,
}

/// Result of [`eigenvector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenDecomposition {
    /// The two eigenpairs, each value bound to its own vector.
    pub pairs: [EigenPair; 2],
    /// Eigenvalues in decomposition order.
    pub eigenvalues: Vec<ComplexNumber>,
    /// Row-major matrix whose columns are the eigenvectors.
    pub eigenvectors: Vec<Vec<ComplexNumber>>,
}

/// Eigen-decomposition of a 2x2 matrix given as rows `[[a, b], [c, d]]`.
///
/// Each pair is reported at `info` level. The pair order is whatever the
/// Schur decomposition produces and is not sorted.
pub fn eigenvector(matrix: &[Vec<f64>]) -> Result<EigenDecomposition> {
    if matrix.len() != 2 {
        return Err(CalculusError::invalid(format!(
            "Expected a 2x2 matrix, got {} rows.",
            matrix.len()
        )));
    }
    let pairs = eigenpairs(matrix)?;
    for pair in &pairs {
        log::info!(
            "Eigenvalue is: {}. Corresponding unit eigenvector is: {}",
            pair.value,
            format_vector(&pair.vector)
        );
    }

    let eigenvalues = pairs.iter().map(|pair| pair.value).collect();
    let eigenvectors = (0..2)
        .map(|row| pairs.iter().map(|pair| pair.vector[row]).collect())
        .collect();
    let pairs: [EigenPair; 2] = pairs
        .try_into()
        .map_err(|_| CalculusError::invalid("Expected exactly two eigenpairs."))?;

    Ok(EigenDecomposition {
        pairs,
        eigenvalues,
        eigenvectors,
    })
}

/// Eigenpairs of any non-empty square matrix.
///
/// Eigenvalues come from the real Schur form. Each eigenvector is the right
/// singular vector of `A - lambda I` belonging to the smallest singular
/// value, scaled to unit length with its largest entry real and positive.
/// A repeated eigenvalue takes the next null vector on each occurrence so the
/// vectors of a semisimple repeated root stay independent.
pub fn eigenpairs(matrix: &[Vec<f64>]) -> Result<Vec<EigenPair>> {
    let matrix = to_square_matrix(matrix)?;
    let dim = matrix.nrows();
    let eigenvalues = matrix.complex_eigenvalues();
    let complex_matrix = matrix.map(|v| Complex::new(v, 0.0));

    let mut pairs = Vec::with_capacity(dim);
    for idx in 0..dim {
        let lambda = eigenvalues[idx];
        let scale = 1.0 + lambda.norm();
        let occurrence = (0..idx)
            .filter(|&j| (eigenvalues[j] - lambda).norm() <= REPEATED_ROOT_TOLERANCE * scale)
            .count();

        let mut shifted = complex_matrix.clone();
        for i in 0..dim {
            shifted[(i, i)] -= lambda;
        }

        let svd = SVD::new(shifted, false, true);
        let v_t = svd.v_t.ok_or_else(|| {
            CalculusError::Solver(format!(
                "Failed to compute eigenvector for eigenvalue index {idx}"
            ))
        })?;
        let sigma_max = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let null_tolerance = REPEATED_ROOT_TOLERANCE * sigma_max.max(1.0);

        // Singular values are sorted in descending order, so null vectors sit at the bottom.
        let mut row_index = dim - 1;
        if occurrence > 0 && occurrence < dim {
            let candidate = dim - 1 - occurrence;
            if svd.singular_values[candidate] <= null_tolerance {
                row_index = candidate;
            }
        }
        // Rows of V^H are conjugated right singular vectors.
        let mut vector: Vec<Complex<f64>> = v_t.row(row_index).iter().map(|c| c.conj()).collect();
        normalize_complex_vector(&mut vector);

        pairs.push(EigenPair {
            value: ComplexNumber::from(lambda),
            vector: vector.into_iter().map(ComplexNumber::from).collect(),
        });
    }
    Ok(pairs)
}

/// Eigenvalues of a symmetric matrix, in decomposition order.
pub fn symmetric_eigenvalues(matrix: &DMatrix<f64>) -> Vec<f64> {
    matrix.clone().symmetric_eigen().eigenvalues.iter().cloned().collect()
}

pub(crate) fn to_square_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let dim = rows.len();
    if dim == 0 {
        return Err(CalculusError::invalid("Matrix must not be empty."));
    }
    if let Some(bad) = rows.iter().position(|row| row.len() != dim) {
        return Err(CalculusError::invalid(format!(
            "Matrix must be square: row {} has {} entries, expected {}.",
            bad,
            rows[bad].len(),
            dim
        )));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(CalculusError::invalid("Matrix entries must be finite."));
    }
    Ok(DMatrix::from_fn(dim, dim, |i, j| rows[i][j]))
}

fn normalize_complex_vector(vec: &mut [Complex<f64>]) {
    let norm = vec.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    if norm == 0.0 {
        return;
    }
    let pivot = vec
        .iter()
        .cloned()
        .fold(Complex::new(0.0, 0.0), |best, c| if c.norm() > best.norm() { c } else { best });
    let phase = pivot.conj() / pivot.norm();
    for entry in vec.iter_mut() {
        *entry = *entry * phase / norm;
        if entry.im.abs() <= f64::EPSILON * norm {
            entry.im = 0.0;
        }
    }
}

fn format_vector(vector: &[ComplexNumber]) -> String {
    let entries: Vec<String> = vector.iter().map(|c| c.to_string()).collect();
    format!("[{}]", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pair_for(pairs: &[EigenPair], value: f64) -> &EigenPair {
        pairs
            .iter()
            .find(|pair| (pair.value.re - value).abs() < 1e-9 && pair.value.im.abs() < 1e-12)
            .unwrap_or_else(|| panic!("no eigenvalue {value} in {pairs:?}"))
    }

    fn real_parts(vector: &[ComplexNumber]) -> Vec<f64> {
        vector.iter().map(|c| c.re).collect()
    }

    #[test]
    fn diagonal_matrix_has_basis_eigenvectors() {
        let decomposition = eigenvector(&[vec![2.0, 0.0], vec![0.0, 3.0]]).expect("eigen");
        let two = pair_for(&decomposition.pairs, 2.0);
        let three = pair_for(&decomposition.pairs, 3.0);
        let v2 = real_parts(&two.vector);
        let v3 = real_parts(&three.vector);
        assert_abs_diff_eq!(v2[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v2[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v3[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v3[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn symmetric_matrix_pairs_are_consistent() {
        let matrix = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let decomposition = eigenvector(&matrix).expect("eigen");
        let s = 1.0 / 2.0_f64.sqrt();

        let one = pair_for(&decomposition.pairs, 1.0);
        let three = pair_for(&decomposition.pairs, 3.0);
        let v1 = real_parts(&one.vector);
        let v3 = real_parts(&three.vector);
        assert_abs_diff_eq!(v3[0], s, epsilon = 1e-12);
        assert_abs_diff_eq!(v3[1], s, epsilon = 1e-12);
        assert_abs_diff_eq!(v1[0].abs(), s, epsilon = 1e-12);
        assert_abs_diff_eq!(v1[0] + v1[1], 0.0, epsilon = 1e-12);

        // Columns of the raw eigenvector matrix line up with the eigenvalue list.
        for (col, value) in decomposition.eigenvalues.iter().enumerate() {
            let column: Vec<ComplexNumber> =
                decomposition.eigenvectors.iter().map(|row| row[col]).collect();
            assert_eq!(column, decomposition.pairs[col].vector);
            assert_eq!(*value, decomposition.pairs[col].value);
        }
    }

    #[test]
    fn rotation_matrix_has_complex_conjugate_pair() {
        let pairs = eigenpairs(&[vec![0.0, -1.0], vec![1.0, 0.0]]).expect("eigen");
        assert_eq!(pairs.len(), 2);
        for pair in &pairs {
            assert_abs_diff_eq!(pair.value.re, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(pair.value.im.abs(), 1.0, epsilon = 1e-12);
            // A v = lambda v
            let lambda = Complex::new(pair.value.re, pair.value.im);
            let v: Vec<Complex<f64>> =
                pair.vector.iter().map(|c| Complex::new(c.re, c.im)).collect();
            let av = [-v[1], v[0]];
            for i in 0..2 {
                assert!((av[i] - lambda * v[i]).norm() < 1e-10, "residual too large for {pair:?}");
            }
        }
    }

    #[test]
    fn repeated_eigenvalue_gets_independent_vectors() {
        let pairs = eigenpairs(&[vec![4.0, 0.0], vec![0.0, 4.0]]).expect("eigen");
        let a = real_parts(&pairs[0].vector);
        let b = real_parts(&pairs[1].vector);
        let overlap = a[0] * b[0] + a[1] * b[1];
        assert_abs_diff_eq!(overlap, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_square_input() {
        let err = eigenvector(&[vec![1.0, 2.0, 3.0]]).expect_err("1 row is not 2x2");
        assert!(err.to_string().contains("2x2"));
        let err = eigenpairs(&[vec![1.0, 2.0], vec![3.0]]).expect_err("ragged");
        assert!(err.to_string().contains("square"));
        let err = eigenpairs(&[]).expect_err("empty");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn symmetric_eigenvalues_of_hessian() {
        let mut values = symmetric_eigenvalues(&DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, -2.0]));
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        assert_eq!(values, vec![-2.0, 2.0]);
    }
}
