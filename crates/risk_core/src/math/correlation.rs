//! Correlation matrices with PSD repair and Cholesky decomposition.
//!
//! ## Mathematical Background
//!
//! Given `n` independent standard normal variables `Z`, correlated normals
//! are obtained as
//!
//! ```text
//! W = L * Z,    C = L * L^T
//! ```
//!
//! where `L` is the lower triangular Cholesky factor of the correlation
//! matrix `C`. Correlations assembled from ad hoc pairwise edges are not
//! guaranteed to be positive definite, so [`CorrelationMatrix::regularize`]
//! first projects the matrix by eigenvalue clipping:
//!
//! ```text
//! C = Q Λ Q^T  →  C' = Q max(Λ, ε) Q^T  →  D^{-1/2} C' D^{-1/2}
//! ```
//!
//! The final rescale restores the unit diagonal.
//!
//! ## Usage
//!
//! ```
//! use risk_core::math::CorrelationMatrix;
//!
//! let corr = CorrelationMatrix::new(&[
//!     1.0, 0.5,
//!     0.5, 1.0,
//! ], 2).unwrap();
//!
//! let repaired = corr.regularize(1e-8);
//! assert!(!repaired.was_regularized);
//!
//! let cholesky = repaired.matrix.cholesky().unwrap();
//! let mut w = [0.0; 2];
//! cholesky.transform_into(&[0.5, 0.8], &mut w);
//! assert_eq!(w[0], 0.5);
//! ```

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use thiserror::Error;

/// Default eigenvalue floor used when repairing correlation matrices.
pub const DEFAULT_EIGENVALUE_FLOOR: f64 = 1e-8;

/// Error types for correlation matrix operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    /// Matrix is not positive definite.
    #[error("Correlation matrix is not positive definite")]
    NotPositiveDefinite,
    /// Element count does not match the dimension.
    #[error("Invalid matrix dimensions: expected {expected} elements, got {got}")]
    InvalidDimensions {
        /// Expected element count.
        expected: usize,
        /// Supplied element count.
        got: usize,
    },
    /// Diagonal element is not 1.0.
    #[error("Diagonal element at index {index} is {value}, expected 1.0")]
    InvalidDiagonal {
        /// Diagonal index.
        index: usize,
        /// Supplied value.
        value: f64,
    },
    /// Matrix is not symmetric.
    #[error("Matrix is not symmetric at ({i}, {j})")]
    NotSymmetric {
        /// Row.
        i: usize,
        /// Column.
        j: usize,
    },
    /// Off-diagonal element outside [-1, 1] or not finite.
    #[error("Correlation at ({i}, {j}) is {value}, must be in [-1, 1]")]
    OutOfRange {
        /// Row.
        i: usize,
        /// Column.
        j: usize,
        /// Supplied value.
        value: f64,
    },
}

/// Dense symmetric correlation matrix in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    data: Vec<f64>,
    dim: usize,
}

/// Outcome of [`CorrelationMatrix::regularize`].
#[derive(Clone, Debug)]
pub struct Regularized {
    /// The matrix to factorise (the input itself when no repair was needed).
    pub matrix: CorrelationMatrix,
    /// Whether eigenvalues were clipped.
    pub was_regularized: bool,
    /// Smallest eigenvalue of the input matrix.
    pub min_eigenvalue: f64,
}

impl CorrelationMatrix {
    /// Creates a correlation matrix from a row-major slice.
    ///
    /// # Validation
    ///
    /// - exactly `dim * dim` elements
    /// - unit diagonal
    /// - symmetric
    /// - off-diagonal elements finite and in [-1, 1]
    ///
    /// Positive definiteness is not required here.
    pub fn new(data: &[f64], dim: usize) -> Result<Self, MatrixError> {
        let expected = dim * dim;
        if data.len() != expected {
            return Err(MatrixError::InvalidDimensions {
                expected,
                got: data.len(),
            });
        }

        let epsilon = 1e-10;

        for i in 0..dim {
            let diag = data[i * dim + i];
            if !diag.is_finite() || (diag - 1.0).abs() > epsilon {
                return Err(MatrixError::InvalidDiagonal {
                    index: i,
                    value: diag,
                });
            }
        }

        for i in 0..dim {
            for j in (i + 1)..dim {
                let val_ij = data[i * dim + j];
                let val_ji = data[j * dim + i];

                if !val_ij.is_finite() || !(-1.0..=1.0).contains(&val_ij) {
                    return Err(MatrixError::OutOfRange {
                        i,
                        j,
                        value: val_ij,
                    });
                }
                if (val_ij - val_ji).abs() > epsilon {
                    return Err(MatrixError::NotSymmetric { i, j });
                }
            }
        }

        Ok(Self {
            data: data.to_vec(),
            dim,
        })
    }

    /// Creates an identity correlation matrix (no correlation).
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Row-major elements.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Repairs the matrix by eigenvalue clipping if its smallest eigenvalue
    /// is below `floor`.
    ///
    /// Eigenvalues below `floor` are raised to `floor`, the matrix is
    /// reconstructed and then rescaled to a unit diagonal. Matrices that are
    /// already sufficiently positive definite are returned unchanged.
    pub fn regularize(&self, floor: f64) -> Regularized {
        if self.dim == 0 {
            return Regularized {
                matrix: self.clone(),
                was_regularized: false,
                min_eigenvalue: f64::INFINITY,
            };
        }

        let eig = SymmetricEigen::new(self.to_dmatrix());
        let min_eigenvalue = eig
            .eigenvalues
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);

        if min_eigenvalue >= floor {
            return Regularized {
                matrix: self.clone(),
                was_regularized: false,
                min_eigenvalue,
            };
        }

        let clipped = eig.eigenvalues.map(|v| v.max(floor));
        let rebuilt = &eig.eigenvectors
            * DMatrix::from_diagonal(&DVector::from_iterator(self.dim, clipped.iter().copied()))
            * eig.eigenvectors.transpose();

        let n = self.dim;
        let scale: Vec<f64> = (0..n).map(|i| rebuilt[(i, i)].max(floor).sqrt()).collect();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let sym = 0.5 * (rebuilt[(i, j)] + rebuilt[(j, i)]);
                let value = (sym / (scale[i] * scale[j])).clamp(-1.0, 1.0);
                data[i * n + j] = value;
                data[j * n + i] = value;
            }
        }

        Regularized {
            matrix: Self { data, dim: n },
            was_regularized: true,
            min_eigenvalue,
        }
    }

    /// Computes the Cholesky decomposition (lower triangular L with C = L L^T).
    ///
    /// # Errors
    ///
    /// `MatrixError::NotPositiveDefinite` if a pivot is not strictly
    /// positive.
    pub fn cholesky(&self) -> Result<CholeskyFactor, MatrixError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;

                if j == i {
                    for k in 0..j {
                        let l_jk = lower[j * n + k];
                        sum += l_jk * l_jk;
                    }
                    let diag = self.get(j, j) - sum;
                    if diag <= 0.0 || !diag.is_finite() {
                        return Err(MatrixError::NotPositiveDefinite);
                    }
                    lower[j * n + j] = diag.sqrt();
                } else {
                    for k in 0..j {
                        sum += lower[i * n + k] * lower[j * n + k];
                    }
                    let l_jj = lower[j * n + j];
                    if l_jj <= 0.0 {
                        return Err(MatrixError::NotPositiveDefinite);
                    }
                    lower[i * n + j] = (self.get(i, j) - sum) / l_jj;
                }
            }
        }

        Ok(CholeskyFactor {
            data: lower,
            dim: n,
        })
    }

    fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.dim, self.dim, &self.data)
    }
}

/// Lower triangular Cholesky factor of a correlation matrix.
#[derive(Clone, Debug)]
pub struct CholeskyFactor {
    data: Vec<f64>,
    dim: usize,
}

impl CholeskyFactor {
    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at `(i, j)`; zero above the diagonal.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if j > i {
            0.0
        } else {
            self.data[i * self.dim + j]
        }
    }

    /// Computes `out = L * z` without allocating.
    ///
    /// # Panics
    ///
    /// Panics if `z` or `out` is shorter than `self.dim()`.
    pub fn transform_into(&self, z: &[f64], out: &mut [f64]) {
        assert!(
            z.len() >= self.dim && out.len() >= self.dim,
            "Buffer length is less than matrix dimension {}",
            self.dim
        );

        let n = self.dim;
        for i in 0..n {
            let row = &self.data[i * n..i * n + i + 1];
            out[i] = row.iter().zip(&z[..=i]).map(|(l, z)| l * z).sum();
        }
    }
}
