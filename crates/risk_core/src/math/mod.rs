//! Numerical building blocks: distributions and correlation handling.

pub mod correlation;
pub mod distributions;

pub use correlation::{
    CholeskyFactor, CorrelationMatrix, MatrixError, Regularized, DEFAULT_EIGENVALUE_FLOOR,
};
pub use distributions::{norm_cdf, DistributionError, Triangular};
