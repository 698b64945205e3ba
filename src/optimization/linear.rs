use nalgebra as na;

use crate::error::{AlignError, Result};

/// Singular values and right-singular vectors (as columns of `v`) of `a`.
///
/// Wide matrices are padded with zero rows so that `v` is always the full
/// `n x n` basis, null-space directions included.
pub fn svd(a: &na::DMatrix<f64>) -> Result<(na::DVector<f64>, na::DMatrix<f64>)> {
    let (rows, cols) = a.shape();
    let work = if rows < cols {
        let mut padded = na::DMatrix::<f64>::zeros(cols, cols);
        padded.view_mut((0, 0), (rows, cols)).copy_from(a);
        padded
    } else {
        a.clone()
    };
    let decomposition = work
        .try_svd(false, true, f64::EPSILON, 10_000)
        .ok_or_else(|| AlignError::DegenerateGeometry("svd did not converge".to_string()))?;
    let v_t = decomposition
        .v_t
        .ok_or_else(|| AlignError::DegenerateGeometry("svd returned no right vectors".to_string()))?;
    Ok((decomposition.singular_values, v_t.transpose()))
}
