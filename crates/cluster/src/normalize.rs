//! Batch-relative rescaling.
//!
//! Statistics are computed from the batch itself and thrown away afterwards;
//! nothing here is fitted once and reused across requests.

use ndarray::{Array2, Axis};

use crate::config::NormalizationMode;
use crate::error::ClusterError;

/// Pack a batch of embeddings into an `n x d` matrix, checking that every
/// vector has the same length and only finite values.
pub fn to_matrix(vectors: &[Vec<f32>]) -> Result<Array2<f32>, ClusterError> {
    let first = vectors.first().ok_or(ClusterError::EmptyInput)?;
    let dim = first.len();
    if dim == 0 {
        return Err(ClusterError::invalid("dimension", "must be at least 1"));
    }

    let mut flat = Vec::with_capacity(vectors.len() * dim);
    for (index, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(ClusterError::DimensionMismatch {
                index,
                expected: dim,
                found: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(ClusterError::NonFiniteValue { index });
        }
        flat.extend_from_slice(v);
    }

    Array2::from_shape_vec((vectors.len(), dim), flat)
        .map_err(|e| ClusterError::invalid("dimension", e.to_string()))
}

/// Validate and rescale a batch according to `mode`.
pub fn standardize(
    vectors: &[Vec<f32>],
    mode: NormalizationMode,
) -> Result<Array2<f32>, ClusterError> {
    let mut data = to_matrix(vectors)?;
    match mode {
        NormalizationMode::Standard => standardize_in_place(&mut data),
        NormalizationMode::L2 => l2_rows_in_place(&mut data),
        NormalizationMode::None => {}
    }
    Ok(data)
}

/// Rescale each column to zero mean and unit variance.
///
/// Uses the population standard deviation (divides by `n`). A column that is
/// constant across the batch has no spread to rescale and becomes all zeros.
pub fn standardize_in_place(data: &mut Array2<f32>) {
    let n = data.nrows();
    if n == 0 {
        return;
    }

    for mut column in data.axis_iter_mut(Axis(1)) {
        let mean = column.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
        let var = column
            .iter()
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;
        let std = var.sqrt();

        if std <= f64::EPSILON * mean.abs().max(1.0) {
            column.fill(0.0);
            continue;
        }

        for x in column.iter_mut() {
            *x = ((*x as f64 - mean) / std) as f32;
        }
    }
}

/// Scale each row to unit L2 length; all-zero rows stay zero.
pub fn l2_rows_in_place(data: &mut Array2<f32>) {
    for mut row in data.axis_iter_mut(Axis(0)) {
        let norm_sq: f32 = row.iter().map(|x| x * x).sum();
        if norm_sq > 0.0 {
            let inv = norm_sq.sqrt().recip();
            row.mapv_inplace(|x| x * inv);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(data: &Array2<f32>, j: usize) -> Vec<f32> {
        data.column(j).to_vec()
    }

    #[test]
    fn standard_mode_centers_and_scales_columns() {
        let vectors = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let out = standardize(&vectors, NormalizationMode::Standard).unwrap();

        for j in 0..2 {
            let col = column(&out, j);
            let mean: f32 = col.iter().sum::<f32>() / 3.0;
            let var: f32 = col.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / 3.0;
            assert!(mean.abs() < 1e-6, "column {j} mean = {mean}");
            assert!((var - 1.0).abs() < 1e-5, "column {j} population var = {var}");
        }

        // Population std of [1,2,3] is sqrt(2/3).
        let expected = -1.0 / (2.0f32 / 3.0).sqrt();
        assert!((out[[0, 0]] - expected).abs() < 1e-5);
    }

    #[test]
    fn zero_variance_dimension_becomes_zero() {
        let vectors = vec![
            vec![0.5, 7.0, 1.0],
            vec![0.5, 8.0, 2.0],
            vec![0.5, 9.0, 4.0],
        ];
        let out = standardize(&vectors, NormalizationMode::Standard).unwrap();
        assert_eq!(column(&out, 0), vec![0.0, 0.0, 0.0]);
        assert!(out.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn single_vector_batch_is_all_zero() {
        let out = standardize(&[vec![3.0, -1.0, 2.5]], NormalizationMode::Standard).unwrap();
        assert_eq!(out.shape(), &[1, 3]);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn identical_vectors_collapse_to_origin() {
        let v = vec![0.1, 0.2, 0.3, 0.4];
        let out =
            standardize(&[v.clone(), v.clone(), v], NormalizationMode::Standard).unwrap();
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn l2_mode_produces_unit_rows() {
        let out = standardize(
            &[vec![3.0, 4.0], vec![0.0, 0.0], vec![-1.0, 0.0]],
            NormalizationMode::L2,
        )
        .unwrap();
        assert!((out[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((out[[0, 1]] - 0.8).abs() < 1e-6);
        assert_eq!(out.row(1).to_vec(), vec![0.0, 0.0]);
        assert_eq!(out.row(2).to_vec(), vec![-1.0, 0.0]);
    }

    #[test]
    fn none_mode_is_identity() {
        let vectors = vec![vec![1.5, -2.0], vec![0.0, 4.0]];
        let out = standardize(&vectors, NormalizationMode::None).unwrap();
        assert_eq!(out.row(0).to_vec(), vectors[0]);
        assert_eq!(out.row(1).to_vec(), vectors[1]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = to_matrix(&[vec![1.0, 2.0], vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            ClusterError::DimensionMismatch {
                index: 2,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn empty_and_non_finite_batches_are_rejected() {
        assert_eq!(to_matrix(&[]).unwrap_err(), ClusterError::EmptyInput);
        assert_eq!(
            to_matrix(&[vec![1.0], vec![f32::NAN]]).unwrap_err(),
            ClusterError::NonFiniteValue { index: 1 }
        );
        assert!(to_matrix(&[vec![]]).is_err());
    }
}
