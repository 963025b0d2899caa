//! Splitting combined bi-hemisphere arrays
//!
//! A CIFTI dense scalar file packs the masked vertices of the left hemisphere
//! followed by those of the right. Unpacking one hemisphere scatters its block
//! of rows back onto the full hemisphere mesh, leaving medial-wall vertices
//! at zero.

use crate::atlas::RoiMasks;
use hcpdata_core::{Error, NdArray, Result, Side};

/// Project a combined array onto one hemisphere
///
/// The packed rows may lie along either the first or the last axis. When both
/// match the packed row count the array is taken as is.
///
/// # Errors
///
/// [`Error::Orientation`] if neither orientation has the packed row count.
pub fn split_hemisphere(combined: &NdArray, masks: &RoiMasks, side: Side) -> Result<NdArray> {
    let left = masks.left.nonzero();
    let right = masks.right.nonzero();
    let packed = left.len() + right.len();

    let oriented = match combined.shape().first() {
        Some(&lead) if lead == packed => combined.clone(),
        Some(_) if combined.shape().last() == Some(&packed) => combined.transpose(),
        _ => {
            return Err(Error::orientation(format!(
                "no dimension of shape {:?} matches {} packed vertices",
                combined.shape(),
                packed
            )));
        }
    };

    let (rows, targets, n_vertices) = match side {
        Side::Left => (0..left.len(), left, masks.left.len()),
        Side::Right => (left.len()..packed, right, masks.right.len()),
    };
    oriented.rows(rows)?.scatter_rows(n_vertices, &targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcpdata_core::ArrayData;

    fn masks() -> RoiMasks {
        RoiMasks::new(
            NdArray::from_bools(vec![true, false, true, true]),
            NdArray::from_bools(vec![false, true, true]),
        )
    }

    /// Five packed rows, two columns: row r holds (r + 1, 10 * (r + 1))
    fn combined() -> NdArray {
        let data = (1..=5).flat_map(|r| [r as f64, 10.0 * r as f64]).collect();
        NdArray::new(vec![5, 2], ArrayData::Float(data)).unwrap()
    }

    #[test]
    fn test_split_left() {
        let left = split_hemisphere(&combined(), &masks(), Side::Left).unwrap();
        assert_eq!(left.shape(), &[4, 2]);
        assert_eq!(
            left.as_floats().unwrap(),
            &[1.0, 10.0, 0.0, 0.0, 2.0, 20.0, 3.0, 30.0]
        );
    }

    #[test]
    fn test_split_right() {
        let right = split_hemisphere(&combined(), &masks(), Side::Right).unwrap();
        assert_eq!(right.shape(), &[3, 2]);
        assert_eq!(right.as_floats().unwrap(), &[0.0, 0.0, 4.0, 40.0, 5.0, 50.0]);
    }

    #[test]
    fn test_transposed_input() {
        let transposed = combined().transpose();
        assert_eq!(transposed.shape(), &[2, 5]);
        for side in [Side::Left, Side::Right] {
            assert_eq!(
                split_hemisphere(&transposed, &masks(), side).unwrap(),
                split_hemisphere(&combined(), &masks(), side).unwrap()
            );
        }
    }

    #[test]
    fn test_one_dimensional() {
        let flat = NdArray::from_floats(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let right = split_hemisphere(&flat, &masks(), Side::Right).unwrap();
        assert_eq!(right.as_floats().unwrap(), &[0.0, 4.0, 5.0]);
    }

    #[test]
    fn test_orientation_error() {
        let wrong = NdArray::new(vec![4, 3], ArrayData::Float(vec![0.0; 12])).unwrap();
        assert!(matches!(
            split_hemisphere(&wrong, &masks(), Side::Left),
            Err(Error::Orientation(_))
        ));
    }

    #[test]
    fn test_square_array_keeps_orientation() {
        let masks = RoiMasks::new(
            NdArray::from_bools(vec![true]),
            NdArray::from_bools(vec![true]),
        );
        let square =
            NdArray::new(vec![2, 2], ArrayData::Float(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
        let right = split_hemisphere(&square, &masks, Side::Right).unwrap();
        assert_eq!(right.as_floats().unwrap(), &[3.0, 4.0]);
    }
}
