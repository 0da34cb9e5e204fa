//! Scalar volumes on a voxel grid

use crate::error::{HemisplitError, Result};

/// Row-major 4x4 identity affine
pub const IDENTITY_AFFINE: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// A 3D scalar field with its voxel-to-world transform
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarVolume {
    /// Voxel values, Fortran order (x varies fastest)
    pub data: Vec<f64>,
    /// Dimensions (nx, ny, nz)
    pub dims: (usize, usize, usize),
    /// Voxel sizes in mm
    pub voxel_size: (f64, f64, f64),
    /// Affine transformation matrix (4x4, row-major)
    pub affine: [f64; 16],
}

impl ScalarVolume {
    /// Wrap a flat buffer, checking it matches the dimensions
    pub fn new(
        data: Vec<f64>,
        dims: (usize, usize, usize),
        voxel_size: (f64, f64, f64),
        affine: [f64; 16],
    ) -> Result<Self> {
        let expected = dims.0 * dims.1 * dims.2;
        if data.len() != expected {
            return Err(HemisplitError::LengthMismatch {
                name: "volume",
                expected,
                found: data.len(),
            });
        }
        Ok(Self { data, dims, voxel_size, affine })
    }

    /// Unit-spaced volume with an identity affine
    pub fn from_data(data: Vec<f64>, dims: (usize, usize, usize)) -> Result<Self> {
        Self::new(data, dims, (1.0, 1.0, 1.0), IDENTITY_AFFINE)
    }

    pub fn n_voxels(&self) -> usize {
        self.data.len()
    }

    /// Check that `other` shares this volume's shape
    pub fn ensure_same_shape(&self, name: &'static str, other: &ScalarVolume) -> Result<()> {
        if other.dims != self.dims {
            return Err(HemisplitError::ShapeMismatch {
                name,
                expected: self.dims,
                found: other.dims,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(ScalarVolume::from_data(vec![0.0; 8], (2, 2, 2)).is_ok());
        assert!(matches!(
            ScalarVolume::from_data(vec![0.0; 7], (2, 2, 2)),
            Err(HemisplitError::LengthMismatch { expected: 8, found: 7, .. })
        ));
    }

    #[test]
    fn test_shape_check() {
        let a = ScalarVolume::from_data(vec![0.0; 8], (2, 2, 2)).unwrap();
        let b = ScalarVolume::from_data(vec![0.0; 8], (4, 2, 1)).unwrap();
        assert!(a.ensure_same_shape("b", &a).is_ok());
        assert!(matches!(
            a.ensure_same_shape("b", &b),
            Err(HemisplitError::ShapeMismatch { name: "b", .. })
        ));
    }
}
