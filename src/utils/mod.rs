//! Volume utilities shared by the segmentation stages
//!
//! - Binary morphology (erosion, dilation, closing, hole filling,
//!   connected components)
//! - Gaussian smoothing and edge/gradient filters
//!
//! All volumes are flattened in Fortran order to match the NIfTI convention:
//! `index = x + y*nx + z*nx*ny`.

pub mod filters;
pub mod morphology;

pub use filters::*;
pub use morphology::*;

/// Convert 3D index to flat index (Fortran order / column-major, matches NIfTI)
#[inline(always)]
pub fn idx3d(i: usize, j: usize, k: usize, nx: usize, ny: usize) -> usize {
    i + j * nx + k * nx * ny
}

/// Convert a flat index back to (i, j, k)
#[inline(always)]
pub fn coords3d(idx: usize, nx: usize, ny: usize) -> (usize, usize, usize) {
    let k = idx / (nx * ny);
    let rem = idx % (nx * ny);
    (rem % nx, rem / nx, k)
}

/// Face-connected (6-connectivity) neighbours of a voxel that lie inside the grid
#[inline]
pub fn face_neighbors(idx: usize, nx: usize, ny: usize, nz: usize) -> impl Iterator<Item = usize> {
    let (i, j, k) = coords3d(idx, nx, ny);
    let plane = nx * ny;
    [
        (i > 0).then(|| idx - 1),
        (i + 1 < nx).then(|| idx + 1),
        (j > 0).then(|| idx - nx),
        (j + 1 < ny).then(|| idx + nx),
        (k > 0).then(|| idx - plane),
        (k + 1 < nz).then(|| idx + plane),
    ]
    .into_iter()
    .flatten()
}
