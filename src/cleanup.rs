//! Hemisphere mask cleanup
//!
//! Each raw flood region is closed and hole-filled on its own copy. Closing
//! can push a hemisphere into concavities of its neighbour, so voxels claimed
//! by both cleaned masks are handed back to the hemisphere the flood chose,
//! or dropped from both when the flood left them unlabelled.

use crate::error::{ensure_len, Result};
use crate::utils::{close, fill_holes};
use crate::watershed::{HemisphereLabels, LEFT_LABEL, RIGHT_LABEL};

/// Mask cleaner parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupParams {
    /// Closing iterations applied to each hemisphere
    pub closing_iterations: usize,
}

impl Default for CleanupParams {
    fn default() -> Self {
        Self { closing_iterations: 2 }
    }
}

/// Close then fill holes in a single mask
pub fn clean_mask(mask: &[u8], nx: usize, ny: usize, nz: usize, closing_iterations: usize) -> Vec<u8> {
    let closed = close(mask, nx, ny, nz, closing_iterations);
    fill_holes(&closed, nx, ny, nz)
}

/// Clean both hemisphere masks independently and keep them disjoint
///
/// # Arguments
/// * `raw` - Flood output (labels and per-hemisphere masks)
/// * `nx`, `ny`, `nz` - Array dimensions
/// * `params` - Closing iterations
///
/// # Returns
/// Tuple of (left, right) cleaned masks with no shared voxels
pub fn clean_hemispheres(
    raw: &HemisphereLabels,
    nx: usize, ny: usize, nz: usize,
    params: &CleanupParams,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let n_total = nx * ny * nz;
    ensure_len("labels", &raw.labels, n_total)?;
    ensure_len("left mask", &raw.left, n_total)?;
    ensure_len("right mask", &raw.right, n_total)?;

    let mut left = clean_mask(&raw.left, nx, ny, nz, params.closing_iterations);
    let mut right = clean_mask(&raw.right, nx, ny, nz, params.closing_iterations);

    let contested = resolve_overlap(&mut left, &mut right, &raw.labels);
    if contested > 0 {
        log::debug!("Cleanup: resolved {} voxels claimed by both hemispheres", contested);
    }

    Ok((left, right))
}

/// Remove voxels claimed by both masks, keeping the flood's choice
///
/// Returns the number of contested voxels.
pub fn resolve_overlap(left: &mut [u8], right: &mut [u8], labels: &[u8]) -> usize {
    let mut contested = 0usize;
    for idx in 0..labels.len() {
        if left[idx] == 0 || right[idx] == 0 {
            continue;
        }
        contested += 1;
        match labels[idx] {
            LEFT_LABEL => right[idx] = 0,
            RIGHT_LABEL => left[idx] = 0,
            _ => {
                left[idx] = 0;
                right[idx] = 0;
            }
        }
    }
    contested
}
