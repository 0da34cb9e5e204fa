//! Brain mask construction from tissue probability maps
//!
//! A voxel is brain when its white + gray matter probability exceeds a
//! threshold. The raw threshold mask is then closed, hole-filled, and
//! stripped of small disconnected blobs.

use crate::error::{ensure_len, HemisplitError, Result};
use crate::utils::{close, count, fill_holes, remove_small_objects};

/// Brain mask builder parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskParams {
    /// Minimum summed tissue probability (strictly exceeded)
    pub probability_threshold: f64,
    /// Closing iterations applied to the thresholded mask
    pub closing_iterations: usize,
    /// Components with fewer voxels than this are discarded
    pub min_object_size: usize,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            probability_threshold: 0.2,
            closing_iterations: 2,
            min_object_size: 2000,
        }
    }
}

/// Threshold the summed tissue probabilities
///
/// Sum and comparison are done in single precision, the storage type of the
/// probability maps, so float32 0.1 + 0.1 does not exceed 0.2.
pub fn threshold_tissue(white_matter: &[f64], gray_matter: &[f64], threshold: f64) -> Vec<u8> {
    let threshold = threshold as f32;
    white_matter
        .iter()
        .zip(gray_matter)
        .map(|(&wm, &gm)| u8::from(wm as f32 + gm as f32 > threshold))
        .collect()
}

/// Build the binary brain mask
///
/// # Arguments
/// * `white_matter`, `gray_matter` - Tissue probability maps in [0, 1] (nx * ny * nz)
/// * `nx`, `ny`, `nz` - Array dimensions
/// * `params` - Threshold and cleanup settings
///
/// # Returns
/// Binary brain mask, or [`HemisplitError::EmptyBrainMask`] when nothing survives cleanup
pub fn build_brain_mask(
    white_matter: &[f64],
    gray_matter: &[f64],
    nx: usize, ny: usize, nz: usize,
    params: &MaskParams,
) -> Result<Vec<u8>> {
    let n_total = nx * ny * nz;
    ensure_len("white matter", white_matter, n_total)?;
    ensure_len("gray matter", gray_matter, n_total)?;

    let raw = threshold_tissue(white_matter, gray_matter, params.probability_threshold);
    log::debug!(
        "Tissue threshold {:.3}: {} voxels",
        params.probability_threshold,
        count(&raw)
    );

    let closed = close(&raw, nx, ny, nz, params.closing_iterations);
    let filled = fill_holes(&closed, nx, ny, nz);
    let mask = remove_small_objects(&filled, nx, ny, nz, params.min_object_size);

    let brain_voxels = count(&mask);
    if brain_voxels == 0 {
        return Err(HemisplitError::EmptyBrainMask);
    }
    log::info!(
        "Brain mask: {} voxels ({:.1}%)",
        brain_voxels,
        100.0 * brain_voxels as f64 / n_total as f64
    );

    Ok(mask)
}

/// Build the brain mask with default parameters
pub fn build_brain_mask_default(
    white_matter: &[f64],
    gray_matter: &[f64],
    nx: usize, ny: usize, nz: usize,
) -> Result<Vec<u8>> {
    build_brain_mask(white_matter, gray_matter, nx, ny, nz, &MaskParams::default())
}
