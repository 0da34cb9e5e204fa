//! Seed planning for the hemisphere flood
//!
//! The brain mask is eroded to a conservative interior region and split at
//! the midline along the first (left-right) voxel axis. A band of
//! `2 * margin + 1` planes around the midline belongs to neither seed.

use crate::error::{ensure_len, Hemisphere, HemisplitError, Result};
use crate::utils::{coords3d, count, erode};

/// Seed planner parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedParams {
    /// One-voxel erosion iterations applied to the brain mask
    pub erosion_radius: usize,
    /// Half-width of the excluded band around the midline, in voxels
    pub midline_margin: usize,
    /// Midline override along the first axis; `None` uses `nx / 2`
    pub midline: Option<usize>,
}

impl Default for SeedParams {
    fn default() -> Self {
        Self {
            erosion_radius: 5,
            midline_margin: 2,
            midline: None,
        }
    }
}

/// Left and right seed masks
#[derive(Debug, Clone)]
pub struct SeedSets {
    pub left: Vec<u8>,
    pub right: Vec<u8>,
    /// Midline index along the first axis
    pub midline: usize,
}

/// Geometric midpoint of the first axis
///
/// Not data-driven: head tilt and off-centre positioning are ignored.
pub fn estimate_midline(nx: usize) -> usize {
    nx / 2
}

/// Erode the brain mask and split the interior into left/right seeds
///
/// # Arguments
/// * `brain_mask` - Binary brain mask (nx * ny * nz)
/// * `nx`, `ny`, `nz` - Array dimensions
/// * `params` - Erosion radius, midline margin and optional midline override
///
/// # Returns
/// Disjoint seed masks, or [`HemisplitError::EmptySeedSet`] naming the empty side
pub fn plan_seeds(
    brain_mask: &[u8],
    nx: usize, ny: usize, nz: usize,
    params: &SeedParams,
) -> Result<SeedSets> {
    let n_total = nx * ny * nz;
    ensure_len("brain mask", brain_mask, n_total)?;

    let midline = params.midline.unwrap_or_else(|| estimate_midline(nx));
    let margin = params.midline_margin;
    let safe = erode(brain_mask, nx, ny, nz, params.erosion_radius);
    log::debug!(
        "Seed region after {} erosions: {} voxels",
        params.erosion_radius,
        count(&safe)
    );

    // Signed bounds so a margin wider than the midline yields an empty side
    let left_limit = midline as i64 - margin as i64;
    let right_limit = midline as i64 + margin as i64;

    let mut left = vec![0u8; n_total];
    let mut right = vec![0u8; n_total];
    for idx in 0..n_total {
        if safe[idx] == 0 {
            continue;
        }
        let (i, _, _) = coords3d(idx, nx, ny);
        let i = i as i64;
        if i < left_limit {
            left[idx] = 1;
        } else if i > right_limit {
            right[idx] = 1;
        }
    }

    let empty_side = if count(&left) == 0 {
        Some(Hemisphere::Left)
    } else if count(&right) == 0 {
        Some(Hemisphere::Right)
    } else {
        None
    };
    if let Some(side) = empty_side {
        return Err(HemisplitError::EmptySeedSet {
            side,
            midline,
            margin,
            erosion_radius: params.erosion_radius,
        });
    }

    log::info!(
        "Seeds: midline x={}, left {} voxels, right {} voxels",
        midline,
        count(&left),
        count(&right)
    );

    Ok(SeedSets { left, right, midline })
}

/// Plan seeds with default parameters
pub fn plan_seeds_default(brain_mask: &[u8], nx: usize, ny: usize, nz: usize) -> Result<SeedSets> {
    plan_seeds(brain_mask, nx, ny, nz, &SeedParams::default())
}
