//! Hemisphere segmentation pipeline
//!
//! Chains the five stages in order:
//! 1. Brain mask from white/gray matter probabilities
//! 2. Edge field of the masked, smoothed intensity volume
//! 3. Midline seeds from the eroded brain mask
//! 4. Seeded watershed over the edge field
//! 5. Per-hemisphere closing and hole filling
//!
//! Every stage is a pure function of its inputs and parameters, so repeated
//! runs on the same data produce identical masks.

use std::path::{Path, PathBuf};

use crate::brain_mask::{build_brain_mask, MaskParams};
use crate::cleanup::{clean_hemispheres, CleanupParams};
use crate::edges::{compute_edge_field, EdgeParams};
use crate::error::{ensure_len, HemisplitError, Result};
use crate::nifti_io::{read_volume, save_mask};
use crate::seeds::{plan_seeds, SeedParams};
use crate::utils::count;
use crate::volume::ScalarVolume;
use crate::watershed::split_hemispheres;

/// Number of progress steps reported by [`segment_hemispheres_with_progress`]
pub const PIPELINE_STAGES: usize = 5;

/// Full pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HemisphereParams {
    pub mask: MaskParams,
    pub edges: EdgeParams,
    pub seeds: SeedParams,
    pub cleanup: CleanupParams,
}

impl HemisphereParams {
    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.mask.probability_threshold;
        if !threshold.is_finite() {
            return Err(HemisplitError::InvalidParameter {
                name: "probability_threshold",
                value: threshold,
            });
        }
        if !self.edges.sigma.is_finite() || self.edges.sigma < 0.0 {
            return Err(HemisplitError::InvalidParameter {
                name: "sigma",
                value: self.edges.sigma,
            });
        }
        Ok(())
    }
}

/// Result of a segmentation run
#[derive(Debug, Clone)]
pub struct HemisphereSegmentation {
    pub brain_mask: Vec<u8>,
    /// Raw flood labels (0 / 1 = left / 2 = right)
    pub labels: Vec<u8>,
    /// Cleaned left hemisphere mask
    pub left: Vec<u8>,
    /// Cleaned right hemisphere mask
    pub right: Vec<u8>,
    pub midline: usize,
    pub dims: (usize, usize, usize),
    pub voxel_size: (f64, f64, f64),
    /// Affine of the intensity volume, carried through unchanged
    pub affine: [f64; 16],
    /// One hemisphere came out of the flood empty
    pub degenerate: bool,
}

impl HemisphereSegmentation {
    pub fn left_count(&self) -> usize {
        count(&self.left)
    }

    pub fn right_count(&self) -> usize {
        count(&self.right)
    }
}

fn check_inputs(t1: &ScalarVolume, white_matter: &ScalarVolume, gray_matter: &ScalarVolume) -> Result<()> {
    t1.ensure_same_shape("white matter", white_matter)?;
    t1.ensure_same_shape("gray matter", gray_matter)?;
    let n_total = t1.dims.0 * t1.dims.1 * t1.dims.2;
    ensure_len("intensity", &t1.data, n_total)?;
    ensure_len("white matter", &white_matter.data, n_total)?;
    ensure_len("gray matter", &gray_matter.data, n_total)?;
    for (name, vol) in [("white matter", white_matter), ("gray matter", gray_matter)] {
        if vol.affine != t1.affine {
            log::warn!("{} affine differs from the intensity volume; using the intensity affine", name);
        }
    }
    Ok(())
}

/// Segment left and right hemispheres
///
/// # Arguments
/// * `t1` - Intensity volume; its affine is propagated to the outputs
/// * `white_matter`, `gray_matter` - Tissue probability maps on the same grid
/// * `params` - Pipeline configuration
pub fn segment_hemispheres(
    t1: &ScalarVolume,
    white_matter: &ScalarVolume,
    gray_matter: &ScalarVolume,
    params: &HemisphereParams,
) -> Result<HemisphereSegmentation> {
    segment_hemispheres_with_progress(t1, white_matter, gray_matter, params, |_, _| {})
}

/// Segment hemispheres with a progress callback
///
/// `progress_callback(stage, total)` is called after each completed stage.
pub fn segment_hemispheres_with_progress<F>(
    t1: &ScalarVolume,
    white_matter: &ScalarVolume,
    gray_matter: &ScalarVolume,
    params: &HemisphereParams,
    mut progress_callback: F,
) -> Result<HemisphereSegmentation>
where
    F: FnMut(usize, usize),
{
    check_inputs(t1, white_matter, gray_matter)?;
    params.validate()?;

    let (nx, ny, nz) = t1.dims;
    log::info!("Segmenting {}x{}x{} volume", nx, ny, nz);

    let brain_mask = build_brain_mask(
        &white_matter.data,
        &gray_matter.data,
        nx, ny, nz,
        &params.mask,
    )?;
    progress_callback(1, PIPELINE_STAGES);

    let edges = compute_edge_field(&t1.data, &brain_mask, nx, ny, nz, &params.edges)?;
    progress_callback(2, PIPELINE_STAGES);

    let seeds = plan_seeds(&brain_mask, nx, ny, nz, &params.seeds)?;
    progress_callback(3, PIPELINE_STAGES);

    let raw = split_hemispheres(&edges, &brain_mask, &seeds.left, &seeds.right, nx, ny, nz)?;
    drop(edges);
    let degenerate = raw.is_degenerate();
    if degenerate {
        log::warn!(
            "Degenerate flood: left {} voxels, right {} voxels; the midline (x={}) is probably wrong",
            count(&raw.left),
            count(&raw.right),
            seeds.midline
        );
    }
    progress_callback(4, PIPELINE_STAGES);

    let (left, right) = clean_hemispheres(&raw, nx, ny, nz, &params.cleanup)?;
    progress_callback(5, PIPELINE_STAGES);

    log::info!("Hemispheres: left {} voxels, right {} voxels", count(&left), count(&right));

    Ok(HemisphereSegmentation {
        brain_mask,
        labels: raw.labels,
        left,
        right,
        midline: seeds.midline,
        dims: t1.dims,
        voxel_size: t1.voxel_size,
        affine: t1.affine,
        degenerate,
    })
}

/// Output paths for a given prefix: `<prefix>_left.nii.gz`, `<prefix>_right.nii.gz`
pub fn output_paths(out_prefix: &Path) -> (PathBuf, PathBuf) {
    let prefix = out_prefix.to_string_lossy();
    (
        PathBuf::from(format!("{}_left.nii.gz", prefix)),
        PathBuf::from(format!("{}_right.nii.gz", prefix)),
    )
}

/// Write both hemisphere masks with the intensity volume's affine
pub fn write_hemispheres(seg: &HemisphereSegmentation, out_prefix: &Path) -> Result<(PathBuf, PathBuf)> {
    let (left_path, right_path) = output_paths(out_prefix);
    save_mask(&left_path, &seg.left, seg.dims, seg.voxel_size, &seg.affine)?;
    save_mask(&right_path, &seg.right, seg.dims, seg.voxel_size, &seg.affine)?;
    log::info!("Saved {} and {}", left_path.display(), right_path.display());
    Ok((left_path, right_path))
}

/// Load inputs, segment, and write the two masks
///
/// Nothing is written unless segmentation succeeds.
pub fn run_from_files(
    t1_path: &Path,
    white_matter_path: &Path,
    gray_matter_path: &Path,
    out_prefix: &Path,
    params: &HemisphereParams,
) -> Result<HemisphereSegmentation> {
    let t1 = read_volume(t1_path)?;
    let white_matter = read_volume(white_matter_path)?;
    let gray_matter = read_volume(gray_matter_path)?;

    let seg = segment_hemispheres(&t1, &white_matter, &gray_matter, params)?;
    write_hemispheres(&seg, out_prefix)?;
    Ok(seg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_match_reference_values() {
        let params = HemisphereParams::default();
        assert_eq!(params.mask.probability_threshold, 0.2);
        assert_eq!(params.mask.closing_iterations, 2);
        assert_eq!(params.mask.min_object_size, 2000);
        assert_eq!(params.edges.sigma, 1.0);
        assert_eq!(params.seeds.erosion_radius, 5);
        assert_eq!(params.seeds.midline_margin, 2);
        assert_eq!(params.seeds.midline, None);
        assert_eq!(params.cleanup.closing_iterations, 2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan_threshold() {
        let mut params = HemisphereParams::default();
        params.mask.probability_threshold = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(HemisplitError::InvalidParameter { name: "probability_threshold", .. })
        ));
    }

    #[test]
    fn test_output_paths() {
        let (l, r) = output_paths(Path::new("/data/hemis_watershed"));
        assert_eq!(l, PathBuf::from("/data/hemis_watershed_left.nii.gz"));
        assert_eq!(r, PathBuf::from("/data/hemis_watershed_right.nii.gz"));
    }

    #[test]
    fn test_shape_mismatch_reported_before_processing() {
        let t1 = ScalarVolume::from_data(vec![0.0; 8], (2, 2, 2)).unwrap();
        let wm = ScalarVolume::from_data(vec![0.0; 8], (2, 4, 1)).unwrap();
        let mut stages = 0;
        let result = segment_hemispheres_with_progress(&t1, &wm, &t1, &HemisphereParams::default(), |_, _| stages += 1);
        assert!(matches!(result, Err(HemisplitError::ShapeMismatch { name: "white matter", .. })));
        assert_eq!(stages, 0);
    }

    #[test]
    fn test_buffer_length_checked_before_processing() {
        let good = ScalarVolume::from_data(vec![0.5; 8], (2, 2, 2)).unwrap();
        // Fields are public, so a volume can disagree with its own dims
        let short_t1 = ScalarVolume { data: vec![0.0; 6], ..good.clone() };
        let mut stages = 0;
        let result = segment_hemispheres_with_progress(&short_t1, &good, &good, &HemisphereParams::default(), |_, _| stages += 1);
        assert!(matches!(
            result,
            Err(HemisplitError::LengthMismatch { name: "intensity", expected: 8, found: 6 })
        ));
        assert_eq!(stages, 0);
    }
}
