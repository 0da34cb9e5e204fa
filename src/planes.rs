//! Mid-plane overlays for visual checking
//!
//! Extracts the axial, coronal and sagittal slices through the grid centre,
//! renders the intensity in gray with the left hemisphere tinted red and the
//! right hemisphere tinted blue, and writes the three panels side by side as
//! a PNG. Slices are rotated 90 degrees counter-clockwise so the second (or
//! third) voxel axis points up.

use std::path::Path;

use crate::error::{HemisplitError, Result};
use crate::utils::idx3d;

/// Overlay opacity of the hemisphere tints
pub const OVERLAY_ALPHA: f64 = 0.35;
/// Left hemisphere tint
pub const LEFT_TINT: [u8; 3] = [203, 24, 29];
/// Right hemisphere tint
pub const RIGHT_TINT: [u8; 3] = [33, 113, 181];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneOrientation {
    /// Normal to z, through `nz / 2`
    Axial,
    /// Normal to y, through `ny / 2`
    Coronal,
    /// Normal to x, through `nx / 2`
    Sagittal,
}

/// RGB slice image, row-major from the top-left pixel
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlane {
    pub orientation: PlaneOrientation,
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

impl OverlayPlane {
    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        let p = (row * self.width + col) * 3;
        [self.rgb[p], self.rgb[p + 1], self.rgb[p + 2]]
    }
}

fn blend(base: u8, tint: u8) -> u8 {
    ((1.0 - OVERLAY_ALPHA) * base as f64 + OVERLAY_ALPHA * tint as f64).round() as u8
}

/// Render one mid-plane
///
/// `voxel(col, row_from_bottom)` maps a pixel to its flat voxel index.
fn render_plane<F>(
    orientation: PlaneOrientation,
    width: usize,
    height: usize,
    intensity: &[f64],
    left: &[u8],
    right: &[u8],
    voxel: F,
) -> OverlayPlane
where
    F: Fn(usize, usize) -> usize,
{
    // Gray levels are scaled to the slice range
    let (lo, hi) = (0..height)
        .flat_map(|r| (0..width).map(move |c| (c, r)))
        .map(|(c, r)| intensity[voxel(c, r)])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = hi - lo;

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let idx = voxel(col, height - 1 - row);
            let gray = if range > 0.0 {
                ((intensity[idx] - lo) / range * 255.0).round() as u8
            } else {
                0
            };
            let mut px = [gray; 3];
            if left[idx] != 0 {
                px = [blend(px[0], LEFT_TINT[0]), blend(px[1], LEFT_TINT[1]), blend(px[2], LEFT_TINT[2])];
            }
            if right[idx] != 0 {
                px = [blend(px[0], RIGHT_TINT[0]), blend(px[1], RIGHT_TINT[1]), blend(px[2], RIGHT_TINT[2])];
            }
            rgb.extend_from_slice(&px);
        }
    }

    OverlayPlane { orientation, width, height, rgb }
}

/// Extract the three mid-planes with hemisphere overlays
///
/// # Arguments
/// * `intensity` - Background volume, e.g. the T1 (nx * ny * nz)
/// * `left`, `right` - Hemisphere masks (nx * ny * nz)
/// * `nx`, `ny`, `nz` - Array dimensions
///
/// # Returns
/// Axial, coronal and sagittal planes, in that order
pub fn mid_planes(
    intensity: &[f64],
    left: &[u8],
    right: &[u8],
    nx: usize, ny: usize, nz: usize,
) -> [OverlayPlane; 3] {
    let (mx, my, mz) = (nx / 2, ny / 2, nz / 2);
    [
        render_plane(PlaneOrientation::Axial, nx, ny, intensity, left, right, |c, r| {
            idx3d(c, r, mz, nx, ny)
        }),
        render_plane(PlaneOrientation::Coronal, nx, nz, intensity, left, right, |c, r| {
            idx3d(c, my, r, nx, ny)
        }),
        render_plane(PlaneOrientation::Sagittal, ny, nz, intensity, left, right, |c, r| {
            idx3d(mx, c, r, nx, ny)
        }),
    ]
}

/// Lay planes out left to right on a black canvas
///
/// Returns (width, height, rgb).
pub fn compose_panels(planes: &[OverlayPlane]) -> (usize, usize, Vec<u8>) {
    let width: usize = planes.iter().map(|p| p.width).sum();
    let height = planes.iter().map(|p| p.height).max().unwrap_or(0);
    let mut rgb = vec![0u8; width * height * 3];

    let mut x0 = 0;
    for plane in planes {
        for row in 0..plane.height {
            let src = row * plane.width * 3;
            let dst = (row * width + x0) * 3;
            rgb[dst..dst + plane.width * 3].copy_from_slice(&plane.rgb[src..src + plane.width * 3]);
        }
        x0 += plane.width;
    }
    (width, height, rgb)
}

/// Write the mid-plane overlays as a single PNG
pub fn save_overlay_png(path: &Path, planes: &[OverlayPlane]) -> Result<()> {
    let (width, height, rgb) = compose_panels(planes);
    let to_u32 = |v: usize| {
        u32::try_from(v).map_err(|_| HemisplitError::Image {
            path: path.to_path_buf(),
            message: format!("panel size {} too large", v),
        })
    };
    image::save_buffer(path, &rgb, to_u32(width)?, to_u32(height)?, image::ColorType::Rgb8).map_err(|e| {
        HemisplitError::Image {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    log::info!("Saved {} ({}x{})", path.display(), width, height);
    Ok(())
}
