//! Binary morphology on 3D masks
//!
//! Masks are `u8` volumes holding 0 or 1. The structuring element is the
//! face-connected cross (6-connectivity); `iterations` repeats it, so `n`
//! iterations act like a city-block ball of radius `n`.

use std::collections::VecDeque;

use super::{coords3d, face_neighbors, idx3d};

/// Number of foreground voxels in a mask
pub fn count(mask: &[u8]) -> usize {
    mask.iter().filter(|&&v| v != 0).count()
}

fn dilate_once(mask: &[u8], nx: usize, ny: usize, nz: usize) -> Vec<u8> {
    let mut out = mask.to_vec();
    for idx in 0..mask.len() {
        if mask[idx] != 0 {
            continue;
        }
        if face_neighbors(idx, nx, ny, nz).any(|n| mask[n] != 0) {
            out[idx] = 1;
        }
    }
    out
}

fn erode_once(mask: &[u8], nx: usize, ny: usize, nz: usize) -> Vec<u8> {
    let mut out = vec![0u8; mask.len()];
    for idx in 0..mask.len() {
        if mask[idx] == 0 {
            continue;
        }
        // Voxels outside the grid count as background
        let mut inside = 0;
        let mut all_set = true;
        for n in face_neighbors(idx, nx, ny, nz) {
            inside += 1;
            if mask[n] == 0 {
                all_set = false;
                break;
            }
        }
        if all_set && inside == 6 {
            out[idx] = 1;
        }
    }
    out
}

/// Dilate a binary mask `iterations` times with the 6-connected cross
pub fn dilate(mask: &[u8], nx: usize, ny: usize, nz: usize, iterations: usize) -> Vec<u8> {
    let mut result = mask.to_vec();
    for _ in 0..iterations {
        result = dilate_once(&result, nx, ny, nz);
    }
    result
}

/// Erode a binary mask `iterations` times with the 6-connected cross
///
/// Voxels on the grid border always erode on the first iteration, since
/// their missing neighbours are treated as background.
pub fn erode(mask: &[u8], nx: usize, ny: usize, nz: usize, iterations: usize) -> Vec<u8> {
    let mut result = mask.to_vec();
    for _ in 0..iterations {
        if count(&result) == 0 {
            break;
        }
        result = erode_once(&result, nx, ny, nz);
    }
    result
}

/// Morphological closing (dilation followed by erosion)
///
/// The mask is padded by `iterations` background voxels on every side before
/// the dilation so that foreground touching the grid edge is not eroded away
/// by the border, then cropped back to the original grid.
///
/// SciPy's `binary_closing` with `border_value=0` does not pad and so erodes
/// objects touching the edge; results differ from it only there.
pub fn close(mask: &[u8], nx: usize, ny: usize, nz: usize, iterations: usize) -> Vec<u8> {
    if iterations == 0 {
        return mask.to_vec();
    }

    let p = iterations;
    let (px, py, pz) = (nx + 2 * p, ny + 2 * p, nz + 2 * p);
    let mut padded = vec![0u8; px * py * pz];
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                padded[idx3d(i + p, j + p, k + p, px, py)] = mask[idx3d(i, j, k, nx, ny)];
            }
        }
    }

    let dilated = dilate(&padded, px, py, pz, iterations);
    let closed = erode(&dilated, px, py, pz, iterations);

    let mut result = vec![0u8; nx * ny * nz];
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                result[idx3d(i, j, k, nx, ny)] = closed[idx3d(i + p, j + p, k + p, px, py)];
            }
        }
    }
    result
}

/// Fill enclosed holes in a binary mask
///
/// Background components that are not connected (6-connectivity) to the grid
/// border are turned into foreground.
pub fn fill_holes(mask: &[u8], nx: usize, ny: usize, nz: usize) -> Vec<u8> {
    let n_total = nx * ny * nz;
    let mut outside = vec![false; n_total];
    let mut queue = VecDeque::new();

    for idx in 0..n_total {
        if mask[idx] != 0 {
            continue;
        }
        let (i, j, k) = coords3d(idx, nx, ny);
        if i == 0 || i == nx - 1 || j == 0 || j == ny - 1 || k == 0 || k == nz - 1 {
            outside[idx] = true;
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        for n in face_neighbors(idx, nx, ny, nz) {
            if mask[n] == 0 && !outside[n] {
                outside[n] = true;
                queue.push_back(n);
            }
        }
    }

    outside.iter().map(|&o| if o { 0 } else { 1 }).collect()
}

/// Label 6-connected foreground components
///
/// Returns the label volume (0 = background, components numbered from 1 in
/// scan order) and the voxel count of each component (`sizes[label - 1]`).
pub fn label_components(mask: &[u8], nx: usize, ny: usize, nz: usize) -> (Vec<u32>, Vec<usize>) {
    let n_total = nx * ny * nz;
    let mut labels = vec![0u32; n_total];
    let mut sizes = Vec::new();
    let mut stack = Vec::new();

    for start in 0..n_total {
        if mask[start] == 0 || labels[start] != 0 {
            continue;
        }

        let label = sizes.len() as u32 + 1;
        let mut size = 0usize;
        labels[start] = label;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            size += 1;
            for n in face_neighbors(idx, nx, ny, nz) {
                if mask[n] != 0 && labels[n] == 0 {
                    labels[n] = label;
                    stack.push(n);
                }
            }
        }

        sizes.push(size);
    }

    (labels, sizes)
}

/// Remove connected components smaller than `min_size` voxels
pub fn remove_small_objects(
    mask: &[u8],
    nx: usize, ny: usize, nz: usize,
    min_size: usize,
) -> Vec<u8> {
    let (labels, sizes) = label_components(mask, nx, ny, nz);
    let removed = sizes.iter().filter(|&&s| s < min_size).count();
    log::debug!(
        "remove_small_objects: {} components, {} below {} voxels",
        sizes.len(), removed, min_size
    );

    labels
        .iter()
        .map(|&l| {
            if l != 0 && sizes[(l - 1) as usize] >= min_size { 1 } else { 0 }
        })
        .collect()
}
