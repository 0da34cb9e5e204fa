//! Surface meshes of hemisphere masks
//!
//! Interface for the downstream display step: a mask is turned into a
//! triangle mesh at the 0.5 iso-level in voxel coordinates, then mapped to
//! world coordinates with the volume affine. Rendering is left to the caller;
//! meshes can be exported as Wavefront OBJ.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{HemisplitError, Result};
use crate::utils::idx3d;

/// Iso-level separating inside (1) from outside (0) voxels
pub const ISO_LEVEL: f64 = 0.5;

/// Triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<[f64; 3]>,
    /// Counter-clockwise seen from outside
    pub faces: Vec<[usize; 3]>,
}

/// Extracts an isosurface mesh from a binary mask
pub trait IsosurfaceExtractor {
    /// Mesh in voxel coordinates (voxel centres at integer indices)
    fn extract(&self, mask: &[u8], nx: usize, ny: usize, nz: usize) -> SurfaceMesh;
}

/// Blocky isosurface made of the voxel faces between inside and outside
///
/// Every face lies exactly on the 0.5 level between a mask voxel and a
/// non-mask (or out-of-grid) neighbour. Shared corners are merged, so the
/// surface of each component is closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoxelFaceExtractor;

impl IsosurfaceExtractor for VoxelFaceExtractor {
    fn extract(&self, mask: &[u8], nx: usize, ny: usize, nz: usize) -> SurfaceMesh {
        let dims = [nx, ny, nz];
        let mut mesh = SurfaceMesh::default();
        let mut corner_index: HashMap<[usize; 3], usize> = HashMap::new();

        let inside = |p: [isize; 3]| -> bool {
            (0..3).all(|a| p[a] >= 0 && (p[a] as usize) < dims[a])
                && mask[idx3d(p[0] as usize, p[1] as usize, p[2] as usize, nx, ny)] != 0
        };

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    if mask[idx3d(i, j, k, nx, ny)] == 0 {
                        continue;
                    }
                    let pos = [i, j, k];
                    for axis in 0..3 {
                        for positive in [false, true] {
                            let mut neighbour = [i as isize, j as isize, k as isize];
                            neighbour[axis] += if positive { 1 } else { -1 };
                            if inside(neighbour) {
                                continue;
                            }

                            let b = (axis + 1) % 3;
                            let c = (axis + 2) % 3;
                            let mut quad = [0usize; 4];
                            for (q, &(db, dc)) in [(0, 0), (1, 0), (1, 1), (0, 1)].iter().enumerate() {
                                // Corner lattice: corner n sits at voxel coordinate n - 0.5
                                let mut corner = pos;
                                corner[axis] += usize::from(positive);
                                corner[b] += db;
                                corner[c] += dc;
                                let next = mesh.vertices.len();
                                quad[q] = *corner_index.entry(corner).or_insert_with(|| {
                                    mesh.vertices.push([
                                        corner[0] as f64 - ISO_LEVEL,
                                        corner[1] as f64 - ISO_LEVEL,
                                        corner[2] as f64 - ISO_LEVEL,
                                    ]);
                                    next
                                });
                            }
                            if !positive {
                                quad.reverse();
                            }
                            mesh.faces.push([quad[0], quad[1], quad[2]]);
                            mesh.faces.push([quad[0], quad[2], quad[3]]);
                        }
                    }
                }
            }
        }

        mesh
    }
}

/// Map voxel coordinates to world coordinates with a row-major 4x4 affine
pub fn apply_affine(affine: &[f64; 16], vertices: &[[f64; 3]]) -> Vec<[f64; 3]> {
    vertices
        .iter()
        .map(|v| {
            let mut out = [0.0; 3];
            for (row, o) in out.iter_mut().enumerate() {
                let m = &affine[row * 4..row * 4 + 4];
                *o = m[0] * v[0] + m[1] * v[1] + m[2] * v[2] + m[3];
            }
            out
        })
        .collect()
}

/// Write a mesh as Wavefront OBJ
pub fn write_obj(path: &Path, mesh: &SurfaceMesh) -> Result<()> {
    let io_err = |source| HemisplitError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2]).map_err(io_err)?;
    }
    for f in &mesh.faces {
        writeln!(out, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1).map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}
