//! Common test utilities for hemisplit integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use hemisplit::pipeline::HemisphereParams;
use hemisplit::utils::idx3d;
use hemisplit::volume::{ScalarVolume, IDENTITY_AFFINE};

/// Synthetic head: uniform-intensity block brain with tissue maps summing to 1
pub struct Phantom {
    pub t1: ScalarVolume,
    pub white_matter: ScalarVolume,
    pub gray_matter: ScalarVolume,
    pub dims: (usize, usize, usize),
}

impl Phantom {
    /// Brain occupies `x_range` along the first axis and `lo..hi` along the others
    pub fn block(
        dims: (usize, usize, usize),
        x_range: std::ops::Range<usize>,
        lo: usize,
        hi: usize,
        affine: [f64; 16],
    ) -> Self {
        let (nx, ny, nz) = dims;
        let n_total = nx * ny * nz;
        let mut wm = vec![0.0; n_total];
        let mut gm = vec![0.0; n_total];
        let mut t1 = vec![5.0; n_total];

        for k in lo..hi {
            for j in lo..hi {
                for i in x_range.clone() {
                    let idx = idx3d(i, j, k, nx, ny);
                    wm[idx] = 0.7;
                    gm[idx] = 0.3;
                    t1[idx] = 100.0;
                }
            }
        }

        let voxel_size = (affine[0].abs(), affine[5].abs(), affine[10].abs());
        let wrap = |data| ScalarVolume::new(data, dims, voxel_size, affine).unwrap();
        Phantom {
            t1: wrap(t1),
            white_matter: wrap(wm),
            gray_matter: wrap(gm),
            dims,
        }
    }

    /// 10x10x10 grid with an 8x8x8 brain cube
    pub fn cube() -> Self {
        Phantom::block((10, 10, 10), 1..9, 1, 9, IDENTITY_AFFINE)
    }

    pub fn n_total(&self) -> usize {
        self.dims.0 * self.dims.1 * self.dims.2
    }
}

/// Parameters scaled down for phantoms of a few hundred voxels
pub fn small_params() -> HemisphereParams {
    let mut params = HemisphereParams::default();
    params.mask.min_object_size = 100;
    params.seeds.erosion_radius = 1;
    params.seeds.midline_margin = 0;
    params
}

/// Number of voxels set in both masks
pub fn overlap(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).filter(|(&x, &y)| x != 0 && y != 0).count()
}

/// True when every voxel of `inner` is also set in `outer`
pub fn is_subset(inner: &[u8], outer: &[u8]) -> bool {
    inner.iter().zip(outer).all(|(&i, &o)| i == 0 || o != 0)
}

/// Smallest and largest x index of a mask, `None` if it is empty
pub fn x_extent(mask: &[u8], nx: usize) -> Option<(usize, usize)> {
    let xs = mask.iter().enumerate().filter(|(_, &m)| m != 0).map(|(idx, _)| idx % nx);
    let (lo, hi) = xs.fold((usize::MAX, 0), |(lo, hi), x| (lo.min(x), hi.max(x)));
    (lo != usize::MAX).then_some((lo, hi))
}

/// Per-test scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hemisplit_it_{}_{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
