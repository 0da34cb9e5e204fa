//! Smoothing and edge filters on 3D volumes
//!
//! All filters use reflect boundary handling (`d c b a | a b c d | d c b a`),
//! so a constant volume stays constant under smoothing and has zero edges.

use super::idx3d;

/// Map an out-of-range index back into `0..n` by reflection about the edges
#[inline]
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let mut m = i.rem_euclid(period);
    if m >= n {
        m = period - 1 - m;
    }
    m as usize
}

/// Normalized 1D Gaussian kernel with radius `round(4 * sigma)`
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-(x * x) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Correlate a 3D volume with a centered 1D kernel along one axis (0 = x, 1 = y, 2 = z)
fn correlate_axis(
    data: &[f64],
    nx: usize, ny: usize, nz: usize,
    kernel: &[f64],
    axis: usize,
) -> Vec<f64> {
    let radius = (kernel.len() / 2) as isize;
    let dims = [nx, ny, nz];
    let n = dims[axis];
    let mut result = vec![0.0f64; data.len()];

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let pos = [i, j, k];
                let mut sum = 0.0;
                for (t, &w) in kernel.iter().enumerate() {
                    let src = reflect_index(pos[axis] as isize + t as isize - radius, n);
                    let mut p = pos;
                    p[axis] = src;
                    sum += w * data[idx3d(p[0], p[1], p[2], nx, ny)];
                }
                result[idx3d(i, j, k, nx, ny)] = sum;
            }
        }
    }

    result
}

/// Isotropic 3D Gaussian smoothing
///
/// Separable convolution along x, y and z. `sigma == 0` returns a copy.
///
/// # Arguments
/// * `data` - Input volume (nx * ny * nz)
/// * `nx`, `ny`, `nz` - Array dimensions
/// * `sigma` - Gaussian standard deviation in voxels
pub fn gaussian_filter_3d(data: &[f64], nx: usize, ny: usize, nz: usize, sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return data.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let smoothed_x = correlate_axis(data, nx, ny, nz, &kernel, 0);
    let smoothed_xy = correlate_axis(&smoothed_x, nx, ny, nz, &kernel, 1);
    correlate_axis(&smoothed_xy, nx, ny, nz, &kernel, 2)
}

const SOBEL_SMOOTH: [f64; 3] = [0.25, 0.5, 0.25];
const SOBEL_EDGE: [f64; 3] = [1.0, 0.0, -1.0];

/// 2D Sobel edge magnitude of a single plane
///
/// The plane is stored column-major (`index = r + c * rows`). Returns
/// `sqrt((h^2 + v^2) / 2)` where `h` and `v` are the responses of the Sobel
/// kernel along each axis, with `[1, 2, 1] / 4` smoothing across it.
pub fn sobel_2d(plane: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let at = |r: isize, c: isize| plane[reflect_index(r, rows) + reflect_index(c, cols) * rows];
    let mut out = vec![0.0f64; rows * cols];

    for c in 0..cols as isize {
        for r in 0..rows as isize {
            let mut along_rows = 0.0;
            let mut along_cols = 0.0;
            for a in 0..3isize {
                for b in 0..3isize {
                    let v = at(r + a - 1, c + b - 1);
                    along_rows += SOBEL_EDGE[a as usize] * SOBEL_SMOOTH[b as usize] * v;
                    along_cols += SOBEL_SMOOTH[a as usize] * SOBEL_EDGE[b as usize] * v;
                }
            }
            out[r as usize + c as usize * rows] =
                ((along_rows * along_rows + along_cols * along_cols) / 2.0).sqrt();
        }
    }

    out
}

/// Gradient-magnitude estimate from stacks of 2D Sobel responses
///
/// Applies [`sobel_2d`] to every slice normal to z, to x and to y, and
/// combines the three stacks as a per-voxel Euclidean norm. This is the
/// slice-wise approximation of a 3D gradient, not a 3D Sobel operator.
pub fn slice_sobel_3d(data: &[f64], nx: usize, ny: usize, nz: usize) -> Vec<f64> {
    let n_total = nx * ny * nz;
    let mut sum_sq = vec![0.0f64; n_total];

    // Slices normal to z: plane over (x, y)
    for k in 0..nz {
        let plane: Vec<f64> = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| (i, j)))
            .map(|(i, j)| data[idx3d(i, j, k, nx, ny)])
            .collect();
        let edges = sobel_2d(&plane, nx, ny);
        for j in 0..ny {
            for i in 0..nx {
                let e = edges[i + j * nx];
                sum_sq[idx3d(i, j, k, nx, ny)] += e * e;
            }
        }
    }

    // Slices normal to x: plane over (y, z)
    for i in 0..nx {
        let plane: Vec<f64> = (0..nz)
            .flat_map(|k| (0..ny).map(move |j| (j, k)))
            .map(|(j, k)| data[idx3d(i, j, k, nx, ny)])
            .collect();
        let edges = sobel_2d(&plane, ny, nz);
        for k in 0..nz {
            for j in 0..ny {
                let e = edges[j + k * ny];
                sum_sq[idx3d(i, j, k, nx, ny)] += e * e;
            }
        }
    }

    // Slices normal to y: plane over (x, z)
    for j in 0..ny {
        let plane: Vec<f64> = (0..nz)
            .flat_map(|k| (0..nx).map(move |i| (i, k)))
            .map(|(i, k)| data[idx3d(i, j, k, nx, ny)])
            .collect();
        let edges = sobel_2d(&plane, nx, nz);
        for k in 0..nz {
            for i in 0..nx {
                let e = edges[i + k * nx];
                sum_sq[idx3d(i, j, k, nx, ny)] += e * e;
            }
        }
    }

    sum_sq.into_iter().map(f64::sqrt).collect()
}

/// True 3D gradient magnitude using central differences
pub fn central_gradient_magnitude(data: &[f64], nx: usize, ny: usize, nz: usize) -> Vec<f64> {
    let diff = [0.5, 0.0, -0.5];
    let gx = correlate_axis(data, nx, ny, nz, &diff, 0);
    let gy = correlate_axis(data, nx, ny, nz, &diff, 1);
    let gz = correlate_axis(data, nx, ny, nz, &diff, 2);

    gx.iter()
        .zip(&gy)
        .zip(&gz)
        .map(|((&x, &y), &z)| (x * x + y * y + z * z).sqrt())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
        assert_eq!(reflect_index(-3, 1), 0);
    }

    #[test]
    fn test_gaussian_kernel_normalized() {
        let kernel = gaussian_kernel(1.0);
        assert_eq!(kernel.len(), 9);
        assert_relative_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        // Peak is close to the continuous density 1 / sqrt(2 pi)
        assert_relative_eq!(kernel[4], 0.398_942, epsilon = 1e-4);
    }

    #[test]
    fn test_gaussian_preserves_constant() {
        let (nx, ny, nz) = (6, 5, 4);
        let data = vec![3.0; nx * ny * nz];
        let smoothed = gaussian_filter_3d(&data, nx, ny, nz, 1.5);
        for &v in &smoothed {
            assert_relative_eq!(v, 3.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_gaussian_preserves_mass_of_centered_impulse() {
        let n = 21;
        let mut data = vec![0.0; n * n * n];
        data[idx3d(10, 10, 10, n, n)] = 1.0;
        let smoothed = gaussian_filter_3d(&data, n, n, n, 1.0);
        assert_relative_eq!(smoothed.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
        assert!(smoothed[idx3d(10, 10, 10, n, n)] > smoothed[idx3d(11, 10, 10, n, n)]);
    }

    #[test]
    fn test_gaussian_zero_sigma_is_copy() {
        let data: Vec<f64> = (0..27).map(|i| i as f64).collect();
        assert_eq!(gaussian_filter_3d(&data, 3, 3, 3, 0.0), data);
    }

    #[test]
    fn test_sobel_2d_constant_is_zero() {
        let plane = vec![2.0; 5 * 4];
        assert!(sobel_2d(&plane, 5, 4).iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn test_sobel_2d_ramp() {
        // Unit ramp along rows: central difference [1, 0, -1] gives magnitude 2 inside
        let (rows, cols) = (6, 6);
        let plane: Vec<f64> = (0..rows * cols).map(|idx| (idx % rows) as f64).collect();
        let edges = sobel_2d(&plane, rows, cols);
        let interior = edges[3 + 3 * rows];
        assert_relative_eq!(interior, 2.0 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_slice_sobel_detects_step() {
        let n = 8;
        let mut data = vec![0.0; n * n * n];
        for k in 0..n {
            for j in 0..n {
                for i in n / 2..n {
                    data[idx3d(i, j, k, n, n)] = 1.0;
                }
            }
        }
        let edges = slice_sobel_3d(&data, n, n, n);
        assert!(edges[idx3d(n / 2, 4, 4, n, n)] > 0.1);
        assert!(edges[idx3d(0, 4, 4, n, n)].abs() < 1e-12);
        assert!(edges.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_central_gradient_linear_ramp() {
        let n = 5;
        let data: Vec<f64> = (0..n * n * n).map(|idx| (idx % n) as f64 * 2.0).collect();
        let grad = central_gradient_magnitude(&data, n, n, n);
        assert_relative_eq!(grad[idx3d(2, 2, 2, n, n)], 2.0, epsilon = 1e-12);
    }
}
