//! NIfTI file I/O
//!
//! Loads intensity and tissue-probability volumes from `.nii` / `.nii.gz`
//! and writes hemisphere masks back on the input grid with the input affine.
//! Byte-level functions report plain string errors; the path-level
//! functions wrap them in [`HemisplitError`].

use std::io::{Cursor, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};

use crate::error::{HemisplitError, Result};
use crate::volume::ScalarVolume;

/// On-disk voxel type for written volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NiftiDataType {
    /// 0/1 masks
    Uint8,
    Float32,
}

impl NiftiDataType {
    fn code(self) -> i16 {
        match self {
            NiftiDataType::Uint8 => 2,
            NiftiDataType::Float32 => 16,
        }
    }

    fn bitpix(self) -> i16 {
        match self {
            NiftiDataType::Uint8 => 8,
            NiftiDataType::Float32 => 32,
        }
    }
}

const HEADER_SIZE: usize = 348;
const VOX_OFFSET: usize = 352;

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Summarize the raw header fields for diagnostics
fn get_header_info(bytes: &[u8]) -> String {
    if bytes.len() < HEADER_SIZE {
        return format!("File too small ({} bytes, need at least {})", bytes.len(), HEADER_SIZE);
    }

    let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magic = String::from_utf8_lossy(&bytes[344..348]).to_string();
    let datatype = i16::from_le_bytes([bytes[70], bytes[71]]);

    format!("sizeof_hdr={}, magic='{}', datatype={}", sizeof_hdr, magic, datatype)
}

/// Get affine transformation matrix from header
///
/// Resolution order: sform, then qform, then a voxel-size diagonal.
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        let vsx = header.pixdim[1] as f64;
        let vsy = header.pixdim[2] as f64;
        let vsz = header.pixdim[3] as f64;
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Affine from the quaternion parameters (NIfTI-1 method 2)
fn qform_affine(header: &NiftiHeader) -> [f64; 16] {
    let b = header.quatern_b as f64;
    let c = header.quatern_c as f64;
    let d = header.quatern_d as f64;
    // Rounding in the stored b, c, d can push 1 - |bcd|^2 slightly negative
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let i = header.pixdim[1] as f64;
    let j = header.pixdim[2] as f64;
    let k = header.pixdim[3] as f64 * qfac;

    let r = [
        [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
        [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
        [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - b * b - c * c],
    ];
    let offset = [
        header.quatern_x as f64,
        header.quatern_y as f64,
        header.quatern_z as f64,
    ];

    let mut affine = [0.0; 16];
    for row in 0..3 {
        affine[row * 4] = r[row][0] * i;
        affine[row * 4 + 1] = r[row][1] * j;
        affine[row * 4 + 2] = r[row][2] * k;
        affine[row * 4 + 3] = offset[row];
    }
    affine[15] = 1.0;
    affine
}

/// Decode a NIfTI image from bytes
///
/// Gzip is auto-detected. 4D images contribute their first volume.
pub fn load_nifti(bytes: &[u8]) -> std::result::Result<ScalarVolume, String> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes))).map_err(|e| {
            let mut decompressed = Vec::new();
            let mut decoder = GzDecoder::new(Cursor::new(bytes));
            let info = if std::io::Read::read_to_end(&mut decoder, &mut decompressed).is_ok() {
                get_header_info(&decompressed)
            } else {
                "could not decompress".to_string()
            };
            format!("failed to read gzipped NIfTI: {} ({})", e, info)
        })?
    } else {
        let info = get_header_info(bytes);
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| format!("failed to read NIfTI: {} ({})", e, info))?
    };

    let header = obj.header();
    if (header.dim[0] as usize) < 3 {
        return Err(format!("expected at least 3D volume, got {}D", header.dim[0]));
    }

    let voxel_size = (
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    );
    let affine = get_affine(header);

    let array: Array<f64, _> = obj
        .into_volume()
        .into_ndarray()
        .map_err(|e| format!("failed to convert to ndarray: {}", e))?;

    let shape = array.shape().to_vec();
    if shape.len() < 3 {
        return Err(format!("expected at least 3D array, got {}D", shape.len()));
    }

    // nifti-rs may reorder axes; trust the array shape
    let (dim0, dim1, dim2) = (shape[0], shape[1], shape[2]);
    let mut data = Vec::with_capacity(dim0 * dim1 * dim2);
    for k in 0..dim2 {
        for j in 0..dim1 {
            for i in 0..dim0 {
                let v = if shape.len() == 3 {
                    array[[i, j, k]]
                } else {
                    array[[i, j, k, 0]]
                };
                data.push(v);
            }
        }
    }

    Ok(ScalarVolume {
        data,
        dims: (dim0, dim1, dim2),
        voxel_size,
        affine,
    })
}

/// Encode a volume as uncompressed single-file NIfTI-1 bytes
///
/// The sform is set from `affine` (sform_code 1, scanner anatomical).
pub fn save_nifti(
    data: &[f64],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
    datatype: NiftiDataType,
) -> std::result::Result<Vec<u8>, String> {
    let (nx, ny, nz) = dims;
    let (vsx, vsy, vsz) = voxel_size;

    if data.len() != nx * ny * nz {
        return Err(format!("data has {} voxels, dims {:?} need {}", data.len(), dims, nx * ny * nz));
    }
    let to_i16 = |d: usize| i16::try_from(d).map_err(|_| format!("dimension {} exceeds NIfTI-1 limit", d));

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());

    let dim: [i16; 8] = [3, to_i16(nx)?, to_i16(ny)?, to_i16(nz)?, 1, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    header[70..72].copy_from_slice(&datatype.code().to_le_bytes());
    header[72..74].copy_from_slice(&datatype.bitpix().to_le_bytes());

    let pixdim: [f32; 8] = [1.0, vsx as f32, vsy as f32, vsz as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    header[108..112].copy_from_slice(&(VOX_OFFSET as f32).to_le_bytes());
    // scl_slope = 1, scl_inter = 0
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());
    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());

    for row in 0..3 {
        for col in 0..4 {
            let offset = 280 + row * 16 + col * 4;
            header[offset..offset + 4].copy_from_slice(&(affine[row * 4 + col] as f32).to_le_bytes());
        }
    }

    header[344..348].copy_from_slice(b"n+1\0");

    let bytes_per_voxel = (datatype.bitpix() / 8) as usize;
    let mut buffer = Vec::with_capacity(VOX_OFFSET + data.len() * bytes_per_voxel);
    buffer.extend_from_slice(&header);
    // Empty extension block
    buffer.extend_from_slice(&[0u8; 4]);

    match datatype {
        NiftiDataType::Uint8 => {
            buffer.extend(data.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8));
        }
        NiftiDataType::Float32 => {
            for &v in data {
                buffer.extend_from_slice(&(v as f32).to_le_bytes());
            }
        }
    }

    Ok(buffer)
}

/// Gzip-compress encoded NIfTI bytes
fn gzip(bytes: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| format!("gzip compression failed: {}", e))?;
    encoder.finish().map_err(|e| format!("gzip finish failed: {}", e))
}

/// Read a NIfTI volume from a `.nii` or `.nii.gz` path
pub fn read_volume(path: &Path) -> Result<ScalarVolume> {
    let bytes = std::fs::read(path).map_err(|source| HemisplitError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_nifti(&bytes).map_err(|message| HemisplitError::Nifti {
        path: path.to_path_buf(),
        message,
    })
}

/// Write a volume, gzip-compressed when the path ends with `.nii.gz`
pub fn save_volume(
    path: &Path,
    data: &[f64],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
    datatype: NiftiDataType,
) -> Result<()> {
    let nifti_err = |message| HemisplitError::Nifti {
        path: path.to_path_buf(),
        message,
    };

    let raw = save_nifti(data, dims, voxel_size, affine, datatype).map_err(nifti_err)?;
    let bytes = if path.to_string_lossy().ends_with(".nii.gz") {
        gzip(&raw).map_err(nifti_err)?
    } else {
        raw
    };

    std::fs::write(path, &bytes).map_err(|source| HemisplitError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a binary mask as uint8 0/1
pub fn save_mask(
    path: &Path,
    mask: &[u8],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> Result<()> {
    let data: Vec<f64> = mask.iter().map(|&m| if m != 0 { 1.0 } else { 0.0 }).collect();
    save_volume(path, &data, dims, voxel_size, affine, NiftiDataType::Uint8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::IDENTITY_AFFINE;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hemisplit_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_affine_fallback_uses_pixdim() {
        let mut header = NiftiHeader::default();
        header.pixdim[1] = 1.0;
        header.pixdim[2] = 2.0;
        header.pixdim[3] = 3.0;
        header.sform_code = 0;
        header.qform_code = 0;

        let affine = get_affine(&header);
        assert_eq!(affine[0], 1.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[10], 3.0);
        assert_eq!(affine[15], 1.0);
    }

    #[test]
    fn test_affine_sform() {
        let mut header = NiftiHeader::default();
        header.sform_code = 1;
        header.srow_x = [1.0, 0.0, 0.0, 10.0];
        header.srow_y = [0.0, 2.0, 0.0, 20.0];
        header.srow_z = [0.0, 0.0, 3.0, 30.0];

        let affine = get_affine(&header);
        assert_eq!(affine[3], 10.0);
        assert_eq!(affine[7], 20.0);
        assert_eq!(affine[11], 30.0);
    }

    #[test]
    fn test_affine_qform_when_sform_unset() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 1;
        header.pixdim = [1.0, 2.0, 2.0, 3.0, 1.0, 1.0, 1.0, 1.0];
        // 180 degrees about z
        header.quatern_b = 0.0;
        header.quatern_c = 0.0;
        header.quatern_d = 1.0;
        header.quatern_x = -90.0;
        header.quatern_y = -126.0;
        header.quatern_z = -72.0;

        let affine = get_affine(&header);
        assert_eq!(affine, [
            -2.0, 0.0, 0.0, -90.0,
            0.0, -2.0, 0.0, -126.0,
            0.0, 0.0, 3.0, -72.0,
            0.0, 0.0, 0.0, 1.0,
        ]);

        // Negative qfac flips the third axis
        header.pixdim[0] = -1.0;
        assert_eq!(get_affine(&header)[10], -3.0);
    }

    #[test]
    fn test_load_qform_only_file_keeps_origin() {
        let dims = (3, 2, 2);
        let mut bytes = save_nifti(&[0.0; 12], dims, (1.0, 1.0, 1.0), &IDENTITY_AFFINE, NiftiDataType::Float32).unwrap();
        // sform_code = 0, qform_code = 1, identity rotation, offset (-90, -126, -72)
        bytes[252..254].copy_from_slice(&1i16.to_le_bytes());
        bytes[254..256].copy_from_slice(&0i16.to_le_bytes());
        for (offset, value) in [(268, -90.0f32), (272, -126.0), (276, -72.0)] {
            bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        let vol = load_nifti(&bytes).unwrap();
        assert_eq!(vol.dims, dims);
        assert_eq!((vol.affine[3], vol.affine[7], vol.affine[11]), (-90.0, -126.0, -72.0));
        assert_eq!((vol.affine[0], vol.affine[5], vol.affine[10]), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x00]));
        assert!(!is_gzip(&[0x00, 0x00, 0x00]));
        assert!(!is_gzip(&[0x1f]));
    }

    #[test]
    fn test_mask_header_is_uint8() {
        let data = vec![0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let bytes = save_nifti(&data, (2, 2, 2), (1.0, 1.0, 1.0), &IDENTITY_AFFINE, NiftiDataType::Uint8).unwrap();

        assert_eq!(bytes.len(), VOX_OFFSET + 8);
        assert_eq!(&bytes[344..348], b"n+1\0");
        assert_eq!(i16::from_le_bytes([bytes[70], bytes[71]]), 2);
        assert_eq!(i16::from_le_bytes([bytes[72], bytes[73]]), 8);
        assert_eq!(&bytes[VOX_OFFSET..], &[0, 1, 1, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_float_header_and_sform_rows() {
        let affine = [
            1.5, 0.0, 0.0, 5.0,
            0.0, 2.5, 0.0, 10.0,
            0.0, 0.0, 3.5, 15.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let bytes = save_nifti(&[0.0; 8], (2, 2, 2), (1.5, 2.5, 3.5), &affine, NiftiDataType::Float32).unwrap();

        assert_eq!(bytes.len(), VOX_OFFSET + 8 * 4);
        assert_eq!(i16::from_le_bytes([bytes[70], bytes[71]]), 16);
        assert_eq!(i16::from_le_bytes([bytes[254], bytes[255]]), 1);
        let srow_y3 = f32::from_le_bytes([bytes[308], bytes[309], bytes[310], bytes[311]]);
        assert_eq!(srow_y3, 10.0);
        let srow_z2 = f32::from_le_bytes([bytes[320], bytes[321], bytes[322], bytes[323]]);
        assert_eq!(srow_z2, 3.5);
    }

    #[test]
    fn test_save_rejects_wrong_length() {
        let result = save_nifti(&[0.0; 7], (2, 2, 2), (1.0, 1.0, 1.0), &IDENTITY_AFFINE, NiftiDataType::Float32);
        assert!(result.is_err());
    }

    #[test]
    fn test_float_roundtrip_gz_with_affine() {
        let dims = (4, 3, 2);
        let n = dims.0 * dims.1 * dims.2;
        let affine = [
            1.0, 0.1, 0.2, 10.0,
            0.3, 2.0, 0.4, 20.0,
            0.5, 0.6, 3.0, 30.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let data: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 + 1.0).collect();
        let path = temp_path("roundtrip.nii.gz");

        save_volume(&path, &data, dims, (1.0, 2.0, 3.0), &affine, NiftiDataType::Float32).unwrap();
        assert!(is_gzip(&std::fs::read(&path).unwrap()));

        let loaded = read_volume(&path).unwrap();
        assert_eq!(loaded.dims, dims);
        for i in 0..n {
            assert!((loaded.data[i] - data[i]).abs() < 1e-5, "data mismatch at {}", i);
        }
        for i in 0..16 {
            assert!((loaded.affine[i] - affine[i]).abs() < 1e-5, "affine[{}] mismatch", i);
        }

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_mask_roundtrip() {
        let dims = (3, 3, 3);
        let mask: Vec<u8> = (0..27).map(|i| (i % 2) as u8).collect();
        let path = temp_path("mask.nii");

        save_mask(&path, &mask, dims, (1.0, 1.0, 1.0), &IDENTITY_AFFINE).unwrap();
        let loaded = read_volume(&path).unwrap();
        let back: Vec<u8> = loaded.data.iter().map(|&v| v as u8).collect();
        assert_eq!(back, mask);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_invalid_bytes() {
        assert!(load_nifti(&[0u8; 10]).is_err());
        assert!(load_nifti(&[0x1f, 0x8b, 0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_header_info() {
        assert!(get_header_info(&[0u8; 10]).contains("too small"));

        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&348i32.to_le_bytes());
        bytes[70..72].copy_from_slice(&16i16.to_le_bytes());
        let info = get_header_info(&bytes);
        assert!(info.contains("sizeof_hdr=348"));
        assert!(info.contains("datatype=16"));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let result = read_volume(Path::new("/tmp/hemisplit_nonexistent_12345.nii"));
        assert!(matches!(result, Err(HemisplitError::Io { .. })));
    }
}
