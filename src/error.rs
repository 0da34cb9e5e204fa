use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which hemisphere a seed set, label or mask refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Left,
    Right,
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hemisphere::Left => write!(f, "left"),
            Hemisphere::Right => write!(f, "right"),
        }
    }
}

/// Top-level error type for hemisphere segmentation.
#[derive(Debug, Error)]
pub enum HemisplitError {
    #[error("{name} volume has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    #[error("{name} buffer has {found} voxels, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("brain mask is empty after cleanup; check the probability threshold and tissue maps")]
    EmptyBrainMask,

    #[error(
        "{side} seed set is empty (midline {midline}, margin {margin}, erosion radius {erosion_radius}); \
         brain too small or off-centre for the current seed parameters"
    )]
    EmptySeedSet {
        side: Hemisphere,
        midline: usize,
        margin: usize,
        erosion_radius: usize,
    },

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("NIfTI error for '{}': {message}", path.display())]
    Nifti { path: PathBuf, message: String },

    #[error("image error for '{}': {message}", path.display())]
    Image { path: PathBuf, message: String },

    #[error("I/O error for '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for results using [`HemisplitError`].
pub type Result<T> = std::result::Result<T, HemisplitError>;

/// Check that a flattened volume holds exactly `expected` voxels
pub(crate) fn ensure_len<T>(name: &'static str, buf: &[T], expected: usize) -> Result<()> {
    if buf.len() != expected {
        return Err(HemisplitError::LengthMismatch {
            name,
            expected,
            found: buf.len(),
        });
    }
    Ok(())
}
