//! Hemisplit: left/right cerebral hemisphere segmentation
//!
//! Splits a T1-weighted brain volume into left and right hemisphere masks
//! using tissue probability maps and a seeded watershed over an edge field.
//!
//! # Modules
//! - `brain_mask`: Brain mask from white/gray matter probabilities
//! - `edges`: Smoothed edge-strength field
//! - `seeds`: Midline estimate and hemisphere seed sets
//! - `watershed`: Priority-flood watershed
//! - `cleanup`: Per-hemisphere closing, hole filling, overlap resolution
//! - `pipeline`: End-to-end segmentation and output writing
//! - `utils`: Morphology and filters
//! - `mesh`: Isosurface meshes for display
//! - `planes`: Mid-plane overlay images

// Core modules
pub mod error;
pub mod priority_queue;
pub mod volume;
pub mod utils;

// Pipeline stages
pub mod brain_mask;
pub mod edges;
pub mod seeds;
pub mod watershed;
pub mod cleanup;
pub mod pipeline;

// I/O modules
pub mod nifti_io;
pub mod mesh;
pub mod planes;

pub use error::{HemisplitError, Hemisphere, Result};
pub use pipeline::{
    run_from_files, segment_hemispheres, segment_hemispheres_with_progress, write_hemispheres,
    HemisphereParams, HemisphereSegmentation,
};
pub use volume::ScalarVolume;
pub use watershed::{LEFT_LABEL, RIGHT_LABEL};
