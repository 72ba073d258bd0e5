//! Annotation export and import.
//!
//! Formats implement the [`AnnotationFormat`] trait and are looked up through
//! a [`FormatRegistry`]. Exports work on an owned [`ProjectSnapshot`], render
//! every artifact in memory and commit them atomically, so a cancelled or
//! failed export never leaves partial files behind.
//!
//! ## Supported Formats
//!
//! - **YOLO TXT**: per-frame normalized boxes plus `classes.txt`
//! - **Pascal VOC XML**: per-frame integer pixel boxes
//! - **COCO JSON**: single `annotations.json` for the whole video
//!
//! ## Usage
//!
//! ```rust,ignore
//! use frame_annotator::format::{CancelToken, ExportOptions, FormatRegistry};
//!
//! let registry = FormatRegistry::new();
//! let snapshot = project.snapshot();
//! let result = registry.export("coco", &snapshot, out_dir, &ExportOptions::default(), &CancelToken::new())?;
//! ```

mod error;
pub mod formats;
mod output;
mod registry;
mod snapshot;
mod traits;
mod worker;

pub use error::FormatError;
pub use output::{Artifact, CancelToken, write_atomic};
pub use registry::FormatRegistry;
pub use snapshot::{FrameEntry, PixelBox, ProjectSnapshot};
pub use traits::{
    AnnotationFormat, ExportOptions, ExportResult, FormatWarning, ImportOptions, ImportResult,
    Rendered, WarningSeverity,
};
pub use worker::{ExportEvent, ExportJob, ExportWorker, JobId};
