//! Frame Annotator - annotation state core
//!
//! Holds the bounding boxes drawn on the frames of a video, the class list
//! they refer to and an undo history of every edit. Annotations are exported
//! to and imported from YOLO, Pascal VOC and COCO.
//!
//! ```rust,ignore
//! use frame_annotator::{AnnotationProject, BoxGeometry, VideoInfo};
//!
//! let video = VideoInfo::new("street.mp4", 1920, 1080, 900, 30.0);
//! let mut project = AnnotationProject::new(video)?;
//! project.add_box(0, 0, BoxGeometry::new(0.5, 0.5, 0.2, 0.3))?;
//! project.undo();
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod project;
pub mod undo;
pub mod viewport;

pub use config::{AnnotatorConfig, ConfigError, LogLevel};
pub use error::AnnotationError;
pub use format::{
    AnnotationFormat, CancelToken, ExportOptions, ExportResult, ExportWorker, FormatError,
    FormatRegistry, ImportOptions, ImportResult, ProjectSnapshot,
};
pub use model::{
    BoundingBox, BoxGeometry, BoxId, BoxUpdate, ClassId, ClassRegistry, Frame, VideoInfo,
};
pub use project::{AnnotationProject, ProjectStats};
pub use undo::{Command, CommandStack, HistoryConfig};
pub use viewport::{CoordinateMapper, EditHandle, ViewportConfig};
