//! Error types for annotation state mutations.

use thiserror::Error;

/// Errors reported by the class registry and the annotation project.
///
/// Every variant is raised before any state is touched, so a caller can
/// present the message and carry on editing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    /// Invalid box geometry or class assignment
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the rejected value
        message: String,
    },

    /// Box id does not exist in the given frame
    #[error("Box {box_id} not found in frame {frame}")]
    BoxNotFound {
        /// Frame index that was searched
        frame: usize,
        /// The missing box id
        box_id: u64,
    },

    /// Frame index outside `[0, frame_count)`
    #[error("Frame index {index} out of range (video has {frame_count} frames)")]
    FrameIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of frames in the video
        frame_count: usize,
    },

    /// Class id not present in the registry
    #[error("Unknown class id {id}")]
    UnknownClass {
        /// The missing class id
        id: u32,
    },

    /// Class name already registered
    #[error("Class '{name}' already exists")]
    DuplicateClass {
        /// The rejected name
        name: String,
    },

    /// Class cannot be removed while boxes reference it
    #[error("Class {id} is used by {references} box(es)")]
    ClassInUse {
        /// The class id
        id: u32,
        /// Number of boxes still referencing it
        references: usize,
    },
}

impl AnnotationError {
    /// Create a validation error with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
