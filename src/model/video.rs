//! Metadata of the loaded video.

use std::path::PathBuf;

use crate::error::AnnotationError;

/// Identity and geometry of the video being annotated.
///
/// Supplied by the decoding side once the video is opened; fixed for the
/// whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Source file
    pub path: PathBuf,
    /// Native frame width in pixels
    pub width: u32,
    /// Native frame height in pixels
    pub height: u32,
    /// Total number of frames
    pub frame_count: usize,
    /// Frames per second
    pub fps: f64,
}

impl VideoInfo {
    /// Describe a video.
    pub fn new(
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        frame_count: usize,
        fps: f64,
    ) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            frame_count,
            fps,
        }
    }

    /// Reject videos without frames or without a resolution.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        if self.width == 0 || self.height == 0 {
            return Err(AnnotationError::validation(format!(
                "video resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.frame_count == 0 {
            return Err(AnnotationError::validation("video has no frames"));
        }
        Ok(())
    }

    /// File stem of the video, used as a folder label in exports.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video")
    }

    /// Timestamp of a frame in seconds.
    pub fn timestamp(&self, frame_index: usize) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }
}
