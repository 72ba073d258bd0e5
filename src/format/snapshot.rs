//! Immutable project snapshot handed to export and produced by import.

use std::collections::BTreeMap;

use crate::error::AnnotationError;
use crate::model::{BoundingBox, BoxGeometry, ClassId, ClassRegistry, VideoInfo};

/// Boxes of one annotated frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    /// Frame index
    pub index: usize,
    /// Boxes in insertion order
    pub boxes: Vec<BoundingBox>,
}

/// Read-only copy of everything an export needs.
///
/// Owns its data, so it can be moved to a worker thread while editing
/// continues on the live project. Only frames with at least one box are
/// listed, in ascending frame order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSnapshot {
    /// Video metadata
    pub video: VideoInfo,
    /// Class list at snapshot time
    pub classes: ClassRegistry,
    /// Annotated frames, ascending
    pub frames: Vec<FrameEntry>,
}

impl ProjectSnapshot {
    /// Build a snapshot from per-frame box lists, dropping empty frames.
    pub fn new(
        video: VideoInfo,
        classes: ClassRegistry,
        frames: BTreeMap<usize, Vec<BoundingBox>>,
    ) -> Self {
        let frames = frames
            .into_iter()
            .filter(|(_, boxes)| !boxes.is_empty())
            .map(|(index, boxes)| FrameEntry { index, boxes })
            .collect();
        Self {
            video,
            classes,
            frames,
        }
    }

    /// Boxes of a frame, empty if the frame has none.
    pub fn boxes(&self, index: usize) -> &[BoundingBox] {
        self.frames
            .binary_search_by_key(&index, |f| f.index)
            .map(|pos| self.frames[pos].boxes.as_slice())
            .unwrap_or(&[])
    }

    /// Number of frames with at least one box.
    pub fn annotated_frames(&self) -> usize {
        self.frames.len()
    }

    /// Total number of boxes.
    pub fn total_boxes(&self) -> usize {
        self.frames.iter().map(|f| f.boxes.len()).sum()
    }

    /// Check that every frame index is inside the video, every class is
    /// known and every box has a usable geometry.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        self.video.validate()?;
        for frame in &self.frames {
            if frame.index >= self.video.frame_count {
                return Err(AnnotationError::FrameIndexOutOfRange {
                    index: frame.index,
                    frame_count: self.video.frame_count,
                });
            }
            for (i, bbox) in frame.boxes.iter().enumerate() {
                if !self.classes.contains(bbox.class_id) {
                    return Err(AnnotationError::UnknownClass { id: bbox.class_id });
                }
                bbox.geometry.validate()?;
                if frame.boxes[..i].iter().any(|b| b.id == bbox.id) {
                    return Err(AnnotationError::validation(format!(
                        "duplicate box id {} in frame {}",
                        bbox.id, frame.index
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Collects imported boxes per frame and numbers them from 1.
#[derive(Debug, Default)]
pub(crate) struct SnapshotBuilder {
    frames: BTreeMap<usize, Vec<BoundingBox>>,
}

impl SnapshotBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append boxes to a frame, assigning the next free ids.
    pub(crate) fn extend(
        &mut self,
        frame_index: usize,
        boxes: impl IntoIterator<Item = (ClassId, BoxGeometry)>,
    ) {
        let frame = self.frames.entry(frame_index).or_default();
        for (class_id, geometry) in boxes {
            let id = frame.len() as u64 + 1;
            frame.push(BoundingBox::new(id, class_id, geometry));
        }
    }

    pub(crate) fn finish(self, video: VideoInfo, classes: ClassRegistry) -> ProjectSnapshot {
        ProjectSnapshot::new(video, classes, self.frames)
    }
}

/// Integer pixel rectangle used by the VOC and COCO formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl PixelBox {
    /// Convert normalized geometry to pixels.
    ///
    /// Each corner is rounded half up and clamped to `[0, W-1] x [0, H-1]`.
    /// A side that collapses to zero length is widened to one pixel, toward
    /// the inside of the frame, so every exported box keeps an area.
    pub fn from_normalized(geometry: &BoxGeometry, width: u32, height: u32) -> Self {
        let (x1, y1, x2, y2) = geometry.corners();
        let (xmin, xmax) = pixel_span(x1, x2, width);
        let (ymin, ymax) = pixel_span(y1, y2, height);
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Convert back to normalized geometry.
    ///
    /// Returns `None` for rectangles without area.
    pub fn to_normalized(&self, width: u32, height: u32) -> Option<BoxGeometry> {
        if self.xmax <= self.xmin || self.ymax <= self.ymin || width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (width as f64, height as f64);
        Some(BoxGeometry::new(
            (self.xmin + self.xmax) as f64 / 2.0 / w,
            (self.ymin + self.ymax) as f64 / 2.0 / h,
            (self.xmax - self.xmin) as f64 / w,
            (self.ymax - self.ymin) as f64 / h,
        ))
    }

    pub fn width(&self) -> u32 {
        self.xmax.saturating_sub(self.xmin)
    }

    pub fn height(&self) -> u32 {
        self.ymax.saturating_sub(self.ymin)
    }
}

/// Pixel edges of one axis, at least one pixel apart when the frame allows.
fn pixel_span(lo: f64, hi: f64, extent: u32) -> (u32, u32) {
    let last = extent.saturating_sub(1);
    let to_px = |v: f64| round_half_up(v * extent as f64).clamp(0.0, last as f64) as u32;
    let (lo, hi) = (to_px(lo), to_px(hi));
    if hi > lo {
        (lo, hi)
    } else if lo < last {
        (lo, lo + 1)
    } else {
        (last.saturating_sub(1), last)
    }
}

/// Round to the nearest integer, ties toward positive infinity.
pub(crate) fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}
