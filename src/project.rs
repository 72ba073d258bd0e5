//! The annotation project: frames, boxes and classes of one video.
//!
//! Every box mutation is validated first, then expressed as a [`Command`] and
//! run through the [`CommandStack`], so undo/redo is available for all of
//! them. Nothing is mutated when validation fails.

use std::collections::BTreeMap;

use crate::config::AnnotatorConfig;
use crate::error::AnnotationError;
use crate::format::ProjectSnapshot;
use crate::model::{
    BoundingBox, BoxGeometry, BoxId, BoxUpdate, ClassId, ClassRegistry, Frame, VideoInfo,
};
use crate::undo::{Command, CommandStack, FrameMap, HistoryConfig};

/// Summary counts of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectStats {
    /// Frames with at least one box
    pub annotated_frames: usize,
    /// Boxes across all frames
    pub total_boxes: usize,
    /// Box count per class, classes without boxes omitted
    pub boxes_per_class: BTreeMap<ClassId, usize>,
}

/// Annotation state of one video.
#[derive(Debug, Clone)]
pub struct AnnotationProject {
    video: VideoInfo,
    frames: FrameMap,
    classes: ClassRegistry,
    history: CommandStack,
    current_frame: usize,
    /// Bumped on every edit, undo, redo and class change
    revision: u64,
    saved_revision: u64,
}

impl AnnotationProject {
    /// Create an empty project with the default classes and unbounded history.
    pub fn new(video: VideoInfo) -> Result<Self, AnnotationError> {
        Self::with_config(video, &AnnotatorConfig::default())
    }

    /// Create an empty project using the history settings of `config`.
    pub fn with_config(video: VideoInfo, config: &AnnotatorConfig) -> Result<Self, AnnotationError> {
        video.validate()?;
        log::info!(
            "Opened project for {:?} ({}x{}, {} frames)",
            video.path,
            video.width,
            video.height,
            video.frame_count
        );
        Ok(Self {
            video,
            frames: FrameMap::new(),
            classes: ClassRegistry::new(),
            history: CommandStack::with_config(HistoryConfig::from(&config.history)),
            current_frame: 0,
            revision: 0,
            saved_revision: 0,
        })
    }

    /// Seed a project from imported annotations.
    ///
    /// History starts empty and every frame is clean.
    pub fn from_snapshot(
        snapshot: ProjectSnapshot,
        config: &AnnotatorConfig,
    ) -> Result<Self, AnnotationError> {
        snapshot.validate()?;
        let mut project = Self::with_config(snapshot.video, config)?;
        project.classes = snapshot.classes;
        project.frames = snapshot
            .frames
            .into_iter()
            .map(|entry| (entry.index, Frame::with_boxes(entry.index, entry.boxes)))
            .collect();
        log::info!(
            "Loaded {} boxes on {} frames",
            project.stats().total_boxes,
            project.frames.len()
        );
        Ok(project)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn video(&self) -> &VideoInfo {
        &self.video
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Frame state, `None` if no box was ever added to it.
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(&index)
    }

    /// Boxes of a frame in draw order.
    pub fn boxes(&self, index: usize) -> &[BoundingBox] {
        self.frames.get(&index).map(|f| f.boxes()).unwrap_or(&[])
    }

    /// Index of the frame being edited.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Boxes of the current frame, for rendering.
    pub fn current_boxes(&self) -> &[BoundingBox] {
        self.boxes(self.current_frame)
    }

    /// The undo history.
    pub fn history(&self) -> &CommandStack {
        &self.history
    }

    pub fn stats(&self) -> ProjectStats {
        let mut stats = ProjectStats::default();
        for frame in self.frames.values().filter(|f| !f.is_empty()) {
            stats.annotated_frames += 1;
            stats.total_boxes += frame.len();
            for bbox in frame.boxes() {
                *stats.boxes_per_class.entry(bbox.class_id).or_default() += 1;
            }
        }
        stats
    }

    /// Number of boxes in any frame that use `class_id`.
    pub fn class_usage(&self, class_id: ClassId) -> usize {
        self.frames
            .values()
            .flat_map(|f| f.boxes())
            .filter(|b| b.class_id == class_id)
            .count()
    }

    // ------------------------------------------------------------------------
    // Box editing
    // ------------------------------------------------------------------------

    /// Add a box to a frame and return its id.
    ///
    /// The extent is clamped into the frame.
    pub fn add_box(
        &mut self,
        frame_index: usize,
        class_id: ClassId,
        geometry: BoxGeometry,
    ) -> Result<BoxId, AnnotationError> {
        self.check_frame(frame_index)?;
        self.classes.ensure_assignable(class_id)?;
        let geometry = geometry.clamped()?;

        let (id, created_frame) = match self.frames.get(&frame_index) {
            Some(frame) => (frame.next_box_id(), false),
            None => (Frame::new(frame_index).next_box_id(), true),
        };
        let bbox = BoundingBox::new(id, class_id, geometry);
        self.execute(Command::Add {
            frame_index,
            bbox,
            created_frame,
        });
        Ok(id)
    }

    /// Remove a box and return it.
    pub fn delete_box(
        &mut self,
        frame_index: usize,
        box_id: BoxId,
    ) -> Result<BoundingBox, AnnotationError> {
        self.check_frame(frame_index)?;
        let (position, bbox) = self
            .frames
            .get(&frame_index)
            .and_then(|f| Some((f.position(box_id)?, *f.get(box_id)?)))
            .ok_or(AnnotationError::BoxNotFound {
                frame: frame_index,
                box_id,
            })?;

        self.execute(Command::Delete {
            frame_index,
            position,
            bbox,
        });
        Ok(bbox)
    }

    /// Change the class and/or geometry of a box and return the new box.
    ///
    /// Records a `ChangeClass` command if the class changes, `Move` if only
    /// the position changes and `Resize` otherwise. An update that changes
    /// nothing records no command.
    pub fn update_box(
        &mut self,
        frame_index: usize,
        box_id: BoxId,
        update: BoxUpdate,
    ) -> Result<BoundingBox, AnnotationError> {
        self.check_frame(frame_index)?;
        let before = self
            .frames
            .get(&frame_index)
            .and_then(|f| f.get(box_id))
            .copied()
            .ok_or(AnnotationError::BoxNotFound {
                frame: frame_index,
                box_id,
            })?;

        if let Some(class_id) = update.class_id.filter(|id| *id != before.class_id) {
            self.classes.ensure_assignable(class_id)?;
        }
        let update = BoxUpdate {
            class_id: update.class_id,
            geometry: update.geometry.map(|g| g.clamped()).transpose()?,
        };
        let after = before.with_update(&update);

        if after == before {
            log::trace!("Update of box {} on frame {} changes nothing", box_id, frame_index);
            return Ok(after);
        }

        let command = if after.class_id != before.class_id {
            Command::ChangeClass {
                frame_index,
                before,
                after,
            }
        } else if after.geometry.is_translation_of(&before.geometry) {
            Command::Move {
                frame_index,
                before,
                after,
            }
        } else {
            Command::Resize {
                frame_index,
                before,
                after,
            }
        };
        self.execute(command);
        Ok(after)
    }

    /// Append clones of every box on the previous frame, with fresh ids.
    ///
    /// Returns the number of boxes copied. Frame 0 and an empty previous
    /// frame copy nothing and record no command.
    pub fn copy_from_previous_frame(&mut self, frame_index: usize) -> Result<usize, AnnotationError> {
        self.check_frame(frame_index)?;
        if frame_index == 0 {
            log::debug!("No frame before frame 0, nothing to copy");
            return Ok(0);
        }

        let source = self.boxes(frame_index - 1);
        if source.is_empty() {
            log::warn!("Frame {} has no boxes to copy", frame_index - 1);
            return Ok(0);
        }

        let (first_id, created_frame) = match self.frames.get(&frame_index) {
            Some(frame) => (frame.next_box_id(), false),
            None => (Frame::new(frame_index).next_box_id(), true),
        };
        let copies: Vec<BoundingBox> = source
            .iter()
            .zip(first_id..)
            .map(|(bbox, id)| BoundingBox::new(id, bbox.class_id, bbox.geometry))
            .collect();
        let count = copies.len();

        self.execute(Command::CopyFromPrevious {
            frame_index,
            copies,
            created_frame,
        });
        Ok(count)
    }

    /// Remove every box from a frame. Returns the number removed.
    pub fn clear_frame(&mut self, frame_index: usize) -> Result<usize, AnnotationError> {
        self.check_frame(frame_index)?;
        let boxes = self.boxes(frame_index).to_vec();
        if boxes.is_empty() {
            return Ok(0);
        }
        let count = boxes.len();
        self.execute(Command::ClearFrame { frame_index, boxes });
        Ok(count)
    }

    fn execute(&mut self, command: Command) {
        self.history.push(command, &mut self.frames);
        self.revision += 1;
    }

    fn check_frame(&self, index: usize) -> Result<(), AnnotationError> {
        if index < self.video.frame_count {
            Ok(())
        } else {
            Err(AnnotationError::FrameIndexOutOfRange {
                index,
                frame_count: self.video.frame_count,
            })
        }
    }

    // ------------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------------

    /// Undo the last edit. Returns the affected frame, `None` if there was
    /// nothing to undo.
    pub fn undo(&mut self) -> Option<usize> {
        let frame = self.history.undo(&mut self.frames)?;
        self.revision += 1;
        Some(frame)
    }

    /// Redo the last undone edit. Returns the affected frame, `None` if there
    /// was nothing to redo.
    pub fn redo(&mut self) -> Option<usize> {
        let frame = self.history.redo(&mut self.frames)?;
        self.revision += 1;
        Some(frame)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Make `index` the current frame.
    pub fn set_current_frame(&mut self, index: usize) -> Result<(), AnnotationError> {
        self.check_frame(index)?;
        self.current_frame = index;
        log::trace!("Current frame {}", index);
        Ok(())
    }

    /// Step forward one frame, stopping at the last. Returns the new index.
    pub fn next_frame(&mut self) -> usize {
        self.skip_frames(1)
    }

    /// Step back one frame, stopping at the first. Returns the new index.
    pub fn previous_frame(&mut self) -> usize {
        self.skip_frames(-1)
    }

    pub fn first_frame(&mut self) -> usize {
        self.current_frame = 0;
        self.current_frame
    }

    pub fn last_frame(&mut self) -> usize {
        self.current_frame = self.video.frame_count - 1;
        self.current_frame
    }

    /// Move by `delta` frames, clamped to the video. Returns the new index.
    pub fn skip_frames(&mut self, delta: isize) -> usize {
        let last = self.video.frame_count - 1;
        self.current_frame = self.current_frame.saturating_add_signed(delta).min(last);
        self.current_frame
    }

    // ------------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------------

    /// Register a custom class and return its id.
    pub fn add_custom_class(&mut self, name: &str) -> Result<ClassId, AnnotationError> {
        let id = self.classes.add_custom_class(name)?;
        self.revision += 1;
        Ok(id)
    }

    /// Retire a class so it can no longer be assigned.
    ///
    /// The id stays reserved. Rejected while any box uses the class.
    pub fn remove_class(&mut self, class_id: ClassId) -> Result<(), AnnotationError> {
        self.classes.class_name_of(class_id)?;
        let references = self.class_usage(class_id);
        if references > 0 {
            return Err(AnnotationError::ClassInUse {
                id: class_id,
                references,
            });
        }
        self.classes.retire(class_id)?;
        self.revision += 1;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Snapshots and save state
    // ------------------------------------------------------------------------

    /// Owned copy of the annotations for export.
    pub fn snapshot(&self) -> ProjectSnapshot {
        let frames = self
            .frames
            .iter()
            .map(|(index, frame)| (*index, frame.boxes().to_vec()))
            .collect();
        ProjectSnapshot::new(self.video.clone(), self.classes.clone(), frames)
    }

    /// Whether anything changed since the last [`mark_saved`](Self::mark_saved).
    ///
    /// Every command, undo and redo counts, even one that returns the boxes to
    /// their saved state.
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Frames with edits since the last save, ascending.
    pub fn dirty_frames(&self) -> Vec<usize> {
        self.frames
            .values()
            .filter(|f| f.is_dirty())
            .map(|f| f.index())
            .collect()
    }

    /// Record that the current state has been written out.
    pub fn mark_saved(&mut self) {
        for frame in self.frames.values_mut() {
            frame.mark_clean();
        }
        self.saved_revision = self.revision;
        log::debug!("Project marked as saved at revision {}", self.revision);
    }
}
