//! Undo/Redo system for box editing.
//!
//! Every mutation of the annotation state is a [`Command`] carrying full
//! before/after box snapshots. A command knows how to apply and revert itself,
//! so replaying the history never recomputes state from partial diffs.

use std::collections::{BTreeMap, VecDeque};

use crate::model::{BoundingBox, Frame};

/// Sparse frame storage keyed by frame index.
pub type FrameMap = BTreeMap<usize, Frame>;

// ============================================================================
// Command Types
// ============================================================================

/// A reversible record of one state mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Append a box to a frame
    Add {
        /// Frame the box was added to
        frame_index: usize,
        /// The added box, id included
        bbox: BoundingBox,
        /// Whether the frame entry was materialized by this add
        created_frame: bool,
    },
    /// Remove a box
    Delete {
        /// Frame the box was removed from
        frame_index: usize,
        /// Draw-order position it occupied
        position: usize,
        /// The removed box (stored for undo)
        bbox: BoundingBox,
    },
    /// Change the position of a box, size unchanged
    Move {
        /// Frame index
        frame_index: usize,
        /// Box before the move
        before: BoundingBox,
        /// Box after the move
        after: BoundingBox,
    },
    /// Change the size of a box
    Resize {
        /// Frame index
        frame_index: usize,
        /// Box before the resize
        before: BoundingBox,
        /// Box after the resize
        after: BoundingBox,
    },
    /// Change the class of a box (geometry may change alongside)
    ChangeClass {
        /// Frame index
        frame_index: usize,
        /// Box before the change
        before: BoundingBox,
        /// Box after the change
        after: BoundingBox,
    },
    /// Clone every box of the previous frame into this one
    CopyFromPrevious {
        /// Destination frame
        frame_index: usize,
        /// The clones with their freshly assigned ids, in order
        copies: Vec<BoundingBox>,
        /// Whether the frame entry was materialized by the copy
        created_frame: bool,
    },
    /// Remove every box from a frame
    ClearFrame {
        /// Frame index
        frame_index: usize,
        /// All boxes that were cleared (stored for undo)
        boxes: Vec<BoundingBox>,
    },
}

impl Command {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            Command::Add { .. } => "Add box".to_string(),
            Command::Delete { .. } => "Delete box".to_string(),
            Command::Move { .. } => "Move box".to_string(),
            Command::Resize { .. } => "Resize box".to_string(),
            Command::ChangeClass { .. } => "Change class".to_string(),
            Command::CopyFromPrevious { copies, .. } => {
                format!("Copy {} boxes from previous frame", copies.len())
            }
            Command::ClearFrame { boxes, .. } => format!("Clear {} boxes", boxes.len()),
        }
    }

    /// Frame touched by this command.
    pub fn frame_index(&self) -> usize {
        match self {
            Command::Add { frame_index, .. }
            | Command::Delete { frame_index, .. }
            | Command::Move { frame_index, .. }
            | Command::Resize { frame_index, .. }
            | Command::ChangeClass { frame_index, .. }
            | Command::CopyFromPrevious { frame_index, .. }
            | Command::ClearFrame { frame_index, .. } => *frame_index,
        }
    }

    /// Apply the forward effect of this command.
    pub(crate) fn apply(&self, frames: &mut FrameMap) {
        match self {
            Command::Add {
                frame_index, bbox, ..
            } => {
                let frame = frames
                    .entry(*frame_index)
                    .or_insert_with(|| Frame::new(*frame_index));
                frame.push(*bbox);
                frame.set_next_box_id(bbox.id + 1);
            }
            Command::Delete {
                frame_index, bbox, ..
            } => {
                if let Some(frame) = frames.get_mut(frame_index) {
                    frame.remove(bbox.id);
                }
            }
            Command::Move {
                frame_index, after, ..
            }
            | Command::Resize {
                frame_index, after, ..
            }
            | Command::ChangeClass {
                frame_index, after, ..
            } => {
                if let Some(frame) = frames.get_mut(frame_index) {
                    frame.replace(*after);
                }
            }
            Command::CopyFromPrevious {
                frame_index,
                copies,
                ..
            } => {
                let frame = frames
                    .entry(*frame_index)
                    .or_insert_with(|| Frame::new(*frame_index));
                for bbox in copies {
                    frame.push(*bbox);
                }
                if let Some(last) = copies.last() {
                    frame.set_next_box_id(last.id + 1);
                }
            }
            Command::ClearFrame { frame_index, .. } => {
                if let Some(frame) = frames.get_mut(frame_index) {
                    frame.take_all();
                }
            }
        }
    }

    /// Apply the inverse effect of this command.
    pub(crate) fn revert(&self, frames: &mut FrameMap) {
        match self {
            Command::Add {
                frame_index,
                bbox,
                created_frame,
            } => {
                if *created_frame {
                    frames.remove(frame_index);
                } else if let Some(frame) = frames.get_mut(frame_index) {
                    frame.remove(bbox.id);
                    frame.set_next_box_id(bbox.id);
                }
            }
            Command::Delete {
                frame_index,
                position,
                bbox,
            } => {
                if let Some(frame) = frames.get_mut(frame_index) {
                    frame.insert(*position, *bbox);
                }
            }
            Command::Move {
                frame_index,
                before,
                ..
            }
            | Command::Resize {
                frame_index,
                before,
                ..
            }
            | Command::ChangeClass {
                frame_index,
                before,
                ..
            } => {
                if let Some(frame) = frames.get_mut(frame_index) {
                    frame.replace(*before);
                }
            }
            Command::CopyFromPrevious {
                frame_index,
                copies,
                created_frame,
            } => {
                if *created_frame {
                    frames.remove(frame_index);
                } else if let Some(frame) = frames.get_mut(frame_index) {
                    for bbox in copies.iter().rev() {
                        frame.remove(bbox.id);
                    }
                    if let Some(first) = copies.first() {
                        frame.set_next_box_id(first.id);
                    }
                }
            }
            Command::ClearFrame {
                frame_index,
                boxes,
            } => {
                if let Some(frame) = frames.get_mut(frame_index) {
                    frame.restore_all(boxes.clone());
                }
            }
        }
    }
}

// ============================================================================
// Command Stack
// ============================================================================

/// Configuration for the command stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of commands to keep, `None` for unbounded
    pub max_depth: Option<usize>,
}

/// The undo/redo history.
///
/// Maintains two stacks:
/// - `undo_stack`: Commands that can be undone (most recent at the back)
/// - `redo_stack`: Commands that can be redone (most recent at the end)
///
/// Pushing a new command executes it, records it, and clears the redo stack.
#[derive(Debug, Clone, Default)]
pub struct CommandStack {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    config: HistoryConfig,
}

impl CommandStack {
    /// Create a new unbounded stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Execute a command against `frames` and record it.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, command: Command, frames: &mut FrameMap) {
        command.apply(frames);
        log::debug!("📝 Undo: pushed '{}'", command.description());
        self.undo_stack.push_back(command);
        self.redo_stack.clear();

        if let Some(max) = self.config.max_depth {
            while self.undo_stack.len() > max {
                if let Some(evicted) = self.undo_stack.pop_front() {
                    log::trace!("Evicted '{}' from undo history", evicted.description());
                }
            }
        }
    }

    /// Revert the most recent command.
    ///
    /// Returns the affected frame index, or `None` if there was nothing to undo.
    pub fn undo(&mut self, frames: &mut FrameMap) -> Option<usize> {
        let cmd = self.undo_stack.pop_back()?;
        log::debug!("⏪ Undo: '{}'", cmd.description());
        cmd.revert(frames);
        let frame_index = cmd.frame_index();
        self.redo_stack.push(cmd);
        Some(frame_index)
    }

    /// Re-apply the most recently undone command.
    ///
    /// Returns the affected frame index, or `None` if there was nothing to redo.
    pub fn redo(&mut self, frames: &mut FrameMap) -> Option<usize> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("⏩ Redo: '{}'", cmd.description());
        cmd.apply(frames);
        let frame_index = cmd.frame_index();
        self.undo_stack.push_back(cmd);
        Some(frame_index)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Get the description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    /// Get the number of commands in undo history
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of commands in redo history
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoxGeometry;

    fn bbox(id: u64, xc: f64) -> BoundingBox {
        BoundingBox::new(id, 0, BoxGeometry::new(xc, 0.5, 0.1, 0.1))
    }

    fn add(frame_index: usize, id: u64, created_frame: bool) -> Command {
        Command::Add {
            frame_index,
            bbox: bbox(id, 0.5),
            created_frame,
        }
    }

    #[test]
    fn test_undo_stack_basic() {
        let mut frames = FrameMap::new();
        let mut stack = CommandStack::new();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());

        stack.push(add(0, 1, true), &mut frames);
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(frames[&0].len(), 1);

        assert_eq!(stack.undo(&mut frames), Some(0));
        assert!(!stack.can_undo());
        assert!(stack.can_redo());
        assert!(frames.is_empty());

        assert_eq!(stack.redo(&mut frames), Some(0));
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(frames[&0].boxes()[0], bbox(1, 0.5));
    }

    #[test]
    fn test_empty_undo_redo_are_noops() {
        let mut frames = FrameMap::new();
        let mut stack = CommandStack::new();
        assert_eq!(stack.undo(&mut frames), None);
        assert_eq!(stack.redo(&mut frames), None);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut frames = FrameMap::new();
        let mut stack = CommandStack::new();

        stack.push(add(0, 1, true), &mut frames);
        stack.undo(&mut frames);
        assert!(stack.can_redo());

        // Push new command should clear redo
        stack.push(add(0, 1, true), &mut frames);
        assert!(!stack.can_redo());
        assert_eq!(stack.redo(&mut frames), None);
    }

    #[test]
    fn test_max_depth_evicts_oldest() {
        let mut frames = FrameMap::new();
        let mut stack = CommandStack::with_config(HistoryConfig { max_depth: Some(3) });

        stack.push(add(0, 1, true), &mut frames);
        for id in 2..=5 {
            stack.push(add(0, id, false), &mut frames);
        }

        assert_eq!(stack.undo_count(), 3);
        while stack.undo(&mut frames).is_some() {}
        // The two oldest adds can no longer be undone
        let ids: Vec<_> = frames[&0].boxes().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut frames = FrameMap::new();
        let mut stack = CommandStack::new();
        stack.push(add(0, 1, true), &mut frames);
        for id in 2..=500 {
            stack.push(add(0, id, false), &mut frames);
        }
        assert_eq!(stack.undo_count(), 500);
    }

    #[test]
    fn test_delete_restores_position() {
        let mut frames = FrameMap::new();
        frames.insert(0, Frame::with_boxes(0, vec![bbox(1, 0.2), bbox(2, 0.4), bbox(3, 0.6)]));
        let before = frames.clone();

        let mut stack = CommandStack::new();
        stack.push(
            Command::Delete {
                frame_index: 0,
                position: 1,
                bbox: bbox(2, 0.4),
            },
            &mut frames,
        );
        assert_eq!(frames[&0].len(), 2);

        stack.undo(&mut frames);
        assert_eq!(frames[&0].boxes(), before[&0].boxes());
    }

    #[test]
    fn test_modify_uses_snapshots() {
        let mut frames = FrameMap::new();
        frames.insert(0, Frame::with_boxes(0, vec![bbox(1, 0.2)]));
        let mut stack = CommandStack::new();

        let after = bbox(1, 0.7);
        stack.push(
            Command::Move {
                frame_index: 0,
                before: bbox(1, 0.2),
                after,
            },
            &mut frames,
        );
        for _ in 0..50 {
            stack.undo(&mut frames);
            stack.redo(&mut frames);
        }
        assert_eq!(frames[&0].boxes()[0], after);
        stack.undo(&mut frames);
        assert_eq!(frames[&0].boxes()[0], bbox(1, 0.2));
    }

    #[test]
    fn test_clear_frame_roundtrip() {
        let mut frames = FrameMap::new();
        frames.insert(4, Frame::with_boxes(4, vec![bbox(1, 0.2), bbox(2, 0.4)]));
        let original = frames[&4].boxes().to_vec();
        let mut stack = CommandStack::new();

        stack.push(
            Command::ClearFrame {
                frame_index: 4,
                boxes: original.clone(),
            },
            &mut frames,
        );
        assert!(frames[&4].is_empty());
        stack.undo(&mut frames);
        assert_eq!(frames[&4].boxes(), original.as_slice());
    }

    #[test]
    fn test_command_descriptions() {
        assert_eq!(add(0, 1, true).description(), "Add box");
        let copy = Command::CopyFromPrevious {
            frame_index: 2,
            copies: vec![bbox(1, 0.2), bbox(2, 0.4)],
            created_frame: true,
        };
        assert_eq!(copy.description(), "Copy 2 boxes from previous frame");
        assert_eq!(copy.frame_index(), 2);
    }
}
