//! Per-frame box storage.

use super::bbox::{BoundingBox, BoxId};

/// The boxes drawn on one video frame.
///
/// Boxes are kept in insertion order, which is also the draw (z) order.
/// Ids are handed out monotonically from `next_box_id`.
///
/// `dirty` means "touched since the last save", not "differs from the saved
/// boxes". Undo and redo are edits too and set it, so undoing back to the
/// saved boxes leaves the frame dirty until the next save.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: usize,
    boxes: Vec<BoundingBox>,
    next_box_id: BoxId,
    dirty: bool,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            boxes: Vec::new(),
            next_box_id: 1,
            dirty: false,
        }
    }

    /// Create a frame from existing boxes (e.g. after an import).
    ///
    /// The id counter continues after the largest existing id.
    pub fn with_boxes(index: usize, boxes: Vec<BoundingBox>) -> Self {
        let next_box_id = boxes.iter().map(|b| b.id).max().map_or(1, |id| id + 1);
        Self {
            index,
            boxes,
            next_box_id,
            dirty: false,
        }
    }

    /// Frame index within the video.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Boxes in draw order.
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Number of boxes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether the frame has no boxes.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Whether the frame has edits that were not exported yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Id the next added box will receive.
    pub fn next_box_id(&self) -> BoxId {
        self.next_box_id
    }

    /// Look up a box by id.
    pub fn get(&self, id: BoxId) -> Option<&BoundingBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    /// Position of a box in draw order.
    pub fn position(&self, id: BoxId) -> Option<usize> {
        self.boxes.iter().position(|b| b.id == id)
    }

    /// Topmost box containing the normalized point.
    pub fn box_at(&self, x: f64, y: f64) -> Option<&BoundingBox> {
        self.boxes.iter().rev().find(|b| b.geometry.contains(x, y))
    }

    /// Clear the dirty flag.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn set_next_box_id(&mut self, id: BoxId) {
        self.next_box_id = id;
    }

    /// Insert at a draw-order position (clamped to the end).
    pub(crate) fn insert(&mut self, position: usize, bbox: BoundingBox) {
        let position = position.min(self.boxes.len());
        self.boxes.insert(position, bbox);
        self.dirty = true;
    }

    pub(crate) fn push(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
        self.dirty = true;
    }

    /// Remove a box, returning it together with its former position.
    pub(crate) fn remove(&mut self, id: BoxId) -> Option<(usize, BoundingBox)> {
        let position = self.position(id)?;
        self.dirty = true;
        Some((position, self.boxes.remove(position)))
    }

    /// Replace a box with the same id in place, returning the old one.
    pub(crate) fn replace(&mut self, bbox: BoundingBox) -> Option<BoundingBox> {
        let slot = self.boxes.iter_mut().find(|b| b.id == bbox.id)?;
        self.dirty = true;
        Some(std::mem::replace(slot, bbox))
    }

    pub(crate) fn take_all(&mut self) -> Vec<BoundingBox> {
        self.dirty = true;
        std::mem::take(&mut self.boxes)
    }

    pub(crate) fn restore_all(&mut self, boxes: Vec<BoundingBox>) {
        self.boxes = boxes;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoxGeometry;

    fn sample(id: BoxId, xc: f64) -> BoundingBox {
        BoundingBox::new(id, 0, BoxGeometry::new(xc, 0.5, 0.2, 0.2))
    }

    #[test]
    fn test_new_frame_starts_ids_at_one() {
        let frame = Frame::new(3);
        assert_eq!(frame.index(), 3);
        assert_eq!(frame.next_box_id(), 1);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_with_boxes_continues_ids() {
        let frame = Frame::with_boxes(0, vec![sample(4, 0.5), sample(9, 0.3)]);
        assert_eq!(frame.next_box_id(), 10);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_remove_and_reinsert_keeps_order() {
        let mut frame = Frame::with_boxes(0, vec![sample(1, 0.2), sample(2, 0.5), sample(3, 0.8)]);
        let (pos, removed) = frame.remove(2).unwrap();
        assert_eq!(pos, 1);
        frame.insert(pos, removed);
        let ids: Vec<_> = frame.boxes().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_box_at_prefers_topmost() {
        let frame = Frame::with_boxes(0, vec![sample(1, 0.5), sample(2, 0.55)]);
        assert_eq!(frame.box_at(0.52, 0.5).map(|b| b.id), Some(2));
        assert_eq!(frame.box_at(0.41, 0.5).map(|b| b.id), Some(1));
        assert!(frame.box_at(0.05, 0.05).is_none());
    }

    #[test]
    fn test_replace_missing_returns_none() {
        let mut frame = Frame::new(0);
        assert!(frame.replace(sample(5, 0.5)).is_none());
        assert!(!frame.is_dirty());
    }
}
