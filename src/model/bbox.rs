//! Bounding box data model in normalized frame coordinates.

use crate::error::AnnotationError;

/// Identifier of a box, unique within its frame.
pub type BoxId = u64;

/// Identifier of a class in the [`ClassRegistry`](super::ClassRegistry).
pub type ClassId = u32;

/// Box geometry as center and size, normalized to the native frame resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeometry {
    /// Horizontal center in `[0, 1]`
    pub x_center: f64,
    /// Vertical center in `[0, 1]`
    pub y_center: f64,
    /// Width as a fraction of the frame width
    pub width: f64,
    /// Height as a fraction of the frame height
    pub height: f64,
}

impl BoxGeometry {
    /// Create a geometry from center and size.
    pub fn new(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// Create a geometry from two opposite corners, in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (x_min, x_max) = (x1.min(x2), x1.max(x2));
        let (y_min, y_max) = (y1.min(y2), y1.max(y2));
        Self {
            x_center: (x_min + x_max) / 2.0,
            y_center: (y_min + y_max) / 2.0,
            width: x_max - x_min,
            height: y_max - y_min,
        }
    }

    /// Top-left and bottom-right corners `(x_min, y_min, x_max, y_max)`.
    pub fn corners(&self) -> (f64, f64, f64, f64) {
        (
            self.x_center - self.width / 2.0,
            self.y_center - self.height / 2.0,
            self.x_center + self.width / 2.0,
            self.y_center + self.height / 2.0,
        )
    }

    /// Check that every component is finite and the size is positive.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        let values = [self.x_center, self.y_center, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnnotationError::validation(format!(
                "box geometry must be finite, got {:?}",
                values
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(AnnotationError::validation(format!(
                "box size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Validate and clamp the box extent into the unit square.
    ///
    /// Geometry that already lies inside the frame is returned untouched so
    /// repeated clamping never introduces float drift.
    pub fn clamped(&self) -> Result<Self, AnnotationError> {
        self.validate()?;

        let (x_min, y_min, x_max, y_max) = self.corners();
        if x_min >= 0.0 && y_min >= 0.0 && x_max <= 1.0 && y_max <= 1.0 {
            return Ok(*self);
        }

        let (x_min, x_max) = (x_min.clamp(0.0, 1.0), x_max.clamp(0.0, 1.0));
        let (y_min, y_max) = (y_min.clamp(0.0, 1.0), y_max.clamp(0.0, 1.0));
        if x_max <= x_min || y_max <= y_min {
            return Err(AnnotationError::validation(format!(
                "box at ({}, {}) lies outside the frame",
                self.x_center, self.y_center
            )));
        }

        let clamped = Self::from_corners(x_min, y_min, x_max, y_max);
        log::trace!("Clamped box {:?} -> {:?}", self, clamped);
        Ok(clamped)
    }

    /// Check if a normalized point lies inside the box (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (x_min, y_min, x_max, y_max) = self.corners();
        x >= x_min && x <= x_max && y >= y_min && y <= y_max
    }

    /// Whether only the position differs from `other` (same size).
    pub fn is_translation_of(&self, other: &BoxGeometry) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// An annotated box on a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Id unique within the owning frame
    pub id: BoxId,
    /// Class this box belongs to
    pub class_id: ClassId,
    /// Normalized geometry
    pub geometry: BoxGeometry,
}

impl BoundingBox {
    /// Create a new box.
    pub fn new(id: BoxId, class_id: ClassId, geometry: BoxGeometry) -> Self {
        Self {
            id,
            class_id,
            geometry,
        }
    }

    /// Copy of this box with its update applied.
    pub fn with_update(&self, update: &BoxUpdate) -> Self {
        Self {
            id: self.id,
            class_id: update.class_id.unwrap_or(self.class_id),
            geometry: update.geometry.unwrap_or(self.geometry),
        }
    }
}

/// Requested change to an existing box.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxUpdate {
    /// New class, if changing
    pub class_id: Option<ClassId>,
    /// New geometry, if moving or resizing
    pub geometry: Option<BoxGeometry>,
}

impl BoxUpdate {
    /// Update that only replaces the geometry.
    pub fn geometry(geometry: BoxGeometry) -> Self {
        Self {
            class_id: None,
            geometry: Some(geometry),
        }
    }

    /// Update that only changes the class.
    pub fn class(class_id: ClassId) -> Self {
        Self {
            class_id: Some(class_id),
            geometry: None,
        }
    }

    /// Also change the class.
    pub fn with_class(mut self, class_id: ClassId) -> Self {
        self.class_id = Some(class_id);
        self
    }
}
