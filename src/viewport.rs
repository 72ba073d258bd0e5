//! Viewport pixel space to normalized frame space mapping.
//!
//! The frame is fitted into the viewport (preserving aspect ratio) and
//! centered. Zoom multiplies the fitted scale and pan shifts the result in
//! screen pixels:
//!
//! ```text
//! scale    = min(vw / fw, vh / fh) * zoom
//! origin_x = (vw - fw * scale) / 2 + pan_x
//! pixel_x  = origin_x + x_norm * fw * scale
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{BoundingBox, BoxGeometry, BoxId};

/// Minimum drag distance (screen pixels) on each axis for a new box.
pub const MIN_DRAG_PIXELS: f64 = 5.0;

/// How close (screen pixels, per axis) the pointer must be to grab a corner.
pub const HANDLE_TOLERANCE_PIXELS: f64 = 8.0;

/// Part of a box grabbed by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditHandle {
    /// Interior: the whole box follows the pointer
    Move,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl EditHandle {
    /// Which edges a drag moves: (left, top, right, bottom).
    fn edges(self) -> (bool, bool, bool, bool) {
        match self {
            EditHandle::Move => (true, true, true, true),
            EditHandle::NorthWest => (true, true, false, false),
            EditHandle::NorthEast => (false, true, true, false),
            EditHandle::SouthWest => (true, false, false, true),
            EditHandle::SouthEast => (false, false, true, true),
        }
    }
}

/// Zoom and pan limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Smallest zoom factor
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    /// Largest zoom factor
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
    /// Multiplicative step for zoom in/out and one scroll notch
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    /// How far (screen pixels) the view may travel past the frame edges
    #[serde(default = "default_pan_margin")]
    pub pan_margin: f64,
}

fn default_min_zoom() -> f64 {
    0.1
}

fn default_max_zoom() -> f64 {
    5.0
}

fn default_zoom_step() -> f64 {
    1.2
}

fn default_pan_margin() -> f64 {
    50.0
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
            pan_margin: default_pan_margin(),
        }
    }
}

/// Bidirectional transform between viewport pixels and normalized frame
/// coordinates under zoom and pan.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMapper {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
    viewport_width: f64,
    viewport_height: f64,
    config: ViewportConfig,
}

impl CoordinateMapper {
    /// Create a mapper for a viewport of the given size at zoom 1, no pan.
    pub fn new(viewport_width: f64, viewport_height: f64, config: ViewportConfig) -> Self {
        Self {
            zoom: 1.0_f64.clamp(config.min_zoom, config.max_zoom),
            pan_x: 0.0,
            pan_y: 0.0,
            viewport_width,
            viewport_height,
            config,
        }
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current pan offset in screen pixels.
    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    /// Zoom as a rounded percentage for status display.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    /// Viewport size in screen pixels.
    pub fn viewport_size(&self) -> (f64, f64) {
        (self.viewport_width, self.viewport_height)
    }

    /// Resize the viewport (window resize); pan is re-clamped.
    pub fn set_viewport_size(
        &mut self,
        width: f64,
        height: f64,
        frame_width: u32,
        frame_height: u32,
    ) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.clamp_pan(frame_width, frame_height);
    }

    /// Back to zoom 1 with no pan.
    pub fn reset(&mut self) {
        self.zoom = 1.0_f64.clamp(self.config.min_zoom, self.config.max_zoom);
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Scale from frame pixels to screen pixels, including zoom.
    fn scale(&self, frame_width: u32, frame_height: u32) -> f64 {
        let (fw, fh) = (frame_width as f64, frame_height as f64);
        let fit = if fw > 0.0 && fh > 0.0 && self.viewport_width > 0.0 && self.viewport_height > 0.0
        {
            (self.viewport_width / fw).min(self.viewport_height / fh)
        } else {
            1.0
        };
        fit * self.zoom
    }

    /// Screen position of the frame's top-left corner without pan.
    fn centered_origin(&self, scale: f64, frame_width: u32, frame_height: u32) -> (f64, f64) {
        (
            (self.viewport_width - frame_width as f64 * scale) / 2.0,
            (self.viewport_height - frame_height as f64 * scale) / 2.0,
        )
    }

    /// Convert a viewport pixel to normalized frame coordinates.
    pub fn to_normalized(
        &self,
        pixel_x: f64,
        pixel_y: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> (f64, f64) {
        let scale = self.scale(frame_width, frame_height);
        let (ox, oy) = self.centered_origin(scale, frame_width, frame_height);
        let span_x = frame_width.max(1) as f64 * scale;
        let span_y = frame_height.max(1) as f64 * scale;
        (
            (pixel_x - ox - self.pan_x) / span_x,
            (pixel_y - oy - self.pan_y) / span_y,
        )
    }

    /// Convert normalized frame coordinates to a viewport pixel.
    pub fn to_pixel(&self, x: f64, y: f64, frame_width: u32, frame_height: u32) -> (f64, f64) {
        let scale = self.scale(frame_width, frame_height);
        let (ox, oy) = self.centered_origin(scale, frame_width, frame_height);
        let span_x = frame_width.max(1) as f64 * scale;
        let span_y = frame_height.max(1) as f64 * scale;
        (ox + self.pan_x + x * span_x, oy + self.pan_y + y * span_y)
    }

    /// Whether a viewport pixel falls on the frame.
    pub fn is_on_frame(
        &self,
        pixel_x: f64,
        pixel_y: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> bool {
        let (x, y) = self.to_normalized(pixel_x, pixel_y, frame_width, frame_height);
        (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)
    }

    /// Multiply the zoom around a cursor position.
    ///
    /// The frame point under the cursor stays under the cursor, unless the
    /// pan limits force the view back.
    pub fn zoom_at(
        &mut self,
        cursor_x: f64,
        cursor_y: f64,
        factor: f64,
        frame_width: u32,
        frame_height: u32,
    ) {
        // Frame point under cursor (before zoom)
        let (nx, ny) = self.to_normalized(cursor_x, cursor_y, frame_width, frame_height);

        self.zoom = (self.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);

        // Solve for the pan that maps the same point back to the cursor
        let scale = self.scale(frame_width, frame_height);
        let (ox, oy) = self.centered_origin(scale, frame_width, frame_height);
        self.pan_x = cursor_x - ox - nx * frame_width.max(1) as f64 * scale;
        self.pan_y = cursor_y - oy - ny * frame_height.max(1) as f64 * scale;
        self.clamp_pan(frame_width, frame_height);

        log::trace!(
            "Zoom {:.3} at ({}, {}), pan ({:.1}, {:.1})",
            self.zoom,
            cursor_x,
            cursor_y,
            self.pan_x,
            self.pan_y
        );
    }

    /// One scroll notch around the cursor; positive `direction` zooms in.
    pub fn scroll(
        &mut self,
        cursor_x: f64,
        cursor_y: f64,
        direction: i32,
        frame_width: u32,
        frame_height: u32,
    ) {
        let factor = match direction.signum() {
            1 => self.config.zoom_step,
            -1 => 1.0 / self.config.zoom_step,
            _ => return,
        };
        self.zoom_at(cursor_x, cursor_y, factor, frame_width, frame_height);
    }

    /// Zoom in by one step around the viewport center.
    pub fn zoom_in(&mut self, frame_width: u32, frame_height: u32) {
        let (cx, cy) = (self.viewport_width / 2.0, self.viewport_height / 2.0);
        self.zoom_at(cx, cy, self.config.zoom_step, frame_width, frame_height);
    }

    /// Zoom out by one step around the viewport center.
    pub fn zoom_out(&mut self, frame_width: u32, frame_height: u32) {
        let (cx, cy) = (self.viewport_width / 2.0, self.viewport_height / 2.0);
        self.zoom_at(cx, cy, 1.0 / self.config.zoom_step, frame_width, frame_height);
    }

    /// Apply a pan delta in screen pixels.
    pub fn pan_by(&mut self, dx: f64, dy: f64, frame_width: u32, frame_height: u32) {
        self.pan_x += dx;
        self.pan_y += dy;
        self.clamp_pan(frame_width, frame_height);
    }

    /// Keep the view within `pan_margin` pixels of the frame bounds.
    ///
    /// When the scaled frame is larger than the viewport the viewport edge
    /// may travel `pan_margin` past the frame edge; when it is smaller the
    /// frame may drift `pan_margin` away from the centered position.
    fn clamp_pan(&mut self, frame_width: u32, frame_height: u32) {
        let scale = self.scale(frame_width, frame_height);
        let overflow_x = (frame_width as f64 * scale - self.viewport_width).max(0.0) / 2.0;
        let overflow_y = (frame_height as f64 * scale - self.viewport_height).max(0.0) / 2.0;
        let limit_x = overflow_x + self.config.pan_margin.max(0.0);
        let limit_y = overflow_y + self.config.pan_margin.max(0.0);
        self.pan_x = self.pan_x.clamp(-limit_x, limit_x);
        self.pan_y = self.pan_y.clamp(-limit_y, limit_y);
    }

    /// Turn a pointer drag into normalized box geometry.
    ///
    /// Returns `None` for drags shorter than [`MIN_DRAG_PIXELS`] on either axis.
    pub fn drag_to_box(
        &self,
        start: (f64, f64),
        end: (f64, f64),
        frame_width: u32,
        frame_height: u32,
    ) -> Option<BoxGeometry> {
        if (end.0 - start.0).abs() < MIN_DRAG_PIXELS || (end.1 - start.1).abs() < MIN_DRAG_PIXELS
        {
            return None;
        }
        let (x1, y1) = self.to_normalized(start.0, start.1, frame_width, frame_height);
        let (x2, y2) = self.to_normalized(end.0, end.1, frame_width, frame_height);
        Some(BoxGeometry::from_corners(x1, y1, x2, y2))
    }

    /// Handle of `geometry` under a viewport pixel.
    ///
    /// Corners win over the interior so small boxes can still be resized.
    pub fn handle_at(
        &self,
        geometry: &BoxGeometry,
        pixel_x: f64,
        pixel_y: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<EditHandle> {
        let (x1, y1, x2, y2) = geometry.corners();
        let (left, top) = self.to_pixel(x1, y1, frame_width, frame_height);
        let (right, bottom) = self.to_pixel(x2, y2, frame_width, frame_height);
        let near = |a: f64, b: f64| (a - b).abs() <= HANDLE_TOLERANCE_PIXELS;

        let corners = [
            (left, top, EditHandle::NorthWest),
            (right, top, EditHandle::NorthEast),
            (left, bottom, EditHandle::SouthWest),
            (right, bottom, EditHandle::SouthEast),
        ];
        if let Some(&(_, _, handle)) = corners
            .iter()
            .find(|(cx, cy, _)| near(pixel_x, *cx) && near(pixel_y, *cy))
        {
            return Some(handle);
        }

        let (x, y) = self.to_normalized(pixel_x, pixel_y, frame_width, frame_height);
        geometry.contains(x, y).then_some(EditHandle::Move)
    }

    /// Topmost box (last drawn) with a handle under the pointer.
    pub fn pick(
        &self,
        boxes: &[BoundingBox],
        pixel_x: f64,
        pixel_y: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<(BoxId, EditHandle)> {
        boxes.iter().rev().find_map(|b| {
            self.handle_at(&b.geometry, pixel_x, pixel_y, frame_width, frame_height)
                .map(|handle| (b.id, handle))
        })
    }

    /// Geometry after dragging `handle` by a screen pixel delta.
    ///
    /// The result is not clamped to the frame; pass it to
    /// `AnnotationProject::update_box`, which does. Dragging a corner past
    /// the opposite one flips the box instead of inverting it.
    pub fn drag_edit(
        &self,
        geometry: &BoxGeometry,
        handle: EditHandle,
        delta: (f64, f64),
        frame_width: u32,
        frame_height: u32,
    ) -> BoxGeometry {
        let scale = self.scale(frame_width, frame_height);
        let dx = delta.0 / (frame_width.max(1) as f64 * scale);
        let dy = delta.1 / (frame_height.max(1) as f64 * scale);

        let (mut x1, mut y1, mut x2, mut y2) = geometry.corners();
        let (left, top, right, bottom) = handle.edges();
        if left {
            x1 += dx;
        }
        if right {
            x2 += dx;
        }
        if top {
            y1 += dy;
        }
        if bottom {
            y2 += dy;
        }
        BoxGeometry::from_corners(x1, y1, x2, y2)
    }
}
