//! Annotation data model: boxes, frames, classes and video metadata.

mod bbox;
mod class_registry;
mod frame;
mod video;

pub use bbox::{BoundingBox, BoxGeometry, BoxId, BoxUpdate, ClassId};
pub use class_registry::{ClassEntry, ClassRegistry, DEFAULT_CLASSES, MAX_QUICK_SELECT};
pub use frame::Frame;
pub use video::VideoInfo;
