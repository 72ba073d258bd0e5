//! Annotation format implementations.

mod coco;
mod pascal_voc;
mod yolo;

#[cfg(test)]
mod tests;

pub use coco::{COCO_FILE, CocoFormat};
pub use pascal_voc::PascalVocFormat;
pub use yolo::{CLASSES_FILE, YoloFormat, format_yolo_line};
