//! YOLO TXT format implementation.
//!
//! One text file per annotated frame with lines of
//! `class_id x_center y_center width height`, all normalized, plus a
//! `classes.txt` listing class names in id order. Label files go to the
//! label subdirectory (`labels/` by default), `classes.txt` to the root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::format::output::{Artifact, CancelToken};
use crate::format::snapshot::{ProjectSnapshot, SnapshotBuilder};
use crate::format::traits::{
    AnnotationFormat, ExportOptions, FormatWarning, ImportOptions, ImportResult, Rendered,
    frame_index_from_stem,
};
use crate::model::{BoundingBox, BoxGeometry, ClassId, ClassRegistry};

/// Name of the class list file.
pub const CLASSES_FILE: &str = "classes.txt";

/// YOLO TXT format.
///
/// Frames without boxes produce no file.
pub struct YoloFormat;

impl AnnotationFormat for YoloFormat {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO (TXT)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn is_per_frame(&self) -> bool {
        true
    }

    fn render(
        &self,
        snapshot: &ProjectSnapshot,
        options: &ExportOptions,
        cancel: &CancelToken,
    ) -> Result<Rendered, FormatError> {
        let mut rendered = Rendered::default();
        rendered.artifacts.push(Artifact::new(
            CLASSES_FILE,
            snapshot.classes.names().join("\n"),
        ));

        for frame in &snapshot.frames {
            cancel.check()?;

            let mut contents = String::new();
            for bbox in &frame.boxes {
                if !snapshot.classes.contains(bbox.class_id) {
                    rendered.warnings.push(FormatWarning::warning(format!(
                        "Unknown class {} on frame {}, skipping box {}",
                        bbox.class_id, frame.index, bbox.id
                    )));
                    continue;
                }
                contents.push_str(&format_yolo_line(bbox));
                contents.push('\n');
                rendered.boxes_exported += 1;
            }
            if contents.is_empty() {
                continue;
            }

            rendered
                .artifacts
                .push(Artifact::new(options.label_path(frame.index, "txt"), contents));
            rendered.frames_exported += 1;
        }

        Ok(rendered)
    }

    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportResult, FormatError> {
        log::info!("Importing YOLO annotations from {:?}", path);

        if !path.is_dir() {
            return Err(FormatError::invalid_format(
                "YOLO import requires a directory path",
            ));
        }

        let mut warnings = Vec::new();
        let classes_path = path.join(CLASSES_FILE);
        let classes = if classes_path.is_file() {
            read_classes(&classes_path)?
        } else {
            warnings.push(FormatWarning::info(format!(
                "No {} found, resolving class ids against the current class list",
                CLASSES_FILE
            )));
            options.base_classes()
        };

        let mut label_files: Vec<PathBuf> = fs::read_dir(options.label_root(path))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "txt")
                    && p.file_name().is_some_and(|n| n != CLASSES_FILE)
            })
            .collect();
        label_files.sort();

        let mut builder = SnapshotBuilder::new();
        for file in &label_files {
            match read_label_file(file, &classes, options.video.frame_count) {
                Ok((frame_index, boxes)) => builder.extend(frame_index, boxes),
                Err(e) => options.tolerate(e, &mut warnings)?,
            }
        }

        let snapshot = builder.finish(options.video.clone(), classes);
        log::info!(
            "Imported {} frames with {} boxes ({} warnings)",
            snapshot.annotated_frames(),
            snapshot.total_boxes(),
            warnings.len()
        );
        Ok(ImportResult { snapshot, warnings })
    }
}

/// Format one box as a YOLO line with six decimals.
pub fn format_yolo_line(bbox: &BoundingBox) -> String {
    let g = &bbox.geometry;
    format!(
        "{} {:.6} {:.6} {:.6} {:.6}",
        bbox.class_id, g.x_center, g.y_center, g.width, g.height
    )
}

/// Parse a single YOLO annotation line.
fn parse_yolo_line(line: &str) -> Result<(ClassId, BoxGeometry), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(format!("expected 5 fields, found {}", parts.len()));
    }

    let class_id: ClassId = parts[0]
        .parse()
        .map_err(|_| format!("invalid class id '{}'", parts[0]))?;
    let mut values = [0.0f64; 4];
    for (value, text) in values.iter_mut().zip(&parts[1..]) {
        *value = text
            .parse()
            .map_err(|_| format!("invalid coordinate '{}'", text))?;
    }

    let [cx, cy, w, h] = values;
    let geometry = BoxGeometry::new(cx, cy, w, h)
        .clamped()
        .map_err(|e| e.to_string())?;
    Ok((class_id, geometry))
}

fn read_classes(path: &Path) -> Result<ClassRegistry, FormatError> {
    let content = fs::read_to_string(path)?;
    let mut names: Vec<&str> = content.lines().map(str::trim).collect();
    while names.last().is_some_and(|n| n.is_empty()) {
        names.pop();
    }
    ClassRegistry::from_names(names).map_err(|e| FormatError::parse(path, None, e.to_string()))
}

fn read_label_file(
    path: &Path,
    classes: &ClassRegistry,
    frame_count: usize,
) -> Result<(usize, Vec<(ClassId, BoxGeometry)>), FormatError> {
    let frame_index = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(frame_index_from_stem)
        .ok_or_else(|| FormatError::parse(path, None, "file name carries no frame number"))?;
    if frame_index >= frame_count {
        return Err(FormatError::parse(
            path,
            None,
            format!(
                "frame {} is outside the video ({} frames)",
                frame_index, frame_count
            ),
        ));
    }

    let content = fs::read_to_string(path)?;
    let mut boxes = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (class_id, geometry) =
            parse_yolo_line(line).map_err(|message| FormatError::parse(path, Some(i + 1), message))?;
        if !classes.contains(class_id) {
            return Err(FormatError::parse(
                path,
                Some(i + 1),
                format!("unknown class id {}", class_id),
            ));
        }
        boxes.push((class_id, geometry));
    }
    Ok((frame_index, boxes))
}
