//! Tests for the Pascal VOC XML format.

use std::fs;

use super::{file_names, pixel_geometry, read, sample_snapshot, snapshot_with, video};
use crate::format::error::FormatError;
use crate::format::formats::PascalVocFormat;
use crate::format::output::CancelToken;
use crate::format::traits::{AnnotationFormat, ExportOptions, ImportOptions};
use crate::model::BoxGeometry;

#[test]
fn test_voc_format_metadata() {
    let format = PascalVocFormat;

    assert_eq!(format.id(), "voc");
    assert_eq!(format.display_name(), "Pascal VOC (XML)");
    assert!(format.extensions().contains(&"xml"));
    assert!(format.is_per_frame(), "VOC uses per-frame files");
}

#[test]
fn test_voc_document_structure() {
    let snapshot = snapshot_with(&[(5, vec![(2, pixel_geometry(100, 40, 300, 240))])]);
    let dir = tempfile::tempdir().unwrap();

    PascalVocFormat
        .export(&snapshot, dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    let xml = read(dir.path(), "labels/frame_000005.xml");
    assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
    assert!(xml.contains("<folder>street</folder>"));
    assert!(xml.contains("<filename>frame_000005.jpg</filename>"));
    assert!(xml.contains("<width>640</width>"));
    assert!(xml.contains("<height>480</height>"));
    assert!(xml.contains("<depth>3</depth>"));
    assert!(xml.contains("<name>car</name>"));
    assert!(xml.contains("<xmin>100</xmin>"));
    assert!(xml.contains("<ymin>40</ymin>"));
    assert!(xml.contains("<xmax>300</xmax>"));
    assert!(xml.contains("<ymax>240</ymax>"));
}

#[test]
fn test_voc_pixel_rounding_and_clamping() {
    // 0.1 * 640 = 64, 0.3 * 640 = 192; right edge beyond the frame
    let snapshot = snapshot_with(&[(
        0,
        vec![(0, BoxGeometry::from_corners(0.1, 0.5, 1.0, 1.0))],
    )]);
    let dir = tempfile::tempdir().unwrap();

    PascalVocFormat
        .export(&snapshot, dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    let xml = read(dir.path(), "labels/frame_000000.xml");
    assert!(xml.contains("<xmin>64</xmin>"));
    assert!(xml.contains("<ymin>240</ymin>"));
    assert!(xml.contains("<xmax>639</xmax>"));
    assert!(xml.contains("<ymax>479</ymax>"));
}

#[test]
fn test_voc_one_file_per_annotated_frame() {
    let dir = tempfile::tempdir().unwrap();
    let result = PascalVocFormat
        .export(&sample_snapshot(), dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    assert_eq!(
        file_names(&dir.path().join("labels")),
        vec!["frame_000000.xml", "frame_000005.xml", "frame_000009.xml"]
    );
    assert_eq!(result.frames_exported, 3);
    assert_eq!(result.boxes_exported, 6);
}

#[test]
fn test_voc_import_is_pixel_exact() {
    let snapshot = sample_snapshot();
    let dir = tempfile::tempdir().unwrap();
    PascalVocFormat
        .export(&snapshot, dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    let imported = PascalVocFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();

    assert!(imported.warnings.is_empty());
    assert_eq!(imported.snapshot, snapshot);
}

#[test]
fn test_voc_import_adds_unknown_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("frame_000003.xml"),
        r#"<annotation>
  <filename>frame_000003.jpg</filename>
  <size><width>640</width><height>480</height><depth>3</depth></size>
  <object><name>forklift</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>30</xmax><ymax>40</ymax></bndbox></object>
</annotation>"#,
    )
    .unwrap();

    let imported = PascalVocFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();

    let classes = &imported.snapshot.classes;
    let forklift = classes.find("forklift").unwrap();
    assert_eq!(forklift as usize, classes.len() - 1);
    assert_eq!(imported.snapshot.boxes(3)[0].class_id, forklift);
}

#[test]
fn test_voc_import_skips_degenerate_boxes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("frame_000001.xml"),
        r#"<annotation>
  <filename>frame_000001.jpg</filename>
  <size><width>640</width><height>480</height></size>
  <object><name>person</name><bndbox><xmin>10</xmin><ymin>10</ymin><xmax>10</xmax><ymax>40</ymax></bndbox></object>
  <object><name>person</name><bndbox><xmin>10</xmin><ymin>10</ymin><xmax>20</xmax><ymax>40</ymax></bndbox></object>
</annotation>"#,
    )
    .unwrap();

    let imported = PascalVocFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();

    assert_eq!(imported.snapshot.boxes(1).len(), 1);
    assert_eq!(imported.warnings.len(), 1);
}

#[test]
fn test_voc_import_malformed_xml() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame_000001.xml"), "<annotation><object>").unwrap();

    let lenient = PascalVocFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();
    assert_eq!(lenient.snapshot.total_boxes(), 0);
    assert!(lenient.has_errors());

    let strict = PascalVocFormat.import(dir.path(), &ImportOptions::new(video()).strict(true));
    assert!(matches!(strict, Err(FormatError::Parse { .. })));
}

#[test]
fn test_voc_import_uses_video_size_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("frame_000002.xml"),
        r#"<annotation>
  <filename>frame_000002.jpg</filename>
  <object><name>dog</name><bndbox><xmin>0</xmin><ymin>0</ymin><xmax>320</xmax><ymax>240</ymax></bndbox></object>
</annotation>"#,
    )
    .unwrap();

    let imported = PascalVocFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();

    let bbox = imported.snapshot.boxes(2)[0];
    assert_eq!(bbox.geometry, BoxGeometry::new(0.25, 0.25, 0.5, 0.5));
    assert_eq!(imported.warnings.len(), 1);
}
