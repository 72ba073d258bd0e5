//! Tests for the YOLO format.

use std::fs;

use super::{file_names, read, sample_snapshot, snapshot_with, video};
use crate::format::error::FormatError;
use crate::format::formats::YoloFormat;
use crate::format::output::CancelToken;
use crate::format::traits::{AnnotationFormat, ExportOptions, ImportOptions};
use crate::model::{BoxGeometry, ClassRegistry};

#[test]
fn test_yolo_format_metadata() {
    let format = YoloFormat;

    assert_eq!(format.id(), "yolo");
    assert_eq!(format.display_name(), "YOLO (TXT)");
    assert!(format.extensions().contains(&"txt"));
    assert!(format.is_per_frame(), "YOLO uses per-frame files");
}

#[test]
fn test_yolo_single_box_line() {
    let snapshot = snapshot_with(&[(5, vec![(2, BoxGeometry::new(0.5, 0.5, 0.2, 0.3))])]);
    let dir = tempfile::tempdir().unwrap();

    let result = YoloFormat
        .export(&snapshot, dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    assert_eq!(result.frames_exported, 1);
    assert_eq!(result.boxes_exported, 1);
    assert_eq!(
        read(dir.path(), "labels/frame_000005.txt"),
        "2 0.500000 0.500000 0.200000 0.300000\n"
    );
}

#[test]
fn test_yolo_classes_file_lists_registry_in_id_order() {
    let dir = tempfile::tempdir().unwrap();
    YoloFormat
        .export(&sample_snapshot(), dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    let classes = read(dir.path(), "classes.txt");
    let names: Vec<&str> = classes.lines().collect();
    assert_eq!(names.len(), ClassRegistry::new().len());
    assert_eq!(names[0], "person");
    assert_eq!(names[2], "car");
}

#[test]
fn test_yolo_only_annotated_frames_get_files() {
    let dir = tempfile::tempdir().unwrap();
    let result = YoloFormat
        .export(&sample_snapshot(), dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    assert_eq!(file_names(dir.path()), vec!["classes.txt", "labels"]);
    assert_eq!(
        file_names(&dir.path().join("labels")),
        vec!["frame_000000.txt", "frame_000005.txt", "frame_000009.txt"]
    );
    assert_eq!(result.files_created.len(), 4);
    assert_eq!(result.boxes_exported, 6);
}

#[test]
fn test_yolo_custom_naming() {
    let snapshot = snapshot_with(&[(42, vec![(0, BoxGeometry::new(0.5, 0.5, 0.1, 0.1))])]);
    let dir = tempfile::tempdir().unwrap();
    let options = ExportOptions::new().frame_prefix("img").frame_digits(4);

    YoloFormat
        .export(&snapshot, dir.path(), &options, &CancelToken::new())
        .unwrap();

    assert!(dir.path().join("labels").join("img0042.txt").exists());
}

#[test]
fn test_yolo_flat_layout() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExportOptions::new().label_dir("");
    YoloFormat
        .export(&sample_snapshot(), dir.path(), &options, &CancelToken::new())
        .unwrap();

    assert_eq!(
        file_names(dir.path()),
        vec![
            "classes.txt",
            "frame_000000.txt",
            "frame_000005.txt",
            "frame_000009.txt"
        ]
    );
    let imported = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();
    assert_eq!(imported.snapshot.total_boxes(), 6);
}

#[test]
fn test_yolo_import_reads_custom_label_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("txt")).unwrap();
    fs::write(dir.path().join("classes.txt"), "cat\ndog").unwrap();
    fs::write(dir.path().join("txt").join("frame_000004.txt"), "1 0.5 0.5 0.2 0.2\n").unwrap();

    let imported = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()).label_dir("txt"))
        .unwrap();

    assert_eq!(imported.snapshot.classes.names(), vec!["cat", "dog"]);
    assert_eq!(imported.snapshot.boxes(4)[0].class_id, 1);
}

#[test]
fn test_yolo_import_roundtrip() {
    let snapshot = snapshot_with(&[
        (
            3,
            vec![
                (0, BoxGeometry::new(0.25, 0.5, 0.125, 0.375)),
                (5, BoxGeometry::new(0.75, 0.25, 0.1, 0.2)),
            ],
        ),
        (7, vec![(1, BoxGeometry::new(0.5, 0.5, 0.5, 0.5))]),
    ]);
    let dir = tempfile::tempdir().unwrap();
    YoloFormat
        .export(&snapshot, dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();

    let imported = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();

    assert!(imported.warnings.is_empty());
    assert_eq!(imported.snapshot, snapshot);
}

#[test]
fn test_yolo_import_without_classes_file_uses_given_registry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame_000001.txt"), "1 0.5 0.5 0.2 0.2\n").unwrap();
    let classes = ClassRegistry::from_names(["cat", "dog"]).unwrap();

    let imported = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()).classes(classes.clone()))
        .unwrap();

    assert_eq!(imported.snapshot.classes, classes);
    assert_eq!(imported.snapshot.boxes(1)[0].class_id, 1);
}

#[test]
fn test_yolo_import_skips_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame_000001.txt"), "0 0.5 0.5 0.2 0.2\n").unwrap();
    fs::write(dir.path().join("frame_000002.txt"), "0 0.5 0.5 0.2 0.2\n0 0.5\n").unwrap();

    let imported = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()))
        .unwrap();

    assert_eq!(imported.snapshot.annotated_frames(), 1);
    assert!(imported.snapshot.boxes(2).is_empty());
    assert!(imported.has_errors());
}

#[test]
fn test_yolo_import_strict_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame_000002.txt"), "0 0.5 0.5 0.2 0.2\n0 0.5\n").unwrap();

    let err = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()).strict(true))
        .unwrap_err();

    assert!(matches!(err, FormatError::Parse { line: Some(2), .. }));
}

#[test]
fn test_yolo_import_rejects_frame_outside_video() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame_000100.txt"), "0 0.5 0.5 0.2 0.2\n").unwrap();

    let err = YoloFormat
        .import(dir.path(), &ImportOptions::new(video()).strict(true))
        .unwrap_err();

    assert!(matches!(err, FormatError::Parse { line: None, .. }));
}

#[test]
fn test_yolo_import_unknown_class_id() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("classes.txt"), "cat\ndog").unwrap();
    fs::write(dir.path().join("frame_000001.txt"), "2 0.5 0.5 0.2 0.2\n").unwrap();

    let result = YoloFormat.import(dir.path(), &ImportOptions::new(video()).strict(true));

    assert!(matches!(result, Err(FormatError::Parse { line: Some(1), .. })));
}

#[test]
fn test_yolo_import_requires_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("frame_000001.txt");
    fs::write(&file, "0 0.5 0.5 0.2 0.2\n").unwrap();

    assert!(matches!(
        YoloFormat.import(&file, &ImportOptions::new(video())),
        Err(FormatError::InvalidFormat { .. })
    ));
}

#[test]
fn test_yolo_cancelled_export_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("export");
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = YoloFormat.export(&sample_snapshot(), &out, &ExportOptions::new(), &cancel);

    assert!(matches!(result, Err(FormatError::Cancelled)));
    assert!(!out.exists());
}

#[test]
fn test_yolo_failed_export_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    YoloFormat
        .export(&sample_snapshot(), dir.path(), &ExportOptions::new(), &CancelToken::new())
        .unwrap();
    let before = read(dir.path(), "labels/frame_000000.txt");
    // Frame 9 cannot be written over a non-empty directory.
    let blocker = dir.path().join("labels").join("frame_000009.txt");
    fs::remove_file(&blocker).unwrap();
    fs::create_dir(&blocker).unwrap();
    fs::write(blocker.join("keep"), "x").unwrap();

    let changed = snapshot_with(&[
        (0, vec![(1, BoxGeometry::new(0.5, 0.5, 0.2, 0.2))]),
        (3, vec![(1, BoxGeometry::new(0.5, 0.5, 0.2, 0.2))]),
        (9, vec![(1, BoxGeometry::new(0.5, 0.5, 0.2, 0.2))]),
    ]);
    let result = YoloFormat.export(&changed, dir.path(), &ExportOptions::new(), &CancelToken::new());

    assert!(matches!(result, Err(FormatError::Io(_))));
    assert_eq!(read(dir.path(), "labels/frame_000000.txt"), before);
    assert_eq!(
        file_names(&dir.path().join("labels")),
        vec!["frame_000000.txt", "frame_000005.txt", "frame_000009.txt"]
    );
    assert_eq!(file_names(dir.path()), vec!["classes.txt", "labels"]);
}
