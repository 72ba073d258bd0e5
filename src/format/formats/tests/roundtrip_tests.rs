//! Round-trip conversion tests between formats.
//!
//! Pixel-aligned boxes must survive VOC and COCO unchanged; boxes with at
//! most six decimals must survive YOLO unchanged.

use proptest::prelude::*;

use super::{pixel_geometry, sample_snapshot, snapshot_with, video};
use crate::model::BoxGeometry;
use crate::format::FormatRegistry;
use crate::format::output::CancelToken;
use crate::format::snapshot::ProjectSnapshot;
use crate::format::traits::{ExportOptions, ImportOptions};

fn roundtrip(format_id: &str, snapshot: &ProjectSnapshot) -> ProjectSnapshot {
    let registry = FormatRegistry::new();
    let dir = tempfile::tempdir().unwrap();
    registry
        .export(
            format_id,
            snapshot,
            dir.path(),
            &ExportOptions::new(),
            &CancelToken::new(),
        )
        .unwrap();
    registry
        .import(format_id, dir.path(), &ImportOptions::new(video()))
        .unwrap()
        .snapshot
}

#[test]
fn test_pixel_formats_preserve_pixel_aligned_boxes() {
    let snapshot = sample_snapshot();
    for id in ["voc", "coco"] {
        assert_eq!(roundtrip(id, &snapshot), snapshot, "format {}", id);
    }
}

#[test]
fn test_voc_to_coco_keeps_pixels() {
    let from_voc = roundtrip("voc", &sample_snapshot());
    let through_coco = roundtrip("coco", &from_voc);
    assert_eq!(through_coco, from_voc);
}

#[test]
fn test_yolo_to_voc_snaps_to_pixels() {
    // 0.3 * 640 = 192 and 0.1 * 480 = 48
    let snapshot = snapshot_with(&[(2, vec![(0, pixel_geometry(160, 216, 224, 264))])]);
    let via_yolo = roundtrip("yolo", &snapshot);
    let via_voc = roundtrip("voc", &via_yolo);
    assert_eq!(via_voc, snapshot);
}

#[test]
fn test_second_export_is_identical() {
    let registry = FormatRegistry::new();
    for id in registry.ids() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let options = ExportOptions::new();
        let cancel = CancelToken::new();

        registry
            .export(id, &sample_snapshot(), first.path(), &options, &cancel)
            .unwrap();
        let imported = registry
            .import(id, first.path(), &ImportOptions::new(video()))
            .unwrap()
            .snapshot;
        let result = registry
            .export(id, &imported, second.path(), &options, &cancel)
            .unwrap();

        for file in &result.files_created {
            let name = file.strip_prefix(second.path()).unwrap();
            assert_eq!(
                std::fs::read(first.path().join(name)).unwrap(),
                std::fs::read(file).unwrap(),
                "format {} file {:?}",
                id,
                name
            );
        }
    }
}

#[test]
fn test_tiny_and_edge_boxes_survive_pixel_formats() {
    let snapshot = snapshot_with(&[(
        2,
        vec![
            (0, BoxGeometry::new(639.5 / 640.0, 0.5, 1.0 / 640.0, 0.2)),
            (1, BoxGeometry::new(0.5, 0.5, 0.0005, 0.1)),
        ],
    )]);
    for id in ["voc", "coco"] {
        let imported = roundtrip(id, &snapshot);
        assert_eq!(imported.boxes(2).len(), 2, "format {}", id);
        // Pixel-aligned after the first trip, so a second trip is exact.
        assert_eq!(roundtrip(id, &imported), imported, "format {}", id);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_coco_pixel_roundtrip(
        xmin in 0u32..600,
        ymin in 0u32..440,
        w in 1u32..40,
        h in 1u32..40,
        frame in 0usize..100,
    ) {
        let snapshot = snapshot_with(&[(frame, vec![(3, pixel_geometry(xmin, ymin, xmin + w, ymin + h))])]);
        prop_assert_eq!(roundtrip("coco", &snapshot), snapshot);
    }
}
