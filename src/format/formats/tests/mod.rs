//! Unit tests for annotation format implementations.
//!
//! These tests verify the correctness of format serialization, deserialization,
//! and round-trip conversions.

use std::collections::BTreeMap;
use std::path::Path;

use crate::format::snapshot::{PixelBox, ProjectSnapshot};
use crate::model::{BoundingBox, BoxGeometry, ClassId, ClassRegistry, VideoInfo};

mod pascal_voc_tests;
mod roundtrip_tests;
mod yolo_tests;

/// 640x480 video with 100 frames.
pub(super) fn video() -> VideoInfo {
    VideoInfo::new("/videos/street.mp4", 640, 480, 100, 30.0)
}

/// Normalized geometry of an integer pixel rectangle on the test video.
pub(super) fn pixel_geometry(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> BoxGeometry {
    PixelBox {
        xmin,
        ymin,
        xmax,
        ymax,
    }
    .to_normalized(640, 480)
    .unwrap()
}

/// Snapshot with boxes numbered from 1 on each frame.
pub(super) fn snapshot_with(frames: &[(usize, Vec<(ClassId, BoxGeometry)>)]) -> ProjectSnapshot {
    let frames: BTreeMap<usize, Vec<BoundingBox>> = frames
        .iter()
        .map(|(index, boxes)| {
            let boxes = boxes
                .iter()
                .enumerate()
                .map(|(i, (class_id, geometry))| {
                    BoundingBox::new(i as u64 + 1, *class_id, *geometry)
                })
                .collect();
            (*index, boxes)
        })
        .collect();
    ProjectSnapshot::new(video(), ClassRegistry::new(), frames)
}

/// Three annotated frames with two pixel-aligned boxes each.
pub(super) fn sample_snapshot() -> ProjectSnapshot {
    snapshot_with(&[
        (
            0,
            vec![
                (0, pixel_geometry(100, 120, 180, 320)),
                (2, pixel_geometry(300, 200, 450, 300)),
            ],
        ),
        (
            5,
            vec![
                (0, pixel_geometry(10, 10, 50, 90)),
                (16, pixel_geometry(400, 50, 639, 479)),
            ],
        ),
        (
            9,
            vec![
                (2, pixel_geometry(0, 0, 64, 48)),
                (7, pixel_geometry(320, 240, 321, 241)),
            ],
        ),
    ])
}

pub(super) fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

/// Sorted file names in a directory.
pub(super) fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
