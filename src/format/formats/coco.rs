//! COCO JSON format implementation.
//!
//! A single `annotations.json` holding images, annotations and categories.
//! Image ids are frame index + 1, annotation ids run from 1 and category ids
//! are the class registry ids.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::error::FormatError;
use crate::format::output::{Artifact, CancelToken};
use crate::format::snapshot::{PixelBox, ProjectSnapshot, SnapshotBuilder, round_half_up};
use crate::format::traits::{
    AnnotationFormat, ExportOptions, FormatWarning, ImportOptions, ImportResult, Rendered,
    frame_index_from_stem,
};
use crate::model::{ClassId, ClassRegistry};

/// Name of the dataset file inside the output directory.
pub const COCO_FILE: &str = "annotations.json";

/// COCO JSON format.
///
/// Boxes only; no segmentation is written.
pub struct CocoFormat;

impl AnnotationFormat for CocoFormat {
    fn id(&self) -> &'static str {
        "coco"
    }

    fn display_name(&self) -> &'static str {
        "COCO (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn is_per_frame(&self) -> bool {
        false
    }

    fn render(
        &self,
        snapshot: &ProjectSnapshot,
        options: &ExportOptions,
        cancel: &CancelToken,
    ) -> Result<Rendered, FormatError> {
        let mut rendered = Rendered::default();
        let (width, height) = (snapshot.video.width, snapshot.video.height);

        let mut coco = CocoDataset::new();
        coco.info.description = format!("Annotations for {}", snapshot.video.stem());
        coco.categories = snapshot
            .classes
            .iter()
            .map(|class| CocoCategory {
                id: class.id,
                name: class.name.clone(),
                supercategory: "none".into(),
            })
            .collect();

        let mut annotation_id = 1u64;
        for frame in &snapshot.frames {
            cancel.check()?;

            let image_id = frame.index as u64 + 1;
            let mut written = 0;
            for bbox in &frame.boxes {
                if !snapshot.classes.contains(bbox.class_id) {
                    rendered.warnings.push(FormatWarning::warning(format!(
                        "Unknown class {} on frame {}, skipping box {}",
                        bbox.class_id, frame.index, bbox.id
                    )));
                    continue;
                }
                let px = PixelBox::from_normalized(&bbox.geometry, width, height);
                let (w, h) = (f64::from(px.width()), f64::from(px.height()));
                coco.annotations.push(CocoAnnotation {
                    id: annotation_id,
                    image_id,
                    category_id: bbox.class_id,
                    bbox: Some([f64::from(px.xmin), f64::from(px.ymin), w, h]),
                    area: w * h,
                    iscrowd: 0,
                });
                annotation_id += 1;
                written += 1;
            }

            if written > 0 {
                coco.images.push(CocoImage {
                    id: image_id,
                    file_name: options.image_name(frame.index),
                    width,
                    height,
                });
                rendered.frames_exported += 1;
                rendered.boxes_exported += written;
            }
        }

        let json = serde_json::to_string_pretty(&coco)?;
        rendered.artifacts.push(Artifact::new(COCO_FILE, json));
        Ok(rendered)
    }

    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportResult, FormatError> {
        let file: PathBuf = if path.is_dir() {
            path.join(COCO_FILE)
        } else {
            path.to_path_buf()
        };
        log::info!("Importing COCO annotations from {:?}", file);

        let json = fs::read_to_string(&file)?;
        let coco: CocoDataset = serde_json::from_str(&json)
            .map_err(|e| FormatError::parse(&file, Some(e.line()), e.to_string()))?;

        let mut warnings = Vec::new();
        let (classes, category_map) = self.read_categories(&file, &coco, options, &mut warnings)?;

        // image id -> (frame index, width, height)
        let mut images: HashMap<u64, (usize, u32, u32)> = HashMap::new();
        let mut skipped_images = HashSet::new();
        for image in &coco.images {
            match self.read_image(&file, image, options) {
                Ok(entry) => {
                    images.insert(image.id, entry);
                }
                Err(e) => {
                    skipped_images.insert(image.id);
                    options.tolerate(e, &mut warnings)?;
                }
            }
        }

        let mut builder = SnapshotBuilder::new();
        for ann in &coco.annotations {
            if skipped_images.contains(&ann.image_id) {
                continue;
            }
            let Some(&(frame_index, width, height)) = images.get(&ann.image_id) else {
                let e = FormatError::parse(
                    &file,
                    None,
                    format!("annotation {} references unknown image {}", ann.id, ann.image_id),
                );
                options.tolerate(e, &mut warnings)?;
                continue;
            };
            let Some(&class_id) = category_map.get(&ann.category_id) else {
                let e = FormatError::parse(
                    &file,
                    None,
                    format!("annotation {} has unknown category {}", ann.id, ann.category_id),
                );
                options.tolerate(e, &mut warnings)?;
                continue;
            };
            let Some([x, y, w, h]) = ann.bbox else {
                let e = FormatError::parse(&file, None, format!("annotation {} has no bbox", ann.id));
                options.tolerate(e, &mut warnings)?;
                continue;
            };

            let to_px = |v: f64, extent: u32| -> u32 {
                round_half_up(v).clamp(0.0, extent.saturating_sub(1) as f64) as u32
            };
            let px = PixelBox {
                xmin: to_px(x, width),
                ymin: to_px(y, height),
                xmax: to_px(x + w, width),
                ymax: to_px(y + h, height),
            };
            match px.to_normalized(width, height) {
                Some(geometry) => builder.extend(frame_index, [(class_id, geometry)]),
                None => warnings.push(
                    FormatWarning::warning(format!("Skipping degenerate annotation {}", ann.id))
                        .with_path(&file),
                ),
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

impl CocoFormat {
    /// Build the class registry from the categories and map category ids to
    /// class ids. Non-contiguous category ids are renumbered in id order.
    fn read_categories(
        &self,
        file: &Path,
        coco: &CocoDataset,
        options: &ImportOptions,
        warnings: &mut Vec<FormatWarning>,
    ) -> Result<(ClassRegistry, HashMap<u32, ClassId>), FormatError> {
        if coco.categories.is_empty() {
            let classes = options.base_classes();
            let map = classes.iter().map(|c| (c.id, c.id)).collect();
            warnings.push(FormatWarning::info(
                "No categories in file, resolving ids against the current class list",
            ));
            return Ok((classes, map));
        }

        let mut categories: Vec<&CocoCategory> = coco.categories.iter().collect();
        categories.sort_by_key(|c| c.id);

        let classes = ClassRegistry::from_names(categories.iter().map(|c| c.name.as_str()))
            .map_err(|e| FormatError::parse(file, None, e.to_string()))?;

        let map: HashMap<u32, ClassId> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i as ClassId))
            .collect();
        if map.iter().any(|(old, new)| old != new) {
            warnings.push(
                FormatWarning::info("Category ids are not contiguous from 0, renumbered")
                    .with_path(file),
            );
        }
        Ok((classes, map))
    }

    fn read_image(
        &self,
        file: &Path,
        image: &CocoImage,
        options: &ImportOptions,
    ) -> Result<(usize, u32, u32), FormatError> {
        let video = &options.video;
        let frame_index = Path::new(&image.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(frame_index_from_stem)
            .or_else(|| usize::try_from(image.id).ok()?.checked_sub(1))
            .ok_or_else(|| {
                FormatError::parse(file, None, format!("image {} has no frame number", image.id))
            })?;
        if frame_index >= video.frame_count {
            return Err(FormatError::parse(
                file,
                None,
                format!(
                    "image '{}' maps to frame {} outside the video ({} frames)",
                    image.file_name, frame_index, video.frame_count
                ),
            ));
        }

        let (width, height) = if image.width > 0 && image.height > 0 {
            (image.width, image.height)
        } else {
            (video.width, video.height)
        };
        Ok((frame_index, width, height))
    }
}

// COCO format structures

#[derive(Debug, Serialize, Deserialize)]
struct CocoDataset {
    #[serde(default)]
    info: CocoInfo,
    #[serde(default)]
    images: Vec<CocoImage>,
    #[serde(default)]
    annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    categories: Vec<CocoCategory>,
    #[serde(default)]
    licenses: Vec<CocoLicense>,
}

impl CocoDataset {
    fn new() -> Self {
        Self {
            info: CocoInfo {
                version: "1.0".into(),
                ..CocoInfo::default()
            },
            images: Vec::new(),
            annotations: Vec::new(),
            categories: Vec::new(),
            licenses: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CocoInfo {
    #[serde(default)]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    contributor: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    date_created: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    file_name: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bbox: Option<[f64; 4]>,
    #[serde(default)]
    area: f64,
    #[serde(default)]
    iscrowd: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u32,
    name: String,
    #[serde(default)]
    supercategory: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoLicense {
    id: u32,
    name: String,
    url: String,
}
