//! Pascal VOC XML format implementation.
//!
//! One XML file per annotated frame with integer pixel corners:
//!
//! ```xml
//! <annotation>
//!   <folder>street</folder>
//!   <filename>frame_000005.jpg</filename>
//!   <size>
//!     <width>640</width>
//!     <height>480</height>
//!     <depth>3</depth>
//!   </size>
//!   <segmented>0</segmented>
//!   <object>
//!     <name>car</name>
//!     <pose>Unspecified</pose>
//!     <truncated>0</truncated>
//!     <difficult>0</difficult>
//!     <bndbox>
//!       <xmin>100</xmin>
//!       <ymin>100</ymin>
//!       <xmax>200</xmax>
//!       <ymax>200</ymax>
//!     </bndbox>
//!   </object>
//! </annotation>
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Deserialize;

use crate::format::error::FormatError;
use crate::format::output::{Artifact, CancelToken};
use crate::format::snapshot::{
    FrameEntry, PixelBox, ProjectSnapshot, SnapshotBuilder, round_half_up,
};
use crate::format::traits::{
    AnnotationFormat, ExportOptions, FormatWarning, ImportOptions, ImportResult, Rendered,
    frame_index_from_stem,
};
use crate::model::{BoxGeometry, ClassId, ClassRegistry};

/// Pascal VOC XML format.
pub struct PascalVocFormat;

impl AnnotationFormat for PascalVocFormat {
    fn id(&self) -> &'static str {
        "voc"
    }

    fn display_name(&self) -> &'static str {
        "Pascal VOC (XML)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["xml"]
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

        for frame in &snapshot.frames {
            cancel.check()?;

            let (xml, written) = self.build_xml(snapshot, frame, options, &mut rendered.warnings)?;
            if written == 0 {
                continue;
            }
            rendered
                .artifacts
                .push(Artifact::new(options.label_path(frame.index, "xml"), xml));
            rendered.frames_exported += 1;
            rendered.boxes_exported += written;
        }

        Ok(rendered)
    }

    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportResult, FormatError> {
        log::info!("Importing Pascal VOC annotations from {:?}", path);

        if !path.is_dir() {
            return Err(FormatError::invalid_format(
                "Pascal VOC import requires a directory path",
            ));
        }

        let mut xml_files: Vec<PathBuf> = fs::read_dir(options.label_root(path))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        xml_files.sort();

        let mut classes = options.base_classes();
        let mut warnings = Vec::new();
        let mut builder = SnapshotBuilder::new();

        for file in &xml_files {
            let parsed = fs::read_to_string(file)
                .map_err(FormatError::from)
                .and_then(|content| parse_voc(file, &content, options, &mut classes, &mut warnings));
            match parsed {
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

impl PascalVocFormat {
    /// Build XML content for a frame. Returns the document and the number of
    /// objects written.
    fn build_xml(
        &self,
        snapshot: &ProjectSnapshot,
        frame: &FrameEntry,
        options: &ExportOptions,
        warnings: &mut Vec<FormatWarning>,
    ) -> Result<(String, usize), FormatError> {
        let (width, height) = (snapshot.video.width, snapshot.video.height);
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let mut written = 0;

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
            .map_err(|e| FormatError::Xml(e.into()))?;

        // <annotation>
        writer
            .write_event(Event::Start(BytesStart::new("annotation")))
            .map_err(|e| FormatError::Xml(e.into()))?;

        self.write_text_element(&mut writer, "folder", snapshot.video.stem())?;
        self.write_text_element(&mut writer, "filename", &options.image_name(frame.index))?;

        // <size>
        writer
            .write_event(Event::Start(BytesStart::new("size")))
            .map_err(|e| FormatError::Xml(e.into()))?;
        self.write_text_element(&mut writer, "width", &width.to_string())?;
        self.write_text_element(&mut writer, "height", &height.to_string())?;
        self.write_text_element(&mut writer, "depth", "3")?;
        writer
            .write_event(Event::End(BytesEnd::new("size")))
            .map_err(|e| FormatError::Xml(e.into()))?;

        self.write_text_element(&mut writer, "segmented", "0")?;

        for bbox in &frame.boxes {
            let Ok(name) = snapshot.classes.class_name_of(bbox.class_id) else {
                warnings.push(FormatWarning::warning(format!(
                    "Unknown class {} on frame {}, skipping box {}",
                    bbox.class_id, frame.index, bbox.id
                )));
                continue;
            };
            let px = PixelBox::from_normalized(&bbox.geometry, width, height);

            writer
                .write_event(Event::Start(BytesStart::new("object")))
                .map_err(|e| FormatError::Xml(e.into()))?;

            self.write_text_element(&mut writer, "name", name)?;
            self.write_text_element(&mut writer, "pose", "Unspecified")?;
            self.write_text_element(&mut writer, "truncated", "0")?;
            self.write_text_element(&mut writer, "difficult", "0")?;

            // <bndbox>
            writer
                .write_event(Event::Start(BytesStart::new("bndbox")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            self.write_text_element(&mut writer, "xmin", &px.xmin.to_string())?;
            self.write_text_element(&mut writer, "ymin", &px.ymin.to_string())?;
            self.write_text_element(&mut writer, "xmax", &px.xmax.to_string())?;
            self.write_text_element(&mut writer, "ymax", &px.ymax.to_string())?;
            writer
                .write_event(Event::End(BytesEnd::new("bndbox")))
                .map_err(|e| FormatError::Xml(e.into()))?;

            writer
                .write_event(Event::End(BytesEnd::new("object")))
                .map_err(|e| FormatError::Xml(e.into()))?;
            written += 1;
        }

        // </annotation>
        writer
            .write_event(Event::End(BytesEnd::new("annotation")))
            .map_err(|e| FormatError::Xml(e.into()))?;

        let xml = String::from_utf8(writer.into_inner())
            .map_err(|_| FormatError::invalid_format("Invalid UTF-8 in XML"))?;
        Ok((xml, written))
    }

    /// Write a simple text element.
    fn write_text_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: &str,
    ) -> Result<(), FormatError> {
        writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct VocAnnotation {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    size: Option<VocSize>,
    #[serde(rename = "object", default)]
    objects: Vec<VocObject>,
}

#[derive(Debug, Deserialize)]
struct VocSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct VocObject {
    name: String,
    bndbox: VocBndbox,
}

#[derive(Debug, Deserialize)]
struct VocBndbox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl VocBndbox {
    fn to_pixels(&self, width: u32, height: u32) -> PixelBox {
        let to_px = |v: f64, extent: u32| -> u32 {
            round_half_up(v).clamp(0.0, extent.saturating_sub(1) as f64) as u32
        };
        PixelBox {
            xmin: to_px(self.xmin, width),
            ymin: to_px(self.ymin, height),
            xmax: to_px(self.xmax, width),
            ymax: to_px(self.ymax, height),
        }
    }
}

/// Parse one VOC document into a frame index and its boxes.
///
/// Unknown object names are appended to `classes`.
fn parse_voc(
    path: &Path,
    content: &str,
    options: &ImportOptions,
    classes: &mut ClassRegistry,
    warnings: &mut Vec<FormatWarning>,
) -> Result<(usize, Vec<(ClassId, BoxGeometry)>), FormatError> {
    let doc: VocAnnotation = quick_xml::de::from_str(content)
        .map_err(|e| FormatError::parse(path, None, e.to_string()))?;

    let frame_index = Path::new(&doc.filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(frame_index_from_stem)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(frame_index_from_stem)
        })
        .ok_or_else(|| FormatError::parse(path, None, "no frame number in file name"))?;
    let video = &options.video;
    if frame_index >= video.frame_count {
        return Err(FormatError::parse(
            path,
            None,
            format!(
                "frame {} is outside the video ({} frames)",
                frame_index, video.frame_count
            ),
        ));
    }

    let (width, height) = match &doc.size {
        Some(size) if size.width > 0 && size.height > 0 => {
            if (size.width, size.height) != (video.width, video.height) {
                warnings.push(
                    FormatWarning::warning(format!(
                        "Frame size {}x{} differs from video size {}x{}",
                        size.width, size.height, video.width, video.height
                    ))
                    .with_path(path),
                );
            }
            (size.width, size.height)
        }
        _ => {
            warnings.push(
                FormatWarning::warning("Missing <size>, using the video resolution")
                    .with_path(path),
            );
            (video.width, video.height)
        }
    };

    let mut boxes = Vec::with_capacity(doc.objects.len());
    for object in &doc.objects {
        let name = object.name.trim();
        let class_id = match classes.find(name) {
            Some(id) => id,
            None => {
                let id = classes.add_custom_class(name)?;
                warnings.push(
                    FormatWarning::info(format!("Added class '{}' as id {}", name, id))
                        .with_path(path),
                );
                id
            }
        };

        match object.bndbox.to_pixels(width, height).to_normalized(width, height) {
            Some(geometry) => boxes.push((class_id, geometry)),
            None => warnings.push(
                FormatWarning::warning(format!("Skipping degenerate '{}' box", name))
                    .with_path(path),
            ),
        }
    }

    Ok((frame_index, boxes))
}
