//! Trait definitions for annotation format implementations.

use std::path::{Path, PathBuf};

use crate::config::ExportSettings;
use crate::format::error::FormatError;
use crate::format::output::{Artifact, CancelToken, commit_artifacts};
use crate::format::snapshot::ProjectSnapshot;
use crate::model::{ClassRegistry, VideoInfo};

/// Trait for annotation format import/export implementations.
///
/// Each format (YOLO, Pascal VOC, COCO) renders a [`ProjectSnapshot`] into a
/// set of in-memory artifacts and parses a directory of such artifacts back
/// into a snapshot. Writing to disk is shared so every format gets the same
/// all-or-nothing behavior.
pub trait AnnotationFormat: Send + Sync {
    /// Unique identifier for this format (e.g., "coco", "yolo", "voc").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// File extensions this format uses (e.g., `["json"]` for COCO).
    fn extensions(&self) -> &[&'static str];

    /// Whether this format writes one file per annotated frame.
    fn is_per_frame(&self) -> bool;

    /// Serialize a snapshot into artifacts named relative to the output
    /// directory.
    fn render(
        &self,
        snapshot: &ProjectSnapshot,
        options: &ExportOptions,
        cancel: &CancelToken,
    ) -> Result<Rendered, FormatError>;

    /// Parse annotations found at `path` into a snapshot for `options.video`.
    ///
    /// Per-frame formats read a directory. COCO accepts its JSON file or the
    /// directory that contains it.
    fn import(&self, path: &Path, options: &ImportOptions) -> Result<ImportResult, FormatError>;

    /// Render and write the snapshot into `output_dir`.
    fn export(
        &self,
        snapshot: &ProjectSnapshot,
        output_dir: &Path,
        options: &ExportOptions,
        cancel: &CancelToken,
    ) -> Result<ExportResult, FormatError> {
        log::info!(
            "Exporting {} annotations to {:?}",
            self.display_name(),
            output_dir
        );
        let rendered = self.render(snapshot, options, cancel)?;
        let files_created = commit_artifacts(output_dir, &rendered.artifacts, cancel)?;

        let result = ExportResult {
            frames_exported: rendered.frames_exported,
            boxes_exported: rendered.boxes_exported,
            warnings: rendered.warnings,
            files_created,
        };
        log::info!(
            "{} export complete: {} frames, {} boxes, {} files",
            self.display_name(),
            result.frames_exported,
            result.boxes_exported,
            result.files_created.len()
        );
        Ok(result)
    }
}

/// Output of [`AnnotationFormat::render`].
#[derive(Debug, Default)]
pub struct Rendered {
    pub artifacts: Vec<Artifact>,
    pub frames_exported: usize,
    pub boxes_exported: usize,
    pub warnings: Vec<FormatWarning>,
}

/// Options for export operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Prefix of per-frame file names.
    pub frame_prefix: String,

    /// Zero-padded width of the frame number.
    pub frame_digits: usize,

    /// Extension of the frame images referenced by VOC and COCO.
    pub image_extension: String,

    /// Subdirectory for per-frame label files, empty for a flat layout.
    pub label_dir: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for ExportOptions {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            frame_prefix: settings.frame_prefix.clone(),
            frame_digits: settings.frame_digits,
            image_extension: settings.image_extension.clone(),
            label_dir: settings.label_dir.clone(),
        }
    }
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file name prefix.
    pub fn frame_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.frame_prefix = prefix.into();
        self
    }

    /// Set the frame number width.
    pub fn frame_digits(mut self, digits: usize) -> Self {
        self.frame_digits = digits;
        self
    }

    /// Set the image extension.
    pub fn image_extension(mut self, extension: impl Into<String>) -> Self {
        self.image_extension = extension.into();
        self
    }

    /// Set the label subdirectory; empty writes labels next to the class list.
    pub fn label_dir(mut self, dir: impl Into<String>) -> Self {
        self.label_dir = dir.into();
        self
    }

    /// Relative path of a per-frame label file, e.g. `labels/frame_000005.txt`.
    pub fn label_path(&self, frame_index: usize, extension: &str) -> String {
        let name = format!("{}.{}", self.frame_stem(frame_index), extension);
        if self.label_dir.is_empty() {
            name
        } else {
            format!("{}/{}", self.label_dir, name)
        }
    }

    /// File stem for a frame, e.g. `frame_000005`.
    pub fn frame_stem(&self, frame_index: usize) -> String {
        format!(
            "{}{:0width$}",
            self.frame_prefix,
            frame_index,
            width = self.frame_digits
        )
    }

    /// Image file name for a frame, e.g. `frame_000005.jpg`.
    pub fn image_name(&self, frame_index: usize) -> String {
        format!("{}.{}", self.frame_stem(frame_index), self.image_extension)
    }
}

/// Options for import operations.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Video the annotations belong to.
    pub video: VideoInfo,

    /// Classes to resolve ids and names against when the files carry no
    /// class list. Defaults to the built-in registry.
    pub classes: Option<ClassRegistry>,

    /// Fail on the first malformed file instead of skipping it.
    pub strict: bool,

    /// Subdirectory searched for per-frame label files before the
    /// import path itself.
    pub label_dir: String,
}

impl ImportOptions {
    /// Create new import options for a video.
    pub fn new(video: VideoInfo) -> Self {
        Self {
            video,
            classes: None,
            strict: false,
            label_dir: "labels".to_string(),
        }
    }

    /// Use an existing class registry.
    pub fn classes(mut self, classes: ClassRegistry) -> Self {
        self.classes = Some(classes);
        self
    }

    /// Set strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the label subdirectory.
    pub fn label_dir(mut self, dir: impl Into<String>) -> Self {
        self.label_dir = dir.into();
        self
    }

    /// Directory holding the per-frame files below an import root.
    pub(crate) fn label_root(&self, path: &Path) -> PathBuf {
        let labels = path.join(&self.label_dir);
        if !self.label_dir.is_empty() && labels.is_dir() {
            labels
        } else {
            path.to_path_buf()
        }
    }

    /// Registry to start from.
    pub(crate) fn base_classes(&self) -> ClassRegistry {
        self.classes.clone().unwrap_or_default()
    }

    /// Propagate `error` in strict mode, otherwise record it and go on.
    pub(crate) fn tolerate(
        &self,
        error: FormatError,
        warnings: &mut Vec<FormatWarning>,
    ) -> Result<(), FormatError> {
        if self.strict {
            return Err(error);
        }
        log::warn!("Skipping: {}", error);
        let warning = match &error {
            FormatError::Parse { path, .. } => {
                FormatWarning::error(error.to_string()).with_path(path.clone())
            }
            _ => FormatWarning::error(error.to_string()),
        };
        warnings.push(warning);
        Ok(())
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of frames written.
    pub frames_exported: usize,

    /// Number of boxes written.
    pub boxes_exported: usize,

    /// Warnings generated during export.
    pub warnings: Vec<FormatWarning>,

    /// Files created during export.
    pub files_created: Vec<PathBuf>,
}

impl ExportResult {
    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of an import operation.
#[derive(Debug)]
pub struct ImportResult {
    /// Parsed annotations.
    pub snapshot: ProjectSnapshot,

    /// Files or entries that were skipped or adjusted.
    pub warnings: Vec<FormatWarning>,
}

impl ImportResult {
    /// Check if there were any errors (skipped content).
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.severity, WarningSeverity::Error))
    }
}

/// Warning generated during format conversion.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// File this warning relates to (if applicable).
    pub path: Option<PathBuf>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            path: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Create an error-level warning.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Error)
    }

    /// Set the file this warning relates to.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Something was adjusted.
    Warning,
    /// Something was skipped.
    Error,
}

/// Frame index encoded in trailing digits of a file stem, e.g.
/// `frame_000042` gives 42.
pub(crate) fn frame_index_from_stem(stem: &str) -> Option<usize> {
    let digits_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    stem[digits_start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_naming() {
        let options = ExportOptions::new();
        assert_eq!(options.frame_stem(5), "frame_000005");
        assert_eq!(options.image_name(5), "frame_000005.jpg");
        assert_eq!(options.label_path(5, "txt"), "labels/frame_000005.txt");
        assert_eq!(options.clone().label_dir("").label_path(5, "xml"), "frame_000005.xml");

        let options = ExportOptions::new()
            .frame_prefix("img")
            .frame_digits(3)
            .image_extension("png");
        assert_eq!(options.image_name(42), "img042.png");
    }

    #[test]
    fn test_frame_index_from_stem() {
        assert_eq!(frame_index_from_stem("frame_000042"), Some(42));
        assert_eq!(frame_index_from_stem("7"), Some(7));
        assert_eq!(frame_index_from_stem("classes"), None);
        assert_eq!(frame_index_from_stem("frame_12a"), None);
    }

    #[test]
    fn test_tolerate_strict_and_lenient() {
        let video = VideoInfo::new("clip.mp4", 640, 480, 10, 30.0);
        let mut warnings = Vec::new();

        let lenient = ImportOptions::new(video.clone());
        lenient
            .tolerate(FormatError::parse("a.txt", Some(1), "bad"), &mut warnings)
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path.as_deref(), Some(Path::new("a.txt")));

        let strict = ImportOptions::new(video).strict(true);
        assert!(
            strict
                .tolerate(FormatError::parse("a.txt", Some(1), "bad"), &mut warnings)
                .is_err()
        );
    }
}
