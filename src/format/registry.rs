//! Format registry for discovering and accessing annotation formats.

use std::collections::HashMap;
use std::path::Path;

use crate::config::ExportSettings;
use crate::format::error::FormatError;
use crate::format::formats::{CocoFormat, PascalVocFormat, YoloFormat};
use crate::format::output::CancelToken;
use crate::format::snapshot::ProjectSnapshot;
use crate::format::traits::{
    AnnotationFormat, ExportOptions, ExportResult, ImportOptions, ImportResult,
};

/// Registry of available annotation formats.
///
/// This provides a central location to discover and access format implementations.
/// All built-in formats are registered automatically on creation.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn AnnotationFormat>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: HashMap::new(),
        };

        registry.register(Box::new(YoloFormat));
        registry.register(Box::new(PascalVocFormat));
        registry.register(Box::new(CocoFormat));

        registry
    }

    /// Register a format implementation.
    pub fn register(&mut self, format: Box<dyn AnnotationFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn AnnotationFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Get a format by its ID or fail with [`FormatError::UnknownFormat`].
    pub fn require(&self, id: &str) -> Result<&dyn AnnotationFormat, FormatError> {
        self.get(id).ok_or_else(|| FormatError::UnknownFormat { id: id.to_string() })
    }

    /// Format configured as the export default.
    pub fn default_format(
        &self,
        settings: &ExportSettings,
    ) -> Result<&dyn AnnotationFormat, FormatError> {
        self.require(&settings.default_format)
    }

    /// Get all registered formats, sorted by ID.
    pub fn all(&self) -> Vec<&dyn AnnotationFormat> {
        let mut formats: Vec<_> = self.formats.values().map(|f| f.as_ref()).collect();
        formats.sort_by_key(|f| f.id());
        formats
    }

    /// Get all format IDs, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.formats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Export a snapshot with the format registered under `id`.
    pub fn export(
        &self,
        id: &str,
        snapshot: &ProjectSnapshot,
        output_dir: &Path,
        options: &ExportOptions,
        cancel: &CancelToken,
    ) -> Result<ExportResult, FormatError> {
        self.require(id)?.export(snapshot, output_dir, options, cancel)
    }

    /// Import annotations with the format registered under `id`.
    pub fn import(
        &self,
        id: &str,
        path: &Path,
        options: &ImportOptions,
    ) -> Result<ImportResult, FormatError> {
        self.require(id)?.import(path, options)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats() {
        let registry = FormatRegistry::new();

        assert!(registry.get("yolo").is_some());
        assert!(registry.get("voc").is_some());
        assert!(registry.get("coco").is_some());
        assert_eq!(registry.ids(), vec!["coco", "voc", "yolo"]);
    }

    #[test]
    fn test_per_frame_formats() {
        let registry = FormatRegistry::new();
        let per_frame: Vec<_> = registry
            .all()
            .into_iter()
            .filter(|f| f.is_per_frame())
            .map(|f| f.id())
            .collect();

        assert_eq!(per_frame, vec!["voc", "yolo"]);
    }

    #[test]
    fn test_default_format_from_settings() {
        let registry = FormatRegistry::new();
        let mut settings = ExportSettings::default();
        assert_eq!(registry.default_format(&settings).unwrap().id(), "yolo");

        settings.default_format = "coco".to_string();
        assert_eq!(registry.default_format(&settings).unwrap().id(), "coco");

        settings.default_format = "labelme".to_string();
        assert!(matches!(
            registry.default_format(&settings),
            Err(FormatError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_unknown_format() {
        let registry = FormatRegistry::new();
        assert!(matches!(
            registry.require("labelme"),
            Err(FormatError::UnknownFormat { id }) if id == "labelme"
        ));
    }
}
