//! Ordered, append-only catalog of annotation classes.

use crate::error::AnnotationError;

use super::bbox::ClassId;

/// The 80 class names every registry is seeded with, in id order.
pub const DEFAULT_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Number of category hotkeys (keys 0-9).
pub const MAX_QUICK_SELECT: usize = 10;

/// A registered class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Contiguous id, equal to the position in the registry
    pub id: ClassId,
    /// Unique display name
    pub name: String,
    /// Retired classes keep their slot but cannot be assigned to new boxes
    pub retired: bool,
}

/// Class id to name mapping.
///
/// Ids are contiguous from 0 and never renumbered, since exported files
/// reference them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRegistry {
    entries: Vec<ClassEntry>,
}

impl ClassRegistry {
    /// Registry seeded with [`DEFAULT_CLASSES`].
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for name in DEFAULT_CLASSES {
            registry.push(name.to_string());
        }
        registry
    }

    /// Registry without any classes.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a registry from names in id order.
    pub fn from_names<I, S>(names: I) -> Result<Self, AnnotationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::empty();
        for name in names {
            registry.add_custom_class(name)?;
        }
        Ok(registry)
    }

    fn push(&mut self, name: String) -> ClassId {
        let id = self.entries.len() as ClassId;
        self.entries.push(ClassEntry {
            id,
            name,
            retired: false,
        });
        id
    }

    /// Name of a class.
    pub fn class_name_of(&self, id: ClassId) -> Result<&str, AnnotationError> {
        self.entries
            .get(id as usize)
            .map(|e| e.name.as_str())
            .ok_or(AnnotationError::UnknownClass { id })
    }

    /// Append a class at the next id.
    pub fn add_custom_class(&mut self, name: impl Into<String>) -> Result<ClassId, AnnotationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(AnnotationError::validation("class name must not be empty"));
        }
        if self.find(&name).is_some() {
            return Err(AnnotationError::DuplicateClass { name });
        }
        let id = self.push(name);
        log::debug!("Registered class {} '{}'", id, self.entries[id as usize].name);
        Ok(id)
    }

    /// Check that a class may be assigned to a box.
    pub fn ensure_assignable(&self, id: ClassId) -> Result<(), AnnotationError> {
        let entry = self
            .entries
            .get(id as usize)
            .ok_or(AnnotationError::UnknownClass { id })?;
        if entry.retired {
            return Err(AnnotationError::validation(format!(
                "class '{}' has been removed",
                entry.name
            )));
        }
        Ok(())
    }

    /// Mark a class as removed. Usage checks are the caller's job.
    pub(crate) fn retire(&mut self, id: ClassId) -> Result<(), AnnotationError> {
        let entry = self
            .entries
            .get_mut(id as usize)
            .ok_or(AnnotationError::UnknownClass { id })?;
        entry.retired = true;
        log::debug!("Retired class {} '{}'", id, entry.name);
        Ok(())
    }

    /// Id of a class by exact name.
    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// Whether the id is registered.
    pub fn contains(&self, id: ClassId) -> bool {
        (id as usize) < self.entries.len()
    }

    /// Number of registered classes, retired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no classes are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> {
        self.entries.iter()
    }

    /// Names in id order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Active classes whose name contains `filter`, ignoring case.
    pub fn search(&self, filter: &str) -> Vec<&ClassEntry> {
        let filter = filter.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| !e.retired)
            .filter(|e| filter.is_empty() || e.name.to_lowercase().contains(&filter))
            .collect()
    }

    /// Class selected by digit key `key` (0-9): key `n` picks class id `n`.
    pub fn quick_select(&self, key: usize) -> Option<ClassId> {
        if key >= MAX_QUICK_SELECT {
            return None;
        }
        self.entries
            .get(key)
            .filter(|e| !e.retired)
            .map(|e| e.id)
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
