//! Result types returned by the comparison service.
//!
//! Everything here is plain data with `serde` derives so that a transport
//! layer (or the CLI's `--json` mode) can serialise responses directly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What kind of difference a [`ChangeRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Content present in the revision but not in the base.
    Inserted,
    /// Content present in the base but not in the revision.
    Deleted,
    /// Same content, different formatting.
    StyleChanged,
    /// Same content, different size.
    Resized,
    /// Same content, different position.
    Moved,
    /// Reported by some engines for context; carries no difference.
    NotModified,
}

/// A rectangle in page coordinates (points, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One formatting property that differs between base and revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleChange {
    pub property: String,
    pub old_value: String,
    pub new_value: String,
}

/// One detected difference unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Sequence number within the list that contains the record.
    pub id: usize,
    pub kind: ChangeKind,
    /// 1-indexed page of the rendered artifact, when the engine computed one.
    pub page: Option<usize>,
    /// Position on `page`, when the engine computed coordinates.
    pub bounds: Option<Rect>,
    /// The changed content.
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_changes: Vec<StyleChange>,
}

impl ChangeRecord {
    /// A record without coordinates or style details.
    pub fn new(id: usize, kind: ChangeKind, text: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            page: None,
            bounds: None,
            text: text.into(),
            style_changes: Vec::new(),
        }
    }

    pub fn with_position(mut self, page: usize, bounds: Rect) -> Self {
        self.page = Some(page);
        self.bounds = Some(bounds);
        self
    }

    /// Whether the engine located this record on a page.
    pub fn has_coordinates(&self) -> bool {
        self.page.is_some() && self.bounds.is_some()
    }
}

/// One rendered (or placeholder) page of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// 1-indexed page number.
    pub number: usize,
    pub width: u32,
    pub height: u32,
    /// Base64-encoded PNG; `None` for lazily listed pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl PageDescriptor {
    /// Metadata-only descriptor used in lazy mode.
    pub fn placeholder(number: usize) -> Self {
        Self {
            number,
            width: 0,
            height: 0,
            data: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }
}

/// The response of one successful compare operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResult {
    /// Fresh result identifier; also the stem of the artifact file name.
    pub guid: String,
    /// Canonical extension of the stored artifact.
    pub extension: String,
    /// Merged change list.
    pub changes: Vec<ChangeRecord>,
    /// Where the artifact was persisted.
    pub artifact_path: PathBuf,
    /// Rendered pages (eager) or page placeholders (lazy).
    pub pages: Vec<PageDescriptor>,
}

impl CompareResult {
    /// Number of records of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}
