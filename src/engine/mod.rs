//! The comparison engine seam.
//!
//! The orchestration layer treats the engine as a black box: given loaded
//! documents it returns a change list plus a merged artifact, and it can
//! render a document's pages to images. Everything the service needs from an
//! engine is expressed by [`ComparisonEngine`].
//!
//! ```text
//! FormatRouter ──┬──▶ TextEngine    (txt, html, htm)
//!                └──▶ PdfiumEngine  (pdf)
//! ```
//!
//! All engine calls are blocking. The service always invokes them from
//! `spawn_blocking`, and compare calls only through [`gateway::EngineGateway`],
//! which serialises them process-wide.
//!
//! ## Directional bias
//!
//! Engines in this family compute accurate coordinates only for content that
//! exists in the *revision* document. Deleted content has no position in the
//! revision's layout, so engines report it without coordinates. The service
//! compensates by running every pairwise compare in both directions; see
//! [`crate::pipeline::merge`].

pub mod gateway;
pub mod pdf;
pub mod router;
pub mod text;

use crate::error::{CompareError, EngineError};
use crate::output::ChangeRecord;
use crate::pipeline::format::extension_of;
use image::DynamicImage;

pub use gateway::EngineGateway;
pub use pdf::PdfiumEngine;
pub use router::FormatRouter;
pub use text::TextEngine;

/// A loaded document handed to an engine: display name, content and password.
#[derive(Clone)]
pub struct EngineDocument {
    name: String,
    bytes: Vec<u8>,
    password: Option<String>,
}

impl EngineDocument {
    /// Empty passwords are treated as "no password".
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, password: Option<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            password: password.filter(|p| !p.is_empty()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Lowercased extension of the document name (empty if none).
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

impl std::fmt::Debug for EngineDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings passed to every compare call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareSettings {
    /// Include deleted content in the merged artifact.
    pub show_deleted_content: bool,
    /// Report formatting-only differences as `StyleChanged`.
    pub style_change_detection: bool,
    /// Compute page coordinates for changes.
    pub calculate_coordinates: bool,
    /// Compare at the finest granularity the engine offers.
    pub high_detail: bool,
}

impl CompareSettings {
    /// The settings the service uses for a request governed by `extension`.
    pub fn for_extension(extension: &str) -> Self {
        Self {
            show_deleted_content: false,
            style_change_detection: true,
            calculate_coordinates: true,
            high_detail: extension.eq_ignore_ascii_case("pdf"),
        }
    }
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self::for_extension("")
    }
}

/// What an engine returns from a successful compare.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub changes: Vec<ChangeRecord>,
    /// The merged document in the format of the inputs.
    pub document: Vec<u8>,
}

/// One rendered page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number.
    pub number: usize,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A black-box document comparison engine.
///
/// Implementations must be `Send + Sync`; the service shares one engine
/// across tasks. They need not be safe under *concurrent compare* calls,
/// because the service never issues two at once.
pub trait ComparisonEngine: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether documents with this (lowercased) extension can be handled.
    fn supports(&self, extension: &str) -> bool;

    /// Compare `base` against `revisions` in one session.
    ///
    /// Pairwise comparison passes exactly one revision. `Ok(None)` is the
    /// engine's "null result".
    fn compare(
        &self,
        base: &EngineDocument,
        revisions: &[EngineDocument],
        settings: &CompareSettings,
    ) -> Result<Option<EngineOutput>, EngineError>;

    /// Number of pages the document renders to.
    fn page_count(&self, document: &EngineDocument) -> Result<usize, EngineError>;

    /// Render one 1-indexed page.
    fn render_page(&self, document: &EngineDocument, page: usize)
        -> Result<PageImage, EngineError>;

    /// Render every page in order.
    fn render_pages(&self, document: &EngineDocument) -> Result<Vec<PageImage>, EngineError> {
        let total = self.page_count(document)?;
        (1..=total)
            .map(|page| self.render_page(document, page))
            .collect()
    }
}

/// Run a blocking engine call on the blocking thread pool.
///
/// Engines wrap native libraries and CPU-heavy loops; calling them on a Tokio
/// worker would stall every other task on that worker.
pub(crate) async fn run_blocking<T, F>(what: &'static str, f: F) -> Result<T, CompareError>
where
    F: FnOnce() -> Result<T, CompareError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CompareError::Internal(format!("{what} task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_detail_only_for_pdf() {
        assert!(CompareSettings::for_extension("pdf").high_detail);
        assert!(CompareSettings::for_extension("PDF").high_detail);
        assert!(!CompareSettings::for_extension("docx").high_detail);
        let s = CompareSettings::for_extension("txt");
        assert!(!s.show_deleted_content);
        assert!(s.style_change_detection);
        assert!(s.calculate_coordinates);
    }

    #[test]
    fn empty_password_is_dropped() {
        let doc = EngineDocument::new("a.TXT", b"x".to_vec(), Some(String::new()));
        assert_eq!(doc.password(), None);
        assert_eq!(doc.extension(), "txt");
    }

    #[test]
    fn debug_redacts_password() {
        let doc = EngineDocument::new("a.pdf", vec![], Some("secret".into()));
        let dbg = format!("{doc:?}");
        assert!(!dbg.contains("secret"), "got: {dbg}");
    }
}
