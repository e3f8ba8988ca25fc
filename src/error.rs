//! Error types for the edgequake-doccompare library.
//!
//! Two error types reflect the two sides of the engine seam:
//!
//! * [`CompareError`] : returned by every public operation of
//!   [`crate::compare::ComparisonService`]. Each variant belongs to exactly one
//!   [`ErrorKind`], so callers (an HTTP layer, the CLI) can map failures onto
//!   status codes without matching every variant.
//!
//! * [`EngineError`] : returned by [`crate::engine::ComparisonEngine`]
//!   implementations. The orchestration layer converts it into
//!   [`CompareError`] at the gateway; engines never see `CompareError`.
//!
//! Nothing is retried. A failure anywhere in a compare aborts the whole
//! request and no partial result is produced.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of [`CompareError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// Wrong number of sources for the requested mode, or a malformed request.
    InvalidInput,
    /// Extension mismatch between sources, or an unsupported type.
    UnsupportedFormat,
    /// The engine produced no result, failed, or a source could not be opened.
    FatalCompare,
    /// Requested page is outside `[1, page_count]`.
    PageOutOfRange,
    /// Persistence or read failure in the result store.
    Io,
    /// Configuration or unexpected internal failure.
    Internal,
}

/// All errors returned by the edgequake-doccompare library.
#[derive(Debug, Error)]
pub enum CompareError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source count does not satisfy the cardinality of the requested mode.
    #[error("Comparing is impossible: {expected}, got {actual}")]
    InvalidInput {
        expected: &'static str,
        actual: usize,
    },

    /// A request field is malformed or the operation is disabled.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A result identifier is not a well-formed capability token.
    #[error("Invalid result identifier '{id}'")]
    InvalidIdentifier { id: String },

    // ── Format errors ─────────────────────────────────────────────────────
    /// Sources do not share one extension.
    #[error("Document types are different: '{first}' vs '{other}'")]
    FormatMismatch { first: String, other: String },

    /// The shared extension is not in the supported set.
    #[error("Unsupported document format '{extension}'")]
    UnsupportedFormat { extension: String },

    // ── Compare errors ────────────────────────────────────────────────────
    /// The engine returned a null result for a required pass.
    #[error("Something went wrong: the engine returned no result for the {pass} pass")]
    EmptyResult { pass: &'static str },

    /// A source stream could not be opened (missing file, HTTP failure, …).
    #[error("Could not open source '{name}': {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// Download of a URL source exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The engine reported an error while comparing or rendering.
    #[error("Comparison engine failed: {0}")]
    Engine(#[source] EngineError),

    // ── Page errors ───────────────────────────────────────────────────────
    /// Requested page number is outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// No stored artifact exists for the identifier.
    #[error("No comparison result stored for '{id}'")]
    ResultNotFound { id: String },

    /// Could not create, write or read a file under the result directory.
    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompareError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompareError::InvalidInput { .. }
            | CompareError::InvalidRequest(_)
            | CompareError::InvalidIdentifier { .. } => ErrorKind::InvalidInput,
            CompareError::FormatMismatch { .. } | CompareError::UnsupportedFormat { .. } => {
                ErrorKind::UnsupportedFormat
            }
            CompareError::EmptyResult { .. }
            | CompareError::SourceUnavailable { .. }
            | CompareError::DownloadTimeout { .. }
            | CompareError::Engine(_) => ErrorKind::FatalCompare,
            CompareError::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            CompareError::ResultNotFound { .. } | CompareError::Io { .. } => ErrorKind::Io,
            CompareError::InvalidConfig(_) | CompareError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompareError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<EngineError> for CompareError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::PageOutOfRange { page, total } => {
                CompareError::PageOutOfRange { page, total }
            }
            other => CompareError::Engine(other),
        }
    }
}

/// Errors reported by a [`crate::engine::ComparisonEngine`].
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine cannot handle documents of this extension.
    #[error("Engine '{engine}' does not support '{extension}' documents")]
    Unsupported { engine: String, extension: String },

    /// Document requires a password but none was provided.
    #[error("Document '{name}' is encrypted and requires a password")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for document '{name}'")]
    WrongPassword { name: String },

    /// The document could not be parsed.
    #[error("Document '{name}' is corrupt: {detail}")]
    Corrupt { name: String, detail: String },

    /// Page index outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Rasterisation of a single page failed.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The engine's native backend could not be loaded.
    #[error("Engine '{engine}' is unavailable: {detail}")]
    Unavailable { engine: String, detail: String },

    /// No revision documents were supplied to a compare call.
    #[error("Nothing to compare: at least one revision document is required")]
    NoRevisions,
}
