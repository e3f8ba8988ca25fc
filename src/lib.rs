//! # edgequake-doccompare
//!
//! Bidirectional document comparison: feed two (or more) versions of a
//! document in, get a change list with page coordinates, a stored merged
//! artifact and rendered pages out.
//!
//! ## Why bidirectional?
//!
//! Comparison engines locate changes in the layout of the *revision*
//! document. Inserted content is placed accurately; deleted content does not
//! exist in the revision, so its position is unknown or wrong. This crate
//! runs every pairwise compare twice (A→B and B→A), keeps insertions from the
//! forward pass and takes deletions from the reverse pass, where they appear
//! as insertions with accurate coordinates in A's layout.
//!
//! ## Pipeline Overview
//!
//! ```text
//! sources (uploads, URLs, paths)
//!  │
//!  ├─ 1. Input    order by group, check count, download/read
//!  ├─ 2. Format   one supported extension for the whole request
//!  ├─ 3. Engine   forward + reverse under a process-wide lock
//!  ├─ 4. Merge    forward insertions + reverse insertions as deletions
//!  ├─ 5. Store    <result_dir>/<uuid>.<canonical ext>
//!  └─ 6. Pages    eager base64 PNGs, or placeholders for lazy loading
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doccompare::{ComparisonConfig, ComparisonService, DocumentRef};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ComparisonConfig::builder()
//!         .files_directory("/srv/documents")
//!         .build()?;
//!     let service = ComparisonService::with_default_engine(config)?;
//!
//!     let result = service
//!         .compare(vec![
//!             DocumentRef::path("v1.txt"),
//!             DocumentRef::path("v2.txt"),
//!         ])
//!         .await?;
//!     for change in &result.changes {
//!         println!("{:?} {:?}: {}", change.kind, change.page, change.text);
//!     }
//!     eprintln!("artifact: {}", result.artifact_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doccompare` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doccompare = { version = "0.1", default-features = false }
//! ```
//!
//! ## Engines
//!
//! | Engine | Formats | Notes |
//! |--------|---------|-------|
//! | [`TextEngine`] | txt, html, htm | word-level diff, HTML inline style changes |
//! | [`PdfiumEngine`] | pdf | needs a pdfium shared library (`PDFIUM_LIB_PATH`) |
//!
//! Office formats pass the format gate but need an engine that claims them;
//! plug one in through [`ComparisonEngine`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compare::ComparisonService;
pub use config::{ComparisonConfig, ComparisonConfigBuilder};
pub use engine::{
    CompareSettings, ComparisonEngine, EngineDocument, EngineOutput, FormatRouter, PageImage,
    PdfiumEngine, TextEngine,
};
pub use error::{CompareError, EngineError, ErrorKind};
pub use output::{ChangeKind, ChangeRecord, CompareResult, PageDescriptor, Rect, StyleChange};
pub use pipeline::input::DocumentRef;
pub use pipeline::paginate::PageStream;
