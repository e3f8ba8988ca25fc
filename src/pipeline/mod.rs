//! Pipeline stages for document comparison.
//!
//! Each submodule implements exactly one step around the engine call.
//! Keeping stages separate makes each independently testable and keeps the
//! engine a black box behind [`crate::engine::ComparisonEngine`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ format ──▶ [gateway] ──▶ merge ──▶ store ──▶ paginate ──▶ encode
//! (upload/   (gate)    (fwd + rev)   (fold)    (guid)    (pages)      (base64)
//!  URL/path)
//! ```
//!
//! 1. [`input`]    : normalise uploads, URLs and paths into ordered, opened
//!    documents; enforce the source count for the mode
//! 2. [`format`]   : all sources share one supported extension
//! 3. the engine gateway (see [`crate::engine::gateway`]) runs the compare
//!    under the process-wide lock
//! 4. [`merge`]    : fold forward and reverse change lists into one
//!    directionally accurate list
//! 5. [`store`]    : persist the merged artifact under a fresh identifier
//! 6. [`paginate`] : list or render the artifact's pages; runs in
//!    `spawn_blocking` because engines are blocking
//! 7. [`encode`]   : PNG-encode and base64-wrap each page image

pub mod encode;
pub mod format;
pub mod input;
pub mod merge;
pub mod paginate;
pub mod store;
