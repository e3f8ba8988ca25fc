//! Format gate: one extension must govern the whole request.
//!
//! The first source's extension is the governing one. Every other source must
//! carry the identical extension (compared lowercased, so `.DOCX` matches
//! `.docx`, but `.doc` never matches `.docx`), and the shared extension must
//! be in the supported set.

use crate::error::CompareError;
use std::path::Path;
use tracing::debug;

/// Office, PDF and text formats every deployment accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "txt", "html", "htm",
];

/// Image formats accepted only when the configuration enables them.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Lowercased extension of a file name, path or URL (empty if none).
///
/// Query strings and fragments are ignored, so
/// `https://host/a/report.PDF?sig=1` yields `pdf`.
pub fn extension_of(name: &str) -> String {
    let name = name
        .split(['?', '#'])
        .next()
        .unwrap_or(name);
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Validates extensions against the supported set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatGate {
    allow_images: bool,
}

impl FormatGate {
    pub fn new(allow_images: bool) -> Self {
        Self { allow_images }
    }

    /// Whether a lowercased extension is supported.
    pub fn is_supported(&self, extension: &str) -> bool {
        SUPPORTED_EXTENSIONS.contains(&extension)
            || (self.allow_images && IMAGE_EXTENSIONS.contains(&extension))
    }

    /// Check that all names share one supported extension and return it.
    pub fn check<S: AsRef<str>>(&self, names: &[S]) -> Result<String, CompareError> {
        let Some(first) = names.first() else {
            return Err(CompareError::InvalidInput {
                expected: "at least 1 document",
                actual: 0,
            });
        };
        let extension = extension_of(first.as_ref());

        for other in &names[1..] {
            let other_ext = extension_of(other.as_ref());
            if other_ext != extension {
                return Err(CompareError::FormatMismatch {
                    first: extension,
                    other: other_ext,
                });
            }
        }

        if !self.is_supported(&extension) {
            return Err(CompareError::UnsupportedFormat { extension });
        }

        debug!("Format gate passed: {} sources of '{}'", names.len(), extension);
        Ok(extension)
    }

    /// Boolean form for two names.
    pub fn check_formats(&self, first: &str, second: &str) -> bool {
        self.check(&[first, second]).is_ok()
    }
}
