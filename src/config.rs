//! Configuration for the comparison service.
//!
//! All orchestration behaviour is controlled through [`ComparisonConfig`],
//! built via its [`ComparisonConfigBuilder`]. Loading the values from files or
//! the environment is the host's business; the CLI maps its flags onto the
//! builder.

use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the result folder created under `files_directory` when no
/// explicit result directory is configured.
pub const DEFAULT_RESULT_SUBDIR: &str = "temp";

/// Upper bound for [`ComparisonConfig::max_rendered_pixels`].
pub const MAX_RENDERED_PIXELS: u32 = 20_000;

/// Configuration for a [`crate::compare::ComparisonService`].
///
/// # Example
/// ```rust
/// use edgequake_doccompare::ComparisonConfig;
///
/// let config = ComparisonConfig::builder()
///     .files_directory("/srv/documents")
///     .preload_page_count(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.result_directory(), std::path::Path::new("/srv/documents/temp"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Root folder for source documents. Default: current directory.
    pub files_directory: PathBuf,

    /// Where compare artifacts are stored. Default: `files_directory/temp`.
    pub result_directory: Option<PathBuf>,

    /// Page preloading switch. `0` renders every result page up front; any
    /// other value returns page metadata only and leaves content to
    /// single-page retrieval. Default: 0.
    pub preload_page_count: usize,

    /// Whether multi-document comparison is enabled. Default: true.
    pub multi_comparing: bool,

    /// Accept image formats (png, jpg, jpeg, bmp, gif) at the format gate.
    /// Default: false.
    pub allow_image_formats: bool,

    /// Download timeout for URL sources in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Maximum rendered page dimension in pixels for rasterised formats.
    /// Clamped to `[100, MAX_RENDERED_PIXELS]`. Default: 2000.
    pub max_rendered_pixels: u32,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            files_directory: PathBuf::from("."),
            result_directory: None,
            preload_page_count: 0,
            multi_comparing: true,
            allow_image_formats: false,
            download_timeout_secs: 120,
            max_rendered_pixels: 2000,
        }
    }
}

impl ComparisonConfig {
    /// Create a new builder for `ComparisonConfig`.
    pub fn builder() -> ComparisonConfigBuilder {
        ComparisonConfigBuilder {
            config: Self::default(),
        }
    }

    /// The effective result directory.
    ///
    /// An unset or empty `result_directory` falls back to
    /// `files_directory/temp`.
    pub fn result_directory(&self) -> PathBuf {
        match &self.result_directory {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => self.files_directory.join(DEFAULT_RESULT_SUBDIR),
        }
    }

    /// Whether pages are rendered eagerly.
    pub fn eager_pages(&self) -> bool {
        self.preload_page_count == 0
    }
}

/// Builder for [`ComparisonConfig`].
#[derive(Debug)]
pub struct ComparisonConfigBuilder {
    config: ComparisonConfig,
}

impl ComparisonConfigBuilder {
    pub fn files_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.files_directory = dir.as_ref().to_path_buf();
        self
    }

    pub fn result_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.result_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn preload_page_count(mut self, n: usize) -> Self {
        self.config.preload_page_count = n;
        self
    }

    pub fn multi_comparing(mut self, enabled: bool) -> Self {
        self.config.multi_comparing = enabled;
        self
    }

    pub fn allow_image_formats(mut self, enabled: bool) -> Self {
        self.config.allow_image_formats = enabled;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, MAX_RENDERED_PIXELS);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ComparisonConfig, CompareError> {
        let c = &self.config;
        if c.files_directory.as_os_str().is_empty() {
            return Err(CompareError::InvalidConfig(
                "files directory must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(CompareError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_directory_defaults_under_files_directory() {
        let config = ComparisonConfig::builder()
            .files_directory("/data/docs")
            .build()
            .unwrap();
        assert_eq!(config.result_directory(), PathBuf::from("/data/docs/temp"));
    }

    #[test]
    fn explicit_result_directory_wins() {
        let config = ComparisonConfig::builder()
            .files_directory("/data/docs")
            .result_directory("/var/results")
            .build()
            .unwrap();
        assert_eq!(config.result_directory(), PathBuf::from("/var/results"));
    }

    #[test]
    fn empty_result_directory_is_treated_as_unset() {
        let config = ComparisonConfig {
            files_directory: PathBuf::from("/data"),
            result_directory: Some(PathBuf::new()),
            ..ComparisonConfig::default()
        };
        assert_eq!(config.result_directory(), PathBuf::from("/data/temp"));
    }

    #[test]
    fn zero_preload_means_eager() {
        assert!(ComparisonConfig::default().eager_pages());
        let lazy = ComparisonConfig::builder()
            .preload_page_count(3)
            .build()
            .unwrap();
        assert!(!lazy.eager_pages());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ComparisonConfig::builder()
            .download_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn max_rendered_pixels_is_clamped() {
        let config = ComparisonConfig::builder()
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(config.max_rendered_pixels, 100);

        let config = ComparisonConfig::builder()
            .max_rendered_pixels(u32::MAX)
            .build()
            .unwrap();
        assert_eq!(config.max_rendered_pixels, MAX_RENDERED_PIXELS);
    }
}
