//! Input normalisation: mixed sources → ordered engine documents.
//!
//! A request may mix uploaded bytes, remote URLs and local paths. The engine
//! only understands loaded documents, so every source is turned into an
//! [`EngineDocument`] (name, content, password) and the list is ordered by
//! input group: uploads first, then URLs, then paths. Order within a group is
//! the caller's order.
//!
//! The cardinality check runs before any source is opened, so a request with
//! the wrong number of documents never touches the network or the disk.

use crate::engine::EngineDocument;
use crate::error::CompareError;
use crate::pipeline::format::extension_of;
use futures::future::try_join_all;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a document's content comes from.
#[derive(Clone)]
pub enum Locator {
    /// Bytes uploaded by the caller, with their original file name.
    Upload { file_name: String, bytes: Vec<u8> },
    /// An HTTP/HTTPS URL.
    Url(String),
    /// A local file.
    Path(PathBuf),
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Upload { file_name, bytes } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("bytes", &bytes.len())
                .finish(),
            Locator::Url(u) => f.debug_tuple("Url").field(u).finish(),
            Locator::Path(p) => f.debug_tuple("Path").field(p).finish(),
        }
    }
}

/// One requested document.
#[derive(Debug, Clone)]
pub struct DocumentRef {
    pub locator: Locator,
    pub password: Option<String>,
}

impl DocumentRef {
    pub fn upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            locator: Locator::Upload {
                file_name: file_name.into(),
                bytes,
            },
            password: None,
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            locator: Locator::Url(url.into()),
            password: None,
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            locator: Locator::Path(path.into()),
            password: None,
        }
    }

    /// Build a reference from user input: URLs become [`Locator::Url`],
    /// anything else a [`Locator::Path`].
    pub fn from_input(input: &str) -> Self {
        if is_url(input) {
            Self::url(input)
        } else {
            Self::path(input)
        }
    }

    /// Attach a password. Empty passwords are ignored.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// The name used for format checks and engine dispatch.
    pub fn file_name(&self) -> String {
        match &self.locator {
            Locator::Upload { file_name, .. } => file_name.clone(),
            Locator::Url(url) => url_file_name(url),
            Locator::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        }
    }

    /// Lowercased extension, derived on demand.
    pub fn extension(&self) -> String {
        extension_of(&self.file_name())
    }

    fn group_rank(&self) -> u8 {
        match self.locator {
            Locator::Upload { .. } => 0,
            Locator::Url(_) => 1,
            Locator::Path(_) => 2,
        }
    }
}

/// How many documents an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly two documents (pairwise compare).
    Pair,
    /// Two or more documents (multi compare).
    AtLeastTwo,
}

impl Cardinality {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Cardinality::Pair => count == 2,
            Cardinality::AtLeastTwo => count >= 2,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Cardinality::Pair => "there must be exactly 2 documents",
            Cardinality::AtLeastTwo => "there must be at least 2 documents",
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Turns mixed [`DocumentRef`]s into ordered [`EngineDocument`]s.
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    download_timeout_secs: u64,
}

impl InputNormalizer {
    pub fn new(download_timeout_secs: u64) -> Self {
        Self {
            download_timeout_secs,
        }
    }

    /// Order sources by input group and enforce the cardinality contract.
    ///
    /// Nothing is opened here.
    pub fn prepare(
        &self,
        mut sources: Vec<DocumentRef>,
        cardinality: Cardinality,
    ) -> Result<Vec<DocumentRef>, CompareError> {
        if !cardinality.accepts(sources.len()) {
            return Err(CompareError::InvalidInput {
                expected: cardinality.expected(),
                actual: sources.len(),
            });
        }
        // stable: keeps caller order within a group
        sources.sort_by_key(DocumentRef::group_rank);
        Ok(sources)
    }

    /// Open every prepared source, preserving order.
    ///
    /// URL downloads run concurrently; the first failure aborts the request.
    pub async fn open_all(
        &self,
        sources: Vec<DocumentRef>,
    ) -> Result<Vec<EngineDocument>, CompareError> {
        try_join_all(sources.into_iter().map(|s| self.open(s))).await
    }

    /// [`prepare`](Self::prepare) followed by [`open_all`](Self::open_all).
    pub async fn normalize(
        &self,
        sources: Vec<DocumentRef>,
        cardinality: Cardinality,
    ) -> Result<Vec<EngineDocument>, CompareError> {
        let prepared = self.prepare(sources, cardinality)?;
        self.open_all(prepared).await
    }

    /// Load one source into memory.
    pub async fn open(&self, source: DocumentRef) -> Result<EngineDocument, CompareError> {
        let name = source.file_name();
        let bytes = match source.locator {
            Locator::Upload { bytes, .. } => bytes,
            Locator::Url(url) => download_url(&url, self.download_timeout_secs).await?,
            Locator::Path(path) => read_local(path).await?,
        };
        debug!("Opened source '{}' ({} bytes)", name, bytes.len());
        Ok(EngineDocument::new(name, bytes, source.password))
    }
}

/// Read a local file, mapping failures to a fatal source error.
async fn read_local(path: PathBuf) -> Result<Vec<u8>, CompareError> {
    tokio::fs::read(&path)
        .await
        .map_err(|e| CompareError::SourceUnavailable {
            name: path.display().to_string(),
            reason: match e.kind() {
                std::io::ErrorKind::NotFound => "file not found".to_string(),
                std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
                _ => e.to_string(),
            },
        })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, CompareError> {
    info!("Downloading document from: {}", url);

    let unavailable = |reason: String| CompareError::SourceUnavailable {
        name: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| unavailable(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CompareError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            unavailable(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(unavailable(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

/// File name for a URL source: the last non-empty path segment, or the URL
/// itself when it has none.
fn url_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    url.to_string()
}
