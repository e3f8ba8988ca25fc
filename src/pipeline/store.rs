//! Result persistence: one artifact file per completed compare.
//!
//! Layout: `result_directory/<identifier>.<canonical_extension>`, no manifest.
//! Identifiers are random UUIDs and act as capability tokens: whoever holds
//! one can fetch the artifact, and nothing else under the directory is
//! reachable through this store.
//!
//! Writes go to a temporary file in the result directory which is then
//! renamed over the final name, so a reader never observes a partially
//! written artifact under a visible name.

use crate::error::CompareError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Map an extension to the one used for stored artifacts.
///
/// Legacy Office formats are stored as their OOXML counterparts; everything
/// else passes through. Case-insensitive; the result is lowercase.
pub fn canonical_extension(extension: &str) -> String {
    let ext = extension.to_ascii_lowercase();
    match ext.as_str() {
        "doc" => "docx".to_string(),
        "xls" => "xlsx".to_string(),
        "ppt" => "pptx".to_string(),
        _ => ext,
    }
}

/// Generate a fresh result identifier.
pub fn new_identifier() -> String {
    Uuid::new_v4().to_string()
}

/// Owns the result directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    directory: PathBuf,
}

impl ResultStore {
    /// Open the store, creating the directory if needed.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, CompareError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|e| CompareError::io(&directory, e))?;
        debug!("Result directory ready: {}", directory.display());
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Artifact path for an identifier and (any-case) extension.
    ///
    /// A pure function of `(id, canonical_extension(ext))`.
    pub fn result_file_name(&self, id: &str, extension: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", id, canonical_extension(extension)))
    }

    /// Persist an artifact under a freshly generated identifier.
    ///
    /// Returns `(identifier, path)`.
    pub fn save_new(
        &self,
        extension: &str,
        bytes: &[u8],
    ) -> Result<(String, PathBuf), CompareError> {
        let id = new_identifier();
        let path = self.save(&id, extension, bytes)?;
        Ok((id, path))
    }

    /// Persist an artifact, replacing any existing file of the same name.
    pub fn save(&self, id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, CompareError> {
        let path = self.result_file_name(id, extension);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.directory)
            .map_err(|e| CompareError::io(&self.directory, e))?;
        let written = tmp.write_all(bytes).and_then(|()| tmp.flush());
        written.map_err(|e| CompareError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| CompareError::io(&path, e.error))?;

        info!("Saved result {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Resolve the artifact for an identifier.
    ///
    /// With an extension this is [`result_file_name`](Self::result_file_name);
    /// without one the directory is searched for a file whose stem is `id`.
    pub fn locate(&self, id: &str, extension: Option<&str>) -> Result<PathBuf, CompareError> {
        validate_identifier(id)?;

        let path = match extension.filter(|e| !e.is_empty()) {
            Some(ext) => self.result_file_name(id, ext),
            None => self.find_by_stem(id)?,
        };

        if !path.is_file() {
            return Err(CompareError::ResultNotFound { id: id.to_string() });
        }
        Ok(path)
    }

    /// Read a stored artifact.
    pub async fn read(&self, id: &str, extension: Option<&str>) -> Result<Vec<u8>, CompareError> {
        let path = self.locate(id, extension)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| CompareError::io(&path, e))
    }

    fn find_by_stem(&self, id: &str) -> Result<PathBuf, CompareError> {
        let entries =
            std::fs::read_dir(&self.directory).map_err(|e| CompareError::io(&self.directory, e))?;
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|p| p.is_file() && p.file_stem().and_then(|s| s.to_str()) == Some(id))
            .ok_or_else(|| CompareError::ResultNotFound { id: id.to_string() })
    }
}

/// Reject anything that is not a UUID, so lookups cannot leave the directory.
fn validate_identifier(id: &str) -> Result<(), CompareError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| CompareError::InvalidIdentifier { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_extension_table() {
        assert_eq!(canonical_extension("doc"), "docx");
        assert_eq!(canonical_extension("DOC"), "docx");
        assert_eq!(canonical_extension("docx"), "docx");
        assert_eq!(canonical_extension("Xls"), "xlsx");
        assert_eq!(canonical_extension("ppt"), "pptx");
        assert_eq!(canonical_extension("PDF"), "pdf");
        assert_eq!(canonical_extension("htm"), "htm");
    }

    #[test]
    fn result_file_name_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let id = new_identifier();
        assert_eq!(
            store.result_file_name(&id, "DOC"),
            store.result_file_name(&id, "DOCX")
        );
        assert_eq!(
            store.result_file_name(&id, "txt"),
            dir.path().join(format!("{id}.txt"))
        );
    }

    #[test]
    fn identifiers_are_unique() {
        let a = new_identifier();
        let b = new_identifier();
        assert_ne!(a, b);
        assert!(validate_identifier(&a).is_ok());
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("files").join("temp");
        ResultStore::open(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn save_then_read_by_id_with_and_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let (id, path) = store.save_new("doc", b"artifact").unwrap();
        assert!(path.to_string_lossy().ends_with(".docx"));

        assert_eq!(store.read(&id, Some("docx")).await.unwrap(), b"artifact");
        assert_eq!(store.read(&id, Some("DOC")).await.unwrap(), b"artifact");
        assert_eq!(store.read(&id, None).await.unwrap(), b"artifact");
    }

    #[test]
    fn save_overwrites_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let id = new_identifier();
        store.save(&id, "txt", b"first").unwrap();
        let path = store.save(&id, "txt", b"second").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
        // no temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn lookups_reject_non_uuid_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let err = store.locate("../../etc/passwd", None).unwrap_err();
        assert!(matches!(err, CompareError::InvalidIdentifier { .. }));
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let err = store.locate(&new_identifier(), Some("pdf")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
