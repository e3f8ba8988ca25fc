//! The comparison service: the request surface of the library.
//!
//! Every compare flows through the same steps:
//!
//! ```text
//! prepare ──▶ gate ──▶ open ──▶ engine (locked) ──▶ merge ──▶ save ──▶ pages
//! ```
//!
//! Pairwise requests run the engine twice (forward and reverse) and fold the
//! two change lists together; multi requests run one chained session and
//! return its change list as is. Page retrieval and downloads work on stored
//! artifacts and never touch the compare lock.

use crate::config::ComparisonConfig;
use crate::engine::router::default_engine;
use crate::engine::{CompareSettings, ComparisonEngine, EngineGateway, EngineOutput};
use crate::error::CompareError;
use crate::output::{CompareResult, PageDescriptor};
use crate::pipeline::format::FormatGate;
use crate::pipeline::input::{Cardinality, DocumentRef, InputNormalizer, Locator};
use crate::pipeline::merge::merge_changes;
use crate::pipeline::paginate::{PageStream, Paginator};
use crate::pipeline::store::{canonical_extension, ResultStore};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pair,
    Multi,
}

/// Orchestrates input normalisation, the engine, merging, storage and
/// pagination.
///
/// Cheap to clone; clones share the engine and the result directory.
#[derive(Debug, Clone)]
pub struct ComparisonService {
    config: ComparisonConfig,
    gate: FormatGate,
    normalizer: InputNormalizer,
    gateway: EngineGateway,
    store: ResultStore,
    paginator: Paginator,
}

impl ComparisonService {
    /// Build a service around an engine.
    ///
    /// The result directory is created here, before any request is served.
    pub fn new(
        config: ComparisonConfig,
        engine: Arc<dyn ComparisonEngine>,
    ) -> Result<Self, CompareError> {
        let store = ResultStore::open(config.result_directory())?;
        info!(
            "Comparison service ready: engine={}, results={}",
            engine.name(),
            store.directory().display()
        );
        Ok(Self {
            gate: FormatGate::new(config.allow_image_formats),
            normalizer: InputNormalizer::new(config.download_timeout_secs),
            gateway: EngineGateway::new(Arc::clone(&engine)),
            paginator: Paginator::new(engine),
            store,
            config,
        })
    }

    /// Build a service with the built-in engines (text, HTML, PDF).
    pub fn with_default_engine(config: ComparisonConfig) -> Result<Self, CompareError> {
        let engine = default_engine(config.max_rendered_pixels);
        Self::new(config, engine)
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    // ── Compare operations ───────────────────────────────────────────────

    /// Compare two local files. Relative paths resolve against
    /// `files_directory`.
    pub async fn compare_with_paths(
        &self,
        first: impl AsRef<Path>,
        first_password: Option<&str>,
        second: impl AsRef<Path>,
        second_password: Option<&str>,
    ) -> Result<CompareResult, CompareError> {
        let sources = vec![
            with_password(DocumentRef::path(first.as_ref()), first_password),
            with_password(DocumentRef::path(second.as_ref()), second_password),
        ];
        self.compare(sources).await
    }

    /// Compare two uploaded files (see [`DocumentRef::upload`]).
    pub async fn compare_files(
        &self,
        first: DocumentRef,
        second: DocumentRef,
    ) -> Result<CompareResult, CompareError> {
        self.compare(vec![first, second]).await
    }

    /// Compare two remote documents.
    pub async fn compare_with_urls(
        &self,
        first: &str,
        first_password: Option<&str>,
        second: &str,
        second_password: Option<&str>,
    ) -> Result<CompareResult, CompareError> {
        let sources = vec![
            with_password(DocumentRef::url(first), first_password),
            with_password(DocumentRef::url(second), second_password),
        ];
        self.compare(sources).await
    }

    /// Compare exactly two documents from any mix of sources.
    ///
    /// Uploads come first, then URLs, then paths; the first document in that
    /// order is the base of the forward pass.
    pub async fn compare(&self, sources: Vec<DocumentRef>) -> Result<CompareResult, CompareError> {
        self.run(sources, Mode::Pair).await
    }

    /// Compare two or more documents in one chained session.
    ///
    /// The first document is the base, the rest are revisions in order. No
    /// directional merge is applied.
    pub async fn multi_compare(
        &self,
        sources: Vec<DocumentRef>,
    ) -> Result<CompareResult, CompareError> {
        if !self.config.multi_comparing {
            return Err(CompareError::InvalidRequest(
                "multi-document comparison is disabled".to_string(),
            ));
        }
        self.run(sources, Mode::Multi).await
    }

    /// Whether two file names share one supported extension.
    pub fn check_formats(&self, first: &str, second: &str) -> bool {
        self.gate.check_formats(first, second)
    }

    async fn run(&self, sources: Vec<DocumentRef>, mode: Mode) -> Result<CompareResult, CompareError> {
        let start = Instant::now();

        // ── Step 1: Order sources and check the count ────────────────────
        let cardinality = match mode {
            Mode::Pair => Cardinality::Pair,
            Mode::Multi => Cardinality::AtLeastTwo,
        };
        let sources = sources.into_iter().map(|s| self.resolve(s)).collect();
        let prepared = self.normalizer.prepare(sources, cardinality)?;
        info!("Starting {:?} compare of {} documents", mode, prepared.len());

        // ── Step 2: Format gate ──────────────────────────────────────────
        let names: Vec<String> = prepared.iter().map(DocumentRef::file_name).collect();
        let extension = self.gate.check(&names)?;
        info!("Format accepted: {}", extension);

        // ── Step 3: Open every source ────────────────────────────────────
        let documents = self.normalizer.open_all(prepared).await?;
        info!("Opened {} sources", documents.len());
        // the artifact is the last document's layout, so it opens with its password
        let artifact_password = documents
            .last()
            .and_then(|d| d.password().map(str::to_string));

        // ── Step 4: Engine ───────────────────────────────────────────────
        let settings = CompareSettings::for_extension(&extension);
        debug!("Engine settings: {:?}", settings);
        let output = match mode {
            Mode::Pair => {
                let mut it = documents.into_iter();
                let (Some(first), Some(second)) = (it.next(), it.next()) else {
                    return Err(CompareError::Internal(
                        "pairwise compare lost a document".to_string(),
                    ));
                };
                let (forward, reverse) = self.gateway.compare_pair(first, second, settings).await?;

                // ── Step 5: Directional merge ────────────────────────────
                let changes = merge_changes(forward.changes, reverse.changes);
                info!("Merged change list: {} records", changes.len());
                EngineOutput {
                    changes,
                    document: forward.document,
                }
            }
            Mode::Multi => self.gateway.compare_chain(documents, settings).await?,
        };

        // ── Step 6: Persist the artifact ─────────────────────────────────
        let (guid, artifact_path) = self.store.save_new(&extension, &output.document)?;
        info!("Stored result {}", guid);

        // ── Step 7: Pages ────────────────────────────────────────────────
        let pages = match self
            .paginator
            .load_pages(
                &artifact_path,
                artifact_password.as_deref(),
                self.config.eager_pages(),
            )
            .await
        {
            Ok(pages) => pages,
            Err(e) => {
                // nobody receives this identifier, so the artifact goes too
                if let Err(rm) = tokio::fs::remove_file(&artifact_path).await {
                    warn!("Could not remove artifact of failed result {}: {}", guid, rm);
                }
                return Err(e);
            }
        };
        info!(
            "Compare finished in {}ms: {} changes, {} pages",
            start.elapsed().as_millis(),
            output.changes.len(),
            pages.len()
        );

        Ok(CompareResult {
            guid,
            extension: canonical_extension(&extension),
            changes: output.changes,
            artifact_path,
            pages,
        })
    }

    // ── Page & artifact retrieval ────────────────────────────────────────

    /// Render one 1-indexed page of a stored result.
    pub async fn load_result_page(
        &self,
        guid: &str,
        page: usize,
        password: Option<&str>,
    ) -> Result<PageDescriptor, CompareError> {
        let path = self.store.locate(guid, None)?;
        debug!("Loading page {} of result {}", page, guid);
        self.paginator.load_page(&path, password, page).await
    }

    /// Stream every page of a stored result.
    pub async fn stream_result_pages(
        &self,
        guid: &str,
        password: Option<&str>,
    ) -> Result<PageStream, CompareError> {
        let path = self.store.locate(guid, None)?;
        self.paginator.stream_pages(&path, password).await
    }

    /// Page list of a source document, eager or lazy per configuration.
    pub async fn load_document(
        &self,
        path: impl AsRef<Path>,
        password: Option<&str>,
    ) -> Result<Vec<PageDescriptor>, CompareError> {
        let path = self.resolve_path(path.as_ref());
        let name = path.to_string_lossy().into_owned();
        self.gate.check(&[name])?;
        info!("Loading document {}", path.display());
        self.paginator
            .load_pages(&path, password, self.config.eager_pages())
            .await
    }

    /// Download a stored result.
    ///
    /// Without `index` this is the artifact itself. With `index` it is the PNG
    /// rendering of that 1-indexed page, opened with `password`. `extension`
    /// narrows the lookup to one artifact name; without it the identifier
    /// alone is used.
    pub async fn download_document(
        &self,
        guid: &str,
        index: Option<usize>,
        extension: Option<&str>,
        password: Option<&str>,
    ) -> Result<Vec<u8>, CompareError> {
        match index {
            None => {
                let bytes = self.store.read(guid, extension).await?;
                info!("Downloading result {} ({} bytes)", guid, bytes.len());
                Ok(bytes)
            }
            Some(page) => {
                let path = self.store.locate(guid, extension)?;
                info!("Downloading page {} of result {}", page, guid);
                self.paginator.page_png(&path, password, page).await
            }
        }
    }

    // ── Blocking wrappers ────────────────────────────────────────────────

    /// Blocking variant of [`compare`](Self::compare) for callers without a
    /// Tokio runtime.
    pub fn compare_sync(&self, sources: Vec<DocumentRef>) -> Result<CompareResult, CompareError> {
        block_on(self.compare(sources))
    }

    /// Blocking variant of [`multi_compare`](Self::multi_compare).
    pub fn multi_compare_sync(
        &self,
        sources: Vec<DocumentRef>,
    ) -> Result<CompareResult, CompareError> {
        block_on(self.multi_compare(sources))
    }

    /// Blocking variant of [`load_result_page`](Self::load_result_page).
    pub fn load_result_page_sync(
        &self,
        guid: &str,
        page: usize,
        password: Option<&str>,
    ) -> Result<PageDescriptor, CompareError> {
        block_on(self.load_result_page(guid, page, password))
    }

    /// Blocking variant of [`download_document`](Self::download_document).
    pub fn download_document_sync(
        &self,
        guid: &str,
        index: Option<usize>,
        extension: Option<&str>,
        password: Option<&str>,
    ) -> Result<Vec<u8>, CompareError> {
        block_on(self.download_document(guid, index, extension, password))
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn resolve(&self, mut source: DocumentRef) -> DocumentRef {
        if let Locator::Path(path) = &source.locator {
            source.locator = Locator::Path(self.resolve_path(path));
        }
        source
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.files_directory.join(path)
        }
    }
}

fn with_password(source: DocumentRef, password: Option<&str>) -> DocumentRef {
    match password {
        Some(p) => source.with_password(p),
        None => source,
    }
}

fn block_on<T>(fut: impl Future<Output = Result<T, CompareError>>) -> Result<T, CompareError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CompareError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(fut)
}
