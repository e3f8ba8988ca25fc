//! Page retrieval over stored artifacts and source documents.
//!
//! Three ways to get pages out of a document:
//!
//! * [`Paginator::load_pages`] : eager (render + encode every page) or lazy
//!   (page numbers with placeholder dimensions only).
//! * [`Paginator::load_page`] : exactly one page, on demand.
//! * [`Paginator::stream_pages`] : every page, yielded one at a time.
//!
//! Every call opens the document fresh from disk and drops it before
//! returning, whether rendering succeeded or not. Nothing here takes the
//! compare lock.

use crate::engine::{run_blocking, ComparisonEngine, EngineDocument, PageImage};
use crate::error::CompareError;
use crate::output::PageDescriptor;
use crate::pipeline::encode::{encode_page, encode_png};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of rendered pages, in page order.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageDescriptor, CompareError>> + Send>>;

/// Renders and encodes document pages through the engine.
#[derive(Clone)]
pub struct Paginator {
    engine: Arc<dyn ComparisonEngine>,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Paginator {
    pub fn new(engine: Arc<dyn ComparisonEngine>) -> Self {
        Self { engine }
    }

    /// List the pages of a document.
    ///
    /// `eager` renders and encodes every page; otherwise only page numbers
    /// are returned, with placeholder dimensions and no data.
    pub async fn load_pages(
        &self,
        path: &Path,
        password: Option<&str>,
        eager: bool,
    ) -> Result<Vec<PageDescriptor>, CompareError> {
        let doc = open_document(path, password).await?;
        let engine = Arc::clone(&self.engine);

        if eager {
            let pages: Vec<PageDescriptor> = run_blocking("Render", move || {
                let rendered = engine.render_pages(&doc)?;
                rendered.iter().map(encode).collect()
            })
            .await?;
            info!("Rendered {} pages of {}", pages.len(), path.display());
            Ok(pages)
        } else {
            let total = run_blocking("Page count", move || Ok(engine.page_count(&doc)?)).await?;
            debug!("Listed {} lazy pages of {}", total, path.display());
            Ok((1..=total).map(PageDescriptor::placeholder).collect())
        }
    }

    /// Render and encode one 1-indexed page.
    pub async fn load_page(
        &self,
        path: &Path,
        password: Option<&str>,
        page: usize,
    ) -> Result<PageDescriptor, CompareError> {
        let doc = open_document(path, password).await?;
        let engine = Arc::clone(&self.engine);
        run_blocking("Render", move || {
            let image = render_checked(engine.as_ref(), &doc, page)?;
            encode(&image)
        })
        .await
    }

    /// Render one 1-indexed page to raw PNG bytes.
    pub async fn page_png(
        &self,
        path: &Path,
        password: Option<&str>,
        page: usize,
    ) -> Result<Vec<u8>, CompareError> {
        let doc = open_document(path, password).await?;
        let engine = Arc::clone(&self.engine);
        run_blocking("Render", move || {
            let image = render_checked(engine.as_ref(), &doc, page)?;
            encode_png(&image.image).map_err(|e| encode_error(page, e))
        })
        .await
    }

    /// Stream every page of a document as it is rendered.
    pub async fn stream_pages(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<PageStream, CompareError> {
        let doc = Arc::new(open_document(path, password).await?);
        let engine = Arc::clone(&self.engine);

        let total = {
            let engine = Arc::clone(&engine);
            let doc = Arc::clone(&doc);
            run_blocking("Page count", move || Ok(engine.page_count(&doc)?)).await?
        };

        let s = stream::iter(1..=total).then(move |page| {
            let engine = Arc::clone(&engine);
            let doc = Arc::clone(&doc);
            async move {
                run_blocking("Render", move || {
                    let image = render_checked(engine.as_ref(), &doc, page)?;
                    encode(&image)
                })
                .await
            }
        });

        Ok(Box::pin(s))
    }
}

/// Read a document from disk into an engine document.
async fn open_document(path: &Path, password: Option<&str>) -> Result<EngineDocument, CompareError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CompareError::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    Ok(EngineDocument::new(name, bytes, password.map(str::to_string)))
}

/// Render a page after checking it lies within `[1, page_count]`.
fn render_checked(
    engine: &dyn ComparisonEngine,
    doc: &EngineDocument,
    page: usize,
) -> Result<PageImage, CompareError> {
    let total = engine.page_count(doc)?;
    if page == 0 || page > total {
        return Err(CompareError::PageOutOfRange { page, total });
    }
    Ok(engine.render_page(doc, page)?)
}

fn encode(image: &PageImage) -> Result<PageDescriptor, CompareError> {
    encode_page(image).map_err(|e| encode_error(image.number, e))
}

fn encode_error(page: usize, e: image::ImageError) -> CompareError {
    CompareError::Internal(format!("Image encoding failed for page {page}: {e}"))
}
