//! Dispatch to the first engine that claims a document's extension.

use super::{
    CompareSettings, ComparisonEngine, EngineDocument, EngineOutput, PageImage, PdfiumEngine,
    TextEngine,
};
use crate::error::EngineError;
use std::sync::Arc;
use tracing::debug;

/// An engine that delegates to a list of engines by extension.
///
/// The base document decides the engine for a compare; format agreement
/// between inputs is checked before the router is reached.
#[derive(Clone, Default)]
pub struct FormatRouter {
    engines: Vec<Arc<dyn ComparisonEngine>>,
}

impl FormatRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine. Earlier registrations win on overlap.
    pub fn with_engine(mut self, engine: Arc<dyn ComparisonEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    fn route(&self, document: &EngineDocument) -> Result<&dyn ComparisonEngine, EngineError> {
        let extension = document.extension();
        let engine = self
            .engines
            .iter()
            .find(|e| e.supports(&extension))
            .ok_or_else(|| EngineError::Unsupported {
                engine: self.name().to_string(),
                extension: extension.clone(),
            })?;
        debug!("Routing '{}' to {} engine", document.name(), engine.name());
        Ok(engine.as_ref())
    }
}

impl std::fmt::Debug for FormatRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.engines.iter().map(|e| e.name()).collect();
        f.debug_struct("FormatRouter").field("engines", &names).finish()
    }
}

impl ComparisonEngine for FormatRouter {
    fn name(&self) -> &str {
        "router"
    }

    fn supports(&self, extension: &str) -> bool {
        self.engines.iter().any(|e| e.supports(extension))
    }

    fn compare(
        &self,
        base: &EngineDocument,
        revisions: &[EngineDocument],
        settings: &CompareSettings,
    ) -> Result<Option<EngineOutput>, EngineError> {
        self.route(base)?.compare(base, revisions, settings)
    }

    fn page_count(&self, document: &EngineDocument) -> Result<usize, EngineError> {
        self.route(document)?.page_count(document)
    }

    fn render_page(&self, document: &EngineDocument, page: usize) -> Result<PageImage, EngineError> {
        self.route(document)?.render_page(document, page)
    }

    fn render_pages(&self, document: &EngineDocument) -> Result<Vec<PageImage>, EngineError> {
        self.route(document)?.render_pages(document)
    }
}

/// The built-in engine set: text and HTML, plus PDF through pdfium.
pub fn default_engine(max_rendered_pixels: u32) -> Arc<dyn ComparisonEngine> {
    Arc::new(
        FormatRouter::new()
            .with_engine(Arc::new(TextEngine::new()))
            .with_engine(Arc::new(PdfiumEngine::new(max_rendered_pixels))),
    )
}
