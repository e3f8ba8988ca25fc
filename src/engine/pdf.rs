//! PDF engine backed by pdfium.
//!
//! Text is pulled from each page with pdfium's text layer and compared by
//! word (high detail) or by line. The merged artifact is the revision PDF
//! itself; pdfium can read PDFs but not re-typeset them.
//!
//! Coordinates are approximate: a change is placed in the horizontal band of
//! its text line, with the line band derived from the number of text lines on
//! the page. As with every engine here, only revision content is located.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded.

use super::text::{align, Op};
use super::{CompareSettings, ComparisonEngine, EngineDocument, EngineOutput, PageImage};
use crate::error::EngineError;
use crate::output::{ChangeKind, ChangeRecord, Rect};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable naming a directory that holds the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Compares and renders PDF documents.
#[derive(Debug, Clone)]
pub struct PdfiumEngine {
    max_rendered_pixels: u32,
    library_dir: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Binds to the directory in `PDFIUM_LIB_PATH` if set, else the system library.
    pub fn new(max_rendered_pixels: u32) -> Self {
        Self {
            max_rendered_pixels,
            library_dir: std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from),
        }
    }

    /// Load pdfium from a specific directory.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    fn bind(&self) -> Result<Pdfium, EngineError> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| EngineError::Unavailable {
            engine: self.name().to_string(),
            detail: format!("{:?}", e),
        })?;
        Ok(Pdfium::new(bindings))
    }

    fn check_supported(&self, doc: &EngineDocument) -> Result<(), EngineError> {
        let extension = doc.extension();
        if self.supports(&extension) {
            Ok(())
        } else {
            Err(EngineError::Unsupported {
                engine: self.name().to_string(),
                extension,
            })
        }
    }
}

/// Open a document, mapping pdfium's load errors onto engine errors.
fn load<'a>(pdfium: &'a Pdfium, doc: &'a EngineDocument) -> Result<PdfDocument<'a>, EngineError> {
    pdfium
        .load_pdf_from_byte_slice(doc.bytes(), doc.password())
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if doc.password().is_some() {
                    EngineError::WrongPassword {
                        name: doc.name().to_string(),
                    }
                } else {
                    EngineError::PasswordRequired {
                        name: doc.name().to_string(),
                    }
                }
            } else {
                EngineError::Corrupt {
                    name: doc.name().to_string(),
                    detail: err_str,
                }
            }
        })
}

/// Text lines of one page together with the page size in points.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageText {
    pub width: f32,
    pub height: f32,
    pub lines: Vec<String>,
}

fn extract_text(doc: &EngineDocument, document: &PdfDocument<'_>) -> Result<Vec<PageText>, EngineError> {
    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| EngineError::Corrupt {
            name: doc.name().to_string(),
            detail: format!("text layer of page {}: {:?}", idx + 1, e),
        })?;
        pages.push(PageText {
            width: page.width().value,
            height: page.height().value,
            lines: text
                .all()
                .lines()
                .map(|l| l.trim_end().to_string())
                .filter(|l| !l.trim().is_empty())
                .collect(),
        });
    }
    Ok(pages)
}

/// One comparison unit: a word or a whole line.
#[derive(Debug, Clone)]
struct Unit {
    text: String,
    page: usize,
    line: usize,
    /// Character offset of the unit within its line.
    column: usize,
}

fn units(pages: &[PageText], words: bool) -> Vec<Unit> {
    let mut out = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        for (line_idx, line) in page.lines.iter().enumerate() {
            if words {
                let mut column = 0;
                for part in line.split(' ') {
                    if !part.trim().is_empty() {
                        out.push(Unit {
                            text: part.trim().to_string(),
                            page: page_idx,
                            line: line_idx,
                            column,
                        });
                    }
                    column += part.chars().count() + 1;
                }
            } else {
                out.push(Unit {
                    text: line.trim().to_string(),
                    page: page_idx,
                    line: line_idx,
                    column: 0,
                });
            }
        }
    }
    out
}

/// Approximate position of a run on a revision page.
fn band(page: &PageText, line: usize, first_col: usize, end_col: usize) -> Rect {
    let rows = page.lines.len().max(1) as f32;
    let chars = page
        .lines
        .get(line)
        .map(|l| l.chars().count())
        .unwrap_or(1)
        .max(1) as f32;
    let line_height = page.height / rows;
    Rect {
        x: page.width * first_col as f32 / chars,
        y: line_height * line as f32,
        width: (page.width * (end_col - first_col) as f32 / chars).min(page.width),
        height: line_height,
    }
}

/// Diff extracted text of `base` against `revision`, numbering from `next_id`.
pub(crate) fn diff_pages(
    base: &[PageText],
    revision: &[PageText],
    settings: &CompareSettings,
    next_id: &mut usize,
) -> Vec<ChangeRecord> {
    let a = units(base, settings.high_detail);
    let b = units(revision, settings.high_detail);
    let a_words: Vec<&str> = a.iter().map(|u| u.text.as_str()).collect();
    let b_words: Vec<&str> = b.iter().map(|u| u.text.as_str()).collect();

    // (kind, first unit, end column, texts) per run
    let mut runs: Vec<(ChangeKind, &Unit, usize, Vec<&str>)> = Vec::new();
    for op in align(&a_words, &b_words) {
        let (kind, unit) = match op {
            Op::Equal(..) => continue,
            Op::Insert(j) => (ChangeKind::Inserted, &b[j]),
            Op::Delete(i) => (ChangeKind::Deleted, &a[i]),
        };
        let end = unit.column + unit.text.chars().count();
        match runs.last_mut() {
            Some((k, first, run_end, texts))
                if *k == kind && first.page == unit.page && first.line == unit.line =>
            {
                *run_end = end;
                texts.push(unit.text.as_str());
            }
            _ => runs.push((kind, unit, end, vec![unit.text.as_str()])),
        }
    }

    runs.into_iter()
        .map(|(kind, first, end, texts)| {
            let rec = ChangeRecord::new(*next_id, kind, texts.join(" "));
            *next_id += 1;
            if settings.calculate_coordinates && kind == ChangeKind::Inserted {
                let rect = band(&revision[first.page], first.line, first.column, end);
                rec.with_position(first.page + 1, rect)
            } else {
                rec
            }
        })
        .collect()
}

impl ComparisonEngine for PdfiumEngine {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn supports(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    fn compare(
        &self,
        base: &EngineDocument,
        revisions: &[EngineDocument],
        settings: &CompareSettings,
    ) -> Result<Option<EngineOutput>, EngineError> {
        let Some(last) = revisions.last() else {
            return Err(EngineError::NoRevisions);
        };
        self.check_supported(base)?;

        let pdfium = self.bind()?;
        let base_text = extract_text(base, &load(&pdfium, base)?)?;
        info!("PDF loaded: '{}' ({} pages)", base.name(), base_text.len());

        let mut next_id = 0;
        let mut changes = Vec::new();
        for revision in revisions {
            self.check_supported(revision)?;
            let text = extract_text(revision, &load(&pdfium, revision)?)?;
            changes.extend(diff_pages(&base_text, &text, settings, &mut next_id));
        }

        debug!(
            "PDF engine: '{}' vs {} revision(s) → {} changes",
            base.name(),
            revisions.len(),
            changes.len()
        );
        Ok(Some(EngineOutput {
            changes,
            document: last.bytes().to_vec(),
        }))
    }

    fn page_count(&self, document: &EngineDocument) -> Result<usize, EngineError> {
        self.check_supported(document)?;
        let pdfium = self.bind()?;
        let pdf = load(&pdfium, document)?;
        Ok(pdf.pages().len() as usize)
    }

    fn render_page(&self, document: &EngineDocument, page: usize) -> Result<PageImage, EngineError> {
        self.check_supported(document)?;
        let pdfium = self.bind()?;
        let pdf = load(&pdfium, document)?;
        let pages = pdf.pages();
        let total = pages.len() as usize;
        if page == 0 || page > total {
            return Err(EngineError::PageOutOfRange { page, total });
        }

        let edge = render_edge(self.max_rendered_pixels);
        let render_config = PdfRenderConfig::new()
            .set_target_width(edge)
            .set_maximum_height(edge);

        let pdf_page = pages
            .get((page - 1) as u16)
            .map_err(|e| EngineError::RenderFailed {
                page,
                detail: format!("{:?}", e),
            })?;
        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| EngineError::RenderFailed {
                page,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page,
            image.width(),
            image.height()
        );
        Ok(PageImage {
            number: page,
            image,
        })
    }
}

/// Longest rendered edge in the signed pixel units pdfium takes.
fn render_edge(max_rendered_pixels: u32) -> i32 {
    i32::try_from(max_rendered_pixels).unwrap_or(i32::MAX)
}
