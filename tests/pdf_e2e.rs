//! End-to-end tests for the pdfium-backed PDF engine.
//!
//! These tests need a pdfium shared library. They are gated behind the
//! `PDFIUM_E2E` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   PDFIUM_E2E=1 PDFIUM_LIB_PATH=/path/to/lib cargo test --test pdf_e2e -- --nocapture

use edgequake_doccompare::{
    ChangeKind, ComparisonConfig, ComparisonService, DocumentRef, ErrorKind,
};
use pdfium_render::prelude::*;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("PDFIUM_E2E").is_err() {
            println!("SKIP — set PDFIUM_E2E=1 to run pdf e2e tests");
            return;
        }
    }};
}

fn pdfium() -> Pdfium {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .expect("pdfium library");
    Pdfium::new(bindings)
}

/// Build a PDF with one text object per line, one page per entry.
fn make_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let pdfium = pdfium();
    let mut document = pdfium.create_new_pdf().expect("new pdf");
    let font = document.fonts_mut().helvetica();
    for lines in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .expect("new page");
        for (i, line) in lines.iter().enumerate() {
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(72.0),
                    PdfPoints::new(770.0 - 20.0 * i as f32),
                    line,
                    font,
                    PdfPoints::new(12.0),
                )
                .expect("text object");
        }
    }
    document.save_to_bytes().expect("save pdf")
}

fn service(dir: &std::path::Path) -> ComparisonService {
    let config = ComparisonConfig::builder()
        .files_directory(dir)
        .max_rendered_pixels(600)
        .build()
        .unwrap();
    ComparisonService::with_default_engine(config).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdf_insert_and_delete_are_both_located() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(&[&["alpha beta gamma", "second line"]]);
    let b = make_pdf(&[&["alpha gamma", "second line", "third line"]]);

    let result = service(dir.path())
        .compare_files(DocumentRef::upload("a.pdf", a), DocumentRef::upload("b.pdf", b))
        .await
        .unwrap();

    println!("{}", serde_json::to_string_pretty(&result.changes).unwrap());
    assert!(result.count(ChangeKind::Inserted) >= 1);
    let deleted: Vec<_> = result
        .changes
        .iter()
        .filter(|c| c.kind == ChangeKind::Deleted)
        .collect();
    assert!(deleted.iter().any(|c| c.text.contains("beta")));
    assert!(deleted.iter().all(|c| c.has_coordinates()));
    assert_eq!(result.extension, "pdf");
    assert_eq!(result.pages.len(), 1);
    assert!(result.pages[0].is_loaded());
    assert!(result.pages[0].width <= 600 && result.pages[0].height <= 600);
}

#[tokio::test]
async fn test_pdf_page_retrieval() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(&[&["one"], &["two"]]);
    let b = make_pdf(&[&["one"], &["two", "more"]]);

    let svc = service(dir.path());
    let result = svc
        .compare_files(DocumentRef::upload("a.pdf", a), DocumentRef::upload("b.pdf", b))
        .await
        .unwrap();
    assert_eq!(result.pages.len(), 2);
    let inserted = result
        .changes
        .iter()
        .find(|c| c.kind == ChangeKind::Inserted)
        .expect("an insertion");
    assert_eq!(inserted.page, Some(2));

    let page = svc.load_result_page(&result.guid, 2, None).await.unwrap();
    assert_eq!(page.number, 2);
    let err = svc.load_result_page(&result.guid, 3, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PageOutOfRange);
}

#[tokio::test]
async fn test_corrupt_pdf_is_fatal() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let err = service(dir.path())
        .compare_files(
            DocumentRef::upload("a.pdf", b"not a pdf".to_vec()),
            DocumentRef::upload("b.pdf", b"still not".to_vec()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FatalCompare);
}
