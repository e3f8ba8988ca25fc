//! Built-in engine for plain text and HTML documents.
//!
//! Documents are laid out on fixed A4-sized pages (595 × 842 pt, one text
//! line per layout line, `lines_per_page` lines per page) and compared at
//! word granularity with a longest-common-subsequence alignment.
//!
//! Like the production engines it stands in for, it only knows where content
//! sits in the *revision* document: inserted and restyled words get a page
//! and a bounding box, deleted words get neither. Callers that need located
//! deletions run the compare in both directions.
//!
//! Rendering produces layout thumbnails: each word is drawn as a grey bar at
//! its position, which is enough to show where changes fall on a page without
//! a font rasteriser.

use super::{CompareSettings, ComparisonEngine, EngineDocument, EngineOutput, PageImage};
use crate::error::EngineError;
use crate::output::{ChangeKind, ChangeRecord, Rect, StyleChange};
use image::{DynamicImage, Rgba, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Page width in points (A4).
pub const PAGE_WIDTH: u32 = 595;
/// Page height in points (A4).
pub const PAGE_HEIGHT: u32 = 842;
const MARGIN: f32 = 36.0;
const CHAR_WIDTH: f32 = 6.0;
const DEFAULT_LINES_PER_PAGE: usize = 50;

const EXTENSIONS: &[&str] = &["txt", "html", "htm"];

/// Inline tags whose nesting defines a word's style.
const STYLE_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "del", "ins", "sub", "sup", "mark", "code",
    "font", "span", "small", "big",
];

static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)?[^>]*>").unwrap());
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// Token-level comparison engine for `txt`, `html` and `htm`.
#[derive(Debug, Clone)]
pub struct TextEngine {
    lines_per_page: usize,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            lines_per_page: DEFAULT_LINES_PER_PAGE,
        }
    }

    /// Lines laid out on one page. Minimum 1.
    pub fn lines_per_page(mut self, n: usize) -> Self {
        self.lines_per_page = n.max(1);
        self
    }

    fn line_height(&self) -> f32 {
        (PAGE_HEIGHT as f32 - 2.0 * MARGIN) / self.lines_per_page as f32
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

    /// Position of a run of words on `line`, in page coordinates.
    fn locate(&self, line: usize, first_col: usize, end_col: usize) -> (usize, Rect) {
        let page = line / self.lines_per_page + 1;
        let row = line % self.lines_per_page;
        let height = self.line_height();
        let x = MARGIN + first_col as f32 * CHAR_WIDTH;
        let max_width = PAGE_WIDTH as f32 - MARGIN - x;
        let rect = Rect {
            x,
            y: MARGIN + row as f32 * height,
            width: ((end_col - first_col) as f32 * CHAR_WIDTH).min(max_width.max(0.0)),
            height,
        };
        (page, rect)
    }

    fn compare_pair(
        &self,
        base: &Layout,
        revision: &Layout,
        settings: &CompareSettings,
        next_id: &mut usize,
    ) -> Vec<ChangeRecord> {
        let ops = align(&base.words(), &revision.words());
        let mut runs: Vec<Run> = Vec::new();

        for op in ops {
            let step = match op {
                Op::Insert(j) => Some((ChangeKind::Inserted, &revision.tokens[j], None)),
                Op::Delete(i) => Some((ChangeKind::Deleted, &base.tokens[i], None)),
                Op::Equal(i, j) => {
                    let (old, new) = (&base.tokens[i], &revision.tokens[j]);
                    (settings.style_change_detection && old.style != new.style).then(|| {
                        (
                            ChangeKind::StyleChanged,
                            new,
                            Some((old.style.clone(), new.style.clone())),
                        )
                    })
                }
            };

            let Some((kind, token, styles)) = step else {
                continue;
            };
            match runs.last_mut() {
                Some(run) if run.extends(kind, token, &styles) => run.push(token),
                _ => runs.push(Run::start(kind, token, styles)),
            }
        }

        runs.into_iter()
            .map(|run| {
                let mut rec = ChangeRecord::new(*next_id, run.kind, run.words.join(" "));
                *next_id += 1;
                // deleted content has no place in the revision layout
                if settings.calculate_coordinates && run.kind != ChangeKind::Deleted {
                    let (page, rect) = self.locate(run.line, run.first_col, run.end_col);
                    rec = rec.with_position(page, rect);
                }
                if let Some((old, new)) = run.styles {
                    rec.style_changes.push(StyleChange {
                        property: "markup".to_string(),
                        old_value: style_label(&old),
                        new_value: style_label(&new),
                    });
                }
                rec
            })
            .collect()
    }

    /// The merged document: the revision, optionally with deleted words
    /// re-inserted as marked lines before the point where they were removed.
    fn merged_document(
        &self,
        base: &Layout,
        revision: &Layout,
        markup: bool,
        settings: &CompareSettings,
    ) -> Vec<u8> {
        if !settings.show_deleted_content {
            return revision.source.as_bytes().to_vec();
        }

        // deleted runs keyed by the revision line they precede
        let mut pending: Vec<(usize, Vec<String>)> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for op in align(&base.words(), &revision.words()) {
            match op {
                Op::Delete(i) => current.push(base.tokens[i].text.clone()),
                Op::Insert(j) | Op::Equal(_, j) => {
                    if !current.is_empty() {
                        pending.push((revision.tokens[j].line, std::mem::take(&mut current)));
                    }
                }
            }
        }
        if !current.is_empty() {
            pending.push((revision.lines.len(), current));
        }

        let mark = |words: &[String]| {
            let text = words.join(" ");
            if markup {
                format!("<del>{text}</del>")
            } else {
                format!("[-{text}-]")
            }
        };

        let mut out: Vec<String> = Vec::with_capacity(revision.lines.len() + pending.len());
        let mut pending = pending.into_iter().peekable();
        for (idx, line) in revision.source.lines().enumerate() {
            while let Some((_, words)) = pending.next_if(|(at, _)| *at <= idx) {
                out.push(mark(&words));
            }
            out.push(line.to_string());
        }
        out.extend(pending.map(|(_, words)| mark(&words)));

        let mut text = out.join("\n");
        if revision.source.ends_with('\n') {
            text.push('\n');
        }
        text.into_bytes()
    }
}

impl ComparisonEngine for TextEngine {
    fn name(&self) -> &str {
        "text"
    }

    fn supports(&self, extension: &str) -> bool {
        EXTENSIONS.contains(&extension)
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
        for revision in revisions {
            self.check_supported(revision)?;
        }

        let markup = is_markup(&base.extension());
        let base_layout = Layout::parse(base.bytes(), markup);
        let mut next_id = 0;
        let mut changes = Vec::new();
        let mut last_layout = None;

        for revision in revisions {
            let layout = Layout::parse(revision.bytes(), markup);
            changes.extend(self.compare_pair(&base_layout, &layout, settings, &mut next_id));
            last_layout = Some(layout);
        }

        let last_layout = last_layout.unwrap_or_else(|| Layout::parse(last.bytes(), markup));
        let document = self.merged_document(&base_layout, &last_layout, markup, settings);

        debug!(
            "Text engine: '{}' vs {} revision(s) → {} changes",
            base.name(),
            revisions.len(),
            changes.len()
        );
        Ok(Some(EngineOutput { changes, document }))
    }

    fn page_count(&self, document: &EngineDocument) -> Result<usize, EngineError> {
        self.check_supported(document)?;
        let layout = Layout::parse(document.bytes(), is_markup(&document.extension()));
        Ok(layout.lines.len().div_ceil(self.lines_per_page).max(1))
    }

    fn render_page(&self, document: &EngineDocument, page: usize) -> Result<PageImage, EngineError> {
        let total = self.page_count(document)?;
        if page == 0 || page > total {
            return Err(EngineError::PageOutOfRange { page, total });
        }

        let layout = Layout::parse(document.bytes(), is_markup(&document.extension()));
        let mut img = RgbaImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Rgba([255, 255, 255, 255]));
        let first_line = (page - 1) * self.lines_per_page;
        let last_line = first_line + self.lines_per_page;

        for token in layout
            .tokens
            .iter()
            .filter(|t| t.line >= first_line && t.line < last_line)
        {
            let (_, rect) = self.locate(token.line, token.column, token.end_column());
            // bar occupies the middle half of the line box
            let bar = Rect {
                y: rect.y + rect.height * 0.25,
                height: (rect.height * 0.5).max(1.0),
                ..rect
            };
            fill_rect(&mut img, bar, Rgba([150, 150, 150, 255]));
        }

        Ok(PageImage {
            number: page,
            image: DynamicImage::ImageRgba8(img),
        })
    }
}

// ── Layout & tokens ──────────────────────────────────────────────────────

fn is_markup(extension: &str) -> bool {
    matches!(extension, "html" | "htm")
}

fn style_label(style: &str) -> String {
    if style.is_empty() {
        "plain".to_string()
    } else {
        style.to_string()
    }
}

/// One word with its position in the visible text.
#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    line: usize,
    /// Character offset within the visible line.
    column: usize,
    /// Enclosing inline tags, outermost first, joined by `+`.
    style: String,
}

impl Token {
    fn end_column(&self) -> usize {
        self.column + self.text.chars().count()
    }
}

/// A parsed document: raw source, visible lines and words.
#[derive(Debug)]
struct Layout {
    source: String,
    lines: Vec<String>,
    tokens: Vec<Token>,
}

impl Layout {
    fn parse(bytes: &[u8], markup: bool) -> Self {
        let source = String::from_utf8_lossy(bytes).into_owned();
        let mut lines = Vec::new();
        let mut tokens = Vec::new();
        let mut stack: Vec<String> = Vec::new();

        for (line_idx, raw) in source.lines().enumerate() {
            let mut visible = String::new();
            let mut visible_cols = 0usize;

            let mut push_segment = |segment: &str, stack: &[String], visible: &mut String| {
                for m in RE_WORD.find_iter(segment) {
                    let column = visible_cols + segment[..m.start()].chars().count();
                    tokens.push(Token {
                        text: m.as_str().to_string(),
                        line: line_idx,
                        column,
                        style: stack.join("+"),
                    });
                }
                visible.push_str(segment);
                visible_cols += segment.chars().count();
            };

            if markup {
                let mut last = 0;
                for caps in RE_TAG.captures_iter(raw) {
                    let Some(whole) = caps.get(0) else { continue };
                    push_segment(&raw[last..whole.start()], &stack, &mut visible);
                    last = whole.end();

                    let closing = caps.get(1).is_some_and(|c| !c.as_str().is_empty());
                    let self_closing = whole.as_str().ends_with("/>");
                    if let Some(name) = caps.get(2).map(|n| n.as_str().to_ascii_lowercase()) {
                        if !STYLE_TAGS.contains(&name.as_str()) || self_closing {
                            continue;
                        }
                        if closing {
                            if let Some(pos) = stack.iter().rposition(|t| *t == name) {
                                stack.remove(pos);
                            }
                        } else {
                            stack.push(name);
                        }
                    }
                }
                push_segment(&raw[last..], &stack, &mut visible);
            } else {
                push_segment(raw, &stack, &mut visible);
            }

            lines.push(visible);
        }

        Self {
            source,
            lines,
            tokens,
        }
    }

    fn words(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

// ── Alignment ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Upper bound on LCS table cells (u32 each) for one section.
const MAX_TABLE_CELLS: usize = 4_000_000;

/// Token alignment by longest common subsequence.
///
/// Common prefix and suffix are matched directly; only the middle section
/// goes through the quadratic table. Sections too large for the table are
/// first split on words that occur exactly once on each side; a section
/// with no such anchor is reported as a block delete followed by a block
/// insert.
pub(super) fn align(a: &[&str], b: &[&str]) -> Vec<Op> {
    let mut ops = Vec::with_capacity(a.len().max(b.len()));
    align_section(a, b, 0, 0, &mut ops);
    ops
}

fn align_section(a: &[&str], b: &[&str], a_off: usize, b_off: usize, ops: &mut Vec<Op>) {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    ops.extend((0..prefix).map(|k| Op::Equal(a_off + k, b_off + k)));

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    let (a_mid_off, b_mid_off) = (a_off + prefix, b_off + prefix);
    let cells = (a_mid.len() + 1).saturating_mul(b_mid.len() + 1);

    if a_mid.is_empty() || b_mid.is_empty() {
        block_replace(a_mid.len(), b_mid.len(), a_mid_off, b_mid_off, ops);
    } else if cells <= MAX_TABLE_CELLS {
        lcs_section(a_mid, b_mid, a_mid_off, b_mid_off, ops);
    } else {
        let anchors = unique_anchors(a_mid, b_mid);
        debug!(
            "Section of {}x{} words split on {} anchors",
            a_mid.len(),
            b_mid.len(),
            anchors.len()
        );
        if anchors.is_empty() {
            block_replace(a_mid.len(), b_mid.len(), a_mid_off, b_mid_off, ops);
        } else {
            let (mut i, mut j) = (0, 0);
            for (ai, bj) in anchors {
                align_section(&a_mid[i..ai], &b_mid[j..bj], a_mid_off + i, b_mid_off + j, ops);
                ops.push(Op::Equal(a_mid_off + ai, b_mid_off + bj));
                i = ai + 1;
                j = bj + 1;
            }
            align_section(&a_mid[i..], &b_mid[j..], a_mid_off + i, b_mid_off + j, ops);
        }
    }

    let (a_end, b_end) = (a_off + a.len(), b_off + b.len());
    ops.extend((0..suffix).map(|k| Op::Equal(a_end - suffix + k, b_end - suffix + k)));
}

fn block_replace(n: usize, m: usize, a_off: usize, b_off: usize, ops: &mut Vec<Op>) {
    ops.extend((0..n).map(|i| Op::Delete(a_off + i)));
    ops.extend((0..m).map(|j| Op::Insert(b_off + j)));
}

fn lcs_section(a: &[&str], b: &[&str], a_off: usize, b_off: usize, ops: &mut Vec<Op>) {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            ops.push(Op::Equal(a_off + i, b_off + j));
            i += 1;
            j += 1;
        } else if i < n && (j == m || lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            ops.push(Op::Delete(a_off + i));
            i += 1;
        } else {
            ops.push(Op::Insert(b_off + j));
            j += 1;
        }
    }
}

/// Index pairs of words unique on both sides, reduced to the longest chain
/// increasing in both indices.
fn unique_anchors(a: &[&str], b: &[&str]) -> Vec<(usize, usize)> {
    // word -> (count in a, index in a, count in b, index in b)
    let mut seen: HashMap<&str, (u32, usize, u32, usize)> = HashMap::new();
    for (i, w) in a.iter().enumerate() {
        let e = seen.entry(*w).or_insert((0, i, 0, 0));
        e.0 += 1;
    }
    for (j, w) in b.iter().enumerate() {
        if let Some(e) = seen.get_mut(*w) {
            e.2 += 1;
            e.3 = j;
        }
    }
    let mut pairs: Vec<(usize, usize)> = seen
        .into_values()
        .filter(|e| e.0 == 1 && e.2 == 1)
        .map(|e| (e.1, e.3))
        .collect();
    pairs.sort_unstable();

    // Longest increasing run of b indices (patience sorting).
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; pairs.len()];
    for (k, &(_, bj)) in pairs.iter().enumerate() {
        let pos = tails.partition_point(|&t| pairs[t].1 < bj);
        if pos > 0 {
            prev[k] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(k);
        } else {
            tails[pos] = k;
        }
    }

    let mut chain = Vec::with_capacity(tails.len());
    let mut cur = tails.last().copied();
    while let Some(k) = cur {
        chain.push(pairs[k]);
        cur = prev[k];
    }
    chain.reverse();
    chain
}

/// Consecutive words of one kind on one line.
struct Run {
    kind: ChangeKind,
    line: usize,
    first_col: usize,
    end_col: usize,
    words: Vec<String>,
    styles: Option<(String, String)>,
}

impl Run {
    fn start(kind: ChangeKind, token: &Token, styles: Option<(String, String)>) -> Self {
        Self {
            kind,
            line: token.line,
            first_col: token.column,
            end_col: token.end_column(),
            words: vec![token.text.clone()],
            styles,
        }
    }

    fn extends(&self, kind: ChangeKind, token: &Token, styles: &Option<(String, String)>) -> bool {
        self.kind == kind && self.line == token.line && &self.styles == styles
    }

    fn push(&mut self, token: &Token) {
        self.end_col = token.end_column();
        self.words.push(token.text.clone());
    }
}

/// Fill a rectangle, clipped to the image.
fn fill_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let x0 = rect.x.max(0.0) as u32;
    let y0 = rect.y.max(0.0) as u32;
    let x1 = ((rect.x + rect.width).max(0.0) as u32).min(img.width());
    let y1 = ((rect.y + rect.height).max(0.0) as u32).min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, text: &str) -> EngineDocument {
        EngineDocument::new(name, text.as_bytes().to_vec(), None)
    }

    fn compare(a: &EngineDocument, b: &EngineDocument) -> EngineOutput {
        TextEngine::new()
            .compare(a, std::slice::from_ref(b), &CompareSettings::for_extension("txt"))
            .unwrap()
            .expect("text engine always returns a result")
    }

    #[test]
    fn identical_documents_have_no_changes() {
        let out = compare(&doc("a.txt", "same text\nhere\n"), &doc("b.txt", "same text\nhere\n"));
        assert!(out.changes.is_empty());
        assert_eq!(out.document, b"same text\nhere\n");
    }

    #[test]
    fn appended_word_is_one_located_insertion() {
        let out = compare(&doc("a.txt", "foo"), &doc("b.txt", "foo bar"));
        assert_eq!(out.changes.len(), 1);
        let c = &out.changes[0];
        assert_eq!(c.kind, ChangeKind::Inserted);
        assert_eq!(c.text, "bar");
        assert_eq!(c.page, Some(1));
        let b = c.bounds.unwrap();
        assert_eq!(b.x, MARGIN + 4.0 * CHAR_WIDTH);
        assert_eq!(b.width, 3.0 * CHAR_WIDTH);
    }

    #[test]
    fn deletions_carry_no_coordinates() {
        let out = compare(&doc("a.txt", "foo bar"), &doc("b.txt", "foo"));
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].kind, ChangeKind::Deleted);
        assert_eq!(out.changes[0].text, "bar");
        assert!(!out.changes[0].has_coordinates());
    }

    #[test]
    fn adjacent_words_on_a_line_form_one_run() {
        let out = compare(
            &doc("a.txt", "alpha omega\nsecond line"),
            &doc("b.txt", "alpha beta gamma omega\nsecond new line"),
        );
        let texts: Vec<_> = out.changes.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["beta gamma", "new"]);
        assert_eq!(out.changes[1].bounds.unwrap().y, MARGIN + TextEngine::new().line_height());
    }

    #[test]
    fn replaced_word_yields_delete_and_insert() {
        let out = compare(&doc("a.txt", "the cat sat"), &doc("b.txt", "the dog sat"));
        let kinds: Vec<_> = out.changes.iter().map(|c| (c.kind, c.text.as_str())).collect();
        assert_eq!(
            kinds,
            [(ChangeKind::Deleted, "cat"), (ChangeKind::Inserted, "dog")]
        );
    }

    #[test]
    fn html_style_change_is_detected() {
        let a = doc("a.html", "<p>hello world</p>");
        let b = doc("b.html", "<p>hello <b>world</b></p>");
        let out = TextEngine::new()
            .compare(&a, std::slice::from_ref(&b), &CompareSettings::for_extension("html"))
            .unwrap()
            .unwrap();
        assert_eq!(out.changes.len(), 1);
        let c = &out.changes[0];
        assert_eq!(c.kind, ChangeKind::StyleChanged);
        assert_eq!(c.text, "world");
        assert_eq!(c.style_changes[0].old_value, "plain");
        assert_eq!(c.style_changes[0].new_value, "b");
        // column counts visible text only
        assert_eq!(c.bounds.unwrap().x, MARGIN + 6.0 * CHAR_WIDTH);
    }

    #[test]
    fn style_detection_can_be_disabled() {
        let a = doc("a.html", "<p>hello world</p>");
        let b = doc("b.html", "<p>hello <i>world</i></p>");
        let settings = CompareSettings {
            style_change_detection: false,
            ..CompareSettings::for_extension("html")
        };
        let out = TextEngine::new()
            .compare(&a, std::slice::from_ref(&b), &settings)
            .unwrap()
            .unwrap();
        assert!(out.changes.is_empty());
    }

    #[test]
    fn coordinates_can_be_disabled() {
        let settings = CompareSettings {
            calculate_coordinates: false,
            ..CompareSettings::for_extension("txt")
        };
        let out = TextEngine::new()
            .compare(&doc("a.txt", "x"), &[doc("b.txt", "x y")], &settings)
            .unwrap()
            .unwrap();
        assert!(!out.changes[0].has_coordinates());
    }

    #[test]
    fn show_deleted_content_marks_removed_words() {
        let settings = CompareSettings {
            show_deleted_content: true,
            ..CompareSettings::for_extension("txt")
        };
        let out = TextEngine::new()
            .compare(
                &doc("a.txt", "keep\ndrop me\nend\n"),
                &[doc("b.txt", "keep\nend\n")],
                &settings,
            )
            .unwrap()
            .unwrap();
        assert_eq!(String::from_utf8(out.document).unwrap(), "keep\n[-drop me-]\nend\n");
    }

    #[test]
    fn multi_revision_session_accumulates_changes() {
        let base = doc("a.txt", "one");
        let revisions = [doc("b.txt", "one two"), doc("c.txt", "one three")];
        let out = TextEngine::new()
            .compare(&base, &revisions, &CompareSettings::for_extension("txt"))
            .unwrap()
            .unwrap();
        let texts: Vec<_> = out.changes.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["two", "three"]);
        let ids: Vec<_> = out.changes.iter().map(|c| c.id).collect();
        assert_eq!(ids, [0, 1]);
        assert_eq!(out.document, b"one three");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = TextEngine::new()
            .compare(&doc("a.docx", ""), &[doc("b.docx", "")], &CompareSettings::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Unsupported { .. }));
    }

    #[test]
    fn no_revisions_is_an_error() {
        let err = TextEngine::new()
            .compare(&doc("a.txt", ""), &[], &CompareSettings::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::NoRevisions));
    }

    #[test]
    fn empty_document_renders_one_page() {
        let engine = TextEngine::new();
        let d = doc("a.txt", "");
        assert_eq!(engine.page_count(&d).unwrap(), 1);
        let pages = engine.render_pages(&d).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width(), pages[0].height()), (PAGE_WIDTH, PAGE_HEIGHT));
    }

    #[test]
    fn pages_follow_lines_per_page() {
        let engine = TextEngine::new().lines_per_page(2);
        let d = doc("a.txt", "1\n2\n3\n4\n5");
        assert_eq!(engine.page_count(&d).unwrap(), 3);
        assert!(matches!(
            engine.render_page(&d, 4),
            Err(EngineError::PageOutOfRange { page: 4, total: 3 })
        ));
        assert_eq!(engine.render_page(&d, 3).unwrap().number, 3);
    }

    #[test]
    fn rendered_words_darken_the_page() {
        let engine = TextEngine::new();
        let page = engine.render_page(&doc("a.txt", "word"), 1).unwrap();
        let rgba = page.image.to_rgba8();
        let y = (MARGIN + engine.line_height() / 2.0) as u32;
        assert_eq!(rgba.get_pixel(MARGIN as u32 + 1, y), &Rgba([150, 150, 150, 255]));
        assert_eq!(rgba.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn align_handles_prefix_and_suffix() {
        let a = Layout::parse(b"a b c d", false);
        let b = Layout::parse(b"a x c d", false);
        assert_eq!(
            align(&a.words(), &b.words()),
            [
                Op::Equal(0, 0),
                Op::Delete(1),
                Op::Insert(1),
                Op::Equal(2, 2),
                Op::Equal(3, 3)
            ]
        );
    }

    #[test]
    fn large_distinct_sections_become_block_replacements() {
        let a: Vec<String> = (0..60_000).map(|i| format!("a{i}")).collect();
        let b: Vec<String> = (0..50_000).map(|i| format!("b{i}")).collect();
        let a: Vec<&str> = a.iter().map(String::as_str).collect();
        let b: Vec<&str> = b.iter().map(String::as_str).collect();

        let ops = align(&a, &b);
        assert_eq!(ops.len(), 110_000);
        assert_eq!(ops.iter().filter(|o| matches!(o, Op::Delete(_))).count(), 60_000);
        assert_eq!(ops.iter().filter(|o| matches!(o, Op::Insert(_))).count(), 50_000);
        assert_eq!(ops[0], Op::Delete(0));
        assert_eq!(ops[60_000], Op::Insert(0));
    }

    #[test]
    fn large_sections_still_match_shared_words() {
        let a: Vec<String> = (0..3_000)
            .flat_map(|i| [format!("a{i}"), format!("k{i}")])
            .collect();
        let b: Vec<String> = (0..3_000)
            .flat_map(|i| [format!("b{i}"), format!("k{i}")])
            .collect();
        let a: Vec<&str> = a.iter().map(String::as_str).collect();
        let b: Vec<&str> = b.iter().map(String::as_str).collect();

        let ops = align(&a, &b);
        let equal: Vec<_> = ops.iter().filter(|o| matches!(o, Op::Equal(..))).collect();
        assert_eq!(equal.len(), 3_000);
        assert_eq!(equal[0], &Op::Equal(1, 1));
        assert_eq!(equal[2_999], &Op::Equal(5_999, 5_999));
        assert_eq!(ops.len(), 9_000);
    }

    #[test]
    fn large_distinct_documents_compare() {
        let text = |prefix: &str| -> String {
            (0..45_000)
                .map(|i| {
                    let sep = if i % 12 == 11 { "\n" } else { " " };
                    format!("{prefix}{i}{sep}")
                })
                .collect()
        };
        let out = compare(&doc("a.txt", &text("old")), &doc("b.txt", &text("new")));
        assert!(out.changes.iter().any(|c| c.kind == ChangeKind::Inserted));
        assert!(out.changes.iter().any(|c| c.kind == ChangeKind::Deleted));
    }
}
