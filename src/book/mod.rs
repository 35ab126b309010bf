//! Processing a book: chapters that share stylesheets.
//!
//! A book is a directory holding chapter documents and CSS files. The base
//! selector styles come from the book's CSS files plus the `<style>` blocks
//! of its first chapter. Each chapter additionally layers its own `<style>`
//! blocks over the base, so a chapter-local rule replaces the book's rule
//! for the same selector.
//!
//! Chapters are independent once the base styles are known, so they are
//! processed in parallel and reassembled in chapter order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::cascade::resolve;
use crate::css::{
    CssSource, CssSummary, ParsedCss, SelectorStyleMap, collapse_style_groups, parse_css_sources,
};
use crate::diagnostics::Diagnostics;
use crate::dom::{ArenaDom, Syntax, collect_inline_css, parse_document, parse_document_as};
use crate::emit::{FormattedEntry, emit};
use crate::error::{Error, Result};
use crate::util::{decode_document, extract_book_number};

/// File extensions treated as chapter documents.
const CHAPTER_EXTENSIONS: &[&str] = &["html", "xhtml", "htm"];

/// One chapter document, already decoded.
#[derive(Debug, Clone)]
pub struct ChapterInput {
    /// Identity used in logs, usually the path relative to the book root.
    pub label: String,
    pub html: String,
    pub syntax: Syntax,
}

impl ChapterInput {
    /// A chapter whose syntax is sniffed from its text.
    pub fn new(label: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            label: label.into(),
            syntax: Syntax::sniff(&html),
            html,
        }
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    fn parse(&self) -> Result<ArenaDom> {
        parse_document_as(&self.html, self.syntax)
    }
}

/// Everything needed to process one book.
#[derive(Debug, Clone, Default)]
pub struct BookInput {
    pub number: u32,
    /// Stylesheet files, applied in order before any `<style>` block.
    pub css_files: Vec<PathBuf>,
    /// Chapters in reading order; chapter numbers are 1-based positions.
    pub chapters: Vec<ChapterInput>,
}

/// Processing options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Worker threads for chapter processing; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
}

/// Result of processing one chapter.
#[derive(Debug, Clone)]
pub struct ChapterOutput {
    pub chapter: u32,
    pub label: String,
    /// The rewritten chapter markup.
    pub html: String,
    pub entries: Vec<FormattedEntry>,
    pub diagnostics: Diagnostics,
}

/// A chapter that could not be processed. Its siblings are unaffected.
#[derive(Debug)]
pub struct ChapterFailure {
    pub chapter: u32,
    pub label: String,
    pub error: Error,
}

/// Result of processing a whole book.
#[derive(Debug, Default)]
pub struct BookOutput {
    pub number: u32,
    /// Successful chapters in chapter order.
    pub chapters: Vec<ChapterOutput>,
    pub failures: Vec<ChapterFailure>,
    /// Book CSS overlaid with every chapter's `<style>` blocks.
    pub summary: CssSummary,
    /// Diagnostics from parsing the base CSS.
    pub diagnostics: Diagnostics,
}

impl BookOutput {
    /// All formatted entries across chapters, in chapter order.
    pub fn entries(&self) -> impl Iterator<Item = &FormattedEntry> {
        self.chapters.iter().flat_map(|c| c.entries.iter())
    }
}

/// Parse, resolve and emit a single document against known selector styles.
///
/// Unlike [`process_book`], the document's own `<style>` blocks are not
/// consulted; `selectors` is used as given.
pub fn process_document(
    html: &str,
    selectors: &SelectorStyleMap,
    book: u32,
    chapter: u32,
) -> Result<ChapterOutput> {
    let dom = parse_document(html)?;
    Ok(fold_chapter(dom, selectors, book, chapter, String::new(), Diagnostics::new()))
}

fn fold_chapter(
    mut dom: ArenaDom,
    selectors: &SelectorStyleMap,
    book: u32,
    chapter: u32,
    label: String,
    mut diagnostics: Diagnostics,
) -> ChapterOutput {
    let resolution = resolve(&dom, selectors, &mut diagnostics);
    let emitted = emit(&mut dom, &resolution, book, chapter);

    ChapterOutput {
        chapter,
        label,
        html: emitted.html,
        entries: emitted.entries,
        diagnostics,
    }
}

fn inline_sources(label: &str, blocks: Vec<String>) -> Vec<CssSource> {
    blocks
        .into_iter()
        .enumerate()
        .map(|(i, text)| CssSource::inline(format!("{label} <style> #{}", i + 1), text))
        .collect()
}

/// Process every chapter of a book.
///
/// A chapter that fails (for example because it is empty) is logged and
/// reported in [`BookOutput::failures`]; the others are still processed.
pub fn process_book(book: &BookInput, options: &Options) -> BookOutput {
    let Some(first) = book.chapters.first() else {
        tracing::info!(book = book.number, "no chapters found");
        return BookOutput {
            number: book.number,
            ..BookOutput::default()
        };
    };

    let mut sources: Vec<CssSource> = book.css_files.iter().map(CssSource::file).collect();
    match first.parse() {
        Ok(dom) => sources.extend(inline_sources(&first.label, collect_inline_css(&dom))),
        Err(e) => tracing::debug!(chapter = %first.label, "no base inline CSS: {e}"),
    }
    let base = parse_css_sources(&sources);

    tracing::info!(
        book = book.number,
        chapters = book.chapters.len(),
        selectors = base.selectors.len(),
        "processing book"
    );

    let run = || {
        book.chapters
            .par_iter()
            .enumerate()
            .map(|(idx, input)| {
                process_chapter(book.number, idx as u32 + 1, input, &base.selectors)
            })
            .collect::<Vec<_>>()
    };
    let results = match options.jobs {
        Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!("falling back to the global thread pool: {e}");
                run()
            }
        },
        None => run(),
    };

    let mut output = BookOutput {
        number: book.number,
        summary: CssSummary {
            selectors: base.selectors.clone(),
            groups: Vec::new(),
        },
        ..BookOutput::default()
    };
    let mut groups = base.groups;

    for (idx, result) in results.into_iter().enumerate() {
        let chapter = idx as u32 + 1;
        match result {
            Ok((chapter_output, inline)) => {
                if let Some(inline) = inline {
                    output.summary.selectors.overlay(&inline.selectors);
                    groups.extend(inline.groups);
                }
                output.chapters.push(chapter_output);
            }
            Err(error) => {
                let label = book.chapters[idx].label.clone();
                tracing::error!(book = book.number, chapter, %label, "chapter failed: {error}");
                output.failures.push(ChapterFailure {
                    chapter,
                    label,
                    error,
                });
            }
        }
    }

    output.summary.groups = collapse_style_groups(groups);
    output.diagnostics = base.diagnostics;
    output
}

/// Process one chapter, returning its parsed `<style>` blocks if it had any.
fn process_chapter(
    book: u32,
    chapter: u32,
    input: &ChapterInput,
    base: &SelectorStyleMap,
) -> Result<(ChapterOutput, Option<ParsedCss>)> {
    let dom = input.parse()?;

    let blocks = collect_inline_css(&dom);
    if blocks.is_empty() {
        let output = fold_chapter(dom, base, book, chapter, input.label.clone(), Diagnostics::new());
        return Ok((output, None));
    }

    let mut inline = parse_css_sources(&inline_sources(&input.label, blocks));
    let mut selectors = base.clone();
    selectors.overlay(&inline.selectors);

    let diagnostics = std::mem::take(&mut inline.diagnostics);
    let output = fold_chapter(dom, &selectors, book, chapter, input.label.clone(), diagnostics);
    Ok((output, Some(inline)))
}

/// Discover a book's chapters and stylesheets under `dir`.
///
/// Chapter documents (`.html`, `.xhtml`, `.htm`) and `.css` files are found
/// recursively and sorted by path. `.xhtml` chapters are always parsed as
/// XHTML; other chapters have their syntax sniffed. The book number is the last run of
/// digits in the directory name, or `default_number` if it has none.
pub fn load_book_dir(dir: &Path, default_number: u32) -> Result<BookInput> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut book = BookInput {
        number: extract_book_number(&name, default_number),
        ..BookInput::default()
    };

    let mut chapter_paths = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("css") => book.css_files.push(path),
            Some(e) if CHAPTER_EXTENSIONS.contains(&e) => chapter_paths.push(path),
            _ => {}
        }
    }
    book.css_files.sort();
    chapter_paths.sort();

    for path in chapter_paths {
        let bytes = std::fs::read(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        let label = path.strip_prefix(dir).unwrap_or(path.as_path()).display().to_string();
        let mut chapter = ChapterInput::new(label, decode_document(&bytes));
        if let Some(syntax) = Syntax::from_path(&path) {
            chapter = chapter.with_syntax(syntax);
        }
        book.chapters.push(chapter);
    }

    tracing::debug!(
        dir = %dir.display(),
        book = book.number,
        chapters = book.chapters.len(),
        css_files = book.css_files.len(),
        "loaded book"
    );
    Ok(book)
}
