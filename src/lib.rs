//! # stylefold
//!
//! Resolve CSS text formatting for HTML/XHTML chapters, write it back as
//! inline `style` attributes, and extract the formatted text.
//!
//! Four properties are tracked: `font-weight`, `font-style`,
//! `text-decoration` and `text-align`. Everything else in a `style`
//! attribute is carried through untouched.
//!
//! ## Pipeline
//!
//! 1. [`parse_css_sources`] turns stylesheets into a [`SelectorStyleMap`]
//! 2. [`dom::parse_document`] builds the tree
//! 3. [`resolve`] computes each element's own style and the inherited
//!    labels of every text node
//! 4. [`emit`] rewrites `style` attributes, drops `class`, and produces
//!    [`FormattedEntry`] records
//!
//! [`process_book`] runs the whole pipeline over a book's chapters in
//! parallel.
//!
//! ## Quick Start
//!
//! ```
//! use stylefold::{CssSource, parse_css_sources, process_document};
//!
//! let css = parse_css_sources(&[CssSource::inline("book.css", ".title { font-weight: bold }")]);
//! let chapter = process_document(
//!     r#"<h1 class="title" style="font-style: italic">Intro</h1>"#,
//!     &css.selectors,
//!     1,
//!     1,
//! )
//! .unwrap();
//!
//! assert_eq!(chapter.entries[0].format, "bold, italic");
//! assert!(chapter.html.contains(r#"<h1 style="font-style:italic;font-weight:bold;">"#));
//! ```

pub mod book;
pub mod cascade;
pub mod css;
pub mod diagnostics;
pub mod dom;
pub mod emit;
pub mod error;
pub mod style;
pub mod util;

pub use book::{
    BookInput, BookOutput, ChapterFailure, ChapterInput, ChapterOutput, Options, load_book_dir,
    process_book, process_document,
};
pub use cascade::{ElementStyle, Resolution, resolve};
pub use css::{CssSource, CssSummary, ParsedCss, SelectorStyleMap, StyleGroup, parse_css_sources};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use dom::Syntax;
pub use emit::{Emitted, FormattedEntry, emit};
pub use error::{Error, Result};
pub use style::{Label, LabelSet, Property, PropertyMap};
