//! plain-pages: paginated plain-text PDF output without dependencies
//!
//! This crate turns a stream of [`Section`]s into a multi-page PDF set in
//! Courier on a fixed character grid. It exists for the cases where a full
//! layout engine is unavailable or has already failed, so it avoids anything
//! that can fail at runtime apart from invalid page geometry.
//!
//! # Quick Start
//!
//! ```
//! use plain_pages::{render_document, DocumentOptions, Section};
//!
//! let options = DocumentOptions::default().banner("DRAFT COPY");
//! let sections = vec![
//!     Section::new(Some("Summary".to_string())).with_paragraph("All systems nominal."),
//! ];
//! let pdf = render_document(&options, sections).unwrap();
//! assert!(pdf.starts_with(b"%PDF-1.4"));
//! ```
//!
//! # Page layout
//!
//! Every page is a grid of [`PageGeometry::columns`] by [`PageGeometry::rows`]
//! cells:
//!
//! - banner rows (at most [`MAX_BANNER_ROWS`]) in bold on a grey box
//! - one separator row
//! - body rows: headings in bold, paragraphs wrapped on word boundaries
//! - one separator row and a centered "Page X of Y" footer
//!
//! Text is encoded for WinAnsiEncoding. Characters outside it print as `?`.
//!
//! # Failure page
//!
//! [`failure_page`] produces a one-page document with an error message and
//! cannot fail. Callers use it when even [`render_document`] did not work.

pub mod document;
pub mod error;
pub mod geometry;
pub mod paginator;
mod pdf;
pub mod wrap;


pub use document::{failure_page, render_document, DocumentOptions, MAX_BANNER_ROWS};
pub use error::LayoutError;
pub use geometry::PageGeometry;
pub use paginator::{Line, LineKind, Pages, Paginator, Section, TRUNCATION_NOTICE};
pub use pdf::escape_text;
pub use wrap::wrap;
