//! Document assembly: banner, body and footer on every page.

use std::fmt::Write as _;

use crate::error::LayoutError;
use crate::geometry::PageGeometry;
use crate::paginator::{Line, LineKind, Paginator, Section};
use crate::pdf::{escape_text, PdfWriter};
use crate::wrap::wrap;

/// Banner text is cut to this many rows.
pub const MAX_BANNER_ROWS: usize = 3;

const DEFAULT_MAX_PAGES: usize = 500;
const FAILURE_MESSAGE_CHARS: usize = 2_000;

/// Options for [`render_document`].
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub geometry: PageGeometry,
    /// Text shown in a shaded box at the top of every page; empty for none
    pub banner: String,
    /// Document title written to the PDF info dictionary
    pub title: Option<String>,
    pub max_pages: usize,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::A4,
            banner: String::new(),
            title: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl DocumentOptions {
    pub fn banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// Lay out `sections` and return the PDF bytes.
///
/// Sections are consumed one at a time. Every page carries the banner and a
/// centered "Page X of Y" footer.
pub fn render_document<I>(options: &DocumentOptions, sections: I) -> Result<Vec<u8>, LayoutError>
where
    I: IntoIterator<Item = Section>,
{
    options.geometry.validate()?;

    let banner = banner_lines(&options.banner, options.geometry.columns());
    let mut paginator = Paginator::new(&options.geometry, banner.len(), options.max_pages)?;
    for section in sections {
        paginator.push_section(&section);
    }
    let pages = paginator.finish();

    Ok(write_pages(
        &options.geometry,
        &banner,
        options.title.as_deref(),
        &pages.pages,
    ))
}

/// A one-page document stating that rendering failed.
///
/// Never fails: it uses a fixed, known-good geometry and bypasses pagination.
pub fn failure_page(message: &str) -> Vec<u8> {
    let geometry = PageGeometry::A4;
    let columns = geometry.columns();
    let banner = vec!["RENDERING FAILED".to_string()];

    let message: String = message.chars().take(FAILURE_MESSAGE_CHARS).collect();
    let budget = geometry.rows().saturating_sub(banner.len() + 3);
    let mut body = vec![Line::heading("The document could not be rendered.")];
    body.extend(wrap(&message, columns).into_iter().map(Line::body));
    body.truncate(budget);

    write_pages(&geometry, &banner, Some("Rendering failed"), &[body])
}

fn banner_lines(banner: &str, columns: usize) -> Vec<String> {
    let mut lines = wrap(banner, columns);
    lines.truncate(MAX_BANNER_ROWS);
    lines
}

fn write_pages(
    geometry: &PageGeometry,
    banner: &[String],
    title: Option<&str>,
    pages: &[Vec<Line>],
) -> Vec<u8> {
    let mut pdf = PdfWriter::new();
    let catalog = pdf.reserve();
    let pages_id = pdf.reserve();
    let regular = pdf.reserve();
    let bold = pdf.reserve();
    let info = pdf.reserve();

    let total = pages.len();
    let mut kids = Vec::with_capacity(total);
    for (index, lines) in pages.iter().enumerate() {
        let page_id = pdf.reserve();
        let content_id = pdf.reserve();
        let content = page_content(geometry, banner, lines, index + 1, total);
        pdf.write_stream(content_id, &content);
        pdf.write_object(
            page_id,
            &format!(
                "<< /Type /Page /Parent {} 0 R /Contents {} 0 R >>",
                pages_id, content_id
            ),
        );
        kids.push(format!("{} 0 R", page_id));
    }

    pdf.write_object(
        pages_id,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> >>",
            kids.join(" "),
            total,
            geometry.width,
            geometry.height,
            regular,
            bold
        ),
    );
    pdf.write_object(regular, &font_object("Courier"));
    pdf.write_object(bold, &font_object("Courier-Bold"));
    pdf.write_object(
        info,
        &format!(
            "<< /Title ({}) /Producer (plain-pages) >>",
            escape_text(title.unwrap_or("Untitled"))
        ),
    );
    pdf.write_object(
        catalog,
        &format!("<< /Type /Catalog /Pages {} 0 R >>", pages_id),
    );

    pdf.finish(catalog, Some(info))
}

fn font_object(base: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base
    )
}

fn page_content(
    geometry: &PageGeometry,
    banner: &[String],
    lines: &[Line],
    page: usize,
    total: usize,
) -> String {
    let mut out = String::new();
    let size = geometry.font_size;
    let left = geometry.margin;

    if !banner.is_empty() {
        let top = geometry.height - geometry.margin + 4.0;
        let bottom = geometry.baseline(banner.len() - 1) - geometry.leading * 0.4;
        let _ = writeln!(
            out,
            "0.85 g {:.2} {:.2} {:.2} {:.2} re f 0 g",
            left - 4.0,
            bottom,
            geometry.width - 2.0 * geometry.margin + 8.0,
            top - bottom
        );
        for (row, text) in banner.iter().enumerate() {
            show_text(&mut out, "F2", size, left, geometry.baseline(row), text);
        }
    }

    let first_body_row = if banner.is_empty() { 0 } else { banner.len() + 1 };
    for (offset, line) in lines.iter().enumerate() {
        if line.text.is_empty() {
            continue;
        }
        let font = match line.kind {
            LineKind::Heading => "F2",
            LineKind::Body => "F1",
        };
        let y = geometry.baseline(first_body_row + offset);
        show_text(&mut out, font, size, left, y, &line.text);
    }

    let footer = format!("Page {} of {}", page, total);
    let footer_width = geometry.text_width(footer.chars().count());
    let x = ((geometry.width - footer_width) / 2.0).max(left);
    let y = geometry.baseline(geometry.rows().saturating_sub(1));
    show_text(&mut out, "F1", size, x, y, &footer);

    out
}

fn show_text(out: &mut String, font: &str, size: f32, x: f32, y: f32, text: &str) {
    let _ = writeln!(
        out,
        "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET",
        font,
        size,
        x,
        y,
        escape_text(text)
    );
}
