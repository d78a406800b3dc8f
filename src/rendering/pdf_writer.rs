//! PDF serialization of laid-out pages with `lopdf`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::error::EngineError;
use crate::models::PrintOptions;

use super::metrics::{to_win_ansi, Font};
use super::paginate::{LaidOutPage, Mark, PageFrame, BAND_SIZE};

/// Substitute `{title}`, `{page}` and `{pages}` in a band template.
pub fn expand_template(template: &str, title: &str, page: usize, pages: usize) -> String {
    template
        .replace("{pages}", &pages.to_string())
        .replace("{page}", &page.to_string())
        .replace("{title}", title)
}

/// Serialize `pages` into a complete PDF document.
pub fn write_pdf(
    pages: &[LaidOutPage],
    frame: &PageFrame,
    options: &PrintOptions,
    title: &str,
) -> Result<Vec<u8>, EngineError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let total = pages.len();
    let mut kids = Vec::with_capacity(total);
    for (index, page) in pages.iter().enumerate() {
        let mut operations = Vec::with_capacity(page.marks.len() * 5 + 16);
        for mark in &page.marks {
            push_mark(&mut operations, mark);
        }
        push_bands(&mut operations, frame, options, title, index + 1, total);

        let content = Content { operations };
        let encoded = content.encode().map_err(|e| {
            EngineError::Content(format!("failed to encode page {}: {e}", index + 1))
        })?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), options.page.width.into(), options.page.height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(to_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal("pressroom"),
    });
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| EngineError::Content(format!("failed to serialize PDF: {e}")))?;
    Ok(out)
}

fn push_mark(operations: &mut Vec<Operation>, mark: &Mark) {
    match mark {
        Mark::Text {
            font,
            size,
            x,
            y,
            text,
        } => push_text(operations, *font, *size, *x, *y, text),
        Mark::Rule { x1, x2, y } => {
            operations.push(Operation::new("w", vec![0.5_f32.into()]));
            operations.push(Operation::new("m", vec![(*x1).into(), (*y).into()]));
            operations.push(Operation::new("l", vec![(*x2).into(), (*y).into()]));
            operations.push(Operation::new("S", vec![]));
        }
    }
}

fn push_text(operations: &mut Vec<Operation>, font: Font, size: f32, x: f32, y: f32, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![
            Object::Name(font.resource_name().as_bytes().to_vec()),
            size.into(),
        ],
    ));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}

fn push_bands(
    operations: &mut Vec<Operation>,
    frame: &PageFrame,
    options: &PrintOptions,
    title: &str,
    page: usize,
    pages: usize,
) {
    let bands = [
        (options.header.as_deref(), frame.header_y, false),
        (options.footer.as_deref(), frame.footer_y, true),
    ];
    for (template, y, centered) in bands {
        let (Some(template), Some(y)) = (template, y) else {
            continue;
        };
        let text = expand_template(template, title, page, pages);
        if text.trim().is_empty() {
            continue;
        }
        let width = Font::Regular.text_width(&text, BAND_SIZE);
        let x = if centered {
            frame.left + ((frame.width() - width) / 2.0).max(0.0)
        } else {
            frame.left
        };
        operations.push(Operation::new("g", vec![0.35_f32.into()]));
        push_text(operations, Font::Regular, BAND_SIZE, x, y, &text);
        operations.push(Operation::new("g", vec![0.into()]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::markup::parse;
    use crate::rendering::paginate::paginate;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn options() -> PrintOptions {
        PrintOptions {
            header: Some("{title}".to_string()),
            footer: Some("Page {page} of {pages}".to_string()),
            ..PrintOptions::default()
        }
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template("{title} - Page {page} of {pages}", "Report", 2, 5),
            "Report - Page 2 of 5"
        );
        // Titles are substituted last so they cannot inject page numbers.
        assert_eq!(expand_template("{title}", "{page}", 1, 1), "{page}");
    }

    #[test]
    fn test_write_pdf_loads_back() {
        let options = options();
        let frame = PageFrame::new(&options).unwrap();
        let doc = parse("<h1>Title</h1><p>Body</p>");
        let pages = paginate(&doc, &options).unwrap();
        let bytes = write_pdf(&pages, &frame, &options, doc.display_title()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
        assert!(contains(&bytes, "(Title)"));
        assert!(contains(&bytes, "(Body)"));
        assert!(contains(&bytes, "(Page 1 of 1)"));
        assert!(contains(&bytes, "/Helvetica-Bold"));
    }

    #[test]
    fn test_footer_counts_all_pages() {
        let options = options();
        let frame = PageFrame::new(&options).unwrap();
        let doc = parse(&"<p>filler text for several pages</p>".repeat(400));
        let pages = paginate(&doc, &options).unwrap();
        let total = pages.len();
        assert!(total > 1);

        let bytes = write_pdf(&pages, &frame, &options, "").unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), total);
        assert!(contains(&bytes, &format!("(Page {total} of {total})")));
    }

    #[test]
    fn test_bands_can_be_disabled() {
        let options = PrintOptions::default();
        let frame = PageFrame::new(&options).unwrap();
        let pages = paginate(&parse("<p>x</p>"), &options).unwrap();
        let bytes = write_pdf(&pages, &frame, &options, "T").unwrap();
        assert!(!contains(&bytes, "(Page 1"));
    }
}
