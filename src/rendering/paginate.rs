//! Pagination of parsed blocks onto fixed-size pages.
//!
//! Coordinates are PDF user space: origin bottom-left, y grows upward.

use crate::error::EngineError;
use crate::models::PrintOptions;

use super::markup::{Block, ParsedDocument};
use super::metrics::{wrap_preformatted, wrap_text, Font};

pub const BODY_SIZE: f32 = 11.0;
pub const MONO_SIZE: f32 = 9.5;
pub const BAND_SIZE: f32 = 9.0;
const LEADING: f32 = 1.35;
const HEADING_SIZES: [f32; 6] = [20.0, 16.0, 14.0, 12.0, 11.0, 10.0];
/// Vertical space reserved for a header or footer band
const BAND_HEIGHT: f32 = 24.0;
const LIST_INDENT: f32 = 18.0;
const MIN_CONTENT_WIDTH: f32 = 72.0;
const MAX_PAGES: usize = 2_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Text {
        font: Font,
        size: f32,
        x: f32,
        y: f32,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutPage {
    pub marks: Vec<Mark>,
}

/// Body area and band positions derived from the print options
#[derive(Debug, Clone, Copy)]
pub struct PageFrame {
    pub left: f32,
    pub right: f32,
    pub body_top: f32,
    pub body_bottom: f32,
    /// Baseline of the header band, if any
    pub header_y: Option<f32>,
    /// Baseline of the footer band, if any
    pub footer_y: Option<f32>,
}

impl PageFrame {
    pub fn new(options: &PrintOptions) -> Result<Self, EngineError> {
        let margins = options.margins;
        let left = margins.left;
        let right = options.page.width - margins.right;
        let top = options.page.height - margins.top;
        let bottom = margins.bottom;

        let header_y = options.header.as_ref().map(|_| top - BAND_SIZE);
        let footer_y = options.footer.as_ref().map(|_| bottom);
        let body_top = if header_y.is_some() { top - BAND_HEIGHT } else { top };
        let body_bottom = if footer_y.is_some() {
            bottom + BAND_HEIGHT
        } else {
            bottom
        };

        let tallest_line = HEADING_SIZES[0] * LEADING;
        if right - left < MIN_CONTENT_WIDTH || body_top - body_bottom < tallest_line {
            return Err(EngineError::Content(format!(
                "content box too small: {:.1}x{:.1}pt after margins and bands",
                right - left,
                body_top - body_bottom
            )));
        }

        Ok(Self {
            left,
            right,
            body_top,
            body_bottom,
            header_y,
            footer_y,
        })
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

/// Lay out `doc` and return one entry per page (at least one).
pub fn paginate(doc: &ParsedDocument, options: &PrintOptions) -> Result<Vec<LaidOutPage>, EngineError> {
    let frame = PageFrame::new(options)?;
    let mut cursor = Cursor::new(frame);

    for (index, block) in doc.blocks.iter().enumerate() {
        match block {
            Block::Heading { level, text } => {
                let size = HEADING_SIZES[(*level as usize).clamp(1, 6) - 1];
                let lines = wrap_text(text, Font::Bold, size, frame.width());
                // Keep the heading together with the first line that follows.
                let next_height = match doc.blocks.get(index + 1) {
                    Some(Block::Heading { .. } | Block::Rule | Block::PageBreak) | None => 0.0,
                    Some(_) => BODY_SIZE * LEADING,
                };
                let needed =
                    size * 0.9 + lines.len() as f32 * size * LEADING + next_height + 0.5;
                if !cursor.fits(needed) && cursor.has_content() {
                    cursor.new_page()?;
                }
                cursor.space(size * 0.6);
                for line in lines {
                    cursor.line(Font::Bold, size, frame.left, line)?;
                }
                cursor.space(size * 0.3);
            }
            Block::Paragraph { text } => {
                for segment in text.split('\n') {
                    for line in wrap_text(segment, Font::Regular, BODY_SIZE, frame.width()) {
                        cursor.line(Font::Regular, BODY_SIZE, frame.left, line)?;
                    }
                }
                cursor.space(BODY_SIZE * 0.5);
            }
            Block::ListItem {
                depth,
                marker,
                text,
            } => {
                let indent = LIST_INDENT * (*depth).min(8) as f32;
                let x = frame.left + indent;
                let width = (frame.width() - indent).max(MIN_CONTENT_WIDTH / 2.0);
                let lines = wrap_text(&text.replace('\n', " "), Font::Regular, BODY_SIZE, width);
                for (i, line) in lines.into_iter().enumerate() {
                    if i == 0 {
                        let marker_x = x - Font::Regular.text_width(marker, BODY_SIZE) - 4.0;
                        cursor.line_with_marker(BODY_SIZE, x, line, marker_x, marker)?;
                    } else {
                        cursor.line(Font::Regular, BODY_SIZE, x, line)?;
                    }
                }
                cursor.space(BODY_SIZE * 0.2);
            }
            Block::Preformatted { text } => {
                for line in wrap_preformatted(text, Font::Mono, MONO_SIZE, frame.width()) {
                    cursor.line(Font::Mono, MONO_SIZE, frame.left, line)?;
                }
                cursor.space(BODY_SIZE * 0.5);
            }
            Block::Rule => {
                if !cursor.fits(BODY_SIZE) {
                    cursor.new_page()?;
                }
                cursor.space(BODY_SIZE * 0.5);
                let y = cursor.y;
                cursor.mark(Mark::Rule {
                    x1: frame.left,
                    x2: frame.right,
                    y,
                });
                cursor.space(BODY_SIZE * 0.5);
            }
            Block::PageBreak => {
                if cursor.has_content() {
                    cursor.new_page()?;
                }
            }
        }
    }

    Ok(cursor.finish())
}

struct Cursor {
    frame: PageFrame,
    pages: Vec<LaidOutPage>,
    current: LaidOutPage,
    /// Top of the free area on the current page
    y: f32,
}

impl Cursor {
    fn new(frame: PageFrame) -> Self {
        Self {
            frame,
            pages: Vec::new(),
            current: LaidOutPage::default(),
            y: frame.body_top,
        }
    }

    fn has_content(&self) -> bool {
        !self.current.marks.is_empty()
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= self.frame.body_bottom
    }

    fn new_page(&mut self) -> Result<(), EngineError> {
        if self.pages.len() + 1 >= MAX_PAGES {
            return Err(EngineError::Content(format!(
                "document exceeds {} pages",
                MAX_PAGES
            )));
        }
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.frame.body_top;
        Ok(())
    }

    /// Vertical gap; swallowed at the top of a page
    fn space(&mut self, height: f32) {
        if self.has_content() {
            self.y = (self.y - height).max(self.frame.body_bottom);
        }
    }

    fn mark(&mut self, mark: Mark) {
        self.current.marks.push(mark);
    }

    fn advance(&mut self, size: f32) -> Result<f32, EngineError> {
        let height = size * LEADING;
        if !self.fits(height) {
            self.new_page()?;
        }
        let baseline = self.y - size;
        self.y -= height;
        Ok(baseline)
    }

    fn line(&mut self, font: Font, size: f32, x: f32, text: String) -> Result<(), EngineError> {
        let y = self.advance(size)?;
        self.mark(Mark::Text {
            font,
            size,
            x,
            y,
            text,
        });
        Ok(())
    }

    fn line_with_marker(
        &mut self,
        size: f32,
        x: f32,
        text: String,
        marker_x: f32,
        marker: &str,
    ) -> Result<(), EngineError> {
        let y = self.advance(size)?;
        self.mark(Mark::Text {
            font: Font::Regular,
            size,
            x: marker_x,
            y,
            text: marker.to_string(),
        });
        self.mark(Mark::Text {
            font: Font::Regular,
            size,
            x,
            y,
            text,
        });
        Ok(())
    }

    fn finish(mut self) -> Vec<LaidOutPage> {
        if self.has_content() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Margins, PageSpec};
    use crate::rendering::markup::parse;

    fn texts(page: &LaidOutPage) -> Vec<&str> {
        page.marks
            .iter()
            .filter_map(|m| match m {
                Mark::Text { text, .. } => Some(text.as_str()),
                Mark::Rule { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_single_page() {
        let doc = parse("<h1>Title</h1><p>Body</p>");
        let pages = paginate(&doc, &PrintOptions::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(texts(&pages[0]), vec!["Title", "Body"]);
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let pages = paginate(&ParsedDocument::default(), &PrintOptions::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].marks.is_empty());
    }

    #[test]
    fn test_marks_stay_inside_body() {
        let options = PrintOptions::default();
        let frame = PageFrame::new(&options).unwrap();
        let content = "<p>lorem ipsum dolor sit amet</p>".repeat(300);
        let pages = paginate(&parse(&content), &options).unwrap();
        assert!(pages.len() > 1);
        for page in &pages {
            for mark in &page.marks {
                if let Mark::Text { y, .. } = mark {
                    assert!(*y >= frame.body_bottom && *y <= frame.body_top);
                }
            }
        }
    }

    #[test]
    fn test_explicit_page_break() {
        let doc = parse("<p>one</p><div style=\"page-break-before: always\"><p>two</p></div>");
        let pages = paginate(&doc, &PrintOptions::default()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[1]), vec!["two"]);
    }

    #[test]
    fn test_heading_not_stranded_at_page_bottom() {
        let options = PrintOptions::default();
        let mut pages = Vec::new();
        // Grow the filler until the heading would land on the last line.
        for n in 1..200 {
            let content = format!("{}<h2>Section</h2><p>body</p>", "<p>x</p>".repeat(n));
            pages = paginate(&parse(&content), &options).unwrap();
            if pages.len() > 1 {
                break;
            }
        }
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[1])[0], "Section");
    }

    #[test]
    fn test_list_marker_left_of_text() {
        let doc = parse("<ul><li>item</li></ul>");
        let pages = paginate(&doc, &PrintOptions::default()).unwrap();
        match &pages[0].marks[..] {
            [Mark::Text { x: mx, text: marker, .. }, Mark::Text { x, text, .. }] => {
                assert_eq!(marker, "\u{2022}");
                assert_eq!(text, "item");
                assert!(mx < x);
            }
            other => panic!("unexpected marks: {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_geometry_is_content_error() {
        let options = PrintOptions {
            page: PageSpec::A5,
            margins: Margins {
                top: 300.0,
                right: 50.0,
                bottom: 290.0,
                left: 50.0,
            },
            ..PrintOptions::default()
        };
        let err = paginate(&parse("<p>x</p>"), &options).unwrap_err();
        assert!(matches!(err, EngineError::Content(_)));
    }

    #[test]
    fn test_narrow_page_is_content_error() {
        let options = PrintOptions {
            margins: Margins {
                left: 290.0,
                right: 290.0,
                ..Margins::default()
            },
            ..PrintOptions::default()
        };
        assert!(paginate(&parse("<p>x</p>"), &options).is_err());
    }
}
