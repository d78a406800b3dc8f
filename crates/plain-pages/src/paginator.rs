//! Streaming pagination of sections into fixed-height pages.

use crate::error::LayoutError;
use crate::geometry::PageGeometry;
use crate::wrap::wrap;

/// Rows reserved below the body: one blank separator and the footer.
const FOOTER_ROWS: usize = 2;

/// Last body line written when content exceeds the page limit.
pub const TRUNCATION_NOTICE: &str = "[content truncated: page limit reached]";

/// A heading followed by zero or more paragraphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
}

impl Section {
    pub fn new(heading: Option<String>) -> Self {
        Self {
            heading,
            paragraphs: Vec::new(),
        }
    }

    pub fn with_paragraph(mut self, paragraph: impl Into<String>) -> Self {
        self.paragraphs.push(paragraph.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.heading.as_deref().map_or(true, |h| h.trim().is_empty())
            && self.paragraphs.iter().all(|p| p.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading,
    Body,
}

/// One laid-out row of a page body.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub kind: LineKind,
    pub text: String,
}

impl Line {
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Body,
            text: text.into(),
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Heading,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::body(String::new())
    }

    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Finished pagination output.
#[derive(Debug, Clone, PartialEq)]
pub struct Pages {
    pub pages: Vec<Vec<Line>>,
    pub truncated: bool,
}

/// Lays sections onto pages one at a time, so callers never hold the whole
/// wrapped document in memory alongside its source.
///
/// Headings are kept with the first line that follows them. Once `max_pages`
/// pages are full, the last line becomes [`TRUNCATION_NOTICE`] and further
/// input is ignored.
#[derive(Debug)]
pub struct Paginator {
    columns: usize,
    body_rows: usize,
    max_pages: usize,
    pages: Vec<Vec<Line>>,
    current: Vec<Line>,
    truncated: bool,
}

impl Paginator {
    /// Create a paginator for `geometry` with `banner_rows` rows reserved at
    /// the top of every page (plus one separator row when non-zero).
    pub fn new(
        geometry: &PageGeometry,
        banner_rows: usize,
        max_pages: usize,
    ) -> Result<Self, LayoutError> {
        geometry.validate()?;

        let header_rows = if banner_rows > 0 { banner_rows + 1 } else { 0 };
        let rows = geometry.rows();
        let body_rows = rows.saturating_sub(header_rows + FOOTER_ROWS);
        if body_rows == 0 {
            return Err(LayoutError::PageTooSmall {
                columns: geometry.columns(),
                rows,
            });
        }

        Ok(Self {
            columns: geometry.columns(),
            body_rows,
            max_pages: max_pages.max(1),
            pages: Vec::new(),
            current: Vec::new(),
            truncated: false,
        })
    }

    pub fn body_rows(&self) -> usize {
        self.body_rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn push_section(&mut self, section: &Section) {
        if self.truncated || section.is_empty() {
            return;
        }

        if let Some(heading) = section.heading.as_deref() {
            let lines = wrap(heading, self.columns);
            if !lines.is_empty() {
                self.push_line(Line::blank());
                // Keep the heading together with one line of its body.
                if self.remaining() < lines.len() + 1 && lines.len() < self.body_rows {
                    self.break_page();
                }
                for line in lines {
                    self.push_line(Line::heading(line));
                }
            }
        }

        for paragraph in &section.paragraphs {
            for line in wrap(paragraph, self.columns) {
                self.push_line(Line::body(line));
            }
            self.push_line(Line::blank());
        }
    }

    /// Finish pagination. Always yields at least one (possibly empty) page.
    pub fn finish(mut self) -> Pages {
        self.trim_trailing_blanks();
        if !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        Pages {
            pages: self.pages,
            truncated: self.truncated,
        }
    }

    fn remaining(&self) -> usize {
        self.body_rows - self.current.len()
    }

    fn push_line(&mut self, line: Line) {
        if self.truncated {
            return;
        }
        if line.is_blank() && self.current.last().map_or(true, Line::is_blank) {
            return;
        }
        if self.current.len() == self.body_rows {
            self.break_page();
            if self.truncated {
                return;
            }
            if line.is_blank() {
                return;
            }
        }
        self.current.push(line);
    }

    fn trim_trailing_blanks(&mut self) {
        while self.current.last().is_some_and(Line::is_blank) {
            self.current.pop();
        }
    }

    /// Close the current page because more content follows.
    fn break_page(&mut self) {
        self.trim_trailing_blanks();
        if self.current.is_empty() {
            return;
        }

        if self.pages.len() + 1 >= self.max_pages {
            if self.current.len() == self.body_rows {
                self.current.pop();
            }
            self.current.push(Line::body(TRUNCATION_NOTICE));
            self.truncated = true;
        }
        self.pages.push(std::mem::take(&mut self.current));
    }
}
