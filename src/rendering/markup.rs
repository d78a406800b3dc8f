//! Markup parsing into a flat block model for pagination.
//!
//! HTML goes through `scraper`; anything that does not look like markup is
//! treated as plain text with blank-line separated paragraphs.

use scraper::{ElementRef, Html, Node};

/// Elements whose text never reaches the page
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "head", "iframe", "object", "svg",
];

/// Elements that end the current paragraph
const BLOCKS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "nav",
    "aside",
    "blockquote",
    "address",
    "figure",
    "figcaption",
    "table",
    "thead",
    "tbody",
    "tfoot",
    "tr",
    "caption",
    "dl",
    "dt",
    "dd",
    "form",
    "fieldset",
    "details",
    "summary",
    "body",
];

/// Nesting beyond this depth is flattened into the enclosing block
const MAX_DEPTH: usize = 128;

pub const BULLET: &str = "\u{2022}";

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    /// Paragraph text; `\n` marks an explicit line break
    Paragraph { text: String },
    ListItem { depth: usize, marker: String, text: String },
    Preformatted { text: String },
    Rule,
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl ParsedDocument {
    /// Title for running headers: `<title>`, else the first heading
    pub fn display_title(&self) -> &str {
        if let Some(title) = self.title.as_deref() {
            return title;
        }
        self.blocks
            .iter()
            .find_map(|block| match block {
                Block::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }
}

/// Parse HTML or plain text into blocks.
pub fn parse(content: &str) -> ParsedDocument {
    if !looks_like_markup(content) {
        return parse_plain_text(content);
    }

    let html = Html::parse_document(content);
    let title = html
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut walker = Walker::default();
    walker.walk(html.root_element(), 0);
    walker.flush();

    ParsedDocument {
        title,
        blocks: walker.blocks,
    }
}

/// True if the content contains at least one tag-like `<x`, `</` or `<!`.
pub fn looks_like_markup(content: &str) -> bool {
    content.as_bytes().windows(2).any(|w| {
        w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/' || w[1] == b'!')
    })
}

fn parse_plain_text(content: &str) -> ParsedDocument {
    let blocks = content
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(|para| {
            para.lines()
                .map(collapse_whitespace)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .map(|text| Block::Paragraph { text })
        .collect();

    ParsedDocument {
        title: None,
        blocks,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct ListState {
    ordered: bool,
    next: usize,
}

#[derive(Default)]
struct Walker {
    blocks: Vec<Block>,
    /// Inline text of the block being built
    text: String,
    lists: Vec<ListState>,
    /// Marker of the list item whose text is in `text`
    pending_item: Option<(usize, String)>,
}

impl Walker {
    fn walk(&mut self, element: ElementRef<'_>, depth: usize) {
        let name = element.value().name();
        if SKIPPED.contains(&name) {
            return;
        }

        let style = element
            .value()
            .attr("style")
            .map(|s| s.to_ascii_lowercase().replace(char::is_whitespace, ""))
            .unwrap_or_default();
        if style.contains("page-break-before:always") || style.contains("break-before:page") {
            self.page_break();
        }

        if depth >= MAX_DEPTH {
            self.push_text(&element.text().collect::<String>());
        } else {
            self.enter(element, name, depth);
        }

        if style.contains("page-break-after:always") || style.contains("break-after:page") {
            self.page_break();
        }
    }

    fn enter(&mut self, element: ElementRef<'_>, name: &str, depth: usize) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse().unwrap_or(1);
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    self.blocks.push(Block::Heading { level, text });
                }
            }
            "pre" => {
                self.flush();
                let raw: String = element.text().collect();
                let text = raw
                    .strip_prefix('\n')
                    .unwrap_or(&raw)
                    .trim_end()
                    .to_string();
                if !text.is_empty() {
                    self.blocks.push(Block::Preformatted { text });
                }
            }
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "br" => self.text.push('\n'),
            "img" => {
                if let Some(alt) = element.value().attr("alt").filter(|a| !a.trim().is_empty()) {
                    self.push_text(&format!("[{}]", alt.trim()));
                }
            }
            "ul" | "ol" => {
                self.flush();
                let start = element
                    .value()
                    .attr("start")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(1);
                self.lists.push(ListState {
                    ordered: name == "ol",
                    next: start,
                });
                self.walk_children(element, depth);
                self.flush();
                self.lists.pop();
            }
            "li" => {
                self.flush();
                let depth_in_lists = self.lists.len().max(1);
                let marker = match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let marker = format!("{}.", list.next);
                        list.next += 1;
                        marker
                    }
                    _ => BULLET.to_string(),
                };
                self.pending_item = Some((depth_in_lists, marker));
                self.walk_children(element, depth);
                self.flush();
                self.pending_item = None;
            }
            "td" | "th" => {
                self.walk_children(element, depth);
                self.text.push_str("  ");
            }
            _ if BLOCKS.contains(&name) => {
                self.flush();
                self.walk_children(element, depth);
                self.flush();
            }
            _ => self.walk_children(element, depth),
        }
    }

    fn walk_children(&mut self, element: ElementRef<'_>, depth: usize) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.walk(child, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        self.text.extend(text.chars().map(|c| {
            if c.is_whitespace() || c.is_control() {
                ' '
            } else {
                c
            }
        }));
    }

    fn page_break(&mut self) {
        self.flush();
        if !matches!(self.blocks.last(), None | Some(Block::PageBreak)) {
            self.blocks.push(Block::PageBreak);
        }
    }

    /// Emit the buffered inline text as a paragraph or list item
    fn flush(&mut self) {
        let text = self
            .text
            .split('\n')
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        self.text.clear();
        if text.is_empty() {
            return;
        }

        match self.pending_item.take() {
            Some((depth, marker)) => self.blocks.push(Block::ListItem {
                depth,
                marker,
                text,
            }),
            None => self.blocks.push(Block::Paragraph { text }),
        }
    }
}
