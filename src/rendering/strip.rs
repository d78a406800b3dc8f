//! Markup stripping for the fallback renderer.
//!
//! Deliberately avoids the HTML parser: this runs after the primary path
//! failed, possibly because of the content itself, so it works on raw
//! characters and accepts anything.

use plain_pages::Section;

use super::markup::looks_like_markup;

/// Bodies of these elements are dropped entirely
const RAW_TEXT: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Elements that end the current paragraph
const PARAGRAPH_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "header",
    "footer",
    "main",
    "nav",
    "aside",
    "blockquote",
    "pre",
    "table",
    "ul",
    "ol",
    "dl",
    "figure",
    "hr",
    "body",
    "title",
];

/// Elements that end the current line
const LINE_TAGS: &[&str] = &["br", "li", "tr", "dt", "dd", "td", "th", "caption"];

const MAX_CAPS_HEADING: usize = 60;

/// Split arbitrary content into sections for the text layout.
pub fn extract_sections(content: &str) -> Vec<Section> {
    let text = if looks_like_markup(content) {
        strip_markup(content)
    } else {
        content.to_string()
    };
    sectionize(&normalize(&text))
}

/// Remove tags, keeping block structure as newlines. Headings become
/// Markdown `#` lines.
fn strip_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(ch) = rest.chars().next() {
        match ch {
            '<' => {
                let after = &rest[1..];
                let next = after.chars().next();
                if after.starts_with("!--") {
                    rest = skip_past(after, "-->");
                } else if matches!(next, Some('!' | '?')) {
                    rest = skip_past(after, ">");
                } else if matches!(next, Some(c) if c.is_ascii_alphabetic() || c == '/') {
                    let (tag, remainder) = read_tag(after);
                    rest = remainder;
                    if !tag.closing && RAW_TEXT.contains(&tag.name.as_str()) {
                        rest = skip_raw_text(rest, &tag.name);
                    } else {
                        emit_tag(&mut out, &tag);
                    }
                } else {
                    out.push('<');
                    rest = after;
                }
            }
            '&' => {
                let (decoded, remainder) = decode_entity(rest);
                out.push_str(&decoded);
                rest = remainder;
            }
            _ => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    out
}

struct Tag {
    name: String,
    closing: bool,
}

fn read_tag(after_lt: &str) -> (Tag, &str) {
    let closing = after_lt.starts_with('/');
    let body = if closing { &after_lt[1..] } else { after_lt };
    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (Tag { name, closing }, skip_past(body, ">"))
}

fn emit_tag(out: &mut String, tag: &Tag) {
    let name = tag.name.as_str();
    if let Some(level) = heading_level(name) {
        if tag.closing {
            out.push('\n');
        } else {
            out.push_str("\n\n");
            out.push_str(&"#".repeat(level));
            out.push(' ');
        }
    } else if PARAGRAPH_TAGS.contains(&name) {
        out.push_str("\n\n");
    } else if LINE_TAGS.contains(&name) {
        if tag.closing {
            return;
        }
        out.push('\n');
        if name == "li" {
            out.push_str("- ");
        } else if matches!(name, "td" | "th") {
            out.push(' ');
        }
    } else {
        // Inline tags still separate words like `a<b>c</b>` would not.
        if matches!(name, "img" | "input" | "button" | "label") {
            out.push(' ');
        }
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => Some((level - b'0') as usize),
        _ => None,
    }
}

/// Everything after the first `needle`, or nothing if it never appears.
fn skip_past<'a>(text: &'a str, needle: &str) -> &'a str {
    match text.find(needle) {
        Some(pos) => &text[pos + needle.len()..],
        None => "",
    }
}

/// Everything after the closing tag for `name`, matched case-insensitively.
fn skip_raw_text<'a>(text: &'a str, name: &str) -> &'a str {
    let closing = text.match_indices("</").find(|(pos, _)| {
        let start = pos + 2;
        text.as_bytes()
            .get(start..start + name.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
    });
    match closing {
        Some((pos, _)) => skip_past(&text[pos..], ">"),
        None => "",
    }
}

/// Decode one entity at the start of `text` (which begins with `&`).
fn decode_entity(text: &str) -> (String, &str) {
    let end = text
        .char_indices()
        .take(12)
        .find(|(_, c)| *c == ';')
        .map(|(i, _)| i);
    let Some(end) = end else {
        return ("&".to_string(), &text[1..]);
    };
    let name = &text[1..end];
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        "copy" => Some('\u{A9}'),
        "reg" => Some('\u{AE}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201C}'),
        "rdquo" => Some('\u{201D}'),
        "bull" => Some('\u{2022}'),
        "euro" => Some('\u{20AC}'),
        _ => numeric_entity(name),
    };
    match decoded {
        Some(ch) => (ch.to_string(), &text[end + 1..]),
        None => ("&".to_string(), &text[1..]),
    }
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code).filter(|c| *c != '\0')
}

/// Unify line endings and blank out control characters.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\r' => '\n',
            '\n' => '\n',
            c if c.is_control() => ' ',
            '\u{FEFF}' => ' ',
            c => c,
        })
        .collect()
}

fn sectionize(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::new(None);
    let mut paragraph: Vec<String> = Vec::new();

    let flush_paragraph = |paragraph: &mut Vec<String>, section: &mut Section| {
        if !paragraph.is_empty() {
            section.paragraphs.push(paragraph.join(" "));
            paragraph.clear();
        }
    };

    for raw in text.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            flush_paragraph(&mut paragraph, &mut current);
            continue;
        }
        if let Some(heading) = as_heading(&line) {
            flush_paragraph(&mut paragraph, &mut current);
            let finished = std::mem::replace(&mut current, Section::new(Some(heading)));
            if !finished.is_empty() {
                sections.push(finished);
            }
            continue;
        }
        paragraph.push(line);
    }
    flush_paragraph(&mut paragraph, &mut current);
    if !current.is_empty() {
        sections.push(current);
    }
    sections
}

fn as_heading(line: &str) -> Option<String> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        if let Some(text) = line[hashes..].strip_prefix(' ') {
            let text = text.trim().trim_end_matches('#').trim();
            return (!text.is_empty()).then(|| text.to_string());
        }
    }

    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let is_caps = line.chars().count() <= MAX_CAPS_HEADING
        && letters >= 3
        && !line.chars().any(|c| c.is_lowercase());
    is_caps.then(|| line.to_string())
}
