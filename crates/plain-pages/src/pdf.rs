//! Minimal PDF 1.4 object writer.
//!
//! Produces uncompressed files with a classic cross-reference table. Only
//! the pieces needed for Type1 base-14 text pages are supported.

use std::fmt::Write as _;

/// Accumulates numbered objects and emits a complete PDF file.
pub(crate) struct PdfWriter {
    buf: Vec<u8>,
    /// Byte offset of each object, indexed by object number - 1
    offsets: Vec<Option<usize>>,
}

impl PdfWriter {
    pub(crate) fn new() -> Self {
        let mut buf = Vec::with_capacity(8 * 1024);
        // Binary marker comment so transfer tools treat the file as binary.
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    /// Allocate the next object number.
    pub(crate) fn reserve(&mut self) -> u32 {
        self.offsets.push(None);
        self.offsets.len() as u32
    }

    pub(crate) fn write_object(&mut self, id: u32, body: &str) {
        if let Some(slot) = (id as usize)
            .checked_sub(1)
            .and_then(|i| self.offsets.get_mut(i))
        {
            *slot = Some(self.buf.len());
        }
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    pub(crate) fn write_stream(&mut self, id: u32, content: &str) {
        let body = format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        );
        self.write_object(id, &body);
    }

    /// Write the cross-reference table and trailer.
    ///
    /// Reserved objects that were never written are listed as free entries.
    pub(crate) fn finish(mut self, root: u32, info: Option<u32>) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;

        let mut xref = String::with_capacity(size * 20 + 64);
        let _ = write!(xref, "xref\n0 {}\n0000000000 65535 f \n", size);
        for slot in &self.offsets {
            match slot {
                Some(offset) => {
                    let _ = write!(xref, "{:010} 00000 n \n", offset);
                }
                None => xref.push_str("0000000000 65535 f \n"),
            }
        }
        let info = info.map(|id| format!(" /Info {} 0 R", id)).unwrap_or_default();
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF\n",
            size, root, info, xref_offset
        );

        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

/// Encode `text` as the body of a PDF literal string.
///
/// Output is pure ASCII: Latin-1 characters become octal escapes in
/// WinAnsiEncoding, a few common typographic characters are mapped to their
/// WinAnsi code points, and anything else becomes `?`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{A0}'..='\u{FF}' => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            other => match win_ansi_special(other) {
                Some(code) => {
                    let _ = write!(out, "\\{:03o}", code);
                }
                None => out.push('?'),
            },
        }
    }
    out
}

fn win_ansi_special(ch: char) -> Option<u8> {
    let code = match ch {
        '\u{20AC}' => 0x80, // euro
        '\u{2026}' => 0x85, // ellipsis
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95, // bullet
        '\u{2013}' => 0x96, // en dash
        '\u{2014}' => 0x97, // em dash
        '\u{2122}' => 0x99, // trademark
        _ => return None,
    };
    Some(code)
}
