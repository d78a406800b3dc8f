//! Base-14 font metrics and line breaking.
//!
//! Widths are in 1/1000 em, taken from the standard Helvetica and
//! Helvetica-Bold AFM files for the printable ASCII range.

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015,                                             // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // 'N'..'Z'
    278, 278, 278, 469, 556, 333,                                                   // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // 'n'..'z'
    334, 260, 334, 584,                                                             // '{'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const COURIER_WIDTH: u16 = 600;

/// Fonts available to the layout engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    pub const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Mono];

    /// Name used in page resource dictionaries
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Mono => "Courier",
        }
    }

    /// Advance width of `ch` in 1/1000 em
    pub fn char_width(&self, ch: char) -> u16 {
        let table = match self {
            Font::Mono => return COURIER_WIDTH,
            Font::Regular => &HELVETICA,
            Font::Bold => &HELVETICA_BOLD,
        };
        match ch {
            ' '..='~' => table[ch as usize - 32],
            '\u{A0}' => table[0],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' | '\u{2026}' => 1000,
            '\u{2018}' | '\u{2019}' => 222,
            // Average lowercase advance for everything else
            _ => 556,
        }
    }

    /// Width of `text` set at `size` points
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 * size / 1000.0
    }
}

/// Greedy word wrap of `text` to `max_width` points.
///
/// Whitespace collapses; words wider than a line are broken between
/// characters. Blank input yields no lines.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = font.text_width(" ", size);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = font.text_width(word, size);

        if word_width > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = break_word(word, font, size, max_width);
            let last = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            current_width = font.text_width(&last, size);
            current = last;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + space + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Hard-wrap preformatted text: every source line is kept, long lines are
/// broken at the last character that fits.
pub fn wrap_preformatted(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        let line = line.replace('\t', "    ");
        if font.text_width(&line, size) <= max_width {
            lines.push(line);
        } else {
            lines.extend(break_word(&line, font, size, max_width));
        }
    }
    lines
}

fn break_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;
    for ch in word.chars() {
        let w = font.char_width(ch) as f32 * size / 1000.0;
        if width + w > max_width && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(ch);
        width += w;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Encode text for a WinAnsiEncoding font. Unmappable characters become `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' | '\n' | '\r' => b' ',
            c if c.is_control() => b'?',
            c if (c as u32) <= 0xFF => c as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(Font::Regular.char_width(' '), 278);
        assert_eq!(Font::Regular.char_width('0'), 556);
        assert_eq!(Font::Regular.char_width('A'), 667);
        assert_eq!(Font::Regular.char_width('W'), 944);
        assert_eq!(Font::Regular.char_width('i'), 222);
        assert_eq!(Font::Regular.char_width('~'), 584);
        assert_eq!(Font::Bold.char_width('m'), 889);
        assert_eq!(Font::Mono.char_width('i'), 600);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let w10 = Font::Regular.text_width("Hello", 10.0);
        let w20 = Font::Regular.text_width("Hello", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 0.001);
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "The quick brown fox jumps over the lazy dog again and again";
        let lines = wrap_text(text, Font::Regular, 11.0, 120.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Regular.text_width(line, 11.0) <= 120.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_text_breaks_long_words() {
        let word = "x".repeat(200);
        let lines = wrap_text(&word, Font::Regular, 11.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_text_blank() {
        assert!(wrap_text("  \n ", Font::Regular, 11.0, 100.0).is_empty());
    }

    #[test]
    fn test_wrap_preformatted_keeps_lines() {
        let lines = wrap_preformatted("a  b\n\n\tc", Font::Mono, 10.0, 500.0);
        assert_eq!(lines, vec!["a  b", "", "    c"]);
    }

    #[test]
    fn test_to_win_ansi() {
        assert_eq!(to_win_ansi("Aé"), vec![b'A', 0xE9]);
        assert_eq!(to_win_ansi("\u{2022}\u{20AC}"), vec![0x95, 0x80]);
        assert_eq!(to_win_ansi("日"), vec![b'?']);
        assert_eq!(to_win_ansi("\u{1}"), vec![b'?']);
    }
}
