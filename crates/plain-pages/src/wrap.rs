//! Greedy word wrapping on a character grid.

/// Wrap `text` into lines of at most `columns` characters.
///
/// Whitespace runs collapse to a single space. Words longer than a line are
/// split at the column boundary. Returns no lines for blank input.
pub fn wrap(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        while chars.len() > columns {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(columns);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let len = chars.len();
        if len == 0 {
            continue;
        }

        let needed = if current_len == 0 {
            len
        } else {
            current_len + 1 + len
        };
        if needed > columns {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += len;
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}
