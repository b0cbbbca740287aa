//! Lexical views over C# source.
//!
//! Attribute and declaration scanning works on two byte-aligned copies of a
//! file: `code` has comments blanked, `masked` additionally blanks the
//! contents of string and char literals so braces and brackets inside them
//! never affect nesting. Offsets found in one view are valid in the other.

pub struct SourceText {
    pub code: String,
    pub masked: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Blank {
    /// Character survives in both views
    None,
    /// Literal content: kept in `code`, blanked in `masked`
    Masked,
    /// Comment: blanked in both views
    Both,
}

impl SourceText {
    pub fn new(content: &str) -> Self {
        let chars: Vec<char> = content.chars().collect();
        let mut code = String::with_capacity(content.len());
        let mut masked = String::with_capacity(content.len());

        let mut push = |c: char, blank: Blank| {
            let keep_newline = c == '\n';
            match blank {
                Blank::None => {
                    code.push(c);
                    masked.push(c);
                }
                Blank::Masked => {
                    code.push(c);
                    push_blank(&mut masked, c, keep_newline);
                }
                Blank::Both => {
                    push_blank(&mut code, c, keep_newline);
                    push_blank(&mut masked, c, keep_newline);
                }
            }
        };

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if c == '/' && next == Some('/') {
                while i < chars.len() && chars[i] != '\n' {
                    push(chars[i], Blank::Both);
                    i += 1;
                }
                continue;
            }

            if c == '/' && next == Some('*') {
                push(c, Blank::Both);
                push('*', Blank::Both);
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        push('*', Blank::Both);
                        push('/', Blank::Both);
                        i += 2;
                        break;
                    }
                    push(chars[i], Blank::Both);
                    i += 1;
                }
                continue;
            }

            if c == '"' {
                let verbatim = is_verbatim_prefix(&chars, i);
                push(c, Blank::None);
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    if verbatim && ch == '"' && chars.get(i + 1) == Some(&'"') {
                        push(ch, Blank::Masked);
                        push('"', Blank::Masked);
                        i += 2;
                        continue;
                    }
                    if !verbatim && ch == '\\' {
                        push(ch, Blank::Masked);
                        if let Some(&escaped) = chars.get(i + 1) {
                            push(escaped, Blank::Masked);
                        }
                        i += 2;
                        continue;
                    }
                    if ch == '"' {
                        push(ch, Blank::None);
                        i += 1;
                        break;
                    }
                    if ch == '\n' && !verbatim {
                        // Unterminated literal; stop at the line end
                        break;
                    }
                    push(ch, Blank::Masked);
                    i += 1;
                }
                continue;
            }

            if c == '\'' {
                push(c, Blank::None);
                i += 1;
                while i < chars.len() && chars[i] != '\n' {
                    let ch = chars[i];
                    if ch == '\\' {
                        push(ch, Blank::Masked);
                        if let Some(&escaped) = chars.get(i + 1) {
                            push(escaped, Blank::Masked);
                        }
                        i += 2;
                        continue;
                    }
                    if ch == '\'' {
                        push(ch, Blank::None);
                        i += 1;
                        break;
                    }
                    push(ch, Blank::Masked);
                    i += 1;
                }
                continue;
            }

            push(c, Blank::None);
            i += 1;
        }

        SourceText { code, masked }
    }

    /// Byte offset of the `}` closing the `{` at `open`, if balanced
    pub fn matching_brace(&self, open: usize) -> Option<usize> {
        matching_forward(&self.masked, open, b'{', b'}')
    }

    /// Byte offset of the `[` opening the `]` at `close`, if balanced
    pub fn matching_open_bracket(&self, close: usize) -> Option<usize> {
        let bytes = self.masked.as_bytes();
        if bytes.get(close) != Some(&b']') {
            return None;
        }
        let mut depth = 0usize;
        for idx in (0..=close).rev() {
            match bytes[idx] {
                b']' => depth += 1,
                b'[' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Byte offset of the `]` closing the `[` at `open`, if balanced
    pub fn matching_close_bracket(&self, open: usize) -> Option<usize> {
        matching_forward(&self.masked, open, b'[', b']')
    }
}

fn matching_forward(masked: &str, open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let bytes = masked.as_bytes();
    if bytes.get(open) != Some(&open_ch) {
        return None;
    }
    let mut depth = 0usize;
    for (idx, &b) in bytes.iter().enumerate().skip(open) {
        if b == open_ch {
            depth += 1;
        } else if b == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn push_blank(out: &mut String, c: char, keep_newline: bool) {
    if keep_newline {
        out.push('\n');
    } else {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }
}

/// `@"..."`, `$@"..."` and `@$"..."` are verbatim
fn is_verbatim_prefix(chars: &[char], quote: usize) -> bool {
    let prev = quote.checked_sub(1).map(|i| chars[i]);
    let prev2 = quote.checked_sub(2).map(|i| chars[i]);
    prev == Some('@') || (prev == Some('$') && prev2 == Some('@'))
}
