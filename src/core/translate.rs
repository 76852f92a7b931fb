//! Translation of shell-style wildcard patterns into anchored regular expressions
//!
//! Every wildcard construct (`*`, `**`, `?`, `[...]`) becomes exactly one
//! capturing group, so the same pattern string can drive the filesystem glob
//! and afterwards re-extract the values each wildcard stood for.

use std::path::MAIN_SEPARATOR;

/// Characters that make a path component a glob rather than a literal name
const MAGIC_CHARS: [char; 3] = ['*', '?', '['];

/// Characters escaped with a backslash outside character classes
const RESERVED: &str = "()[]{}?*+-|^$\\.&~#";

/// Characters escaped with a backslash inside character classes
const CLASS_RESERVED: &str = "\\[]^-&~|";

/// Never matches anything; produced by classes whose ranges are all empty
const EMPTY_CLASS: &str = r"[^\x00-\x{10FFFF}]";

/// Result of translating one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Regex source anchored at both ends
    pub regex: String,
    /// Number of capture groups, one per wildcard construct
    pub magic_expressions: usize,
}

/// Returns true if `s` contains any glob metacharacter
pub fn has_magic(s: &str) -> bool {
    s.contains(MAGIC_CHARS)
}

/// Translates `pattern` using the platform path separator
pub fn translate(pattern: &str) -> Translation {
    translate_with_separator(pattern, MAIN_SEPARATOR)
}

/// Translates `pattern`, treating `separator` as the character `*` and `?` never match
pub fn translate_with_separator(pattern: &str, separator: char) -> Translation {
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();
    let not_separator = format!("[^{}]", escape_class_char(separator));

    let mut body = String::with_capacity(pattern.len() * 2);
    let mut groups = 0;
    let mut i = 0;

    while i < n {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                if i < n && chars[i] == '*' {
                    while i < n && chars[i] == '*' {
                        i += 1;
                    }
                    body.push_str("(.*)");
                } else {
                    body.push('(');
                    body.push_str(&not_separator);
                    body.push_str("*)");
                }
                groups += 1;
            }
            '?' => {
                body.push('(');
                body.push_str(&not_separator);
                body.push(')');
                groups += 1;
            }
            '[' => match translate_class(&chars, i, separator) {
                Some((class, next)) => {
                    body.push('(');
                    body.push_str(&class);
                    body.push(')');
                    groups += 1;
                    i = next;
                }
                None => body.push_str(r"\["),
            },
            c => push_literal(&mut body, c),
        }
    }

    Translation {
        regex: format!(r"\A(?s:{})[\r\n]?\z", body),
        magic_expressions: groups,
    }
}

/// Translates the class starting right after `[` at `start`.
///
/// Returns the regex class and the index after the closing `]`, or `None`
/// when `[` must be taken literally: the class is unterminated or spans a
/// path separator, which globbing treats as a component boundary.
fn translate_class(chars: &[char], start: usize, separator: char) -> Option<(String, usize)> {
    let n = chars.len();
    let mut j = start;
    if j < n && chars[j] == '!' {
        j += 1;
    }
    if j < n && chars[j] == ']' {
        j += 1;
    }
    while j < n && chars[j] != ']' {
        j += 1;
    }
    if j >= n {
        return None;
    }
    if chars[start..j].contains(&separator) {
        return None;
    }

    let negated = chars[start] == '!';
    let content = if negated {
        &chars[start + 1..j]
    } else {
        &chars[start..j]
    };

    let stuff = if content.contains(&'-') {
        escape_ranges(content)
    } else {
        content.iter().map(|&c| escape_class_char(c)).collect()
    };

    let class = match (stuff.is_empty(), negated) {
        (true, false) => EMPTY_CLASS.to_string(),
        (true, true) => ".".to_string(),
        (false, true) => format!("[^{}]", stuff),
        (false, false) => format!("[{}]", stuff),
    };
    Some((class, j + 1))
}

/// Splits class content into range chunks, drops empty ranges (`z-a`) and
/// rejoins the chunks with range hyphens. Hyphens inside chunks stay literal.
fn escape_ranges(content: &[char]) -> String {
    let mut chunks: Vec<Vec<char>> = Vec::new();
    let mut i = 0;
    let mut k = 1;
    while let Some(p) = (k..content.len()).find(|&p| content[p] == '-') {
        chunks.push(content[i..p].to_vec());
        i = p + 1;
        k = p + 3;
    }
    let last = &content[i.min(content.len())..];
    if !last.is_empty() {
        chunks.push(last.to_vec());
    } else if let Some(chunk) = chunks.last_mut() {
        chunk.push('-');
    }

    for k in (1..chunks.len()).rev() {
        let empty_range = match (chunks[k - 1].last(), chunks[k].first()) {
            (Some(lo), Some(hi)) => lo > hi,
            _ => false,
        };
        if empty_range {
            let tail: Vec<char> = chunks[k].iter().skip(1).copied().collect();
            let head = &mut chunks[k - 1];
            head.pop();
            head.extend(tail);
            chunks.remove(k);
        }
    }

    chunks
        .iter()
        .map(|chunk| chunk.iter().map(|&c| escape_class_char(c)).collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

fn escape_class_char(c: char) -> String {
    if CLASS_RESERVED.contains(c) {
        format!("\\{}", c)
    } else {
        c.to_string()
    }
}

fn push_literal(out: &mut String, c: char) {
    if RESERVED.contains(c) {
        out.push('\\');
        out.push(c);
    } else if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C') {
        out.push_str(&format!("\\x{{{:X}}}", c as u32));
    } else {
        out.push(c);
    }
}
