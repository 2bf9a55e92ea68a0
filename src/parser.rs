use crate::types::{SourceFormat, Unit};

use html_escape::decode_html_entities;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn parse(source: &str, format: SourceFormat) -> Vec<Unit> {
    match format {
        SourceFormat::Markup => parse_markup(source),
        SourceFormat::Plain => parse_plain(source),
    }
}

pub fn parse_plain(source: &str) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                units.push(Unit::Break);
            }
            '\n' => units.push(Unit::Break),
            '\t' => units.push(Unit::character(' ')),
            other => units.push(Unit::character(other)),
        }
    }

    units
}

/// Keeps top-level text and `<br>` markers; other elements are dropped with
/// their content.
pub fn parse_markup(source: &str) -> Vec<Unit> {
    let chars: Vec<char> = source.chars().collect();
    let mut units = Vec::new();
    let mut run = String::new();

    // Element currently being dropped and how deeply it is nested in itself.
    let mut dropping: Option<(String, usize)> = None;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c == '<' {
            if starts_with(&chars, i, "<!--") {
                push_text(&mut units, &mut run);
                i = find(&chars, i + 4, "-->").map_or(chars.len(), |end| end + 3);
                continue;
            }

            if let Some(close) = chars[i..].iter().position(|&ch| ch == '>').map(|p| i + p) {
                if let Some(tag) = Tag::parse(&chars[i + 1..close]) {
                    i = close + 1;

                    if let Some((name, depth)) = dropping.as_mut() {
                        if tag.name == *name {
                            if tag.closing {
                                *depth -= 1;
                            } else if !tag.self_closing {
                                *depth += 1;
                            }
                        }
                        if *depth == 0 {
                            dropping = None;
                        }
                        continue;
                    }

                    push_text(&mut units, &mut run);

                    if tag.name == "br" {
                        units.push(Unit::Break);
                    } else if !tag.closing
                        && !tag.self_closing
                        && !VOID_ELEMENTS.contains(&tag.name.as_str())
                    {
                        dropping = Some((tag.name, 1));
                    }

                    continue;
                }
            }
        }

        if dropping.is_none() {
            run.push(c);
        }
        i += 1;
    }

    push_text(&mut units, &mut run);
    units
}

/// Decodes a text run and appends its characters. Raw line breaks and tabs
/// are spaces in markup.
fn push_text(units: &mut Vec<Unit>, run: &mut String) {
    if run.is_empty() {
        return;
    }

    let text = std::mem::take(run);
    let decoded = decode_html_entities(&text);
    let mut chars = decoded.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                units.push(Unit::character(' '));
            }
            '\n' | '\t' => units.push(Unit::character(' ')),
            other => units.push(Unit::character(other)),
        }
    }
}

struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
}

impl Tag {
    /// Parses the inside of `<...>`. Returns `None` when it is not a tag,
    /// in which case the `<` is literal text.
    fn parse(inner: &[char]) -> Option<Self> {
        let (closing, rest) = match inner.first() {
            Some('/') => (true, &inner[1..]),
            _ => (false, inner),
        };

        let name: String = rest
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if name.is_empty() || !rest[0].is_ascii_alphabetic() {
            return None;
        }

        Some(Self {
            name,
            closing,
            self_closing: inner.last() == Some(&'/'),
        })
    }
}

fn starts_with(chars: &[char], at: usize, pattern: &str) -> bool {
    let mut idx = at;
    for p in pattern.chars() {
        if chars.get(idx) != Some(&p) {
            return false;
        }
        idx += 1;
    }
    true
}

fn find(chars: &[char], from: usize, pattern: &str) -> Option<usize> {
    (from..chars.len()).find(|&at| starts_with(chars, at, pattern))
}
