//! Splits a document into top-level `KEYWORD NAME [extra] { body }` blocks and
//! block bodies into items.

use crate::diagnostics::{Diagnostics, Issue, Outcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub keyword: String,
    pub name: String,
    /// Header text between the name and the opening brace (`ON relation`).
    pub extra: String,
    pub body: String,
}

impl Block {
    /// Keyword compared case-insensitively.
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    pub fn items(&self) -> Vec<String> {
        split_items(&self.body)
    }

    /// Report header text after the name for keywords that take none.
    pub fn reject_extra(&self, diagnostics: &mut Diagnostics) {
        if !self.extra.is_empty() {
            diagnostics.scoped(
                &self.name,
                Issue::MalformedItem {
                    text: format!("{} {} {}", self.keyword, self.name, self.extra),
                },
            );
        }
    }
}

/// Extract every top-level block, in document order.
///
/// The opening brace may sit on the header line or on a following line.
/// Braces are depth-tracked, and lines starting with `#` or `--` are skipped
/// both between blocks and inside bodies.
pub fn extract_blocks(text: &str) -> Outcome<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let mut header = String::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        if is_comment(rest) && at_line_start(text, pos) {
            pos += comment_len(rest);
            continue;
        }

        let Some(c) = rest.chars().next() else { break };
        match c {
            '{' => {
                let Some(close) = find_closing(text, pos) else {
                    let (keyword, name, _) = split_header(last_line(&header));
                    diagnostics.push(
                        name.as_deref(),
                        Issue::UnterminatedBlock {
                            keyword: keyword.unwrap_or_default(),
                            name: name.clone().unwrap_or_default(),
                        },
                    );
                    header.clear();
                    break;
                };

                let body = &text[pos + 1..close];
                if let Some(block) = build_block(&header, body, &mut diagnostics) {
                    blocks.push(block);
                }
                header.clear();
                pos = close + 1;
            }
            '}' => {
                diagnostics.push(None, Issue::StrayText { text: "}".to_string() });
                pos += 1;
            }
            _ => {
                header.push(c);
                pos += c.len_utf8();
            }
        }
    }

    for line in header.lines().map(str::trim).filter(|l| !l.is_empty()) {
        diagnostics.push(None, Issue::StrayText { text: line.to_string() });
    }

    tracing::debug!(blocks = blocks.len(), "extracted blocks");
    Outcome::new(blocks, diagnostics)
}

/// Split a block body into atomic items.
///
/// Each line is split on commas, except commas nested in `(...)` or `[...]`,
/// so `A (1,n), B (0,n)` and one participant per line give the same items.
pub fn split_items(body: &str) -> Vec<String> {
    let mut items = Vec::new();

    for line in body.lines().map(str::trim) {
        if line.is_empty() || is_comment(line) {
            continue;
        }

        let mut depth = 0usize;
        let mut current = String::new();
        for c in line.chars() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    push_item(&mut items, &current);
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(c);
        }
        push_item(&mut items, &current);
    }

    items
}

fn push_item(items: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        items.push(text.to_string());
    }
}

fn is_comment(s: &str) -> bool {
    s.starts_with('#') || s.starts_with("--")
}

fn comment_len(rest: &str) -> usize {
    rest.find('\n').unwrap_or(rest.len())
}

/// Whether only whitespace precedes `pos` on its line.
fn at_line_start(text: &str, pos: usize) -> bool {
    text[..pos]
        .rsplit('\n')
        .next()
        .is_none_or(|prefix| prefix.trim().is_empty())
}

/// Byte offset of the brace closing the one at `open`.
fn find_closing(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;

    while pos < text.len() {
        let rest = &text[pos..];
        if pos > open && is_comment(rest) && at_line_start(text, pos) {
            pos += comment_len(rest);
            continue;
        }

        let c = rest.chars().next()?;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
        pos += c.len_utf8();
    }

    None
}

fn last_line(header: &str) -> &str {
    header
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("")
}

fn split_header(line: &str) -> (Option<String>, Option<String>, String) {
    let mut words = line.split_whitespace();
    let keyword = words.next().map(str::to_string);
    let name = words.next().map(str::to_string);
    let extra = words.collect::<Vec<_>>().join(" ");
    (keyword, name, extra)
}

fn build_block(header: &str, body: &str, diagnostics: &mut Diagnostics) -> Option<Block> {
    let lines: Vec<&str> = header
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let Some((last, stray)) = lines.split_last() else {
        diagnostics.push(None, Issue::MissingName { header: String::new() });
        return None;
    };
    for text in stray {
        diagnostics.push(None, Issue::StrayText { text: text.to_string() });
    }

    match split_header(last) {
        (Some(keyword), Some(name), extra) => Some(Block {
            keyword,
            name,
            extra,
            body: body.to_string(),
        }),
        _ => {
            diagnostics.push(None, Issue::MissingName { header: last.to_string() });
            None
        }
    }
}
