//! Grammar shared by the item parsers: identifiers, `[FLAG]` groups and
//! foreign-key descriptors.

use crate::ast::{ForeignKey, ReferentialAction};
use crate::diagnostics::Issue;

/// A non-empty run of Unicode alphanumerics or `_`.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// An item split into its leading text and the contents of its `[...]` groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemParts {
    pub head: String,
    pub flags: Vec<String>,
}

/// Split `head [A] [B, C]` into `head` and `["A", "B", "C"]`.
///
/// Returns `None` when text other than whitespace follows the first group or a
/// group is left open.
pub fn split_flags(item: &str) -> Option<ItemParts> {
    let mut paren = 0usize;
    let mut start = None;
    for (i, c) in item.char_indices() {
        match c {
            '(' => paren += 1,
            ')' => paren = paren.saturating_sub(1),
            '[' if paren == 0 => {
                start = Some(i);
                break;
            }
            _ => {}
        }
    }

    let Some(start) = start else {
        return Some(ItemParts {
            head: item.trim().to_string(),
            flags: Vec::new(),
        });
    };

    let head = item[..start].trim().to_string();
    let mut flags = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in item[start..].chars() {
        match c {
            '(' if depth == 0 => return None,
            '[' | '(' => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            ']' | ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    push_flag(&mut flags, &current);
                    current.clear();
                    continue;
                }
            }
            ',' if depth == 1 => {
                push_flag(&mut flags, &current);
                current.clear();
                continue;
            }
            c if depth == 0 && !c.is_whitespace() => return None,
            _ => {}
        }
        if depth > 0 {
            current.push(c);
        }
    }

    if depth != 0 {
        return None;
    }
    Some(ItemParts { head, flags })
}

fn push_flag(flags: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        flags.push(text.to_string());
    }
}

/// A recognized flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    PrimaryKey,
    Derived,
    ForeignKey(ForeignKey),
    NotNull,
    Unique,
    Check(String),
    Other(String),
}

/// Interpret one flag. Unknown referential actions are reported through
/// `warnings` and left unset; a malformed `FK`/`CHECK` is an error.
pub fn parse_flag(column: &str, text: &str, warnings: &mut Vec<Issue>) -> Result<Flag, Issue> {
    let upper = text.to_ascii_uppercase();
    let words: Vec<&str> = upper.split_whitespace().collect();

    match words.as_slice() {
        ["PK"] => return Ok(Flag::PrimaryKey),
        ["DERIVED"] => return Ok(Flag::Derived),
        ["UNIQUE"] => return Ok(Flag::Unique),
        ["NOT", "NULL"] => return Ok(Flag::NotNull),
        _ => {}
    }

    if is_keyword_prefix(&upper, "FK") {
        return parse_foreign_key(column, text[2..].trim(), warnings).map(Flag::ForeignKey);
    }
    if is_keyword_prefix(&upper, "CHECK") {
        let rest = text[5..].trim();
        return match rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            Some(expr) if !expr.trim().is_empty() => Ok(Flag::Check(expr.trim().to_string())),
            _ => Err(Issue::MalformedItem { text: text.to_string() }),
        };
    }

    Ok(Flag::Other(text.to_string()))
}

fn is_keyword_prefix(upper: &str, keyword: &str) -> bool {
    upper.starts_with(keyword)
        && upper[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
}

/// Parse `-> Table.col ON DELETE action ON UPDATE action`.
fn parse_foreign_key(
    column: &str,
    text: &str,
    warnings: &mut Vec<Issue>,
) -> Result<ForeignKey, Issue> {
    let malformed = || Issue::MalformedItem { text: format!("FK {text}") };

    let rest = text.strip_prefix("->").unwrap_or(text).trim();
    let mut words = rest.split_whitespace();
    let target = words.next().ok_or_else(malformed)?;
    let (table, referenced) = target.split_once('.').ok_or_else(malformed)?;
    if !is_identifier(table) || !is_identifier(referenced) {
        return Err(malformed());
    }

    let mut fk = ForeignKey::new(column, table, referenced);
    let remaining: Vec<&str> = words.collect();
    let mut i = 0;
    while i < remaining.len() {
        let event = match remaining.get(i + 1) {
            Some(w) if remaining[i].eq_ignore_ascii_case("ON") => w.to_ascii_uppercase(),
            _ => return Err(malformed()),
        };
        let mut end = i + 2;
        while end < remaining.len() && !remaining[end].eq_ignore_ascii_case("ON") {
            end += 1;
        }
        let action_text = remaining[i + 2..end].join(" ");
        let action = ReferentialAction::from_str(&action_text);
        if action.is_none() {
            warnings.push(Issue::UnknownReferentialAction { action: action_text });
        }

        match event.as_str() {
            "DELETE" => fk.on_delete = action,
            "UPDATE" => fk.on_update = action,
            _ => return Err(malformed()),
        }
        i = end;
    }

    Ok(fk)
}
