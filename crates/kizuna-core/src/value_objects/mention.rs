//! `@username` mentions inside message bodies

use serde::{Deserialize, Serialize};

use super::Snowflake;

/// Longest username the scanner will accept after an `@`.
pub const MAX_MENTION_LEN: usize = 32;

/// A mention that resolved to a known user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mention {
    pub user_id: Snowflake,
    pub username: String,
}

impl Mention {
    pub fn new(user_id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

#[inline]
fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scan `content` for `@username` tokens.
///
/// An `@` counts only at the start of the text or after a non-word character,
/// so e-mail addresses are skipped. Trailing dots are treated as punctuation.
/// Names are returned in order of first appearance, deduplicated
/// case-insensitively.
pub fn extract_mention_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = content.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c == '@' && prev.map_or(true, |p| !is_word_char(p)) {
            let start = idx + 1;
            let mut end = start;
            while let Some(&(i, next)) = chars.peek() {
                if !is_username_char(next) {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }

            let name = content[start..end].trim_end_matches('.');
            if !name.is_empty()
                && name.len() <= MAX_MENTION_LEN
                && !names.iter().any(|n| n.eq_ignore_ascii_case(name))
            {
                names.push(name.to_string());
            }

            prev = content[..end].chars().next_back();
            continue;
        }
        prev = Some(c);
    }

    names
}
