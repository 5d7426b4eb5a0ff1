//! JSON with comments.
//!
//! `.jshintrc` files routinely carry `//` and `/* */` comments. They are
//! stripped before handing the text to `serde_json`; quoted strings are
//! matched first so comment-like text inside them survives.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Groups: 1 = double-quoted string, 2 = single-quoted string,
/// 3 = block comment, 4 = line comment (with its line terminator, if any).
///
/// `[^\r\n\x{2028}\x{2029}]` stands in for `.`: a line comment ends at any
/// line terminator, a bare `\r` included, and only `\n` / `\r\n` may
/// continue a block comment.
static STRING_OR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"("(?:[^\\"]*(?:\\[^\r\n\x{2028}\x{2029}])?)*")|('(?:[^\\']*(?:\\[^\r\n\x{2028}\x{2029}])?)*')|(/\*(?:\r?\n|[^\r\n\x{2028}\x{2029}])*?\*/)|(/{2,}[^\r\n\x{2028}\x{2029}]*?(?:\r?\n|$))"#,
    )
    .expect("valid string-or-comment regex")
});

/// Remove block and line comments, leaving string literals untouched.
///
/// A line comment keeps its trailing `\n` / `\r\n` so line numbers in later
/// parse errors still point at the right place.
#[must_use]
pub fn strip_comments(content: &str) -> Cow<'_, str> {
    STRING_OR_COMMENT.replace_all(content, |caps: &Captures<'_>| {
        if caps.get(3).is_some() {
            return String::new();
        }
        if let Some(comment) = caps.get(4) {
            let text = comment.as_str();
            if text.len() > 2 && text.ends_with('\n') {
                let body = &text[..text.len() - 1];
                return if body.ends_with('\r') { "\r\n" } else { "\n" }.to_string();
            }
            return String::new();
        }
        caps[0].to_string()
    })
}

/// Strip a UTF-8 byte order mark and comments, then parse.
pub fn from_str(content: &str) -> serde_json::Result<serde_json::Value> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    serde_json::from_str(&strip_comments(content))
}
