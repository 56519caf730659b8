/// How the server interprets backslashes inside string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeMode {
    /// Backslash is an escape character (the server default).
    #[default]
    Backslash,
    /// `NO_BACKSLASH_ESCAPES`: only quotes need doubling.
    NoBackslashEscapes,
}

/// Escape `raw` for use between single quotes in an SQL literal.
///
/// The result is at most twice the input length.
///
/// ```rust
/// use sql_stmt_engine::escape::{EscapeMode, escape_string};
///
/// assert_eq!(escape_string("O'Brien", EscapeMode::Backslash), r"O\'Brien");
/// assert_eq!(escape_string("O'Brien", EscapeMode::NoBackslashEscapes), "O''Brien");
/// ```
#[must_use]
pub fn escape_string(raw: &str, mode: EscapeMode) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 4);
    for ch in raw.chars() {
        match mode {
            EscapeMode::Backslash => match ch {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x1a' => out.push_str("\\Z"),
                c => out.push(c),
            },
            EscapeMode::NoBackslashEscapes => {
                if ch == '\'' {
                    out.push_str("''");
                } else {
                    out.push(ch);
                }
            }
        }
    }
    out
}
