//! Quoting helpers for values interpolated into remote commands, SQL and PHP
//!
//! Every user-supplied or generated value that ends up inside a shell
//! command line, a SQL statement or a PHP source file goes through one of
//! these functions.

/// Quote a value as a single POSIX shell word.
///
/// The result is wrapped in single quotes; embedded single quotes are
/// closed, escaped and reopened (`'` becomes `'\''`).
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Quote a value as a MySQL single-quoted string literal
pub fn sql_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote a value as a PHP single-quoted string literal
pub fn php_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Validate a SQL identifier (database or user name) taken from config.
///
/// Identifiers cannot be bound as literals, so only `[A-Za-z0-9_]` is allowed.
pub fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
