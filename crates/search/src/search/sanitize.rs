//! Escaping for pattern-matching input.
//!
//! Free text that ends up inside a `LIKE` pattern must never be able to
//! introduce wildcards. The backend always renders `LIKE ? ESCAPE '\'`, so
//! prefixing the escape character and both wildcard tokens with a backslash
//! turns any input into a literal.

/// The escape character used in `LIKE ... ESCAPE` clauses.
pub const LIKE_ESCAPE: char = '\\';

/// Escapes `\`, `%` and `_` so the input matches only itself.
pub fn sanitize_contains_input(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize_contains_input("bolt"), "bolt");
        assert_eq!(sanitize_contains_input(""), "");
    }

    #[test]
    fn test_wildcards_escaped() {
        assert_eq!(sanitize_contains_input("50%"), "50\\%");
        assert_eq!(sanitize_contains_input("a_b"), "a\\_b");
        assert_eq!(sanitize_contains_input("%_%"), "\\%\\_\\%");
    }

    #[test]
    fn test_escape_character_escaped() {
        assert_eq!(sanitize_contains_input("c:\\tmp"), "c:\\\\tmp");
        assert_eq!(sanitize_contains_input("\\%"), "\\\\\\%");
    }

    #[test]
    fn test_quotes_are_left_for_binding() {
        assert_eq!(sanitize_contains_input("O'Brien"), "O'Brien");
    }
}
