//! Lexical query handling for the FTS5 index

/// Turn free text into an FTS5 expression.
///
/// Every word becomes a quoted phrase so user input can never inject FTS5
/// syntax (`NEAR`, `*`, column filters, unbalanced quotes). Terms are joined
/// with `OR` so partially matching notes still get a rank; bm25 rewards
/// notes that match more of them. Returns `None` when there is nothing to
/// search for.
pub fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// First `max_chars` characters of `body` with whitespace collapsed
pub fn snippet(body: &str, max_chars: usize) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > max_chars {
        format!("{}...", collapsed.chars().take(max_chars).collect::<String>())
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_query_quotes_terms() {
        assert_eq!(
            fts_query("Project status-update").as_deref(),
            Some("\"project\" OR \"status\" OR \"update\"")
        );
    }

    #[test]
    fn test_fts_query_neutralizes_syntax() {
        let query = fts_query("title:secret NEAR(\"a\" b) *").unwrap_or_default();
        assert_eq!(query, "\"title\" OR \"secret\" OR \"near\" OR \"a\" OR \"b\"");
    }

    #[test]
    fn test_fts_query_empty() {
        assert_eq!(fts_query("   "), None);
        assert_eq!(fts_query("?!*"), None);
    }

    #[test]
    fn test_snippet_is_char_aware() {
        assert_eq!(snippet("a  b\n c", 10), "a b c");
        assert_eq!(snippet("한국어 테스트 문장", 3), "한국어...");
    }
}
