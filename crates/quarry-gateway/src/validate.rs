//! Statement validation for the guarded gateway.
//!
//! The validator is deliberately a blocklist, not a SQL parser: it admits a
//! single statement that starts with `SELECT` and carries none of the known
//! mutation keywords anywhere in its text. Keyword matching is word-bounded,
//! so column names like `created_at` or `updated_at` pass.

use std::sync::LazyLock;

use quarry_core::{Error, Result};
use regex::Regex;

/// Mutation keywords rejected anywhere in a statement.
const BLOCKED_KEYWORDS: [&str; 10] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE", "COPY",
];

static BLOCKLIST: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?i)\b({})\b", BLOCKED_KEYWORDS.join("|"));
    Regex::new(&pattern).expect("Invalid blocklist regex pattern")
});

/// Validate `sql` as a single read-only SELECT statement.
///
/// Returns the trimmed statement on success. The keyword blocklist runs
/// first so a mutation anywhere in the text, leading or smuggled after a
/// semicolon, always reports the offending keyword; the `SELECT` prefix
/// and multi-statement checks follow.
pub fn validate(sql: &str) -> Result<&str> {
    let trimmed = sql.trim();

    if let Some(m) = BLOCKLIST.find(trimmed) {
        return Err(Error::MutationRejected(m.as_str().to_uppercase()));
    }

    if !starts_with_select(trimmed) {
        return Err(Error::NotReadOnly);
    }

    if has_interior_statement(trimmed) {
        return Err(Error::NotReadOnly);
    }

    Ok(trimmed)
}

fn starts_with_select(trimmed: &str) -> bool {
    let Some(head) = trimmed.get(..6) else {
        return false;
    };
    if !head.eq_ignore_ascii_case("select") {
        return false;
    }
    // "selection" must not pass as a prefix match.
    trimmed[6..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric() && c != '_')
}

/// Whether a semicolon is followed by anything other than whitespace.
/// A single trailing `;` is tolerated.
fn has_interior_statement(trimmed: &str) -> bool {
    match trimmed.find(';') {
        Some(pos) => !trimmed[pos + 1..].trim().is_empty(),
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_passes() {
        assert!(validate("SELECT 1").is_ok());
        assert!(validate("SELECT * FROM documents").is_ok());
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert!(validate("  select count(*) from documents  ").is_ok());
        assert!(validate("\n\tSeLeCt id FROM documents").is_ok());
    }

    #[test]
    fn test_trailing_semicolon_tolerated() {
        assert!(validate("SELECT id FROM documents;").is_ok());
        assert!(validate("SELECT id FROM documents; ").is_ok());
    }

    #[test]
    fn test_non_select_rejected() {
        assert!(matches!(validate("EXPLAIN SELECT 1"), Err(Error::NotReadOnly)));
        assert!(matches!(validate("WITH x AS (SELECT 1) SELECT * FROM x"), Err(Error::NotReadOnly)));
        assert!(matches!(validate(""), Err(Error::NotReadOnly)));
        assert!(matches!(validate("selection FROM t"), Err(Error::NotReadOnly)));
    }

    #[test]
    fn test_mutation_keyword_rejected_with_name() {
        let err = validate("DROP TABLE chunks").unwrap_err();
        assert!(matches!(err, Error::MutationRejected(ref k) if k == "DROP"));

        let err = validate("delete from documents").unwrap_err();
        assert!(matches!(err, Error::MutationRejected(ref k) if k == "DELETE"));

        let err = validate("SELECT 1; DROP TABLE documents").unwrap_err();
        assert!(matches!(err, Error::MutationRejected(ref k) if k == "DROP"));

        let err = validate("SELECT * FROM documents WHERE id IN (delete)").unwrap_err();
        assert!(matches!(err, Error::MutationRejected(ref k) if k == "DELETE"));
    }

    #[test]
    fn test_keyword_inside_identifier_passes() {
        assert!(validate("SELECT created_at, updated_at FROM documents").is_ok());
        assert!(validate("SELECT * FROM documents WHERE title = 'insertion'").is_ok());
    }

    #[test]
    fn test_multi_statement_rejected() {
        let err = validate("SELECT 1; SELECT 2").unwrap_err();
        assert!(matches!(err, Error::NotReadOnly));
    }

    #[test]
    fn test_validate_returns_trimmed_statement() {
        assert_eq!(validate("  SELECT 1  ").unwrap(), "SELECT 1");
    }
}
