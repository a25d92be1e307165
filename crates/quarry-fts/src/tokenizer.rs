//! Tokenization shared by indexing and query parsing.
//!
//! A single analyzer is used on both sides so query terms always line up
//! with indexed terms: lowercase, split on any non-alphanumeric character,
//! drop empty tokens. Digits are kept ("Q3" → "q3", "12%" → "12").

/// Tokenize text into lowercase alphanumeric terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
