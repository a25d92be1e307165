//! Query-side stopword detection.
//!
//! Stopwords affect query terms only, never indexed content, so phrase
//! queries can still match function words exactly. The parser drops
//! stopword clauses unless that would leave nothing: a query made entirely
//! of stopwords should still be answerable.

use std::collections::HashSet;

use crate::types::FtsConfig;

/// Classifies query terms as stopwords.
pub struct StopwordFilter {
    words: HashSet<String>,
    enabled: bool,
}

impl StopwordFilter {
    /// Build a filter from the configured language list.
    pub fn new(config: &FtsConfig) -> Self {
        let words = if config.filter_stopwords {
            stop_words::get(stop_words::LANGUAGE::English)
                .into_iter()
                .map(|w| w.to_string())
                .collect()
        } else {
            HashSet::new()
        };
        Self {
            words,
            enabled: config.filter_stopwords,
        }
    }

    /// Whether `term` is a stopword.
    pub fn is_stopword(&self, term: &str) -> bool {
        self.enabled && self.words.contains(term)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> StopwordFilter {
        StopwordFilter::new(&FtsConfig::default())
    }

    #[test]
    fn test_detects_common_stopwords() {
        let f = filter();
        assert!(f.is_stopword("the"));
        assert!(f.is_stopword("of"));
        assert!(f.is_stopword("is"));
        assert!(!f.is_stopword("cadence"));
        assert!(!f.is_stopword("revenue"));
    }

    #[test]
    fn test_disabled_filter_detects_nothing() {
        let config = FtsConfig {
            filter_stopwords: false,
            ..Default::default()
        };
        let f = StopwordFilter::new(&config);
        assert!(!f.is_stopword("the"));
    }
}
