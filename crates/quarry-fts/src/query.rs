//! Query parsing for the web-style search grammar.
//!
//! Grammar:
//! - bare terms are joined with an implicit AND ("revenue growth" matches
//!   chunks containing both)
//! - `"quoted phrases"` must match as an exact token sequence
//! - the bare word `OR` joins the atoms on either side into one clause,
//!   any of which may match
//!
//! A parsed [`LexicalQuery`] is a conjunction of [`Clause`]s; each clause is
//! a disjunction of [`Atom`]s. Stopwords are filtered from bare terms (never
//! from phrases), falling back to the unfiltered terms if nothing survives.

use crate::stopwords::StopwordFilter;
use crate::tokenizer::tokenize;
use crate::types::FtsConfig;

/// A single matchable unit: one term or one exact phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// A single analyzed term.
    Term(String),
    /// An exact token sequence.
    Phrase(Vec<String>),
}

/// A disjunction of atoms; at least one must match.
pub type Clause = Vec<Atom>;

/// A parsed query: a conjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexicalQuery {
    pub clauses: Vec<Clause>,
}

impl LexicalQuery {
    /// Whether the query has no matchable content.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// All atoms across all clauses.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.clauses.iter().flatten()
    }
}

/// Raw lexical token produced by the query scanner.
#[derive(Debug, PartialEq, Eq)]
enum RawToken {
    Word(String),
    Phrase(String),
    Or,
}

/// Parser for the web-style query grammar.
pub struct QueryParser {
    stopwords: StopwordFilter,
}

impl QueryParser {
    /// Create a parser with the given configuration.
    pub fn new(config: &FtsConfig) -> Self {
        Self {
            stopwords: StopwordFilter::new(config),
        }
    }

    /// Parse a query string into clauses.
    pub fn parse(&self, query: &str) -> LexicalQuery {
        let raw = scan(query);

        let mut clauses: Vec<Clause> = Vec::new();
        let mut pending_or = false;

        for token in raw {
            match token {
                RawToken::Or => {
                    // OR binds the previous atom to the next; leading OR is noise
                    if !clauses.is_empty() {
                        pending_or = true;
                    }
                }
                RawToken::Word(word) => {
                    let terms = tokenize(&word);
                    for term in terms {
                        self.push_atom(&mut clauses, Atom::Term(term), &mut pending_or);
                    }
                }
                RawToken::Phrase(text) => {
                    let tokens = tokenize(&text);
                    if tokens.is_empty() {
                        continue;
                    }
                    let atom = if tokens.len() == 1 {
                        Atom::Term(tokens.into_iter().next().unwrap_or_default())
                    } else {
                        Atom::Phrase(tokens)
                    };
                    self.push_atom(&mut clauses, atom, &mut pending_or);
                }
            }
        }

        self.filter_stopword_clauses(clauses)
    }

    fn push_atom(&self, clauses: &mut Vec<Clause>, atom: Atom, pending_or: &mut bool) {
        if *pending_or {
            if let Some(last) = clauses.last_mut() {
                last.push(atom);
                *pending_or = false;
                return;
            }
        }
        *pending_or = false;
        clauses.push(vec![atom]);
    }

    /// Drop single-term stopword clauses, keeping the original query when
    /// every clause would be dropped. Phrases and OR-groups are kept as-is.
    fn filter_stopword_clauses(&self, clauses: Vec<Clause>) -> LexicalQuery {
        let kept: Vec<Clause> = clauses
            .iter()
            .filter(|clause| match clause.as_slice() {
                [Atom::Term(term)] => !self.stopwords.is_stopword(term),
                _ => true,
            })
            .cloned()
            .collect();

        let clauses = if kept.is_empty() { clauses } else { kept };
        LexicalQuery { clauses }
    }
}

/// Scan a query string into raw tokens, honoring quoted phrases.
///
/// An unclosed quote is treated as literal text (the quote is dropped).
fn scan(query: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut rest = query;

    while let Some(start) = rest.find('"') {
        let before = &rest[..start];
        scan_words(before, &mut tokens);

        match rest[start + 1..].find('"') {
            Some(end) => {
                let phrase = rest[start + 1..start + 1 + end].trim();
                if !phrase.is_empty() {
                    tokens.push(RawToken::Phrase(phrase.to_string()));
                }
                rest = &rest[start + end + 2..];
            }
            None => {
                rest = &rest[start + 1..];
                scan_words(rest, &mut tokens);
                return tokens;
            }
        }
    }

    scan_words(rest, &mut tokens);
    tokens
}

fn scan_words(text: &str, tokens: &mut Vec<RawToken>) {
    for word in text.split_whitespace() {
        // Operator recognition is case-sensitive: "or" is a term, "OR" joins
        if word == "OR" {
            tokens.push(RawToken::Or);
        } else {
            tokens.push(RawToken::Word(word.to_string()));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
