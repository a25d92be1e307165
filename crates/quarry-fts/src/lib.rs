//! Lexical full-text search for Quarry.
//!
//! A hand-maintained inverted index with BM25 ranking and a web-style query
//! grammar. The index is a passive data structure: the store that owns it is
//! responsible for updating it inside the same critical section as the
//! content write, which is what guarantees the "no stale index" invariant.
//!
//! # Modules
//!
//! - [`tokenizer`]: shared analyzer for indexing and queries
//! - [`stopwords`]: query-side stopword filtering
//! - [`query`]: the web-style grammar (implicit AND, phrases, `OR`)
//! - [`index`]: the inverted index and BM25 scoring

#![doc = include_str!("../README.md")]

pub mod index;
pub mod query;
pub mod stopwords;
pub mod tokenizer;
pub mod types;

// Re-export key types at crate root for convenience
pub use index::{LexicalHit, LexicalIndex};
pub use query::{Atom, LexicalQuery, QueryParser};
pub use stopwords::StopwordFilter;
pub use tokenizer::tokenize;
pub use types::FtsConfig;
