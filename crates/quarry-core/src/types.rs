//! Core data model: documents, chunks, and date windows.
//!
//! A [`Document`] is the unit of ownership and lifecycle; a [`Chunk`] is the
//! unit of retrieval. Chunks never exist without an owning document, and the
//! owning user is always derived through the document; chunks do not carry
//! their own ownership field that could drift.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a document.
///
/// Only `Ready` documents are eligible for retrieval; the other states are
/// visible through the metadata catalog but never through search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    /// Canonical lowercase name, as stored in the metadata catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

/// An uploaded document and its retrieval-relevant metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: Uuid,

    /// Owning user. Every query is scoped to this.
    pub user_id: Uuid,

    /// Extracted title, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Topic tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub topics: BTreeSet<String>,

    /// Date mentioned in the document, used for recency scoring and
    /// date-window filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_date: Option<NaiveDate>,

    /// Lifecycle state.
    pub status: DocumentStatus,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document in `Pending` state, owned by `user_id`.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: None,
            topics: BTreeSet::new(),
            document_date: None,
            status: DocumentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a topic tag.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.insert(topic.into());
        self
    }

    /// Set the document date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.document_date = Some(date);
        self
    }

    /// Set the lifecycle state.
    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }

    /// The date used for recency scoring and date filters: the document's
    /// own date when present, otherwise the creation timestamp.
    pub fn recency_date(&self) -> NaiveDate {
        self.document_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// A fixed-size slice of a document's text: the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier.
    pub id: Uuid,

    /// The owning document. Exactly one; never changes.
    pub document_id: Uuid,

    /// Chunk text content.
    pub content: String,

    /// Position of the chunk within its document (0-based).
    pub chunk_index: u32,

    /// Token count reported by the ingestion pipeline.
    pub token_count: u32,

    /// Dense embedding vector. Length must equal the store's dimension.
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk for `document_id` at `chunk_index`.
    pub fn new(
        document_id: Uuid,
        chunk_index: u32,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let content = content.into();
        let token_count = content.split_whitespace().count() as u32;
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            chunk_index,
            token_count,
            embedding,
        }
    }

    /// The embedding dimension.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// An optional inclusive date window applied to searches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DateWindow {
    /// Inclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,

    /// Inclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    /// An unbounded window that admits every date.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A window bounded on either side.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }

    /// Whether the window has any bound at all.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_document_builder() {
        let user = Uuid::new_v4();
        let doc = Document::new(user)
            .with_title("Q3 Report")
            .with_topic("finance")
            .with_date(date(2024, 9, 30))
            .with_status(DocumentStatus::Ready);

        assert_eq!(doc.user_id, user);
        assert_eq!(doc.title.as_deref(), Some("Q3 Report"));
        assert!(doc.topics.contains("finance"));
        assert_eq!(doc.status, DocumentStatus::Ready);
        assert_eq!(doc.recency_date(), date(2024, 9, 30));
    }

    #[test]
    fn test_document_recency_date_falls_back_to_created_at() {
        let doc = Document::new(Uuid::new_v4());
        assert_eq!(doc.recency_date(), doc.created_at.date_naive());
    }

    #[test]
    fn test_chunk_token_count() {
        let chunk = Chunk::new(Uuid::new_v4(), 0, "Q3 revenue grew 12%", vec![0.0; 4]);
        assert_eq!(chunk.token_count, 4);
        assert_eq!(chunk.dimension(), 4);
    }

    #[test]
    fn test_date_window_unbounded() {
        let window = DateWindow::unbounded();
        assert!(window.is_unbounded());
        assert!(window.contains(date(1990, 1, 1)));
        assert!(window.contains(date(2030, 12, 31)));
    }

    #[test]
    fn test_date_window_bounds_inclusive() {
        let window = DateWindow::new(Some(date(2024, 1, 1)), Some(date(2024, 12, 31)));
        assert!(window.contains(date(2024, 1, 1)));
        assert!(window.contains(date(2024, 12, 31)));
        assert!(!window.contains(date(2023, 12, 31)));
        assert!(!window.contains(date(2025, 1, 1)));
    }

    #[test]
    fn test_date_window_half_open() {
        let from_only = DateWindow::new(Some(date(2024, 6, 1)), None);
        assert!(from_only.contains(date(2030, 1, 1)));
        assert!(!from_only.contains(date(2024, 5, 31)));

        let to_only = DateWindow::new(None, Some(date(2024, 6, 1)));
        assert!(to_only.contains(date(1999, 1, 1)));
        assert!(!to_only.contains(date(2024, 6, 2)));
    }

    #[test]
    fn test_status_serialization_lowercase() {
        let json = serde_json::to_string(&DocumentStatus::Ready).unwrap();
        assert_eq!(json, "\"ready\"");
        assert_eq!(DocumentStatus::Error.as_str(), "error");
    }

    #[test]
    fn test_document_serialization_skips_empty() {
        let doc = Document::new(Uuid::new_v4());
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("title"));
        assert!(!json.contains("topics"));
        assert!(!json.contains("document_date"));
    }
}
