//! The catalog row shape mirrored into the gateway's SQLite database.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use quarry_core::{Document, DocumentStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One document's metadata as exposed through the catalog.
///
/// A superset of [`Document`]: it adds the file-level fields (filename,
/// type, size, hash) and ingestion bookkeeping (chunk count, summary,
/// timestamps) that callers query over but retrieval itself never reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub status: DocumentStatus,
    pub chunk_count: u32,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub topics: BTreeSet<String>,
    pub document_date: Option<NaiveDate>,
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a record from a retrieval-side document, with file metadata
    /// left at defaults for callers that only track retrieval state.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            filename: String::new(),
            file_type: String::new(),
            file_size: 0,
            status: doc.status,
            chunk_count: 0,
            title: doc.title.clone(),
            summary: None,
            topics: doc.topics.clone(),
            document_date: doc.document_date,
            content_hash: None,
            created_at: doc.created_at,
            updated_at: doc.created_at,
        }
    }

    /// Set the uploaded filename and type.
    pub fn with_file(mut self, filename: impl Into<String>, file_type: impl Into<String>) -> Self {
        self.filename = filename.into();
        self.file_type = file_type.into();
        self
    }

    /// Set the file size in bytes.
    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size = bytes;
        self
    }

    /// Set the chunk count produced by ingestion.
    pub fn with_chunk_count(mut self, count: u32) -> Self {
        self.chunk_count = count;
        self
    }

    /// Set the generated summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the content hash.
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
