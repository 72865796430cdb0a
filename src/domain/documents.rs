//! Document list shapes served by the public catalog and per-user list
//! endpoints.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Upload formats the catalog accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Md,
    Pdf,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md => "md",
            Self::Pdf => "pdf",
        }
    }
}

/// One published document as it appears in list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub file_type: FileType,
    pub view_count: i64,
    pub is_featured: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

/// A page of the public or per-user document list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentListPage {
    pub documents: Vec<DocumentSummary>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

/// Hot or latest documents are served unpaginated, bounded by a limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotDocumentsPage {
    pub documents: Vec<DocumentSummary>,
}

/// A page of keyword search results; echoes the keyword the caller sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultsPage {
    pub documents: Vec<DocumentSummary>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub keyword: String,
}
