//! Aggregate statistics shapes for the catalog landing page and the per-user
//! dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub md_count: u64,
    pub pdf_count: u64,
    pub total_count: u64,
}

/// Global counters shown on the public catalog landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechSquareStats {
    pub total_documents: u64,
    pub total_views: u64,
    pub today_published: u64,
    pub featured_count: u64,
    pub category_stats: CategoryStats,
}

/// Per-user document counters for the dashboard sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocumentStats {
    pub user_id: i64,
    pub total_documents: u64,
    pub total_folders: u64,
    pub documents_by_status: BTreeMap<String, u64>,
}
