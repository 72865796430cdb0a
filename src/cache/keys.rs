//! Typed cache keys and the keyword fingerprinter.
//!
//! Every cached endpoint family renders its key here and nowhere else, so
//! key formats cannot drift between the read path and the invalidator.
//! Rendered keys are pure ASCII with bounded length: free-text inputs go
//! through [`fingerprint`] before they reach a key.

use md5::{Digest, Md5};

use crate::domain::FileType;

// ============================================================================
// Families
// ============================================================================

/// The cached endpoint families and their authoritative TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFamily {
    PublicDocumentList,
    UserDocumentList,
    HotDocuments,
    LatestDocuments,
    SearchResults,
    TechSquareStats,
    UserDocumentStats,
    UserProfile,
}

impl CacheFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicDocumentList => "public_document_list",
            Self::UserDocumentList => "user_document_list",
            Self::HotDocuments => "hot_documents",
            Self::LatestDocuments => "latest_documents",
            Self::SearchResults => "search_results",
            Self::TechSquareStats => "tech_square_stats",
            Self::UserDocumentStats => "user_document_stats",
            Self::UserProfile => "user_profile",
        }
    }

    /// Seconds of staleness each family tolerates. The user-profile TTL is
    /// configurable and resolved by its cache, not here.
    pub fn default_ttl_secs(self) -> u64 {
        match self {
            Self::PublicDocumentList => 600,
            Self::UserDocumentList => 1200,
            Self::HotDocuments => 600,
            Self::LatestDocuments => 300,
            Self::SearchResults => 480,
            Self::TechSquareStats => 900,
            Self::UserDocumentStats => 1800,
            Self::UserProfile => 3600,
        }
    }
}

// ============================================================================
// Typed filters
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Latest,
    Popular,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Popular => "popular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    Today,
    Week,
    Month,
}

impl TimeFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

// ============================================================================
// Keys
// ============================================================================

/// One variant per cacheable request shape. `render` is the only place key
/// strings are assembled.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    PublicList {
        page: u32,
        size: u32,
        search: Option<String>,
        file_type: Option<FileType>,
        time_filter: Option<TimeFilter>,
        sort_by: SortBy,
    },
    UserList {
        user_id: i64,
        page: u32,
        size: u32,
        folder_id: Option<i64>,
    },
    HotDocuments {
        limit: u32,
    },
    LatestDocuments {
        limit: u32,
    },
    Search {
        keyword: String,
        page: u32,
        size: u32,
        file_type: Option<FileType>,
    },
    TechSquareStats,
    UserStats {
        user_id: i64,
    },
    User {
        key_prefix: String,
        user_id: i64,
    },
}

impl CacheKey {
    pub fn family(&self) -> CacheFamily {
        match self {
            Self::PublicList { .. } => CacheFamily::PublicDocumentList,
            Self::UserList { .. } => CacheFamily::UserDocumentList,
            Self::HotDocuments { .. } => CacheFamily::HotDocuments,
            Self::LatestDocuments { .. } => CacheFamily::LatestDocuments,
            Self::Search { .. } => CacheFamily::SearchResults,
            Self::TechSquareStats => CacheFamily::TechSquareStats,
            Self::UserStats { .. } => CacheFamily::UserDocumentStats,
            Self::User { .. } => CacheFamily::UserProfile,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::PublicList {
                page,
                size,
                search,
                file_type,
                time_filter,
                sort_by,
            } => {
                let q = fingerprint(search.as_deref().unwrap_or(""));
                let t = file_type.map_or("none", FileType::as_str);
                let time = time_filter.map_or("none", TimeFilter::as_str);
                format!(
                    "doc_list:public:p{page}:s{size}:q{q}:t{t}:time{time}:sort{}",
                    sort_by.as_str()
                )
            }
            Self::UserList {
                user_id,
                page,
                size,
                folder_id,
            } => {
                let f = folder_id.map_or_else(|| "none".to_owned(), |id| id.to_string());
                format!("doc_list:user{user_id}:p{page}:s{size}:f{f}")
            }
            Self::HotDocuments { limit } => format!("hot_data:hot_docs:limit_{limit}"),
            Self::LatestDocuments { limit } => format!("hot_data:latest_docs:limit_{limit}"),
            Self::Search {
                keyword,
                page,
                size,
                file_type,
            } => {
                let h = fingerprint(keyword);
                let t = file_type.map_or("none", FileType::as_str);
                format!("search_cache:keyword_{h}:p{page}:s{size}:t{t}")
            }
            Self::TechSquareStats => "stats:tech_square:global".to_owned(),
            Self::UserStats { user_id } => format!("stats:user_docs:{user_id}"),
            Self::User {
                key_prefix,
                user_id,
            } => format!("{key_prefix}:user:{user_id}"),
        }
    }
}

/// Collapse free text into a short stable token: trim, lowercase, hash.
/// Empty input renders as the literal `none` so filterless and filtered
/// requests share the same key grammar.
pub fn fingerprint(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return "none".to_owned();
    }
    let digest = Md5::digest(normalized.as_bytes());
    hex::encode(digest)[..8].to_owned()
}

// ============================================================================
// Invalidation patterns
// ============================================================================

/// Glob patterns the invalidator scans with. Kept beside the key builders so
/// a format change updates both sides together.
pub mod patterns {
    use super::fingerprint;

    pub const PUBLIC_LIST: &str = "doc_list:public:*";
    pub const HOT_DOCS: &str = "hot_data:hot_docs:*";
    pub const LATEST_DOCS: &str = "hot_data:latest_docs:*";
    pub const ALL_HOT_DATA: &str = "hot_data:*";
    pub const SEARCH_ALL: &str = "search_cache:*";

    pub fn user_list(user_id: i64) -> String {
        format!("doc_list:user{user_id}:*")
    }

    pub fn search_keyword(keyword: &str) -> String {
        format!("search_cache:keyword_{}:*", fingerprint(keyword))
    }
}
