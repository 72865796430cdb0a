//! Serializable result types for the cached endpoint families.
//!
//! These are the shapes the read-side queries produce and the cache stores;
//! the owning domains (document manager, user service) construct them, this
//! crate only round-trips them through JSON.

pub mod documents;
pub mod stats;
pub mod users;

pub use documents::{
    DocumentListPage, DocumentSummary, FileType, HotDocumentsPage, SearchResultsPage,
};
pub use stats::{CategoryStats, TechSquareStats, UserDocumentStats};
pub use users::CachedUser;
