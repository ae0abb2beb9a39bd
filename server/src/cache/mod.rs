//! Local inventory cache
//!
//! A disk-persisted, profile-scoped snapshot of compartments, database
//! insights and host insights.

pub mod builder;
pub mod mirror;
pub mod models;
pub mod query;
pub mod source;
pub mod store;

pub use builder::{BuildError, BuildReport, BuildRequest};
pub use mirror::{CacheMirror, DocumentMirror};
pub use models::{BuildStatus, CacheDocument, Statistics};
pub use query::{CacheSummary, CompartmentNode};
pub use source::{InventorySource, Listing, OciInventorySource};
pub use store::{CacheError, InventoryCache};
