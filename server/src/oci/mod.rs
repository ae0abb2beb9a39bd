//! Oracle Cloud Infrastructure access layer
//!
//! Resolves identities from the OCI CLI config or the runtime environment,
//! signs REST calls and maps OCIDs to regions.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod pagination;
pub mod profile;
pub mod region;
pub mod signing;

pub use auth::{AuthType, Credentials};
pub use client::{OciClient, OciResponse};
pub use endpoints::Service;
pub use error::OciError;
pub use pagination::{list_all, Collected, DEFAULT_MAX_ITEMS};
pub use profile::{OciConfigFile, OciProfile};
