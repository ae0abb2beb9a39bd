//! OPSI MCP server library
//!
//! Exposes OCI Operations Insights, Database Management, Identity and
//! Database APIs as MCP tools, plus a local inventory cache of compartments,
//! database insights and host insights.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod logging;
pub mod mcp;
pub mod metrics;
pub mod models;
pub mod oci;
pub mod registry;
pub mod skills;
pub mod tools;

/// Application state shared across all handlers
pub struct AppState {
    pub config: config::AppConfig,
    pub registry: Arc<registry::ClientRegistry>,
    pub skills: Arc<skills::SkillLibrary>,
    pub tools: tools::ToolRouter,
    pub token_verifier: Option<api::TokenVerifier>,
    pub total_tool_calls: AtomicU64,
    pub total_tool_errors: AtomicU64,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: config::AppConfig,
        registry: Arc<registry::ClientRegistry>,
        skills: Arc<skills::SkillLibrary>,
    ) -> Self {
        Self {
            tools: tools::ToolRouter::new(registry.clone(), skills.clone()),
            config,
            registry,
            skills,
            token_verifier: None,
            total_tool_calls: AtomicU64::new(0),
            total_tool_errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn with_token_verifier(mut self, verifier: Option<api::TokenVerifier>) -> Self {
        self.token_verifier = verifier;
        self
    }
}
