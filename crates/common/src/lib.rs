//! PaperDesk Common Library
//!
//! Shared code for the PaperDesk services including:
//! - Role-based access control
//! - Tag extraction with keyword fallback
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - File storage and field validation rules
//! - Metrics and observability

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod rbac;
pub mod storage;
pub mod tagging;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use rbac::{Action, Actor, ResourceKind};
pub use tagging::{TagExtraction, TagExtractor};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Title of the role that receives every permission when seeding
pub const ADMIN_ROLE_TITLE: &str = "Administrator";
