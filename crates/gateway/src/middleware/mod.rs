//! Request middleware and extractors

pub mod actor;
pub mod metrics;
pub mod rate_limit;
