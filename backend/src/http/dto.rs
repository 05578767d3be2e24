//! Data Transfer Objects for the HTTP API.
//!
//! Profit records and request bodies serialize directly from the types in
//! [`crate::api`]; only responses with no domain counterpart live here.

use serde::{Deserialize, Serialize};

pub use crate::api::{Profit, ProfitBody, ValidationIssue};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// `connected`, `disconnected` or `error: ...`
    pub database: String,
}
