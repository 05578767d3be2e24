//! Repository trait definitions for the profit store.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`profit`]: Document-store style CRUD operations for profit records
//!
//! Handlers never talk to a backend directly; they receive an
//! `Arc<dyn ProfitRepository>` through the application state.

pub mod error;
pub mod profit;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use profit::{ProfitFilter, ProfitRepository};
