//! High-level profit service layer.
//!
//! These functions work with any [`ProfitRepository`] and hold the rules
//! that must not depend on the backend: identifier parsing, validation and
//! not-found mapping. HTTP handlers call these, never the repository
//! directly.
//!
//! # Usage
//!
//! ```no_run
//! use profits_api::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let profits = services::list_profits(&repo).await?;
//!     println!("Found {} profits", profits.len());
//!     Ok(())
//! }
//! ```

use log::{debug, info, warn};

use super::repository::{ProfitFilter, ProfitRepository, RepositoryError, RepositoryResult};
use crate::api::{Profit, ProfitBody, ProfitId, ValidationErrors};

/// Errors surfaced by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The identifier is malformed or no record carries it. Callers cannot
    /// tell the two apart.
    #[error("Profit {id} not found")]
    NotFound { id: String },

    /// The request body failed validation; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Unexpected store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Parse a path identifier, reporting malformed tokens as not found.
pub fn parse_profit_id(token: &str) -> ServiceResult<ProfitId> {
    ProfitId::parse(token).map_err(|e| {
        debug!("Rejecting malformed id: {}", e);
        ServiceError::NotFound {
            id: token.to_string(),
        }
    })
}

fn not_found(id: ProfitId) -> ServiceError {
    warn!("Profit {} not found", id);
    ServiceError::NotFound { id: id.to_string() }
}

// ==================== Health & Connection ====================

/// Check if the store is reachable.
pub async fn health_check<R: ProfitRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Reads ====================

/// Every stored profit, in store default order.
pub async fn list_profits<R: ProfitRepository + ?Sized>(repo: &R) -> ServiceResult<Vec<Profit>> {
    Ok(repo.find(ProfitFilter::all()).await?)
}

/// Look up one profit by its textual identifier.
///
/// # Returns
/// * `Ok(Profit)` - The record
/// * `Err(ServiceError::NotFound)` - Malformed or unknown identifier
pub async fn get_profit<R: ProfitRepository + ?Sized>(repo: &R, id: &str) -> ServiceResult<Profit> {
    let id = parse_profit_id(id)?;
    repo.find_by_id(id).await?.ok_or_else(|| not_found(id))
}

// ==================== Writes ====================

/// Validate and store a new profit.
///
/// Validation happens before the store is touched, so a rejected draft
/// leaves the store unchanged.
pub async fn create_profit<R: ProfitRepository + ?Sized>(
    repo: &R,
    draft: &ProfitBody,
) -> ServiceResult<Profit> {
    let new = draft.validate_new().map_err(|errors| {
        warn!("Rejected profit draft: {}", errors);
        ServiceError::Validation(errors)
    })?;

    let stored = repo.insert(new).await?;
    info!("Created profit {} ({})", stored.id, stored.name);
    Ok(stored)
}

/// Overwrite the supplied fields of a profit and return the re-read record.
///
/// The identifier is checked first; a malformed one is reported as not
/// found regardless of the body.
pub async fn update_profit<R: ProfitRepository + ?Sized>(
    repo: &R,
    id: &str,
    patch: &ProfitBody,
) -> ServiceResult<Profit> {
    let id = parse_profit_id(id)?;
    let changes = patch.validate_changes().map_err(|errors| {
        warn!("Rejected update for profit {}: {}", id, errors);
        ServiceError::Validation(errors)
    })?;

    match repo.update_by_id(id, changes).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(not_found(id)),
        Err(e) => return Err(e.into()),
    }

    // A concurrent delete can land between the update and the read.
    let updated = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
    info!("Updated profit {}", id);
    Ok(updated)
}

/// Permanently remove a profit and return what was removed.
pub async fn delete_profit<R: ProfitRepository + ?Sized>(
    repo: &R,
    id: &str,
) -> ServiceResult<Profit> {
    let id = parse_profit_id(id)?;
    let deleted = repo.delete_by_id(id).await?.ok_or_else(|| not_found(id))?;
    info!("Deleted profit {}", id);
    Ok(deleted)
}

// ==================== Fixtures ====================

/// Replace the store's contents with `records`.
///
/// # Returns
/// Number of records inserted
pub async fn reset_profits<R: ProfitRepository + ?Sized>(
    repo: &R,
    records: Vec<Profit>,
) -> ServiceResult<usize> {
    let removed = repo.delete_many(ProfitFilter::all()).await?;
    let inserted = repo.insert_many(records).await?;
    info!("Reset profits: removed {}, inserted {}", removed, inserted);
    Ok(inserted)
}

/// Insert `records` only when the store holds no profits yet.
pub async fn seed_if_empty<R: ProfitRepository + ?Sized>(
    repo: &R,
    records: Vec<Profit>,
) -> ServiceResult<usize> {
    let existing = repo.count(ProfitFilter::all()).await?;
    if existing > 0 {
        info!("Skipping seed: store already holds {} profits", existing);
        return Ok(0);
    }
    let inserted = repo.insert_many(records).await?;
    info!("Seeded {} profits", inserted);
    Ok(inserted)
}
