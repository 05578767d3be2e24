//! Profit repository trait.
//!
//! The operations mirror a generic document store: insert, find by id,
//! find by filter, update by id and delete by id. Identifiers are already
//! parsed when they reach a repository; malformed tokens never get here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::api::{NewProfit, Profit, ProfitChanges, ProfitId};

/// Equality filter over profit fields. The default filter matches every
/// record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfitFilter {
    pub name: Option<String>,
    pub year: Option<DateTime<Utc>>,
}

impl ProfitFilter {
    /// Filter matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_year(mut self, year: DateTime<Utc>) -> Self {
        self.year = Some(year);
        self
    }

    pub fn matches(&self, profit: &Profit) -> bool {
        self.name.as_ref().map_or(true, |name| &profit.name == name)
            && self.year.map_or(true, |year| profit.year == year)
    }
}

/// Repository trait for profit documents.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ProfitRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Release store resources. Called once during shutdown.
    async fn close(&self) -> RepositoryResult<()> {
        Ok(())
    }

    // ==================== Writes ====================

    /// Store a new profit and return it with its assigned identifier.
    async fn insert(&self, profit: NewProfit) -> RepositoryResult<Profit>;

    /// Store records that already carry identifiers (fixtures, seeding).
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records inserted
    async fn insert_many(&self, profits: Vec<Profit>) -> RepositoryResult<usize>;

    /// Overwrite the supplied fields of an existing record.
    ///
    /// # Returns
    /// * `Ok(())` - The record was matched and updated
    /// * `Err(RepositoryError::NotFound)` - No record has this identifier
    async fn update_by_id(&self, id: ProfitId, changes: ProfitChanges) -> RepositoryResult<()>;

    /// Permanently remove a record.
    ///
    /// # Returns
    /// * `Ok(Some(Profit))` - The removed record
    /// * `Ok(None)` - No record had this identifier
    async fn delete_by_id(&self, id: ProfitId) -> RepositoryResult<Option<Profit>>;

    /// Remove every record matching `filter` and return how many were removed.
    async fn delete_many(&self, filter: ProfitFilter) -> RepositoryResult<usize>;

    // ==================== Reads ====================

    async fn find_by_id(&self, id: ProfitId) -> RepositoryResult<Option<Profit>>;

    /// All records matching `filter`, in store default (insertion) order.
    async fn find(&self, filter: ProfitFilter) -> RepositoryResult<Vec<Profit>>;

    async fn count(&self, filter: ProfitFilter) -> RepositoryResult<usize>;
}
