//! In-memory local repository implementation.
//!
//! This module provides a local implementation of [`ProfitRepository`]
//! suitable for unit testing and local development. Every operation takes
//! the lock once, so each write is atomic per document.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::api::{NewProfit, Profit, ProfitChanges, ProfitId};
use crate::db::repository::{
    ErrorContext, ProfitFilter, ProfitRepository, RepositoryError, RepositoryResult,
};

/// In-memory local repository.
///
/// Cloning shares the underlying data.
///
/// # Example
/// ```
/// use profits_api::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.profit_count(), 0);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    // Keyed by insertion sequence so that `find` returns insertion order.
    profits: BTreeMap<u64, Profit>,
    index: HashMap<ProfitId, u64>,
    next_seq: u64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            profits: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn push(&mut self, profit: Profit) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(profit.id, seq);
        self.profits.insert(seq, profit);
    }

    fn get_mut(&mut self, id: &ProfitId) -> Option<&mut Profit> {
        let seq = self.index.get(id)?;
        self.profits.get_mut(seq)
    }

    fn remove(&mut self, id: &ProfitId) -> Option<Profit> {
        let seq = self.index.remove(id)?;
        self.profits.remove(&seq)
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    ///
    /// While unhealthy every operation fails with a connection error.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of profits stored.
    pub fn profit_count(&self) -> usize {
        self.data.read().profits.len()
    }

    /// Check if a profit exists.
    pub fn has_profit(&self, id: ProfitId) -> bool {
        self.data.read().index.contains_key(&id)
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self, operation: &'static str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::unavailable(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfitRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn insert(&self, profit: NewProfit) -> RepositoryResult<Profit> {
        self.check_health("insert")?;
        let stored = Profit::from_new(ProfitId::generate(), profit);
        self.data.write().push(stored.clone());
        Ok(stored)
    }

    async fn insert_many(&self, profits: Vec<Profit>) -> RepositoryResult<usize> {
        self.check_health("insert_many")?;
        let mut data = self.data.write();

        let mut seen = std::collections::HashSet::new();
        for profit in &profits {
            if data.index.contains_key(&profit.id) || !seen.insert(profit.id) {
                return Err(RepositoryError::duplicate(
                    "identifier already stored",
                    ErrorContext::for_profit("insert_many", profit.id),
                ));
            }
        }

        let inserted = profits.len();
        for profit in profits {
            data.push(profit);
        }
        Ok(inserted)
    }

    async fn update_by_id(&self, id: ProfitId, changes: ProfitChanges) -> RepositoryResult<()> {
        self.check_health("update_by_id")?;
        let mut data = self.data.write();
        match data.get_mut(&id) {
            Some(profit) => {
                profit.apply(&changes);
                Ok(())
            }
            None => Err(RepositoryError::not_found(id, "update_by_id")),
        }
    }

    async fn delete_by_id(&self, id: ProfitId) -> RepositoryResult<Option<Profit>> {
        self.check_health("delete_by_id")?;
        Ok(self.data.write().remove(&id))
    }

    async fn delete_many(&self, filter: ProfitFilter) -> RepositoryResult<usize> {
        self.check_health("delete_many")?;
        let mut data = self.data.write();
        let doomed: Vec<ProfitId> = data
            .profits
            .values()
            .filter(|profit| filter.matches(profit))
            .map(|profit| profit.id)
            .collect();
        for id in &doomed {
            data.remove(id);
        }
        Ok(doomed.len())
    }

    async fn find_by_id(&self, id: ProfitId) -> RepositoryResult<Option<Profit>> {
        self.check_health("find_by_id")?;
        let data = self.data.read();
        Ok(data
            .index
            .get(&id)
            .and_then(|seq| data.profits.get(seq))
            .cloned())
    }

    async fn find(&self, filter: ProfitFilter) -> RepositoryResult<Vec<Profit>> {
        self.check_health("find")?;
        Ok(self
            .data
            .read()
            .profits
            .values()
            .filter(|profit| filter.matches(profit))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: ProfitFilter) -> RepositoryResult<usize> {
        self.check_health("count")?;
        Ok(self
            .data
            .read()
            .profits
            .values()
            .filter(|profit| filter.matches(profit))
            .count())
    }
}
