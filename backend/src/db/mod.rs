//! Database module for profit storage.
//!
//! This module provides abstractions for database operations via the
//! Repository pattern, allowing different storage backends to be swapped
//! easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (HTTP handlers)                      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - Identifier parsing (malformed == not found)          │
//! │  - Draft / patch validation                             │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Trait (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                │
//! ┌───▼──────────────┐     ┌───────────▼─────────────┐
//! │ Local Repository │     │ Postgres Repository     │
//! │ (in-memory)      │     │ (Diesel, postgres-repo) │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! The store handle is created once with [`connect`], injected into the
//! application state, and released with [`disconnect`] after the server
//! stops. There is no global repository.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod seed;
pub mod services;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, ProfitFilter, ProfitRepository, RepositoryError, RepositoryResult,
};
pub use services::{ServiceError, ServiceResult};

use log::info;
use std::path::Path;
use std::sync::Arc;

/// Open the selected store and verify it answers.
///
/// For Postgres this builds the pool and runs pending migrations.
pub async fn connect(
    repo_type: RepositoryType,
    postgres_config: Option<&PostgresConfig>,
) -> RepositoryResult<Arc<dyn ProfitRepository>> {
    let repo = RepositoryFactory::create(repo_type, postgres_config).await?;
    if !repo.health_check().await? {
        return Err(RepositoryError::unavailable(
            "store reported unhealthy right after connecting",
            ErrorContext::new("connect").with_details(format!("type={}", repo_type)),
        ));
    }
    info!("Connected to {} repository", repo_type);
    Ok(repo)
}

/// Open the store configured for the current working directory.
///
/// See [`connect_configured`].
pub async fn connect_from_env() -> RepositoryResult<Arc<dyn ProfitRepository>> {
    connect_configured(Path::new(".")).await
}

/// Open the store described by the first `repository.toml` found from
/// `base_dir` (see [`RepositoryConfig::find_in`]). Without such a file the
/// store is chosen by `REPOSITORY_TYPE` / `DATABASE_URL`.
pub async fn connect_configured(base_dir: &Path) -> RepositoryResult<Arc<dyn ProfitRepository>> {
    if let Some(config) = RepositoryConfig::find_in(base_dir)? {
        let repo_type = config.repository_type()?;
        let postgres_config = config.to_postgres_config()?;
        return connect(repo_type, postgres_config.as_ref()).await;
    }

    let repo_type = RepositoryType::from_env()?;
    match repo_type {
        #[cfg(feature = "postgres-repo")]
        RepositoryType::Postgres => {
            let config = PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
            connect(repo_type, Some(&config)).await
        }
        _ => connect(repo_type, None).await,
    }
}

/// Release the store. Other clones of the handle stay usable until dropped.
pub async fn disconnect(repo: Arc<dyn ProfitRepository>) -> RepositoryResult<()> {
    repo.close().await?;
    info!("Repository disconnected");
    Ok(())
}
