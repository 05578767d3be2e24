//! Errors raised by profit stores.
//!
//! Each error names the store operation that failed and, when one was
//! involved, the profit identifier, so a failure logged at the HTTP layer can
//! be traced back to the call that produced it.

use std::fmt;

use crate::api::ProfitId;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where a store error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Store operation, e.g. `"insert"` or `"update_by_id"`
    pub operation: Option<&'static str>,
    /// Profit the operation was working on
    pub profit_id: Option<ProfitId>,
    /// Backend-specific detail (pool size, attempt number, error kind)
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation: Some(operation),
            ..Default::default()
        }
    }

    /// Context for an operation on a single profit.
    pub fn for_profit(operation: &'static str, id: ProfitId) -> Self {
        Self::new(operation).with_profit(id)
    }

    pub fn with_profit(mut self, id: ProfitId) -> Self {
        self.profit_id = Some(id);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(op) = self.operation {
            parts.push(format!("during {}", op));
        }
        if let Some(id) = self.profit_id {
            parts.push(format!("profit {}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(details.clone());
        }
        if parts.is_empty() {
            return Ok(());
        }
        write!(f, " ({})", parts.join(", "))
    }
}

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The store cannot be reached. Always worth retrying.
    #[error("Store unavailable: {message}{context}")]
    Unavailable {
        message: String,
        context: ErrorContext,
    },

    /// The store rejected or failed a statement.
    #[error("Query failed: {message}{context}")]
    Query {
        message: String,
        retryable: bool,
        context: ErrorContext,
    },

    /// No profit carries the identifier.
    #[error("Profit {id} not found{context}")]
    NotFound { id: ProfitId, context: ErrorContext },

    /// A profit with the same identifier is already stored.
    #[error("Duplicate profit: {message}{context}")]
    Duplicate {
        message: String,
        context: ErrorContext,
    },

    /// The store could not be selected or built from its settings.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Anything else, e.g. a stored row that no longer decodes.
    #[error("Internal error: {message}{context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    pub fn unavailable(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Unavailable {
            message: message.into(),
            context,
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            retryable: false,
            context: ErrorContext::default(),
        }
    }

    pub fn not_found(id: ProfitId, operation: &'static str) -> Self {
        Self::NotFound {
            id,
            context: ErrorContext::new(operation),
        }
    }

    pub fn duplicate(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Duplicate {
            message: message.into(),
            context,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Internal {
            message: message.into(),
            context,
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Query { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Record the operation and profit on errors that carry a context.
    pub fn within(mut self, operation: &'static str, id: Option<ProfitId>) -> Self {
        if let Self::Unavailable { context, .. }
        | Self::Query { context, .. }
        | Self::NotFound { context, .. }
        | Self::Duplicate { context, .. }
        | Self::Internal { context, .. } = &mut self
        {
            context.operation = Some(operation);
            if id.is_some() {
                context.profit_id = id;
            }
        }
        self
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let context = ErrorContext::default().with_details(format!("{:?}", kind));
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::duplicate(message, context),
                    DatabaseErrorKind::ClosedConnection => Self::unavailable(message, context),
                    DatabaseErrorKind::SerializationFailure => Self::Query {
                        message,
                        retryable: true,
                        context,
                    },
                    _ => Self::Query {
                        message,
                        retryable: false,
                        context,
                    },
                }
            }
            Error::DeserializationError(e) => {
                Self::internal(format!("row decoding failed: {}", e), ErrorContext::default())
            }
            other => Self::query(other.to_string()),
        }
    }
}
