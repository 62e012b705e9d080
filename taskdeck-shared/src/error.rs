/// Domain error taxonomy
///
/// Every service method returns `Result<T, DomainError>`. The HTTP boundary
/// (taskdeck-api) pattern-matches these variants into status codes; nothing
/// below the boundary knows about HTTP.
///
/// # Variants
///
/// - `Validation`: DTO field ranges, sort grammar, cross-field filter conflicts (422)
/// - `Authentication`: missing/invalid/expired token, wrong password (401)
/// - `NotActive`: valid token but the account is not activated (401, distinct detail)
/// - `Forbidden`: active account with insufficient role (403)
/// - `NotFound`: requested row absent (404)
/// - `Conflict`: uniqueness or foreign-key violation, naming the field (400)
/// - `Internal`: everything else; the enclosing transaction rolls back (500)

use thiserror::Error;

/// Result alias used throughout the domain layer
pub type DomainResult<T> = Result<T, DomainError>;

/// Unified domain error type
#[derive(Debug, Error)]
pub enum DomainError {
    /// A request value failed validation
    #[error("{field}: {message}")]
    Validation {
        /// Field or parameter that failed
        field: String,
        /// Human-readable reason
        message: String,
    },

    /// Token or password verification failed
    #[error("Authentication was unsuccessful.")]
    Authentication,

    /// The caller authenticated but the account is not activated
    #[error("Not an active user.")]
    NotActive,

    /// The caller is activated but the role is insufficient
    #[error("Without permission user.")]
    Forbidden,

    /// The requested resource does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness or referential constraint was violated
    #[error("Duplicate or invalid {0}")]
    Conflict(String),

    /// Unexpected failure; not recoverable at this layer
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    /// Convenience constructor for validation failures
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Maps store-level errors into the domain taxonomy.
///
/// Constraint violations are re-raised as `Conflict` with a human-readable
/// field name derived from the constraint identifier; a foreign-key violation
/// against the tasks table is surfaced as `NotFound` (the watch-set upsert
/// relies on this). All other database errors propagate as `Internal`.
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("resource".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return constraint_to_domain(constraint);
                }
                DomainError::Internal(anyhow::anyhow!("database error: {}", db_err))
            }
            other => DomainError::Internal(anyhow::anyhow!("database error: {}", other)),
        }
    }
}

/// Translates a Postgres constraint name into a domain error.
///
/// Constraint names follow the default `<table>_<column>_{key,fkey,pkey}`
/// convention of the schema.
fn constraint_to_domain(constraint: &str) -> DomainError {
    // A watch upsert referencing a missing task row
    if constraint.contains("task_id_fkey") {
        return DomainError::NotFound("task".to_string());
    }

    let field = if constraint.contains("username") {
        "username"
    } else if constraint.contains("nickname") {
        "nickname"
    } else if constraint.contains("email") {
        "email"
    } else if constraint.contains("asaignee_id") {
        "asaignee_id"
    } else if constraint.contains("registrant_id") {
        "registrant_id"
    } else if constraint.contains("account_id") || constraint.ends_with("_pkey") {
        "account_id"
    } else {
        constraint
    };

    DomainError::Conflict(field.to_string())
}
