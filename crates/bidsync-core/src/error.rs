use thiserror::Error;

/// PostgreSQL SQLSTATE codes treated as lock/timeout-class faults.
///
/// - `40001` serialization_failure
/// - `40P01` deadlock_detected
/// - `55P03` lock_not_available
/// - `57014` query_canceled (statement or lock timeout)
const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01", "55P03", "57014"];

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while reconciling
/// the source and destination stores. It uses the `thiserror` crate for
/// ergonomic error handling and automatic conversion from underlying library
/// errors.
///
/// # Error Conversion
///
/// Most errors automatically convert from their source types using the `#[from]` attribute:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```no_run
/// use bidsync_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// This error wraps all errors from SQLx database operations, including
    /// connection failures, query errors, and constraint violations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// A store reported a lock or timeout-class failure.
    ///
    /// Store implementations that can recognise these faults without an
    /// underlying `sqlx::Error` report them through this variant.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// A parent record the row depends on has not been synchronized yet.
    ///
    /// The row is skipped and left eligible for the next run.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Source data could not be mapped onto the destination schema.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A sync status transition was requested that the state machine forbids.
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// Creating the upload folder tree for a project failed.
    #[error("Folder provisioning failed: {0}")]
    FolderError(String),

    /// Creating an application login for a contact failed.
    #[error("Credential provisioning failed: {0}")]
    CredentialError(String),

    /// One or more child-resolution steps failed for a project.
    #[error("{failed} child resolution step(s) failed for project {project_id}")]
    ChildResolution { project_id: i64, failed: usize },

    /// HTTP client request failed.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

/// Coarse classification used by the engine to decide how a row failure is
/// logged and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Lock/timeout faults. Retried where a retry policy applies.
    Transient,
    /// Parent not synced yet. Logged as a warning, row skipped.
    MissingDependency,
    /// Mapping or data errors. Row failure.
    Data,
    /// Folder or credential provisioning errors scoped to a sub-step.
    Infrastructure,
    /// Anything else.
    Other,
}

impl AppError {
    /// Returns true for lock/timeout-class store faults that are worth retrying.
    ///
    /// # Examples
    ///
    /// ```
    /// use bidsync_core::error::AppError;
    ///
    /// assert!(AppError::LockTimeout("row locked".to_string()).is_transient());
    /// assert!(AppError::DatabaseError(sqlx::Error::PoolTimedOut).is_transient());
    /// assert!(!AppError::InvalidData("bad".to_string()).is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::LockTimeout(_) => true,
            AppError::DatabaseError(e) => is_transient_sqlx(e),
            _ => false,
        }
    }

    /// Returns true if this error is retryable at the HTTP client level.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::ClientError(_)
        ) || self.is_transient()
    }

    /// Classifies the error according to the sync error taxonomy.
    pub fn class(&self) -> ErrorClass {
        if self.is_transient() {
            return ErrorClass::Transient;
        }
        match self {
            AppError::MissingDependency(_) => ErrorClass::MissingDependency,
            AppError::InvalidData(_) | AppError::InvalidTransition(_) => ErrorClass::Data,
            AppError::FolderError(_) | AppError::CredentialError(_) => ErrorClass::Infrastructure,
            _ => ErrorClass::Other,
        }
    }

    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check SOURCE_DATABASE_URL and DESTINATION_DATABASE_URL.".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::LockTimeout(msg) => {
                format!("Database lock timeout: {}\n   Another process may be holding locks on the destination tables.", msg)
            }
            AppError::FolderError(msg) => {
                format!("Cannot create upload folders: {}\n   Check that UPLOAD_ROOT exists and is writable.", msg)
            }
            AppError::CredentialError(msg) => {
                format!("Cannot create contact login: {}\n   Check IDENTITY_API_URL and IDENTITY_API_KEY.", msg)
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!("Request timed out after {} seconds.\n   The server may be overloaded. Try again later.", secs)
            }
            _ => self.to_string(),
        }
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())),
        _ => false,
    }
}
