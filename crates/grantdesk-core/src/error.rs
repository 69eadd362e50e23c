use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur in GrantDesk.
/// It uses the `thiserror` crate for ergonomic error handling and automatic
/// conversion from underlying library errors.
///
/// # Error Conversion
///
/// Most errors automatically convert from their source types using the `#[from]` attribute:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
/// - `std::io::Error` → `AppError::IoError`
///
/// # Examples
///
/// ```no_run
/// use grantdesk_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps all errors from SQLx, including connection failures,
    /// query errors and constraint violations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client request to a bibliographic API failed.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Local file system operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing or invalid credentials.
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated, but the role does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with the current state of a record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A fund request cannot move to the requested status.
    #[error("Cannot {action} a request in status '{from}'")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// A requested or approved amount does not fit the fund budget.
    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded on a remote API.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Configuration error (missing API key, unreadable config file, ...).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The DOCX template could not be read or patched.
    #[error("Document error: {0}")]
    DocumentError(String),

    /// The external document converter failed.
    #[error("PDF conversion failed: {0}")]
    ConversionFailed(String),

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is MySQL running?\n   Try: docker compose up -d"
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::ClientError(msg) => {
                if msg.contains("401") || msg.contains("403") {
                    format!(
                        "The publication API rejected the request: {}\n   Check SCOPUS_API_KEY / SCHOLAR_API_KEY.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The remote service may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::ConfigError(msg) => {
                format!(
                    "Configuration error: {}\n   Check your environment or grantdesk.toml.",
                    msg
                )
            }
            AppError::ConversionFailed(msg) => {
                format!(
                    "PDF conversion failed: {}\n   Is LibreOffice installed? Set SOFFICE_BIN to the soffice binary.",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use grantdesk_core::error::AppError;
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::NotFound("User 7".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::RateLimitExceeded
                | AppError::ClientError(_)
        )
    }
}
