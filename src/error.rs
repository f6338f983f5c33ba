//! Error types for CheapChomp.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags used by the sync worker
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use thiserror::Error;

/// Result type alias for CheapChomp operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the exit code, JSON consumers on the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Not Found (exit 3)
    UserNotFound,
    GroceryListNotFound,
    ItemNotFound,
    NotSignedIn,

    // Validation (exit 4)
    InvalidArgument,
    PasswordMismatch,

    // Auth (exit 5)
    AuthFailed,

    // Remote store (exit 6)
    RemoteError,

    // Catalog (exit 7)
    CatalogError,

    // Config (exit 8)
    ConfigError,

    // I/O (exit 9)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::GroceryListNotFound => "GROCERY_LIST_NOT_FOUND",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::NotSignedIn => "NOT_SIGNED_IN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::AuthFailed => "AUTH_FAILED",
            Self::RemoteError => "REMOTE_ERROR",
            Self::CatalogError => "CATALOG_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::UserNotFound | Self::GroceryListNotFound | Self::ItemNotFound | Self::NotSignedIn => 3,
            Self::InvalidArgument | Self::PasswordMismatch => 4,
            Self::AuthFailed => 5,
            Self::RemoteError => 6,
            Self::CatalogError => 7,
            Self::ConfigError => 8,
            Self::IoError | Self::JsonError => 9,
        }
    }

    /// Whether the failed operation may succeed if tried again later.
    ///
    /// The sync worker turns a retryable failure into a "retry later"
    /// outcome instead of giving up on the pass.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteError
                | Self::DatabaseError
                | Self::UserNotFound
                | Self::GroceryListNotFound
                | Self::CatalogError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in CheapChomp operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("User not found: {email}")]
    UserNotFound { email: String },

    #[error("No grocery list found for user {user_id}")]
    GroceryListNotFound { user_id: String },

    #[error("Item not found: {name}")]
    ItemNotFound { name: String },

    #[error("Passwords do not match!")]
    PasswordMismatch,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotSignedIn => ErrorCode::NotSignedIn,
            Self::UserNotFound { .. } => ErrorCode::UserNotFound,
            Self::GroceryListNotFound { .. } => ErrorCode::GroceryListNotFound,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::PasswordMismatch => ErrorCode::PasswordMismatch,
            Self::Auth(_) => ErrorCode::AuthFailed,
            Self::Remote(_) => ErrorCode::RemoteError,
            Self::Catalog(_) | Self::Http(_) => ErrorCode::CatalogError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Whether this error should make a sync pass report "retry".
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.error_code().is_retryable()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotSignedIn => Some(
                "Sign in first:\n  \
                 Login:    chomp login <email>\n  \
                 Register: chomp register <email>"
                    .to_string(),
            ),
            Self::UserNotFound { email } => Some(format!(
                "No account for '{email}'. Use `chomp register {email}` to create one."
            )),
            Self::GroceryListNotFound { .. } => Some(
                "The account has no grocery list document. Re-register or check the remote store."
                    .to_string(),
            ),
            Self::ItemNotFound { .. } => {
                Some("Use `chomp list` to see the items on your grocery list.".to_string())
            }
            Self::PasswordMismatch => {
                Some("Enter the same password in both prompts.".to_string())
            }
            Self::Remote(_) => Some(
                "Changes made offline stay pending. Run `chomp sync run` once the remote store is reachable."
                    .to_string(),
            ),
            Self::Catalog(_) | Self::Http(_) => Some(
                "Check CHOMP_CLIENT_ID / CHOMP_CLIENT_SECRET and network access.".to_string(),
            ),
            Self::Config(_) => Some("Check ~/.cheapchomp/config.json".to_string()),
            Self::Auth(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
