use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error type for the lobby server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional context for additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Severity level
    pub severity: ErrorSeverity,
    /// Error category for filtering and handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

impl LobbyError {
    /// Create a new error builder with the specified error code
    pub fn new(code: ErrorCode) -> LobbyErrorBuilder {
        LobbyErrorBuilder {
            code,
            message: String::new(),
            context: None,
            severity: ErrorSeverity::Error,
            category: None,
        }
    }
}

/// Builder for creating LobbyError instances
pub struct LobbyErrorBuilder {
    code: ErrorCode,
    message: String,
    context: Option<String>,
    severity: ErrorSeverity,
    category: Option<ErrorCategory>,
}

impl LobbyErrorBuilder {
    /// Set the error message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the error context
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the error severity
    pub fn severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the error category
    pub fn category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Build the final LobbyError
    pub fn build(self) -> LobbyError {
        LobbyError {
            code: self.code,
            message: self.message,
            context: self.context,
            severity: self.severity,
            category: self.category,
        }
    }
}

/// Error codes for different types of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // General errors
    Unknown,

    // Lifecycle errors
    ServerAlreadyRunning,
    ServerNotRunning,

    // HTTP/WebSocket related errors
    WebSocketBindFailed,
    WebSocketSendFailed,
    SessionNotFound,

    // Configuration related errors
    ConfigInvalid,
}

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Informational only, not an actual error
    Info,
    /// Warning that doesn't prevent operation
    Warning,
    /// Error that affects functionality but allows continued operation
    Error,
    /// Severe error that prevents further operation
    Critical,
}

/// Error category for filtering and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Socket, bind and delivery failures
    Network,
    /// Invalid or missing configuration
    Configuration,
    /// Calling an operation in the wrong server state
    Lifecycle,
    /// Internal errors
    Internal,
}

/// Errors raised inside the event bus while delivering to observers
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// A handler returned an error
    #[error("Handler {subscription} failed: {message}")]
    HandlerFailed {
        /// Subscription that failed
        subscription: String,
        /// Error message reported by the handler
        message: String,
    },

    /// A handler panicked during delivery
    #[error("Handler {subscription} panicked: {message}")]
    HandlerPanicked {
        /// Subscription that panicked
        subscription: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {} ({})", self.code, self.message, context)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code_str = match self {
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::ServerAlreadyRunning => "SERVER_ALREADY_RUNNING",
            ErrorCode::ServerNotRunning => "SERVER_NOT_RUNNING",
            ErrorCode::WebSocketBindFailed => "WS_BIND_FAILED",
            ErrorCode::WebSocketSendFailed => "WS_SEND_FAILED",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
        };
        write!(f, "{}", code_str)
    }
}

impl std::error::Error for LobbyError {}

impl From<anyhow::Error> for LobbyError {
    fn from(err: anyhow::Error) -> Self {
        LobbyError::new(ErrorCode::Unknown)
            .message(err.to_string())
            .category(ErrorCategory::Internal)
            .build()
    }
}

/// Type alias for lobby results
pub type LobbyResult<T> = Result<T, LobbyError>;

// Helper functions to create standard errors

/// Create an error for starting a server that is already running
pub fn server_already_running() -> LobbyError {
    LobbyError::new(ErrorCode::ServerAlreadyRunning)
        .message("Server is already running")
        .category(ErrorCategory::Lifecycle)
        .severity(ErrorSeverity::Warning)
        .build()
}

/// Create an error for stopping a server that is not running
pub fn server_not_running() -> LobbyError {
    LobbyError::new(ErrorCode::ServerNotRunning)
        .message("Server is not running")
        .category(ErrorCategory::Lifecycle)
        .severity(ErrorSeverity::Warning)
        .build()
}

/// Create a WebSocket bind failed error
pub fn websocket_bind_failed(addr: &str, err: impl fmt::Display) -> LobbyError {
    LobbyError::new(ErrorCode::WebSocketBindFailed)
        .message(format!("Failed to bind server to {}", addr))
        .context(err.to_string())
        .category(ErrorCategory::Network)
        .severity(ErrorSeverity::Critical)
        .build()
}

/// Create a WebSocket send failed error
pub fn websocket_send_failed(session_id: &str, err: impl fmt::Display) -> LobbyError {
    LobbyError::new(ErrorCode::WebSocketSendFailed)
        .message(format!("Failed to send to session {}", session_id))
        .context(err.to_string())
        .category(ErrorCategory::Network)
        .severity(ErrorSeverity::Error)
        .build()
}

/// Create an error for a session the transport does not know
pub fn session_not_found(session_id: &str) -> LobbyError {
    LobbyError::new(ErrorCode::SessionNotFound)
        .message(format!("Session {} is not connected", session_id))
        .category(ErrorCategory::Network)
        .severity(ErrorSeverity::Warning)
        .build()
}

/// Create an invalid configuration error
pub fn config_invalid(key: &str, value: &str, reason: &str) -> LobbyError {
    LobbyError::new(ErrorCode::ConfigInvalid)
        .message(format!("Invalid configuration value for {}: {}", key, value))
        .context(reason)
        .category(ErrorCategory::Configuration)
        .severity(ErrorSeverity::Error)
        .build()
}
