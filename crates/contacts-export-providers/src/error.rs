//! Error types for contact provider operations.
//!
//! Every failure carries a fine-grained [`ProviderErrorCode`]; codes fold
//! into the five user-facing [`ErrorCategory`] values that the CLI reports.

use std::fmt;
use thiserror::Error;

/// The user-facing class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or malformed client descriptor, token file or settings.
    Config,
    /// Consent denied, or a token that can no longer be refreshed.
    Auth,
    /// The granted permissions do not cover reading contacts.
    Scope,
    /// Network, transport or HTTP-level failure from the provider.
    Api,
    /// The provider broke the pagination contract.
    Protocol,
}

impl ErrorCategory {
    /// Returns the name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "ConfigError",
            Self::Auth => "AuthError",
            Self::Scope => "ScopeError",
            Self::Api => "ApiError",
            Self::Protocol => "ProtocolError",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specific kind of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Configuration error - missing or invalid descriptor, token file, settings.
    ConfigurationError,
    /// Authentication failed - consent denied, refresh rejected, callback lost.
    AuthenticationFailed,
    /// The token does not carry the scope needed to read contacts.
    InsufficientScope,
    /// The API rejected the access token (401).
    Unauthorized,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit or quota exceeded.
    RateLimited,
    /// Server returned an error status.
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Request was invalid (400) - bad parameters, malformed request.
    BadRequest,
    /// Pagination invariant violated - repeating cursor or runaway paging.
    ProtocolViolation,
}

impl ProviderErrorCode {
    /// Returns the user-facing category of this code.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError => ErrorCategory::Config,
            Self::AuthenticationFailed => ErrorCategory::Auth,
            Self::InsufficientScope => ErrorCategory::Scope,
            Self::Unauthorized
            | Self::NetworkError
            | Self::RateLimited
            | Self::ServerError
            | Self::InvalidResponse
            | Self::BadRequest => ErrorCategory::Api,
            Self::ProtocolViolation => ErrorCategory::Protocol,
        }
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::AuthenticationFailed => "authentication_failed",
            Self::InsufficientScope => "insufficient_scope",
            Self::Unauthorized => "unauthorized",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::BadRequest => "bad_request",
            Self::ProtocolViolation => "protocol_violation",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a contacts provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The provider that generated this error (e.g., "google").
    provider: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates an insufficient scope error.
    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InsufficientScope, message)
    }

    /// Creates an error for an access token the API refused.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unauthorized, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a pagination protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ProtocolViolation, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the user-facing category.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{} ({}): {}", self.category(), self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
