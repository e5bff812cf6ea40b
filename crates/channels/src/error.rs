/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across channel traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// No transport is registered for the provider.
    #[error("no outbound transport for provider: {provider}")]
    UnknownProvider { provider: String },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_provider(provider: impl std::fmt::Display) -> Self {
        Self::UnknownProvider {
            provider: provider.to_string(),
        }
    }
}
