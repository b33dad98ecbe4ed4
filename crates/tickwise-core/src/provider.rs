use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{ProviderId, Quote, Symbol};

/// Why a provider call produced no quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    MissingCredentials,
    Malformed,
    InvalidRequest,
    Internal,
}

/// Provider-level failure. The chain records it and moves to the next provider;
/// it never reaches the caller of the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn missing_credentials(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::MissingCredentials,
            message: format!("provider '{provider}' has no API key configured"),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::MissingCredentials => "source.missing_credentials",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Future returned by [`QuoteProvider::fetch`].
pub type QuoteFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Quote>, SourceError>> + Send + 'a>>;

/// One quote source in the fallback chain.
///
/// `Ok(None)` means the provider answered but has nothing for this exact symbol.
pub trait QuoteProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// False when required credentials are missing; the chain then skips the provider.
    fn is_available(&self) -> bool {
        true
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> QuoteFuture<'a>;
}
