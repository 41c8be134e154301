//! Provider contract shared by the primary and failover adapters.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::http_client::{HttpError, HttpErrorKind};
use crate::{MetricBundle, ProviderId, Ticker};

/// Classified provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimited,
    ServerError,
    NotFound,
    Timeout,
}

impl ProviderErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
        }
    }
}

/// Error returned by a provider adapter.
///
/// `status` is the upstream HTTP status when one was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    status: Option<u16>,
    message: String,
}

impl ProviderError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            status: None,
            message: message.into(),
        }
    }

    pub fn server_error(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::ServerError,
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            status: None,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            status: None,
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status to an error kind.
    ///
    /// Statuses outside 404/429/5xx are treated as server errors that keep
    /// their status, so they never match the default failover set.
    pub fn from_status(provider: ProviderId, status: u16) -> Self {
        let message = format!("{provider} returned status {status}");
        let kind = match status {
            404 => ProviderErrorKind::NotFound,
            429 => ProviderErrorKind::RateLimited,
            _ => ProviderErrorKind::ServerError,
        };
        Self {
            kind,
            status: Some(status),
            message,
        }
    }

    pub fn from_http(provider: ProviderId, error: &HttpError) -> Self {
        match error.kind() {
            HttpErrorKind::Timeout => {
                Self::timeout(format!("{provider} request timed out: {}", error.message()))
            }
            HttpErrorKind::Connect | HttpErrorKind::Other => Self::server_error(
                None,
                format!("{provider} transport error: {}", error.message()),
            ),
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this failure moves the fetcher onto the failover provider.
    pub fn triggers_failover(&self, statuses: &[u16]) -> bool {
        self.kind == ProviderErrorKind::ServerError
            && self.status.is_some_and(|status| statuses.contains(&status))
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.as_str())
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<MetricBundle, ProviderError>> + Send + 'a>>;

/// Uniform contract over upstream market-data providers.
///
/// Implementations normalise provider payloads into canonical units and map
/// missing or null fields to absent metrics.
pub trait MarketDataProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn fetch_fundamentals<'a>(&'a self, ticker: &'a Ticker) -> ProviderFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_http_semantics() {
        assert_eq!(
            ProviderError::from_status(ProviderId::Yahoo, 404).kind(),
            ProviderErrorKind::NotFound
        );
        assert_eq!(
            ProviderError::from_status(ProviderId::Yahoo, 429).kind(),
            ProviderErrorKind::RateLimited
        );

        let bad_gateway = ProviderError::from_status(ProviderId::Yahoo, 502);
        assert_eq!(bad_gateway.kind(), ProviderErrorKind::ServerError);
        assert_eq!(bad_gateway.status(), Some(502));
    }

    #[test]
    fn only_configured_server_statuses_trigger_failover() {
        let statuses = [502];

        assert!(ProviderError::from_status(ProviderId::Yahoo, 502).triggers_failover(&statuses));
        assert!(!ProviderError::from_status(ProviderId::Yahoo, 503).triggers_failover(&statuses));
        assert!(!ProviderError::from_status(ProviderId::Yahoo, 429).triggers_failover(&statuses));
        assert!(!ProviderError::server_error(None, "reset").triggers_failover(&statuses));
    }

    #[test]
    fn transport_errors_map_to_timeout_or_status_less_server_error() {
        let timeout = ProviderError::from_http(ProviderId::Finnhub, &HttpError::timeout("slow"));
        assert_eq!(timeout.kind(), ProviderErrorKind::Timeout);

        let connect = ProviderError::from_http(ProviderId::Finnhub, &HttpError::connect("refused"));
        assert_eq!(connect.kind(), ProviderErrorKind::ServerError);
        assert_eq!(connect.status(), None);
    }
}
