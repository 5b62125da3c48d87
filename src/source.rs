#[cfg(test)]
pub mod fake;
pub mod github;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::{StatusCode, Url};

/// Where the raw feed comes from.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current feed: complete today, and tomorrow as far as it has been published.
    async fn fetch_live(&self) -> Result<String, FetchError>;

    /// The feed as it was at a revision committed since the specified moment.
    async fn fetch_historical(&self, since: DateTime<Tz>) -> Result<String, FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("price feed not found at `{url}`")]
    NotFound { url: Url },

    #[error("no commits found for {date}")]
    NoCommits { date: NaiveDate },

    #[error("`{url}` responded with {status}")]
    Status { url: Url, status: StatusCode },

    #[error("request to `{url}` timed out")]
    Timeout { url: Url },

    #[error("request to `{url}` failed")]
    Request {
        url: Url,

        #[source]
        source: reqwest::Error,
    },

    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,

        #[source]
        source: Box<Self>,
    },
}

impl FetchError {
    /// The data does not exist, as opposed to being unreachable.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::NoCommits { .. } => true,
            Self::Exhausted { source, .. } => source.is_not_found(),
            Self::Status { .. } | Self::Timeout { .. } | Self::Request { .. } => false,
        }
    }

    /// Worth another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Timeout { .. } | Self::Request { .. })
    }

    pub(crate) fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { url: url.clone() }
        } else {
            Self::Request { url: url.clone(), source: error }
        }
    }
}
