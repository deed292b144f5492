// src/ingest/error.rs
use thiserror::Error;

/// Transport-level failures of a single feed request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed xml: {0}")]
    Xml(String),

    #[error("not a feed document (root element <{0}>)")]
    UnknownRoot(String),

    #[error("no root element")]
    Empty,
}

/// Everything that can stop one source inside a cycle. Never crosses the
/// worker boundary; the worker logs it and reports zero added.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("feed parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("storage failed: {0}")]
    Storage(#[from] sqlx::Error),
}

impl SourceError {
    /// Stable label for logs and the `kind` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Fetch(FetchError::Timeout(_)) => "timeout",
            SourceError::Fetch(FetchError::Status { .. }) => "http_status",
            SourceError::Fetch(FetchError::Network(_)) => "network",
            SourceError::Parse(_) => "parse",
            SourceError::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errs = [
            SourceError::from(FetchError::Timeout("t".into())),
            SourceError::from(FetchError::Status { status: 403 }),
            SourceError::from(FetchError::Network("n".into())),
            SourceError::from(ParseError::Empty),
            SourceError::from(sqlx::Error::PoolClosed),
        ];
        let mut kinds: Vec<_> = errs.iter().map(SourceError::kind).collect();
        kinds.dedup();
        assert_eq!(kinds, vec!["timeout", "http_status", "network", "parse", "storage"]);
    }
}
