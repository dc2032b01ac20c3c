use std::time::Duration;

use crate::provider::ProviderKind;

/// Why a single upstream fetch failed.
///
/// Every variant is handled the same way by the aggregator (the provider is
/// disabled for its cool-down), but the cause is kept apart so it can be
/// logged and tested precisely.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream returned an empty body")]
    EmptyBody,
    #[error("malformed response body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("{0} payload lacks a required top-level field")]
    Incomplete(ProviderKind),
    #[error("location `{0}` is not supported by this provider")]
    UnsupportedLocation(String),
    #[error("no credential configured")]
    MissingCredential,
    #[error("no adapter registered for provider kind `{0}`")]
    NoAdapter(ProviderKind),
}

impl FetchError {
    /// Short tag for structured logs.
    pub fn class(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "protocol",
            FetchError::EmptyBody
            | FetchError::Parse(_)
            | FetchError::MissingField(_)
            | FetchError::Incomplete(_) => "parse",
            FetchError::UnsupportedLocation(_) | FetchError::MissingCredential => "request",
            FetchError::NoAdapter(_) => "dispatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_distinct_per_failure_family() {
        assert_eq!(FetchError::Timeout(Duration::from_secs(10)).class(), "timeout");
        assert_eq!(FetchError::Status { status: 503, body: String::new() }.class(), "protocol");
        assert_eq!(FetchError::MissingField("current").class(), "parse");
        assert_eq!(FetchError::NoAdapter(ProviderKind::Metno).class(), "dispatch");
    }

    #[test]
    fn messages_name_the_cause() {
        let err = FetchError::Status { status: 401, body: "bad key".into() };
        assert_eq!(err.to_string(), "upstream returned status 401: bad key");
        assert!(FetchError::MissingField("location").to_string().contains("`location`"));
    }
}
