use reqwest::StatusCode;

use crate::provider::Lookup;

/// Failure of a single external lookup. Never escapes the aggregator; it is
/// turned into that lookup's slice sentinel.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("{lookup} request failed: {source}")]
    Transport {
        lookup: Lookup,
        #[source]
        source: reqwest::Error,
    },

    #[error("{lookup} request failed with status {status}: {body}")]
    Status {
        lookup: Lookup,
        status: StatusCode,
        body: String,
    },

    #[error("{lookup} returned a malformed payload: {reason}")]
    Malformed { lookup: Lookup, reason: String },

    /// The service answered but reported failure in the payload itself.
    #[error("{lookup} service reported an error: {reason}")]
    Rejected { lookup: Lookup, reason: String },
}

impl LookupError {
    pub fn lookup(&self) -> Lookup {
        match self {
            Self::Transport { lookup, .. }
            | Self::Status { lookup, .. }
            | Self::Malformed { lookup, .. }
            | Self::Rejected { lookup, .. } => *lookup,
        }
    }

    pub(crate) fn malformed(lookup: Lookup, reason: impl Into<String>) -> Self {
        Self::Malformed {
            lookup,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Sign in required.\nHint: pass `--user <name>` or set `identity` in the config file.")]
    SignInRequired,
}
