use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouteError>;

/// Failures of a single optimization request. None of them touch state outside the request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("no segment data for {from} -> {to}")]
    MissingSegmentData { from: String, to: String },

    #[error("segment {from} -> {to} has non-positive duration ({duration_h} h)")]
    InvalidDuration {
        from: String,
        to: String,
        duration_h: f64,
    },

    #[error("solver found no solution within {time_limit:?}")]
    SolverNoSolution { time_limit: Duration },

    #[error("{provider} unavailable: {reason}")]
    UpstreamDataUnavailable { provider: String, reason: String },

    #[error("unknown location identifier '{0}'")]
    UnknownLocation(String),

    #[error("stop '{0}' appears more than once in the request")]
    DuplicateStop(String),

    #[error("index {index} out of bounds for {len} stops")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RouteError {
    pub fn upstream(provider: impl Into<String>, reason: impl ToString) -> Self {
        RouteError::UpstreamDataUnavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }
}
