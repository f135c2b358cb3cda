//! Error types for the pool and the trace configuration

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Pool is empty - no objects available")]
    PoolEmpty,

    #[error("Pool is at maximum capacity")]
    PoolFull,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Maximum active objects limit reached")]
    MaxActiveObjectsReached,
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Configuration errors raised once, when the tracer is set up
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("max_frames must be at least 1")]
    ZeroMaxFrames,

    #[error("namespace separator must not be empty")]
    EmptySeparator,

    #[error("internal package exclusion is on but the package prefix is empty")]
    EmptyInternalPrefix,

    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

pub type TraceResult<T> = Result<T, TraceError>;
