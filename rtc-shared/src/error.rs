use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("sliding window capacity must be at least 2, got {0}")]
    ErrWindowCapacityTooSmall(usize),
    #[error("last value weight must be a finite number greater than 0")]
    ErrInvalidLastValueWeight,
    #[error("stats polling interval must not be zero")]
    ErrZeroPollInterval,
    #[error("unknown media kind: {0}")]
    ErrUnknownMediaKind(String),
    #[error("unknown peer direction: {0}")]
    ErrUnknownPeerDirection(String),
    #[error("analyzer: closed")]
    ErrAnalyzerClosed,
}
