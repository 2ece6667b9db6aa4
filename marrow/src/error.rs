//! Module containing the crate-wide error type
use thiserror::Error;

/// Universal error type for this crate
#[derive(Error, Debug)]
pub enum Error {
    /// The skeleton has no ball marked [`Root`](crate::skeleton::BallKind)
    #[error("skeleton has no root ball")]
    MissingRoot,

    /// A second root ball was added to the same skeleton
    #[error("skeleton already has a root ball at slot {0}")]
    MultipleRoots(usize),

    /// A bone referenced a ball slot that does not exist
    #[error("bone references unknown ball slot {0}")]
    BadBallSlot(usize),

    /// A bone connected a ball to itself
    #[error("bone connects ball slot {0} to itself")]
    SelfBone(usize),

    /// A traversal exceeded the configured depth bound
    #[error("skeleton depth exceeds the configured limit ({0})")]
    DepthExceeded(usize),

    /// Generation settings failed validation
    #[error("invalid settings: {0}")]
    BadSettings(&'static str),

    /// Storage growth failed; the current generation pass is abandoned
    #[error("out of memory: {0}")]
    ResourceExhausted(#[from] std::collections::TryReserveError),

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
