//! Crate-level error type.
//!
//! Transport failures stay opaque; everything the interaction model itself
//! can report gets its own variant so callers can match on it.

use thiserror::Error;

use crate::interaction::{AttributeWriteError, ReadFailure, Status};
use crate::path::{AttributePath, CommandPath};
use crate::subscription::SubscriptionError;
use crate::tlv::FormatError;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unexpected tlv in a payload.
    #[error("tlv format error: {0}")]
    Format(#[from] FormatError),

    /// A read came back with no successful entries at all. The per-path
    /// failures, if any, are carried along for diagnostics.
    #[error("read returned no data ({} per-path failure(s))", failures.len())]
    NoReadData { failures: Vec<ReadFailure> },

    /// The read succeeded for other paths but the requested attribute was
    /// absent from the successes.
    #[error("attribute {path} missing from read response")]
    AttributeMissing { path: AttributePath },

    /// Per-path write rejection.
    #[error("write rejected: {0}")]
    Write(AttributeWriteError),

    /// Command-level failure status on invoke.
    #[error("invoke {path} failed: {status}")]
    Invoke {
        path: CommandPath,
        status: Status,
        cluster_status: Option<u32>,
    },

    /// Failure below the interaction model: session, exchange or socket.
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

pub type Result<T> = std::result::Result<T, Error>;
