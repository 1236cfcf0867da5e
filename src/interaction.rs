//! Read/write/invoke request and response model.
//!
//! Requests carry one or more paths; responses are partitioned into per-path
//! successes and failures. Every requested path lands in exactly one of the
//! two partitions - that invariant is owed by the controller implementation
//! behind [MatterController](crate::controller::MatterController).

use core::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::clusters::helpers::serialize_bytes_as_hex;
use crate::path::{AttributePath, CommandPath, EventPath};

/// Interaction model status code carried in per-path failures and command
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Success,
    Failure,
    InvalidSubscription,
    UnsupportedAccess,
    UnsupportedEndpoint,
    InvalidAction,
    UnsupportedCommand,
    InvalidCommand,
    UnsupportedAttribute,
    ConstraintError,
    UnsupportedWrite,
    ResourceExhausted,
    NotFound,
    UnreportableAttribute,
    UnsupportedEvent,
    PathsExhausted,
    TimedRequestMismatch,
    FailsafeRequired,
    InvalidDataVersion,
    Timeout,
    Busy,
    UnsupportedCluster,
    NoUpstreamSubscription,
    NeedsTimedInteraction,
    Unknown(u8),
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Status::Success,
            0x01 => Status::Failure,
            0x7d => Status::InvalidSubscription,
            0x7e => Status::UnsupportedAccess,
            0x7f => Status::UnsupportedEndpoint,
            0x80 => Status::InvalidAction,
            0x81 => Status::UnsupportedCommand,
            0x85 => Status::InvalidCommand,
            0x86 => Status::UnsupportedAttribute,
            0x87 => Status::ConstraintError,
            0x88 => Status::UnsupportedWrite,
            0x89 => Status::ResourceExhausted,
            0x8b => Status::NotFound,
            0x8c => Status::UnreportableAttribute,
            0x8d => Status::UnsupportedEvent,
            0x8e => Status::PathsExhausted,
            0x8f => Status::TimedRequestMismatch,
            0x90 => Status::FailsafeRequired,
            0x92 => Status::InvalidDataVersion,
            0x94 => Status::Timeout,
            0x9c => Status::Busy,
            0xc3 => Status::UnsupportedCluster,
            0xc5 => Status::NoUpstreamSubscription,
            0xc6 => Status::NeedsTimedInteraction,
            other => Status::Unknown(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "SUCCESS"),
            Status::Failure => write!(f, "FAILURE"),
            Status::InvalidSubscription => write!(f, "INVALID_SUBSCRIPTION"),
            Status::UnsupportedAccess => write!(f, "UNSUPPORTED_ACCESS"),
            Status::UnsupportedEndpoint => write!(f, "UNSUPPORTED_ENDPOINT"),
            Status::InvalidAction => write!(f, "INVALID_ACTION"),
            Status::UnsupportedCommand => write!(f, "UNSUPPORTED_COMMAND"),
            Status::InvalidCommand => write!(f, "INVALID_COMMAND"),
            Status::UnsupportedAttribute => write!(f, "UNSUPPORTED_ATTRIBUTE"),
            Status::ConstraintError => write!(f, "CONSTRAINT_ERROR"),
            Status::UnsupportedWrite => write!(f, "UNSUPPORTED_WRITE"),
            Status::ResourceExhausted => write!(f, "RESOURCE_EXHAUSTED"),
            Status::NotFound => write!(f, "NOT_FOUND"),
            Status::UnreportableAttribute => write!(f, "UNREPORTABLE_ATTRIBUTE"),
            Status::UnsupportedEvent => write!(f, "UNSUPPORTED_EVENT"),
            Status::PathsExhausted => write!(f, "PATHS_EXHAUSTED"),
            Status::TimedRequestMismatch => write!(f, "TIMED_REQUEST_MISMATCH"),
            Status::FailsafeRequired => write!(f, "FAILSAFE_REQUIRED"),
            Status::InvalidDataVersion => write!(f, "INVALID_DATA_VERSION"),
            Status::Timeout => write!(f, "TIMEOUT"),
            Status::Busy => write!(f, "BUSY"),
            Status::UnsupportedCluster => write!(f, "UNSUPPORTED_CLUSTER"),
            Status::NoUpstreamSubscription => write!(f, "NO_UPSTREAM_SUBSCRIPTION"),
            Status::NeedsTimedInteraction => write!(f, "NEEDS_TIMED_INTERACTION"),
            Status::Unknown(code) => write!(f, "UNKNOWN 0x{:02x}", code),
        }
    }
}

/// Request for one or more attribute and/or event paths.
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub attribute_paths: Vec<AttributePath>,
    pub event_paths: Vec<EventPath>,
}

impl ReadRequest {
    pub fn attributes(paths: Vec<AttributePath>) -> Self {
        Self {
            attribute_paths: paths,
            event_paths: Vec::new(),
        }
    }
}

/// One successful per-path entry of a read response or subscription update.
/// The payload is raw tlv, decoded by the typed layer.
#[derive(Debug, Clone, Serialize)]
pub enum ReadData {
    Attribute {
        path: AttributePath,
        #[serde(serialize_with = "serialize_bytes_as_hex")]
        data: Vec<u8>,
    },
    Event {
        path: EventPath,
        #[serde(serialize_with = "serialize_bytes_as_hex")]
        data: Vec<u8>,
    },
}

/// One failed per-path entry of a read response.
#[derive(Debug, Clone, Serialize)]
pub enum ReadFailure {
    Attribute { path: AttributePath, status: Status },
    Event { path: EventPath, status: Status },
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFailure::Attribute { path, status } => write!(f, "{}: {}", path, status),
            ReadFailure::Event { path, status } => write!(f, "{}: {}", path, status),
        }
    }
}

/// Response to a [ReadRequest], also the per-update payload of a
/// subscription.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadResponse {
    pub successes: Vec<ReadData>,
    pub failures: Vec<ReadFailure>,
}

impl ReadResponse {
    /// Scan successes for the attribute entry with the given id.
    pub fn attribute(&self, attribute_id: u32) -> Option<&ReadData> {
        self.successes.iter().find(|entry| match entry {
            ReadData::Attribute { path, .. } => path.attribute_id == attribute_id,
            ReadData::Event { .. } => false,
        })
    }
}

/// Write of one encoded attribute value, optionally as a timed request.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub path: AttributePath,
    pub tlv_payload: Vec<u8>,
    pub timed: Option<Duration>,
}

/// Per-path write failure.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeWriteError {
    pub path: AttributePath,
    pub status: Status,
}

impl fmt::Display for AttributeWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.status)
    }
}

/// Response to a [WriteRequest]; must be checked per-path, a write carries no
/// implicit success assumption.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteResponse {
    pub failures: Vec<AttributeWriteError>,
}

impl WriteResponse {
    pub fn failure_for(&self, path: &AttributePath) -> Option<&AttributeWriteError> {
        self.failures.iter().find(|e| e.path == *path)
    }
}

/// Invocation of one command with an encoded payload, optionally timed.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub path: CommandPath,
    pub tlv_payload: Vec<u8>,
    pub timed: Option<Duration>,
}

/// Response payload of a successful invoke. Command-level status failures
/// surface as [Error::Invoke](crate::error::Error::Invoke) instead.
#[derive(Debug, Clone, Serialize)]
pub struct InvokeResponse {
    #[serde(serialize_with = "serialize_bytes_as_hex")]
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_code() {
        assert_eq!(Status::from(0x86), Status::UnsupportedAttribute);
        assert_eq!(Status::from(0x00), Status::Success);
        assert_eq!(Status::from(0x42), Status::Unknown(0x42));
        assert_eq!(Status::from(0x42).to_string(), "UNKNOWN 0x42");
    }

    #[test]
    fn test_response_attribute_lookup() {
        let response = ReadResponse {
            successes: vec![ReadData::Attribute {
                path: AttributePath::new(1, 0x0047, 1),
                data: vec![0x04, 0x2a],
            }],
            failures: vec![],
        };
        assert!(response.attribute(1).is_some());
        assert!(response.attribute(2).is_none());
    }

    #[test]
    fn test_read_data_serializes_hex() {
        let entry = ReadData::Attribute {
            path: AttributePath::new(1, 6, 0),
            data: vec![0xab, 0xcd],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["Attribute"]["data"], "abcd");
    }
}
