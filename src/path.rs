//! Logical addressing of attributes, events and commands:
//! (endpoint, cluster, element id) tuples, stable across read, write,
//! subscribe and invoke.

use core::fmt;
use serde::Serialize;

/// Address of one attribute instance on one cluster on one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttributePath {
    pub endpoint_id: u16,
    pub cluster_id: u32,
    pub attribute_id: u32,
}

impl AttributePath {
    pub fn new(endpoint_id: u16, cluster_id: u32, attribute_id: u32) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            attribute_id,
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/0x{:04x}/0x{:04x}",
            self.endpoint_id, self.cluster_id, self.attribute_id
        )
    }
}

/// Address of one event on one cluster on one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventPath {
    pub endpoint_id: u16,
    pub cluster_id: u32,
    pub event_id: u32,
}

impl EventPath {
    pub fn new(endpoint_id: u16, cluster_id: u32, event_id: u32) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            event_id,
        }
    }
}

impl fmt::Display for EventPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/0x{:04x}/ev:0x{:04x}",
            self.endpoint_id, self.cluster_id, self.event_id
        )
    }
}

/// Address of one command on one cluster on one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CommandPath {
    pub endpoint_id: u16,
    pub cluster_id: u32,
    pub command_id: u32,
}

impl CommandPath {
    pub fn new(endpoint_id: u16, cluster_id: u32, command_id: u32) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            command_id,
        }
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/0x{:04x}/cmd:0x{:02x}",
            self.endpoint_id, self.cluster_id, self.command_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let p = AttributePath::new(1, 0x0006, 0);
        assert_eq!(p.to_string(), "1/0x0006/0x0000");
        let c = CommandPath::new(1, 0x0006, 2);
        assert_eq!(c.to_string(), "1/0x0006/cmd:0x02");
    }
}
