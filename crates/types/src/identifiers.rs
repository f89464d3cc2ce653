//! Transport-facing identifiers.

use sbor::prelude::*;
use std::fmt;

/// Opaque peer identifier assigned by the transport layer.
///
/// An empty id marks a peer the transport has not introduced yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, BasicSbor)]
#[sbor(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    /// Create a peer id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }

    /// True if the transport has not assigned an id yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        PeerId(id.to_owned())
    }
}

/// Host and port a committee member is reachable at.
///
/// Mutable transport datum: patched on handshake, never part of a
/// member's identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, BasicSbor)]
pub struct NetworkAddress {
    pub host: String,
    pub port: u16,
}

impl NetworkAddress {
    /// Create a network address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
