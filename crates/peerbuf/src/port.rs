// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

/// A network endpoint port that carries its own network byte order representation.
///
/// The port normalizes its byte order once, at construction, so that writers can append
/// it to the wire verbatim via [`BufferWriter::add_port()`][crate::BufferWriter::add_port].
///
/// # Example
///
/// ```
/// use peerbuf::Port;
///
/// let port = Port::from_host(6881);
///
/// assert_eq!(port.host(), 6881);
/// assert_eq!(port.network_bytes(), [0x1A, 0xE1]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port {
    // The port number as it is laid out on the wire.
    network: [u8; 2],
}

impl Port {
    /// Creates a port from a port number in host byte order.
    #[must_use]
    pub const fn from_host(port: u16) -> Self {
        Self {
            network: port.to_be_bytes(),
        }
    }

    /// Creates a port from the two bytes that represent it on the wire.
    #[must_use]
    pub const fn from_network_bytes(bytes: [u8; 2]) -> Self {
        Self { network: bytes }
    }

    /// The port number in host byte order.
    #[must_use]
    pub const fn host(self) -> u16 {
        u16::from_be_bytes(self.network)
    }

    /// The port number as it is laid out on the wire (network byte order).
    #[must_use]
    pub const fn network_bytes(self) -> [u8; 2] {
        self.network
    }

    /// Whether this is the unspecified port zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.host() == 0
    }
}

impl From<u16> for Port {
    fn from(value: u16) -> Self {
        Self::from_host(value)
    }
}

impl From<Port> for u16 {
    fn from(value: Port) -> Self {
        value.host()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host())
    }
}
