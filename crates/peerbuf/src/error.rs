// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, ErrorKind};

use thiserror::Error;

use crate::sys;

/// A failure reported by a socket operation on a [`Buffer`][crate::Buffer].
///
/// Carries the raw platform error code (`errno` on Unix, the Winsock error code on Windows)
/// together with the message the operating system associates with it.
///
/// A read that returns zero bytes is reported as a "not connected" error even though no
/// operating system error was raised, because it means the peer has closed the connection.
/// Use [`is_disconnect()`][Self::is_disconnect] to detect this case and
/// [`is_would_block()`][Self::is_would_block] to detect a socket that simply has nothing to
/// deliver (or no room to accept data) right now.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("socket error {code}: {message}")]
pub struct SocketError {
    code: i32,
    message: String,
}

impl SocketError {
    /// Creates an error from a raw platform error code, looking up the system message for it.
    #[must_use]
    pub fn from_raw_os_error(code: i32) -> Self {
        Self {
            code,
            message: io::Error::from_raw_os_error(code).to_string(),
        }
    }

    /// Captures the most recent socket error raised on the calling thread.
    #[must_use]
    pub fn last_os_error() -> Self {
        io::Error::last_os_error().into()
    }

    /// The error signaled when a socket read returns zero bytes (end of stream).
    #[must_use]
    pub fn not_connected() -> Self {
        Self::from_raw_os_error(sys::NOT_CONNECTED)
    }

    /// The raw platform error code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// The human-readable message associated with the error code.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The platform-neutral category of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        io::Error::from_raw_os_error(self.code).kind()
    }

    /// Whether the socket could not make progress without blocking.
    ///
    /// This is the normal steady state of a non-blocking socket and the operation should be
    /// retried once the socket is reported ready again.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        self.kind() == ErrorKind::WouldBlock
    }

    /// Whether the peer has closed the connection.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        self.code == sys::NOT_CONNECTED
    }
}

impl From<io::Error> for SocketError {
    fn from(value: io::Error) -> Self {
        match value.raw_os_error() {
            Some(code) => Self::from_raw_os_error(code),
            // Errors that did not come from the operating system have no code to carry.
            None => Self {
                code: 0,
                message: value.to_string(),
            },
        }
    }
}

/// Represents the socket error as a standard I/O error, for interoperating with libraries that
/// expect standard I/O errors.
impl From<SocketError> for io::Error {
    fn from(value: SocketError) -> Self {
        if value.code == 0 {
            Self::other(value)
        } else {
            Self::from_raw_os_error(value.code)
        }
    }
}
