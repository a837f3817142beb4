// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Byte buffers for peer-wire protocols, with socket integration and network byte order codecs.
//!
//! Two capabilities describe what can be done with buffered bytes:
//!
//! * [`BufferReader`] inspects the buffered bytes and consumes them from the front. It decodes
//!   numbers from network byte order (big-endian) via [`to_uint32()`] and friends.
//! * [`BufferWriter`] appends bytes at the back. It encodes numbers in network byte order via
//!   [`add_uint32()`] and friends, and hands out [`ReservedSpace`] for zero-copy writes.
//!
//! Two buffers provide both capabilities:
//!
//! * [`Buffer`] is a growable queue of segments that talks to non-blocking sockets directly via
//!   [`Buffer::add_socket()`] and [`Buffer::to_socket()`]. Appending never moves bytes that are
//!   already buffered.
//! * [`SmallBuffer`] keeps up to `N` bytes inline and is meant for small, short-lived messages
//!   that are assembled or parsed entirely in memory.
//!
//! # Example
//!
//! ```
//! use peerbuf::{Buffer, BufferReader, BufferWriter, Port, SmallBuffer};
//!
//! // Assemble a compact peer entry: four address bytes followed by the port.
//! let mut entry = SmallBuffer::<6>::new();
//! entry.add([192, 168, 1, 20]);
//! entry.add_port(Port::from_host(6881));
//!
//! // Queue it for sending.
//! let mut outgoing = Buffer::new();
//! outgoing.add_uint32(6);
//! outgoing.add(entry.data());
//!
//! assert_eq!(outgoing.to_uint32(), 6);
//! assert!(outgoing.starts_with(&[192, 168, 1, 20, 0x1A, 0xE1]));
//! ```
//!
//! # Interoperability
//!
//! [`Buffer`] also implements [`bytes::Buf`] and [`bytes::BufMut`], and offers
//! [`std::io`] adapters via [`Buffer::io_reader()`] and [`Buffer::io_writer()`].
//!
//! # Logging
//!
//! Socket transfers emit [`tracing`] events: successful transfers at `TRACE` level and failures
//! (including the peer closing the connection) at `DEBUG` level.
//!
//! [`to_uint32()`]: BufferReader::to_uint32
//! [`add_uint32()`]: BufferWriter::add_uint32

mod buffer;
mod bytes_compat;
mod error;
mod io_adapters;
mod port;
mod reader;
mod small;
mod sys;
mod writer;

pub use buffer::{Buffer, MAX_WRITE_SLICES, MIN_SEGMENT_SIZE};
pub use error::SocketError;
pub use io_adapters::{BufferReadAdapter, BufferWriteAdapter};
pub use port::Port;
pub use reader::BufferReader;
pub use small::SmallBuffer;
pub use sys::SocketHandle;
pub use writer::{BufferWriter, ReservedSpace};
