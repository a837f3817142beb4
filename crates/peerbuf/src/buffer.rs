// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::IoSlice;
use std::mem::MaybeUninit;

use bytes::BytesMut;
use smallvec::SmallVec;
use tracing::{Level, event};

use crate::sys::{self, SocketHandle};
use crate::{BufferReader, BufferWriter, SocketError};

/// The smallest segment the buffer allocates when it needs more memory capacity.
pub const MIN_SEGMENT_SIZE: usize = 1024;

/// The most segments a single [`Buffer::to_socket()`] call hands to the operating system.
pub const MAX_WRITE_SLICES: usize = 64;

/// A growable byte queue that moves bytes between sockets and protocol codecs.
///
/// Bytes are appended at the back - either by a protocol encoder via [`BufferWriter`] or
/// straight from a socket via [`add_socket()`] - and consumed from the front - either by a
/// protocol decoder via [`BufferReader`] or straight to a socket via [`to_socket()`].
///
/// Internally the bytes are kept in a queue of segments, so appending never moves bytes that
/// are already buffered. Decoders that need to look at a whole message at once call
/// [`pullup()`], which merges the segments into one contiguous region on demand.
///
/// # Example
///
/// ```
/// use peerbuf::{Buffer, BufferReader, BufferWriter};
///
/// let mut buf = Buffer::new();
///
/// // A "have" message: length prefix, message id, piece index.
/// buf.add_uint32(5);
/// buf.add_uint8(4);
/// buf.add_uint32(1234);
///
/// assert_eq!(buf.len(), 9);
///
/// // The decoder checks that the whole message is buffered before decoding it.
/// let message_len = u32::from_be_bytes(buf.data()[..4].try_into().unwrap()) as usize;
/// assert!(buf.len() >= 4 + message_len);
///
/// buf.drain(4);
/// assert_eq!(buf.to_uint8(), 4);
/// assert_eq!(buf.to_uint32(), 1234);
/// assert!(buf.is_empty());
/// ```
///
/// # Ownership
///
/// The buffered bytes are in-flight I/O state with exactly one owner, so the type can be moved
/// but not cloned.
///
/// [`add_socket()`]: Self::add_socket
/// [`to_socket()`]: Self::to_socket
/// [`pullup()`]: Self::pullup
#[derive(Debug, Default)]
pub struct Buffer {
    // Every segment except the last one holds at least one byte.
    // Writes go into the spare capacity of the last segment.
    segments: VecDeque<BytesMut>,

    // Sum of the lengths of all segments.
    len: usize,
}

impl Buffer {
    /// Creates an empty buffer without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: VecDeque::new(),
            len: 0,
        }
    }

    /// Creates an empty buffer with room for at least `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = Self::new();
        buf.reserve(capacity);
        buf
    }

    /// Creates a buffer holding a copy of `bytes`.
    #[must_use]
    pub fn copied_from_slice(bytes: impl AsRef<[u8]>) -> Self {
        let mut buf = Self::new();
        buf.add(bytes);
        buf
    }

    /// Discards all buffered bytes.
    ///
    /// Memory capacity of the last segment is retained for reuse.
    pub fn clear(&mut self) {
        self.drain(self.len);
    }

    /// Number of segments the bytes are currently stored in.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The segments holding the buffered bytes, front to back.
    pub(crate) fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(|segment| &segment[..])
    }

    /// Makes all buffered bytes contiguous and returns them.
    ///
    /// If the bytes are spread over several segments, they are copied into a single new
    /// segment. Calling this again without modifying the buffer in between costs nothing
    /// and returns the same region.
    #[doc(alias = "linearize")]
    pub fn pullup(&mut self) -> &mut [u8] {
        if self.segments.len() > 1 {
            let tail_spare = self.tail_spare();

            let mut merged = BytesMut::with_capacity(self.len + tail_spare);
            for segment in self.segments.drain(..) {
                merged.extend_from_slice(&segment);
            }

            self.segments.push_back(merged);
        }

        match self.segments.front_mut() {
            Some(segment) => &mut segment[..],
            None => &mut [],
        }
    }

    /// Makes all buffered bytes contiguous and returns them as text.
    ///
    /// The text borrows the buffer if the bytes are valid UTF-8; invalid sequences are replaced
    /// with `U+FFFD REPLACEMENT CHARACTER` in an owned copy.
    pub fn pullup_sv(&mut self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.pullup())
    }

    /// Ensures the buffer can hold at least `total_len` bytes without allocating again,
    /// with the free space contiguous at the end.
    ///
    /// Use this when the size of a message is known before it is written.
    pub fn reserve(&mut self, total_len: usize) {
        let additional = total_len.saturating_sub(self.len);

        if additional > 0 {
            self.tail_with_capacity(additional);
        }
    }

    /// Writes up to `max_len` buffered bytes to a non-blocking socket with one system call.
    ///
    /// The bytes the socket accepted are drained from the buffer and their count is returned,
    /// which may be less than requested. Nothing is retried and the call never blocks; if the
    /// socket cannot accept anything right now, an error for which
    /// [`SocketError::is_would_block()`] is `true` is returned.
    ///
    /// Returns `Ok(0)` without touching the socket if there is nothing to write.
    ///
    /// # Errors
    ///
    /// Returns the platform socket error if the write fails. The buffer is unchanged in that case.
    pub fn to_socket(&mut self, socket: SocketHandle, max_len: usize) -> Result<usize, SocketError> {
        let max_len = max_len.min(self.len);

        if max_len == 0 {
            return Ok(0);
        }

        let result = {
            let mut slices: SmallVec<[IoSlice<'_>; MAX_WRITE_SLICES]> = SmallVec::new();
            let mut remaining = max_len;

            for segment in &self.segments {
                if remaining == 0 || slices.len() == MAX_WRITE_SLICES {
                    break;
                }

                let take = segment.len().min(remaining);
                slices.push(IoSlice::new(&segment[..take]));
                remaining -= take;
            }

            sys::send_vectored(socket, &slices)
        };

        match result {
            Ok(written) => {
                event!(Level::TRACE, message = "socket write", socket, requested = max_len, written);

                self.drain(written);
                Ok(written)
            }
            Err(error) => {
                event!(Level::DEBUG, message = "socket write failed", socket, requested = max_len, code = error.code());

                Err(error)
            }
        }
    }

    /// Reads up to `max_len` bytes from a non-blocking socket with one system call, appending
    /// them to the buffer.
    ///
    /// The bytes are read directly into the buffer's memory. Returns the number of bytes read,
    /// which may be less than requested.
    ///
    /// If the last segment still has free space (at least `min(max_len, MIN_SEGMENT_SIZE)` bytes),
    /// the read is limited to that space instead of allocating a new segment. A new segment of
    /// `max_len` bytes is only allocated once the last one is (nearly) full.
    ///
    /// Returns `Ok(0)` without touching the socket if `max_len` is zero.
    ///
    /// # Errors
    ///
    /// If the peer has closed the connection (the read returns zero bytes), returns a
    /// "not connected" error for which [`SocketError::is_disconnect()`] is `true`.
    ///
    /// If the socket has nothing to deliver right now, returns an error for which
    /// [`SocketError::is_would_block()`] is `true`.
    ///
    /// Any other failure is returned as the platform socket error.
    pub fn add_socket(&mut self, socket: SocketHandle, max_len: usize) -> Result<usize, SocketError> {
        if max_len == 0 {
            return Ok(0);
        }

        // Read into the free space of the last segment while it has a useful amount of it, so
        // that short reads against a large allowance do not each allocate a new segment.
        let tail_spare = self.tail_spare();
        let read_len = if tail_spare >= max_len.min(MIN_SEGMENT_SIZE) {
            max_len.min(tail_spare)
        } else {
            max_len
        };

        let mut space = self.reserve_space(read_len);

        match sys::recv(socket, &mut space.unfilled()[..read_len]) {
            Ok(0) => {
                event!(Level::DEBUG, message = "socket closed by peer", socket);

                Err(SocketError::not_connected())
            }
            Ok(read) => {
                debug_assert!(read <= read_len);

                // SAFETY: The operating system has initialized this many bytes for us.
                unsafe {
                    space.advance(read);
                }

                space.commit();

                event!(Level::TRACE, message = "socket read", socket, requested = max_len, read);

                Ok(read)
            }
            Err(error) => {
                event!(Level::DEBUG, message = "socket read failed", socket, requested = max_len, code = error.code());

                Err(error)
            }
        }
    }

    /// Free space at the end of the last segment.
    fn tail_spare(&self) -> usize {
        self.segments.back().map_or(0, |tail| tail.capacity() - tail.len())
    }

    /// Returns the last segment, after making sure it has at least `min_len` bytes of spare capacity.
    fn tail_with_capacity(&mut self, min_len: usize) -> &mut BytesMut {
        let fits = self
            .segments
            .back()
            .is_some_and(|tail| tail.capacity() - tail.len() >= min_len);

        if !fits {
            let tail_is_empty = self.segments.back().is_some_and(BytesMut::is_empty);

            if tail_is_empty {
                // Nothing to move, so the segment can simply grow.
                if let Some(tail) = self.segments.back_mut() {
                    tail.reserve(min_len);
                }
            } else {
                // Never move the bytes already buffered; start a new segment instead.
                self.segments
                    .push_back(BytesMut::with_capacity(min_len.max(MIN_SEGMENT_SIZE)));
            }
        }

        self.segments
            .back_mut()
            .expect("guaranteed to exist - we just ensured there is a tail segment")
    }
}

impl BufferReader for Buffer {
    fn len(&self) -> usize {
        self.len
    }

    fn chunk(&self) -> &[u8] {
        match self.segments.front() {
            Some(segment) => segment,
            None => &[],
        }
    }

    fn data(&mut self) -> &mut [u8] {
        self.pullup()
    }

    fn drain(&mut self, len: usize) {
        let mut remaining = len.min(self.len);
        self.len -= remaining;

        while remaining > 0 {
            let is_tail = self.segments.len() == 1;

            let Some(front) = self.segments.front_mut() else {
                break;
            };

            if front.len() > remaining {
                bytes::Buf::advance(front, remaining);
                break;
            }

            remaining -= front.len();

            if is_tail {
                front.clear();
            } else {
                self.segments.pop_front();
            }
        }
    }
}

impl BufferWriter for Buffer {
    fn spare_capacity(&mut self, min_len: usize) -> &mut [MaybeUninit<u8>] {
        self.tail_with_capacity(min_len).spare_capacity_mut()
    }

    unsafe fn commit_space(&mut self, len: usize) {
        let Some(tail) = self.segments.back_mut() else {
            debug_assert_eq!(len, 0);
            return;
        };

        debug_assert!(len <= tail.capacity() - tail.len());

        // SAFETY: Forwarding the guarantee from the caller that the bytes are initialized.
        unsafe {
            tail.set_len(tail.len() + len);
        }

        self.len += len;
    }
}

impl From<&[u8]> for Buffer {
    fn from(value: &[u8]) -> Self {
        Self::copied_from_slice(value)
    }
}

impl<const LEN: usize> From<&[u8; LEN]> for Buffer {
    fn from(value: &[u8; LEN]) -> Self {
        Self::copied_from_slice(value)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(value: Vec<u8>) -> Self {
        Self::copied_from_slice(value)
    }
}

impl From<&str> for Buffer {
    fn from(value: &str) -> Self {
        Self::copied_from_slice(value)
    }
}
