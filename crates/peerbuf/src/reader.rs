// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::slice;

use num_traits::FromBytes;

/// The read capability of a byte buffer: inspect the buffered bytes and consume them from the front.
///
/// Implementers supply four primitives - [`len()`], [`chunk()`], [`data()`] and [`drain()`] - and
/// get all the decoding helpers on top. Reading follows "copy out, then consume" semantics: every
/// decoding helper removes the bytes it decodes from the front of the buffer.
///
/// Multi-byte numbers are always decoded from network byte order (big-endian).
///
/// # Example
///
/// ```
/// use peerbuf::{Buffer, BufferReader, BufferWriter};
///
/// let mut buf = Buffer::new();
/// buf.add(b"\x13BitTorrent protocol");
/// buf.add_uint32(7);
///
/// assert!(buf.starts_with(b"\x13BitTorrent"));
/// assert_eq!(buf.to_uint8(), 19);
/// buf.drain(19);
/// assert_eq!(buf.to_uint32(), 7);
/// assert!(buf.is_empty());
/// ```
///
/// # Reading past the buffered data
///
/// The fixed-width decoders ([`to_uint32()`] and friends) require the caller to have checked
/// that enough bytes are buffered and panic otherwise. Protocol decoders that cannot make that
/// guarantee should use [`try_to_num_be()`], which leaves the buffer untouched when it is short.
///
/// [`len()`]: Self::len
/// [`chunk()`]: Self::chunk
/// [`data()`]: Self::data
/// [`drain()`]: Self::drain
/// [`to_uint32()`]: Self::to_uint32
/// [`try_to_num_be()`]: Self::try_to_num_be
pub trait BufferReader {
    /// Number of bytes available to read.
    fn len(&self) -> usize;

    /// The contiguous region at the front of the readable bytes.
    ///
    /// This may be shorter than [`len()`][Self::len] if the buffer stores its bytes in multiple
    /// segments but is never empty while the buffer is not.
    fn chunk(&self) -> &[u8];

    /// All readable bytes as one contiguous region.
    ///
    /// Implementations that store their bytes in segments linearize them first.
    fn data(&mut self) -> &mut [u8];

    /// Discards `len` bytes from the front of the buffer.
    ///
    /// Requests to drain more bytes than are available drain everything.
    fn drain(&mut self, len: usize);

    /// Whether there are no bytes available to read.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all readable bytes without consuming them.
    fn iter(&mut self) -> slice::Iter<'_, u8> {
        self.data().iter()
    }

    /// Copies all readable bytes into a `String`, without consuming them.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD REPLACEMENT CHARACTER`.
    fn to_string_lossy(&mut self) -> String {
        String::from_utf8_lossy(self.data()).into_owned()
    }

    /// Whether the readable bytes begin with `needle`.
    ///
    /// Returns `false` if fewer bytes than `needle.len()` are buffered.
    fn starts_with(&mut self, needle: &[u8]) -> bool {
        needle.len() <= self.len() && self.data().starts_with(needle)
    }

    /// Copies bytes from the front of the buffer into `dst` and consumes them.
    ///
    /// Copies `min(dst.len(), self.len())` bytes and returns that count.
    fn to_buf(&mut self, dst: &mut [u8]) -> usize {
        let len = dst.len().min(self.len());
        let mut copied = 0;

        while copied < len {
            let src = self.chunk();
            let to_copy = src.len().min(len - copied);

            // A non-empty buffer always exposes a non-empty chunk; bail instead of spinning.
            debug_assert_ne!(to_copy, 0);
            if to_copy == 0 {
                break;
            }

            dst[copied..copied + to_copy].copy_from_slice(&src[..to_copy]);
            self.drain(to_copy);
            copied += to_copy;
        }

        copied
    }

    /// Consumes a number of type `T` in network byte order (big-endian).
    ///
    /// # Panics
    ///
    /// Panics if fewer than `size_of::<T>()` bytes are buffered.
    #[must_use]
    fn to_num_be<T: FromBytes>(&mut self) -> T
    where
        T::Bytes: Sized + Default,
        Self: Sized,
    {
        let mut bytes = T::Bytes::default();
        let size = bytes.as_ref().len();

        assert!(
            self.len() >= size,
            "cannot decode a {size}-byte number from a buffer holding {} bytes",
            self.len()
        );

        self.to_buf(bytes.as_mut());
        T::from_be_bytes(&bytes)
    }

    /// Consumes a number of type `T` in network byte order (big-endian), if enough bytes are buffered.
    ///
    /// Returns `None` and leaves the buffer untouched if fewer than `size_of::<T>()` bytes are buffered.
    #[must_use]
    fn try_to_num_be<T: FromBytes>(&mut self) -> Option<T>
    where
        T::Bytes: Sized + Default,
        Self: Sized,
    {
        let mut bytes = T::Bytes::default();

        if self.len() < bytes.as_ref().len() {
            return None;
        }

        self.to_buf(bytes.as_mut());
        Some(T::from_be_bytes(&bytes))
    }

    /// Consumes one byte.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    #[must_use]
    fn to_uint8(&mut self) -> u8
    where
        Self: Sized,
    {
        self.to_num_be()
    }

    /// Consumes a `u16` in network byte order.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 2 bytes are buffered.
    #[doc(alias = "ntohs")]
    #[must_use]
    fn to_uint16(&mut self) -> u16
    where
        Self: Sized,
    {
        self.to_num_be()
    }

    /// Consumes a `u32` in network byte order.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 4 bytes are buffered.
    #[doc(alias = "ntohl")]
    #[must_use]
    fn to_uint32(&mut self) -> u32
    where
        Self: Sized,
    {
        self.to_num_be()
    }

    /// Consumes a `u64` in network byte order.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 8 bytes are buffered.
    #[doc(alias = "ntohll")]
    #[must_use]
    fn to_uint64(&mut self) -> u64
    where
        Self: Sized,
    {
        self.to_num_be()
    }
}
