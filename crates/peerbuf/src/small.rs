// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem::MaybeUninit;
use std::slice;

use smallvec::SmallVec;

use crate::{BufferReader, BufferWriter};

/// A byte buffer that stores up to `N` bytes inline, without heap allocation.
///
/// Meant for short-lived, small messages assembled or parsed in memory, such as a handshake
/// preamble. The bytes are always contiguous, so [`data()`][BufferReader::data] never copies.
/// If more than `N` bytes are written, the bytes move to the heap.
///
/// # Example
///
/// ```
/// use peerbuf::{BufferReader, BufferWriter, SmallBuffer};
///
/// let mut handshake = SmallBuffer::<68>::new();
///
/// handshake.add_uint8(19);
/// handshake.add(b"BitTorrent protocol");
/// handshake.add([0_u8; 8]);
///
/// assert_eq!(handshake.len(), 28);
/// assert!(!handshake.spilled());
/// ```
///
/// # Relocation
///
/// Writable memory is only reachable through a [`ReservedSpace`][crate::ReservedSpace], which
/// borrows the buffer mutably. While a reservation is outstanding the buffer can be neither
/// moved nor reallocated, so the memory being written into always stays where it was handed out.
///
/// # Draining
///
/// [`drain()`][BufferReader::drain] shifts the remaining bytes to the front of the storage, which
/// costs O(len). This keeps the bytes contiguous and is cheap at the sizes this type is meant for.
#[derive(Debug, Default)]
pub struct SmallBuffer<const N: usize> {
    // The vector length is the committed size: everything beyond it is uninitialized.
    bytes: SmallVec<[u8; N]>,
}

impl<const N: usize> SmallBuffer<N> {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: SmallVec::new_const() }
    }

    /// Number of bytes the buffer can hold without heap allocation.
    #[must_use]
    pub const fn inline_capacity() -> usize {
        N
    }

    /// Number of bytes the buffer can hold without allocating again.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Whether the bytes have moved to the heap because more than `N` were written.
    #[must_use]
    pub fn spilled(&self) -> bool {
        self.bytes.spilled()
    }

    /// The buffered bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl<const N: usize> BufferReader for SmallBuffer<N> {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn chunk(&self) -> &[u8] {
        &self.bytes
    }

    fn data(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn drain(&mut self, len: usize) {
        let len = len.min(self.bytes.len());
        self.bytes.drain(..len);
    }
}

impl<const N: usize> BufferWriter for SmallBuffer<N> {
    fn spare_capacity(&mut self, min_len: usize) -> &mut [MaybeUninit<u8>] {
        self.bytes.reserve(min_len);

        let len = self.bytes.len();
        let spare_len = self.bytes.capacity() - len;

        // SAFETY: Seeking to the end of the initialized bytes stays within the allocation.
        let spare_start = unsafe { self.bytes.as_mut_ptr().add(len) };

        // SAFETY: The region between length and capacity belongs to the vector and is valid for
        // writes. We hand it out as `MaybeUninit` so nobody reads it before it is initialized,
        // and the returned borrow of `self` keeps anyone else from touching the vector meanwhile.
        unsafe { slice::from_raw_parts_mut(spare_start.cast::<MaybeUninit<u8>>(), spare_len) }
    }

    unsafe fn commit_space(&mut self, len: usize) {
        let new_len = self.bytes.len() + len;
        debug_assert!(new_len <= self.bytes.capacity());

        // SAFETY: Forwarding the guarantee from the caller that the bytes are initialized.
        unsafe {
            self.bytes.set_len(new_len);
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::Port;

    assert_impl_all!(SmallBuffer<8>: Send, Sync, Default);
    assert_not_impl_any!(SmallBuffer<8>: Clone, Copy);

    #[test]
    fn push_back_then_drain() {
        let mut buf = SmallBuffer::<8>::new();

        buf.push_back(0x0A);
        buf.push_back(0x0B);
        buf.push_back(0x0C);
        buf.drain(2);

        assert_eq!(buf.len(), 1);
        assert_eq!(buf.data()[0], 0x0C);
    }

    #[test]
    fn stays_inline_up_to_capacity() {
        let mut buf = SmallBuffer::<8>::new();
        assert_eq!(SmallBuffer::<8>::inline_capacity(), 8);
        assert!(buf.capacity() >= 8);

        buf.add_uint64(u64::MAX);
        assert!(!buf.spilled());

        buf.push_back(1);
        assert!(buf.spilled());
        assert_eq!(buf.len(), 9);

        assert_eq!(buf.to_uint64(), u64::MAX);
        assert_eq!(buf.to_uint8(), 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn integers_round_trip() {
        let mut buf = SmallBuffer::<32>::new();

        buf.add_uint8(7);
        buf.add_uint16(0x1AE1);
        buf.add_uint32(0x0102_0304);
        buf.add_uint64(42);
        buf.add_port(Port::from_host(6881));

        assert_eq!(buf.len(), 17);
        assert!(!buf.spilled());

        assert_eq!(buf.to_uint8(), 7);
        assert_eq!(buf.to_uint16(), 0x1AE1);
        assert_eq!(buf.to_uint32(), 0x0102_0304);
        assert_eq!(buf.to_uint64(), 42);
        assert_eq!(buf.as_slice(), &[0x1A, 0xE1]);
        assert_eq!(Port::from_host(buf.to_uint16()), Port::from_host(6881));
    }

    #[test]
    fn drain_is_clamped() {
        let mut buf = SmallBuffer::<4>::new();
        buf.add(b"abc");

        buf.drain(10);
        assert!(buf.is_empty());

        buf.add(b"de");
        assert_eq!(buf.chunk(), b"de");
    }

    #[test]
    fn reserve_and_commit() {
        let mut buf = SmallBuffer::<16>::new();
        buf.add(b"ab");

        let mut space = buf.reserve_space(4);
        assert!(space.capacity() >= 4);

        space.put_slice(b"cd");
        let unfilled = space.unfilled();
        unfilled[0].write(b'e');

        // SAFETY: We just initialized that byte.
        unsafe {
            space.advance(1);
        }

        assert_eq!(space.commit(), 3);
        assert_eq!(buf.data(), b"abcde");
    }

    #[test]
    fn reservation_beyond_inline_capacity() {
        let mut buf = SmallBuffer::<4>::new();

        let mut space = buf.reserve_space(10);
        space.put_slice(b"0123456789");
        space.commit();

        assert!(buf.spilled());
        assert_eq!(buf.as_slice(), b"0123456789");
    }

    #[test]
    fn starts_with_and_string() {
        let mut buf = SmallBuffer::<8>::new();
        buf.add(b"peer");

        assert!(buf.starts_with(b"pe"));
        assert!(!buf.starts_with(b"peers"));
        assert_eq!(buf.to_string_lossy(), "peer");

        buf.clear();
        assert!(buf.is_empty());
    }
}
