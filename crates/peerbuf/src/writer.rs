// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem::MaybeUninit;
use std::ptr;

use num_traits::ToBytes;

use crate::Port;

/// The write capability of a byte buffer: append bytes to the end of the readable region.
///
/// Implementers supply two primitives - [`spare_capacity()`] and [`commit_space()`] - and get
/// all the encoding helpers on top. Multi-byte numbers are always encoded in network byte
/// order (big-endian), as mandated by the peer-wire protocol.
///
/// # Zero-copy writes
///
/// [`reserve_space()`] hands out a [`ReservedSpace`] that borrows the buffer mutably. Bytes can
/// be generated directly into the reserved memory (e.g. by a socket read) and then committed,
/// without going through an intermediate caller-owned copy.
///
/// # Example
///
/// ```
/// use peerbuf::{Buffer, BufferReader, BufferWriter, Port};
///
/// let mut buf = Buffer::new();
///
/// buf.add_uint8(0x09);
/// buf.add_port(Port::from_host(6881));
///
/// assert_eq!(buf.data(), &[0x09, 0x1A, 0xE1]);
/// ```
///
/// [`spare_capacity()`]: Self::spare_capacity
/// [`commit_space()`]: Self::commit_space
/// [`reserve_space()`]: Self::reserve_space
pub trait BufferWriter {
    /// Ensures there are at least `min_len` bytes of writable memory after the readable region
    /// and returns all of the writable memory.
    ///
    /// The returned region may be longer than requested. Calling this again without an
    /// intervening commit, with a `min_len` no greater than the length previously returned,
    /// returns the same region.
    fn spare_capacity(&mut self, min_len: usize) -> &mut [MaybeUninit<u8>];

    /// Appends `len` bytes from the start of the writable memory to the readable region.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that the first `len` bytes of the region most recently returned
    /// by [`spare_capacity()`][Self::spare_capacity] have been initialized.
    unsafe fn commit_space(&mut self, len: usize);

    /// Reserves at least `len` bytes of writable memory, returning a handle to fill it with.
    ///
    /// Nothing is appended until [`ReservedSpace::commit()`] is called.
    fn reserve_space(&mut self, len: usize) -> ReservedSpace<'_, Self> {
        ReservedSpace::new(self, len)
    }

    /// Appends a slice of bytes.
    #[doc(alias = "put_slice")]
    fn add(&mut self, bytes: impl AsRef<[u8]>)
    where
        Self: Sized,
    {
        let bytes = bytes.as_ref();

        let mut space = self.reserve_space(bytes.len());
        space.put_slice(bytes);
        space.commit();
    }

    /// Appends a single byte.
    fn push_back(&mut self, byte: u8)
    where
        Self: Sized,
    {
        self.add([byte]);
    }

    /// Appends a single byte.
    fn add_uint8(&mut self, value: u8)
    where
        Self: Sized,
    {
        self.push_back(value);
    }

    /// Appends a `u16` in network byte order.
    #[doc(alias = "add_hton16")]
    fn add_uint16(&mut self, value: u16)
    where
        Self: Sized,
    {
        self.add_num_be(value);
    }

    /// Appends a `u32` in network byte order.
    #[doc(alias = "add_hton32")]
    fn add_uint32(&mut self, value: u32)
    where
        Self: Sized,
    {
        self.add_num_be(value);
    }

    /// Appends a `u64` in network byte order.
    #[doc(alias = "add_hton64")]
    fn add_uint64(&mut self, value: u64)
    where
        Self: Sized,
    {
        self.add_num_be(value);
    }

    /// Appends a number of type `T` in network byte order (big-endian).
    fn add_num_be<T: ToBytes>(&mut self, value: T)
    where
        Self: Sized,
    {
        self.add(value.to_be_bytes());
    }

    /// Appends a port exactly as it is laid out on the wire.
    ///
    /// The port already carries its network byte order representation, so no conversion happens here.
    fn add_port(&mut self, port: Port)
    where
        Self: Sized,
    {
        self.add(port.network_bytes());
    }
}

/// Writable memory reserved at the end of a buffer, filled before being committed.
///
/// Obtained from [`BufferWriter::reserve_space()`]. The handle borrows the buffer mutably, so
/// the buffer can neither be read, moved nor reallocated while the reservation is outstanding.
///
/// The filled bytes are appended to the buffer by [`commit()`][Self::commit]. Dropping the
/// handle without committing discards the reservation and leaves the buffer unchanged, so
/// uninitialized memory is never exposed and no bytes are ever committed twice.
///
/// # Example
///
/// ```
/// use peerbuf::{BufferReader, BufferWriter, SmallBuffer};
///
/// let mut buf = SmallBuffer::<16>::new();
///
/// let mut space = buf.reserve_space(4);
/// space.put_slice(b"ping");
/// assert_eq!(space.commit(), 4);
///
/// assert_eq!(buf.data(), b"ping");
/// ```
#[derive(Debug)]
#[must_use = "reserved space is discarded unless committed"]
pub struct ReservedSpace<'a, W: BufferWriter + ?Sized> {
    writer: &'a mut W,

    // Length of the writable region handed out by the writer.
    capacity: usize,

    // Bytes at the start of the writable region that have been initialized.
    filled: usize,
}

impl<'a, W: BufferWriter + ?Sized> ReservedSpace<'a, W> {
    fn new(writer: &'a mut W, len: usize) -> Self {
        let capacity = writer.spare_capacity(len).len();
        debug_assert!(capacity >= len);

        Self {
            writer,
            capacity,
            filled: 0,
        }
    }

    /// Total length of the reserved memory, filled or not.
    ///
    /// This is at least the length that was requested.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes filled so far, which will be appended on commit.
    #[must_use]
    pub const fn filled(&self) -> usize {
        self.filled
    }

    /// Bytes of reserved memory that have not been filled yet.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.filled
    }

    /// The reserved memory that has not been filled yet.
    ///
    /// After writing into it, declare the written bytes via [`advance()`][Self::advance].
    pub fn unfilled(&mut self) -> &mut [MaybeUninit<u8>] {
        let spare = self.writer.spare_capacity(self.capacity);
        &mut spare[self.filled..self.capacity]
    }

    /// Copies `src` into the reserved memory after any bytes filled so far.
    ///
    /// # Panics
    ///
    /// Panics if `src` does not fit into the remaining reserved memory.
    pub fn put_slice(&mut self, src: &[u8]) {
        assert!(
            src.len() <= self.remaining(),
            "{} bytes do not fit into {} bytes of reserved memory",
            src.len(),
            self.remaining()
        );

        let dst = self.unfilled();

        // SAFETY: Both are byte slices, so no alignment concerns.
        // We verified that the destination is long enough above.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst.as_mut_ptr().cast::<u8>(), src.len());
        }

        self.filled += src.len();
    }

    /// Declares that `len` more bytes at the start of [`unfilled()`][Self::unfilled] have been written.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that those bytes have been initialized and that `len` is no
    /// greater than [`remaining()`][Self::remaining].
    pub unsafe fn advance(&mut self, len: usize) {
        debug_assert!(len <= self.remaining());

        self.filled += len;
    }

    /// Appends the filled bytes to the buffer, returning how many were appended.
    pub fn commit(self) -> usize {
        // SAFETY: We only count bytes as filled once they were copied in or declared initialized
        // by the caller of `advance()`, and we never hand out a region beyond the reserved one.
        unsafe {
            self.writer.commit_space(self.filled);
        }

        self.filled
    }

    /// Releases the reservation without appending anything.
    #[cfg_attr(test, mutants::skip)] // Same as dropping.
    pub fn discard(self) {}
}

/// A `Vec<u8>` can serve as a plain growable write target, e.g. for assembling a message
/// before handing it to a buffer.
impl BufferWriter for Vec<u8> {
    fn spare_capacity(&mut self, min_len: usize) -> &mut [MaybeUninit<u8>] {
        self.reserve(min_len);
        self.spare_capacity_mut()
    }

    unsafe fn commit_space(&mut self, len: usize) {
        debug_assert!(self.len() + len <= self.capacity());

        // SAFETY: Forwarding the guarantee from the caller that the bytes are initialized.
        unsafe {
            self.set_len(self.len() + len);
        }
    }
}
