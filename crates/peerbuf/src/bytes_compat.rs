// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compatibility with the traits of the `bytes` crate.

use std::io::IoSlice;

use bytes::buf::UninitSlice;
use bytes::{Buf, BufMut};

use crate::{Buffer, BufferReader, BufferWriter};

impl Buf for Buffer {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn remaining(&self) -> usize {
        BufferReader::len(self)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn chunk(&self) -> &[u8] {
        BufferReader::chunk(self)
    }

    fn chunks_vectored<'a>(&'a self, dst: &mut [IoSlice<'a>]) -> usize {
        let mut filled = 0;

        for (slot, segment) in dst.iter_mut().zip(self.segments().filter(|segment| !segment.is_empty())) {
            *slot = IoSlice::new(segment);
            filled += 1;
        }

        filled
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= BufferReader::len(self),
            "cannot advance by {cnt} bytes, only {} are buffered",
            BufferReader::len(self)
        );

        BufferReader::drain(self, cnt);
    }
}

// SAFETY: `chunk_mut()` only ever exposes the spare capacity of the last segment, which is never
// part of the readable bytes, and `advance_mut()` forwards the caller's guarantee that the bytes
// it commits have been initialized.
unsafe impl BufMut for Buffer {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn remaining_mut(&self) -> usize {
        usize::MAX - BufferReader::len(self)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    unsafe fn advance_mut(&mut self, cnt: usize) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe {
            self.commit_space(cnt);
        }
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        UninitSlice::uninit(self.spare_capacity(1))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buf_compat() {
        let mut buf = Buffer::from(b"0123456789");

        assert_eq!(Buf::remaining(&buf), 10);
        assert_eq!(Buf::chunk(&buf), b"0123456789");

        Buf::advance(&mut buf, 4);
        assert_eq!(Buf::chunk(&buf), b"456789");

        assert_eq!(buf.get_u16(), 0x3435);
        assert_eq!(Buf::remaining(&buf), 4);

        let mut rest = [0_u8; 4];
        buf.copy_to_slice(&mut rest);
        assert_eq!(&rest, b"6789");
        assert!(!buf.has_remaining());
    }

    #[test]
    #[should_panic]
    fn advance_past_end_panics() {
        let mut buf = Buffer::from(b"ab");
        Buf::advance(&mut buf, 3);
    }

    #[test]
    fn chunks_vectored_lists_segments() {
        let mut buf = Buffer::from(b"head");

        let spare = buf.spare_capacity(0).len();
        buf.add(vec![0xEE; spare]);
        buf.add(b"tail");
        assert_eq!(buf.segment_count(), 2);

        let mut slices = [IoSlice::new(&[]); 4];
        assert_eq!(buf.chunks_vectored(&mut slices), 2);
        assert!(slices[0].starts_with(b"head"));
        assert_eq!(&*slices[1], b"tail");

        let mut one_slice = [IoSlice::new(&[]); 1];
        assert_eq!(buf.chunks_vectored(&mut one_slice), 1);

        let mut no_slices: [IoSlice<'_>; 0] = [];
        assert_eq!(buf.chunks_vectored(&mut no_slices), 0);
    }

    #[test]
    fn buf_mut_compat() {
        let mut buf = Buffer::new();
        assert_eq!(buf.remaining_mut(), usize::MAX);

        buf.put_u32(0x0102_0304);
        buf.put_slice(b"xyz");
        buf.put_bytes(0xAB, 2);

        assert_eq!(BufferReader::len(&buf), 9);
        assert_eq!(buf.remaining_mut(), usize::MAX - 9);
        assert_ne!(buf.chunk_mut().len(), 0);

        assert_eq!(buf.data(), &[0x01, 0x02, 0x03, 0x04, b'x', b'y', b'z', 0xAB, 0xAB]);
    }

    #[test]
    fn put_large_buf_spans_segments() {
        let mut buf = Buffer::new();
        let payload = vec![0x5A_u8; 3 * 1024 + 7];

        buf.put_slice(&payload);

        assert_eq!(BufferReader::len(&buf), payload.len());
        assert_eq!(buf.data(), &payload[..]);
    }
}
