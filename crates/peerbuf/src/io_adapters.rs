// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, BufRead, Read, Write};

use crate::{Buffer, BufferReader, BufferWriter};

impl Buffer {
    /// Returns an adapter that implements [`Read`] and [`BufRead`] by consuming from the front of
    /// this buffer.
    ///
    /// The adapter borrows the buffer. This is distinct from [`bytes::Buf::reader()`], which
    /// takes the buffer by value.
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::BufRead;
    ///
    /// use peerbuf::Buffer;
    ///
    /// let mut buf = Buffer::from("GET /announce\r\n");
    ///
    /// let mut line = String::new();
    /// buf.io_reader().read_line(&mut line)?;
    ///
    /// assert_eq!(line, "GET /announce\r\n");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    #[doc(alias = "reader")]
    #[must_use]
    pub const fn io_reader(&mut self) -> BufferReadAdapter<'_> {
        BufferReadAdapter { inner: self }
    }

    /// Returns an adapter that implements [`Write`] by appending to the end of this buffer.
    ///
    /// The adapter borrows the buffer. This is distinct from [`bytes::BufMut::writer()`], which
    /// takes the buffer by value.
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::Write;
    ///
    /// use peerbuf::{Buffer, BufferReader};
    ///
    /// let mut buf = Buffer::new();
    /// write!(buf.io_writer(), "d8:completei{}e", 12)?;
    ///
    /// assert_eq!(buf.data(), b"d8:completei12e");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    #[doc(alias = "writer")]
    #[must_use]
    pub const fn io_writer(&mut self) -> BufferWriteAdapter<'_> {
        BufferWriteAdapter { inner: self }
    }
}

/// Adapter that implements [`Read`] and [`BufRead`] for [`Buffer`].
///
/// Create an instance via [`Buffer::io_reader()`]. Because the buffer already holds its bytes in
/// memory, this adapter implements [`BufRead`] directly. Wrapping it in a
/// [`std::io::BufReader`] only adds a copy.
///
/// Reading from an empty buffer returns `Ok(0)`, which [`Read`] consumers treat as end of data.
#[derive(Debug)]
pub struct BufferReadAdapter<'b> {
    inner: &'b mut Buffer,
}

impl Read for BufferReadAdapter<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.inner.to_buf(buf))
    }
}

impl BufRead for BufferReadAdapter<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(BufferReader::chunk(&*self.inner))
    }

    fn consume(&mut self, amount: usize) {
        BufferReader::drain(self.inner, amount);
    }
}

/// Adapter that implements [`Write`] for [`Buffer`].
///
/// Create an instance via [`Buffer::io_writer()`]. Writes always accept every byte, so
/// [`Write::write_all()`] never fails.
#[derive(Debug)]
pub struct BufferWriteAdapter<'b> {
    inner: &'b mut Buffer,
}

impl Write for BufferWriteAdapter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.add(buf);
        Ok(buf.len())
    }

    #[cfg_attr(test, mutants::skip)] // Nothing to flush.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
