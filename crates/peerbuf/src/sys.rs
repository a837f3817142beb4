// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Platform socket primitives.
//!
//! Only the two calls the buffer needs live here: one vectored write and one read into spare
//! capacity. Neither retries, blocks on its own account or touches socket configuration.

use std::io::IoSlice;
use std::mem::MaybeUninit;

use crate::SocketError;

/// Platform handle of a socket, as obtained from `AsRawFd::as_raw_fd()` on Unix
/// or `AsRawSocket::as_raw_socket()` on Windows.
#[cfg(unix)]
pub type SocketHandle = std::os::fd::RawFd;

/// Platform handle of a socket, as obtained from `AsRawFd::as_raw_fd()` on Unix
/// or `AsRawSocket::as_raw_socket()` on Windows.
#[cfg(windows)]
pub type SocketHandle = std::os::windows::io::RawSocket;

#[cfg(unix)]
pub(crate) const NOT_CONNECTED: i32 = libc::ENOTCONN;
#[cfg(windows)]
pub(crate) const NOT_CONNECTED: i32 = windows_sys::Win32::Networking::WinSock::WSAENOTCONN;

#[cfg(all(test, unix))]
pub(crate) const WOULD_BLOCK: i32 = libc::EWOULDBLOCK;
#[cfg(all(test, windows))]
pub(crate) const WOULD_BLOCK: i32 = windows_sys::Win32::Networking::WinSock::WSAEWOULDBLOCK;

/// Writes as many bytes from `slices` as the socket accepts right now.
///
/// Returns the number of bytes written.
#[cfg(unix)]
#[cfg_attr(test, mutants::skip)] // Messing with FFI results can end in UB.
pub(crate) fn send_vectored(socket: SocketHandle, slices: &[IoSlice<'_>]) -> Result<usize, SocketError> {
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap, reason = "callers cap the slice count far below c_int::MAX")]
    let count = slices.len() as libc::c_int;

    // SAFETY: `IoSlice` is guaranteed to be ABI compatible with `iovec` on Unix and every
    // slice stays borrowed for the duration of the call.
    let result = unsafe { libc::writev(socket, slices.as_ptr().cast::<libc::iovec>(), count) };

    if result < 0 {
        return Err(SocketError::last_os_error());
    }

    #[expect(clippy::cast_sign_loss, reason = "checked for negative values above")]
    let transferred = result as usize;

    Ok(transferred)
}

/// Writes as many bytes from `slices` as the socket accepts right now.
///
/// Returns the number of bytes written.
#[cfg(windows)]
#[cfg_attr(test, mutants::skip)] // Messing with FFI results can end in UB.
pub(crate) fn send_vectored(socket: SocketHandle, slices: &[IoSlice<'_>]) -> Result<usize, SocketError> {
    use windows_sys::Win32::Networking::WinSock::send;

    let Some(first) = slices.first() else {
        return Ok(0);
    };

    let len = i32::try_from(first.len()).unwrap_or(i32::MAX);

    #[expect(clippy::cast_possible_truncation, reason = "SOCKET is pointer-sized and so is every valid RawSocket")]
    let socket = socket as usize;

    // SAFETY: The pointer and length describe a live borrowed slice for the duration of the call.
    let result = unsafe { send(socket, first.as_ptr(), len, 0) };

    if result < 0 {
        return Err(SocketError::last_os_error());
    }

    #[expect(clippy::cast_sign_loss, reason = "checked for negative values above")]
    let transferred = result as usize;

    Ok(transferred)
}

/// Reads whatever the socket has available into `dst`, up to its length.
///
/// Returns the number of bytes read, which are initialized at the start of `dst`.
/// Zero means the peer closed the connection.
#[cfg(unix)]
#[cfg_attr(test, mutants::skip)] // Messing with FFI results can end in UB.
pub(crate) fn recv(socket: SocketHandle, dst: &mut [MaybeUninit<u8>]) -> Result<usize, SocketError> {
    // SAFETY: The destination is valid for writes of `dst.len()` bytes and the kernel never
    // reads from it, so it being uninitialized is fine.
    let result = unsafe { libc::read(socket, dst.as_mut_ptr().cast(), dst.len()) };

    if result < 0 {
        return Err(SocketError::last_os_error());
    }

    #[expect(clippy::cast_sign_loss, reason = "checked for negative values above")]
    let transferred = result as usize;

    Ok(transferred)
}

/// Reads whatever the socket has available into `dst`, up to its length.
///
/// Returns the number of bytes read, which are initialized at the start of `dst`.
/// Zero means the peer closed the connection.
#[cfg(windows)]
#[cfg_attr(test, mutants::skip)] // Messing with FFI results can end in UB.
pub(crate) fn recv(socket: SocketHandle, dst: &mut [MaybeUninit<u8>]) -> Result<usize, SocketError> {
    use windows_sys::Win32::Networking::WinSock::recv;

    let len = i32::try_from(dst.len()).unwrap_or(i32::MAX);

    #[expect(clippy::cast_possible_truncation, reason = "SOCKET is pointer-sized and so is every valid RawSocket")]
    let socket = socket as usize;

    // SAFETY: The destination is valid for writes of `len` bytes and Winsock never reads
    // from it, so it being uninitialized is fine.
    let result = unsafe { recv(socket, dst.as_mut_ptr().cast(), len, 0) };

    if result < 0 {
        return Err(SocketError::last_os_error());
    }

    #[expect(clippy::cast_sign_loss, reason = "checked for negative values above")]
    let transferred = result as usize;

    Ok(transferred)
}
