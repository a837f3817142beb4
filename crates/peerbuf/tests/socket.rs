// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Moves bytes between buffers and real sockets.

#![cfg(unix)]

use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;

use peerbuf::{Buffer, BufferReader, BufferWriter};

// A generous read allowance, much larger than what the peer sends at a time.
const READ_ALLOWANCE: usize = 256 * 1024;

fn init_logging() {
    _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn nonblocking_pair() -> (UnixStream, UnixStream) {
    let (local, remote) = UnixStream::pair().unwrap();
    local.set_nonblocking(true).unwrap();
    remote.set_nonblocking(true).unwrap();
    (local, remote)
}

#[test]
fn add_socket_reads_available_bytes() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    remote.write_all(b"\x13BitTorrent protocol").unwrap();

    let mut buf = Buffer::new();
    let read = buf.add_socket(local.as_raw_fd(), 1024).unwrap();

    assert_eq!(read, 20);
    assert_eq!(buf.len(), 20);
    assert_eq!(buf.to_uint8(), 19);
    assert!(buf.starts_with(b"BitTorrent"));
}

#[test]
fn add_socket_appends_after_buffered_bytes() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    let mut buf = Buffer::from("abc");
    remote.write_all(b"def").unwrap();

    assert_eq!(buf.add_socket(local.as_raw_fd(), 16), Ok(3));
    assert_eq!(buf.data(), b"abcdef");
}

#[test]
fn add_socket_reads_at_most_max_len() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    remote.write_all(&[7; 100]).unwrap();

    let mut buf = Buffer::new();
    assert_eq!(buf.add_socket(local.as_raw_fd(), 40), Ok(40));
    assert_eq!(buf.add_socket(local.as_raw_fd(), 1000), Ok(60));
    assert_eq!(buf.len(), 100);
}

#[test]
fn short_reads_fill_the_last_segment_before_allocating() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    let mut buf = Buffer::new();

    for round in 0..100_u8 {
        remote.write_all(&[round; 100]).unwrap();
        assert_eq!(buf.add_socket(local.as_raw_fd(), READ_ALLOWANCE), Ok(100));
    }

    assert_eq!(buf.len(), 10_000);
    assert_eq!(buf.segment_count(), 1);

    let data = buf.data();
    assert_eq!(data[0], 0);
    assert_eq!(data[5_050], 50);
    assert_eq!(data[9_999], 99);
}

#[test]
fn add_socket_starts_new_segment_when_last_is_full() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    let mut buf = Buffer::from("x");
    let spare = buf.spare_capacity(0).len();
    buf.add(vec![b'x'; spare]);
    assert_eq!(buf.segment_count(), 1);

    remote.write_all(b"more").unwrap();
    assert_eq!(buf.add_socket(local.as_raw_fd(), 64), Ok(4));

    assert_eq!(buf.segment_count(), 2);
    assert!(buf.data().ends_with(b"xmore"));
}

#[test]
fn add_socket_on_empty_socket_would_block() {
    init_logging();
    let (local, _remote) = nonblocking_pair();

    let mut buf = Buffer::from("keep");
    let error = buf.add_socket(local.as_raw_fd(), 64).unwrap_err();

    assert!(error.is_would_block());
    assert!(!error.is_disconnect());
    assert_eq!(buf.data(), b"keep");
}

#[test]
fn add_socket_after_peer_closed_is_disconnect() {
    init_logging();
    let (local, remote) = nonblocking_pair();
    drop(remote);

    let mut buf = Buffer::new();
    let error = buf.add_socket(local.as_raw_fd(), 64).unwrap_err();

    assert!(error.is_disconnect());
    assert!(buf.is_empty());
}

#[test]
fn add_socket_on_invalid_handle_fails() {
    init_logging();

    let mut buf = Buffer::new();
    let error = buf.add_socket(-1, 64).unwrap_err();

    assert_eq!(error.code(), libc::EBADF);
    assert!(buf.is_empty());
}

#[test]
fn to_socket_drains_written_bytes() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    let mut buf = Buffer::new();
    buf.add_uint32(1);
    buf.add_uint8(2);

    assert_eq!(buf.to_socket(local.as_raw_fd(), usize::MAX), Ok(5));
    assert!(buf.is_empty());

    let mut received = [0_u8; 5];
    remote.read_exact(&mut received).unwrap();
    assert_eq!(received, [0, 0, 0, 1, 2]);
}

#[test]
fn to_socket_writes_at_most_max_len() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    let mut buf = Buffer::from("0123456789");

    assert_eq!(buf.to_socket(local.as_raw_fd(), 4), Ok(4));
    assert_eq!(buf.data(), b"456789");

    let mut received = [0_u8; 4];
    remote.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"0123");
}

#[test]
fn to_socket_drains_only_what_the_socket_accepts() {
    init_logging();
    let (local, _remote) = nonblocking_pair();

    // Far more than any default socket send buffer holds.
    let total = 8 * 1024 * 1024;

    let mut buf = Buffer::new();
    buf.add(vec![0xAB; total]);

    let written = buf.to_socket(local.as_raw_fd(), total).unwrap();
    assert!(written > 0);
    assert!(written < total);
    assert_eq!(buf.len(), total - written);

    // Nobody reads the other end, so the socket has no room left.
    let error = buf.to_socket(local.as_raw_fd(), total).unwrap_err();
    assert!(error.is_would_block());
    assert_eq!(buf.len(), total - written);
}

#[test]
fn to_socket_sends_all_segments_in_order() {
    init_logging();
    let (local, mut remote) = nonblocking_pair();

    let mut buf = Buffer::from("head");
    let spare = buf.spare_capacity(0).len();
    buf.add(vec![b'.'; spare]);
    buf.add(b"tail");
    assert_eq!(buf.segment_count(), 2);

    let total = buf.len();
    assert_eq!(buf.to_socket(local.as_raw_fd(), total), Ok(total));
    assert!(buf.is_empty());

    let mut received = vec![0_u8; total];
    remote.read_exact(&mut received).unwrap();
    assert!(received.starts_with(b"head"));
    assert!(received.ends_with(b"tail"));
}

#[test]
fn to_socket_after_peer_closed_keeps_bytes() {
    init_logging();
    let (local, remote) = nonblocking_pair();
    drop(remote);

    let mut buf = Buffer::from("unsent");
    let error = buf.to_socket(local.as_raw_fd(), 100).unwrap_err();

    assert_ne!(error.code(), 0);
    assert_eq!(buf.data(), b"unsent");
}

#[test]
fn round_trip_between_buffers() {
    init_logging();
    let (local, remote) = nonblocking_pair();

    let mut outgoing = Buffer::new();
    outgoing.add_uint16(0x1AE1);
    outgoing.add_uint64(u64::MAX - 1);

    let len = outgoing.len();
    assert_eq!(outgoing.to_socket(local.as_raw_fd(), len), Ok(len));

    let mut incoming = Buffer::new();
    assert_eq!(incoming.add_socket(remote.as_raw_fd(), len), Ok(len));

    assert_eq!(incoming.to_uint16(), 0x1AE1);
    assert_eq!(incoming.to_uint64(), u64::MAX - 1);
}
