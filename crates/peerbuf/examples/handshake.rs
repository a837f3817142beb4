// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Exchanging a handshake over a loopback TCP connection.
//!
//! 1. We assemble a handshake in a `SmallBuffer`, which needs no heap allocation.
//! 2. We queue it in a `Buffer` and write it to a non-blocking socket.
//! 3. The other side reads from its socket into a `Buffer` until the whole handshake has
//!    arrived, then decodes it.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use peerbuf::{Buffer, BufferReader, BufferWriter, SmallBuffer, SocketHandle};

const PROTOCOL: &[u8] = b"BitTorrent protocol";
const PROTOCOL_LEN: u8 = 19;
const HANDSHAKE_LEN: usize = 1 + 19 + 8 + 20 + 20;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).init();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let sender = TcpStream::connect(listener.local_addr()?)?;
    let (receiver, _) = listener.accept()?;

    sender.set_nonblocking(true)?;
    receiver.set_nonblocking(true)?;

    let mut outgoing = Buffer::new();
    outgoing.add(handshake(&[0xAB; 20], b"-PB0100-123456789012").data());

    while !outgoing.is_empty() {
        let len = outgoing.len();
        match outgoing.to_socket(raw(&sender), len) {
            Ok(written) => println!("Wrote {written} bytes."),
            Err(e) if e.is_would_block() => thread::sleep(Duration::from_millis(1)),
            Err(e) => return Err(e.into()),
        }
    }

    let mut incoming = Buffer::new();

    while incoming.len() < HANDSHAKE_LEN {
        match incoming.add_socket(raw(&receiver), HANDSHAKE_LEN - incoming.len()) {
            Ok(read) => println!("Read {read} bytes."),
            Err(e) if e.is_would_block() => thread::sleep(Duration::from_millis(1)),
            Err(e) => return Err(e.into()),
        }
    }

    let protocol_len = usize::from(incoming.to_uint8());
    assert!(incoming.starts_with(PROTOCOL));
    incoming.drain(protocol_len);

    let reserved = incoming.to_uint64();

    let mut info_hash = [0_u8; 20];
    incoming.to_buf(&mut info_hash);

    println!(
        "Handshake received. Reserved bits: {reserved:#018x}, peer id: {}",
        incoming.to_string_lossy()
    );

    Ok(())
}

fn handshake(info_hash: &[u8; 20], peer_id: &[u8; 20]) -> SmallBuffer<HANDSHAKE_LEN> {
    let mut buf = SmallBuffer::new();

    buf.add_uint8(PROTOCOL_LEN);
    buf.add(PROTOCOL);
    buf.add_uint64(0);
    buf.add(info_hash);
    buf.add(peer_id);

    buf
}

#[cfg(unix)]
fn raw(stream: &TcpStream) -> SocketHandle {
    use std::os::fd::AsRawFd;

    stream.as_raw_fd()
}

#[cfg(windows)]
fn raw(stream: &TcpStream) -> SocketHandle {
    use std::os::windows::io::AsRawSocket;

    stream.as_raw_socket()
}
