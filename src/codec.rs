//! Wire format for membership packets.
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//! byte 0      : version
//! bytes 1-2   : total encoded length, header included
//! byte 3      : flags, bit 7 is the heartbeat flag, bits 0-6 are zero
//! repeated    :
//!   byte      : address length, 4 or 16
//!   byte      : status code
//!   N bytes   : address
//! ```

use crate::{
    error::{Error, Result},
    protocol::{Packet, PeerAddress, PeerStatus, VERSION},
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::convert::TryFrom;

/// Size of the fixed packet header.
pub const HEADER_LEN: usize = 4;

/// Default frame budget, the size of a receive buffer on every node.
pub const MAX_FRAME_LEN: usize = 1024;

/// Size of the largest possible entry, an IPv6 address with its two prefix bytes.
pub const MAX_ENTRY_LEN: usize = 2 + 16;

const HEARTBEAT_FLAG: u8 = 0b1000_0000;

/// Number of bytes `entries` takes on the wire, header included.
pub fn encoded_len(entries: &[(PeerAddress, PeerStatus)]) -> usize {
    HEADER_LEN + entries.iter().map(|(addr, _)| entry_len(addr)).sum::<usize>()
}

fn entry_len(addr: &PeerAddress) -> usize {
    2 + addr.wire_len()
}

/// Encode `packet`, failing with `EncodeOverflow` if it does not fit in `max_frame_len`.
pub fn encode(packet: &Packet, max_frame_len: usize) -> Result<Bytes> {
    let len = encoded_len(packet.entries());
    let limit = max_frame_len.min(u16::MAX as usize);

    if len > limit {
        return Err(Error::new_encode_overflow(len, limit));
    }

    let mut buf = BytesMut::with_capacity(len);

    // Length and flags are backpatched once the entries are written.
    buf.put_u8(packet.version());
    buf.put_u16(0);
    buf.put_u8(0);

    for (addr, status) in packet.entries() {
        buf.put_u8(addr.wire_len() as u8);
        buf.put_u8(status.code());
        buf.put_slice(addr.as_bytes());
    }

    debug_assert_eq!(buf.len(), len);

    let total = buf.len() as u16;
    buf[1..3].copy_from_slice(&total.to_be_bytes());
    buf[3] = if packet.is_heartbeat() { HEARTBEAT_FLAG } else { 0 };

    Ok(buf.freeze())
}

/// Encode a one entry notification about `addr`.
///
/// A single entry always fits in a frame, so this cannot fail.
pub fn encode_single(addr: PeerAddress, status: PeerStatus) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + entry_len(&addr));

    buf.put_u8(VERSION);
    buf.put_u16((HEADER_LEN + entry_len(&addr)) as u16);
    buf.put_u8(0);
    buf.put_u8(addr.wire_len() as u8);
    buf.put_u8(status.code());
    buf.put_slice(addr.as_bytes());

    buf.freeze()
}

/// Encode `entries` into as many frames as needed so that none exceeds `max_frame_len`.
///
/// Entries keep their order and every frame carries the same heartbeat flag. An
/// empty entry list still produces one header-only frame.
pub fn encode_split(
    entries: &[(PeerAddress, PeerStatus)],
    heartbeat: bool,
    max_frame_len: usize,
) -> Result<Vec<Bytes>> {
    let limit = max_frame_len.min(u16::MAX as usize);

    if limit < HEADER_LEN + MAX_ENTRY_LEN {
        return Err(Error::new_encode_overflow(HEADER_LEN + MAX_ENTRY_LEN, limit));
    }

    let mut frames = Vec::new();
    let mut chunk = Vec::new();
    let mut used = HEADER_LEN;

    for &(addr, status) in entries {
        let size = entry_len(&addr);

        if used + size > limit {
            let packet = Packet::new(heartbeat, std::mem::take(&mut chunk));
            frames.push(encode(&packet, limit)?);
            used = HEADER_LEN;
        }

        used += size;
        chunk.push((addr, status));
    }

    if !chunk.is_empty() || frames.is_empty() {
        frames.push(encode(&Packet::new(heartbeat, chunk), limit)?);
    }

    Ok(frames)
}

/// Decode a datagram.
///
/// Bytes past the declared length are ignored, a receive buffer is usually larger
/// than the packet it holds. Reserved flag bits are ignored as well.
pub fn decode(bytes: &[u8]) -> Result<Packet> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::new_malformed(format!(
            "{} bytes is shorter than the header",
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_LEN];
    let version = header.get_u8();
    let declared = header.get_u16() as usize;
    let flags = header.get_u8();

    if version != VERSION {
        return Err(Error::new_malformed(format!("unknown version {}", version)));
    }

    if declared < HEADER_LEN {
        return Err(Error::new_malformed(format!(
            "declared length {} is shorter than the header",
            declared
        )));
    }

    if declared > bytes.len() {
        return Err(Error::new_malformed(format!(
            "declared length {} but only {} bytes available",
            declared,
            bytes.len()
        )));
    }

    let mut body = &bytes[HEADER_LEN..declared];
    let mut entries = Vec::new();

    while body.has_remaining() {
        if body.remaining() < 2 {
            return Err(Error::new_malformed("truncated entry prefix"));
        }

        let addr_len = body.get_u8() as usize;
        let code = body.get_u8();

        if addr_len != 4 && addr_len != 16 {
            return Err(Error::new_malformed(format!(
                "invalid address length {}",
                addr_len
            )));
        }

        let status = PeerStatus::try_from(code)
            .map_err(|code| Error::new_malformed(format!("invalid status code {}", code)))?;

        if body.remaining() < addr_len {
            return Err(Error::new_malformed(format!(
                "address needs {} bytes, {} left",
                addr_len,
                body.remaining()
            )));
        }

        let addr = PeerAddress::from_bytes(&body[..addr_len])
            .ok_or_else(|| Error::new_malformed("invalid address"))?;
        body.advance(addr_len);

        entries.push((addr, status));
    }

    Ok(Packet::new(flags & HEARTBEAT_FLAG != 0, entries))
}
