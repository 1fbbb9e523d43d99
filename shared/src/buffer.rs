//! The wire codec: big-endian primitives, length-prefixed strings/lists, and
//! key-ascending maps, plus the two transport-specific byte sources.
//!
//! Grounded in `original_source/common/buffer.{h,cpp}`: `Buffer` holds the
//! shared get/insert primitives, `BufferUDP` reads/writes one whole datagram
//! at a time, `BufferTCP` refills from the socket on demand and has no outer
//! length prefix.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::net::UdpSocket;

/// UDP datagrams are capped at this size (the historical practical maximum
/// for UDP payload over IPv4/IPv6 without jumbograms).
pub const UDP_BUFFER_SIZE: usize = 65507;

/// Growth increment used when a `TcpReader` needs more bytes than it has
/// buffered. Matches the original implementation's fixed `TCP_BUFFER_SIZE`.
pub const TCP_BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
pub enum CodecError {
    /// Not enough bytes remain in a non-refillable source (UDP datagram).
    Truncated,
    /// A length-prefixed field claimed more bytes than the format allows.
    Oversized,
    /// An unrecognized tag byte for some message kind.
    InvalidTag(u8),
    /// A direction byte outside `0..=3`.
    InvalidDirection(u8),
    /// The TCP peer closed the connection cleanly while we expected more
    /// bytes.
    PeerClosed,
    Io(io::Error),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "truncated message"),
            CodecError::Oversized => write!(f, "oversized field"),
            CodecError::InvalidTag(t) => write!(f, "invalid tag byte {t}"),
            CodecError::InvalidDirection(d) => write!(f, "invalid direction byte {d}"),
            CodecError::PeerClosed => write!(f, "Connection closed cleanly by peer"),
            CodecError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        CodecError::Io(e)
    }
}

/// Source of decodable bytes. One implementation per transport: a UDP
/// datagram is a fixed slice with no refill, a TCP stream refills on demand.
pub trait ByteReader {
    fn read_u8(&mut self) -> Result<u8, CodecError>;
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, CodecError>;

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_list<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> Result<T, CodecError>,
    ) -> Result<Vec<T>, CodecError>
    where
        Self: Sized,
    {
        let len = self.read_u32()? as usize;
        // Guard against a hostile/garbled length prefix allocating huge
        // capacity before validating any element.
        let mut items = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            items.push(element(self)?);
        }
        Ok(items)
    }

    fn read_map<K: Ord, V>(
        &mut self,
        mut pair: impl FnMut(&mut Self) -> Result<(K, V), CodecError>,
    ) -> Result<BTreeMap<K, V>, CodecError>
    where
        Self: Sized,
    {
        let len = self.read_u32()? as usize;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let (k, v) = pair(self)?;
            map.insert(k, v);
        }
        Ok(map)
    }
}

/// Sink for encodable bytes. Writing never fails (growable `Vec<u8>`
/// backing); the caller flushes the finished buffer to a socket afterwards.
pub trait ByteWriter {
    fn write_u8(&mut self, v: u8);
    fn write_bytes(&mut self, bytes: &[u8]);

    fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Writes a `u8`-length-prefixed string. Names/addresses longer than 255
    /// bytes are truncated at the wire boundary, matching the original
    /// implementation's implicit narrowing cast.
    fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        let len = bytes.len().min(u8::MAX as usize);
        self.write_u8(len as u8);
        self.write_bytes(&bytes[..len]);
    }

    fn write_list<T>(&mut self, items: &[T], mut element: impl FnMut(&mut Self, &T))
    where
        Self: Sized,
    {
        self.write_u32(items.len() as u32);
        for item in items {
            element(self, item);
        }
    }

    fn write_map<K, V>(&mut self, map: &BTreeMap<K, V>, mut pair: impl FnMut(&mut Self, &K, &V))
    where
        Self: Sized,
    {
        self.write_u32(map.len() as u32);
        for (k, v) in map {
            pair(self, k, v);
        }
    }
}

/// In-memory write buffer. One instance per outgoing message.
#[derive(Debug, Default)]
pub struct VecWriter {
    buf: Vec<u8>,
}

impl VecWriter {
    pub fn new() -> Self {
        VecWriter { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl ByteWriter for VecWriter {
    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Reads from a single, already-received datagram. No refill: running out
/// of bytes is always `Truncated`.
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceReader { data, pos: 0 }
    }

    /// True if every byte of the datagram was consumed. Section 6 requires
    /// rejecting UDP datagrams with extraneous trailing bytes.
    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

impl<'a> ByteReader for SliceReader<'a> {
    fn read_u8(&mut self) -> Result<u8, CodecError> {
        let b = *self.data.get(self.pos).ok_or(CodecError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::Truncated)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        Ok(slice.to_vec())
    }
}

/// Receives and sends whole UDP datagrams.
pub struct BufferUdp<'a> {
    socket: &'a UdpSocket,
}

impl<'a> BufferUdp<'a> {
    pub fn new(socket: &'a UdpSocket) -> Self {
        BufferUdp { socket }
    }

    /// Blocks for the next datagram and returns its bytes, truncated/padded
    /// to exactly what was received.
    pub fn receive_datagram(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; UDP_BUFFER_SIZE];
        let (n, _addr) = self.socket.recv_from(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    pub fn send_datagram(&self, bytes: &[u8], addr: std::net::SocketAddr) -> io::Result<()> {
        self.socket.send_to(bytes, addr)?;
        Ok(())
    }
}

/// Reads length-implicit messages off a TCP stream, refilling its internal
/// buffer from the socket whenever a decode runs out of bytes. Persistent
/// across multiple `read_message` calls so a message that arrived ahead of
/// schedule stays buffered for the next call.
pub struct TcpReader<S: Read> {
    socket: S,
    buf: Vec<u8>,
    pos: usize,
}

impl<S: Read> TcpReader<S> {
    pub fn new(socket: S) -> Self {
        TcpReader {
            socket,
            buf: Vec::new(),
            pos: 0,
        }
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }

    fn fill_at_least(&mut self, n: usize) -> Result<(), CodecError> {
        while self.buf.len() - self.pos < n {
            self.compact();
            let start = self.buf.len();
            self.buf.resize(start + TCP_BUFFER_SIZE, 0);
            let read = self.socket.read(&mut self.buf[start..])?;
            self.buf.truncate(start + read);
            if read == 0 {
                return Err(CodecError::PeerClosed);
            }
        }
        Ok(())
    }
}

impl<S: Read> ByteReader for TcpReader<S> {
    fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.fill_at_least(1)?;
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        self.fill_at_least(n)?;
        let bytes = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(bytes)
    }
}

/// Writes whole messages to a TCP stream. Every call to `send` flushes the
/// built bytes immediately — there is no partial delivery across calls.
pub struct TcpWriter<S: Write> {
    socket: S,
}

impl<S: Write> TcpWriter<S> {
    pub fn new(socket: S) -> Self {
        TcpWriter { socket }
    }

    pub fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.socket.write_all(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_round_trip() {
        let mut w = VecWriter::new();
        w.write_u16(0x1234);
        w.write_u32(0xdead_beef);
        w.write_u64(0x0102_0304_0506_0708);
        let bytes = w.into_bytes();
        let mut r = SliceReader::new(&bytes);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(r.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert!(r.at_end());
    }

    #[test]
    fn string_round_trip() {
        let mut w = VecWriter::new();
        w.write_string("robot-7");
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 7);
        let mut r = SliceReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "robot-7");
    }

    #[test]
    fn truncated_read_fails() {
        let bytes = [0x00u8];
        let mut r = SliceReader::new(&bytes);
        assert!(matches!(r.read_u16(), Err(CodecError::Truncated)));
    }

    #[test]
    fn trailing_garbage_is_detectable_for_udp() {
        let mut w = VecWriter::new();
        w.write_u8(1);
        let mut bytes = w.into_bytes();
        bytes.push(0xff);
        let mut r = SliceReader::new(&bytes);
        let _ = r.read_u8().unwrap();
        assert!(!r.at_end());
    }

    #[test]
    fn list_and_map_round_trip() {
        let mut w = VecWriter::new();
        w.write_list(&[1u16, 2, 3], |w, v| w.write_u16(*v));
        let mut map = BTreeMap::new();
        map.insert(2u8, "b".to_string());
        map.insert(1u8, "a".to_string());
        w.write_map(&map, |w, k, v| {
            w.write_u8(*k);
            w.write_string(v);
        });
        let bytes = w.into_bytes();
        let mut r = SliceReader::new(&bytes);
        let list = r.read_list(|r| r.read_u16()).unwrap();
        assert_eq!(list, vec![1, 2, 3]);
        let decoded: BTreeMap<u8, String> = r.read_map(|r| Ok((r.read_u8()?, r.read_string()?))).unwrap();
        assert_eq!(decoded.get(&1).unwrap(), "a");
        assert_eq!(decoded.get(&2).unwrap(), "b");
    }

    #[test]
    fn tcp_reader_refills_across_short_reads() {
        struct Chunked {
            chunks: Vec<Vec<u8>>,
        }
        impl Read for Chunked {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.chunks.is_empty() {
                    return Ok(0);
                }
                let chunk = self.chunks.remove(0);
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
        }
        let source = Chunked {
            chunks: vec![vec![0x00], vec![0x2a]],
        };
        let mut r = TcpReader::new(source);
        assert_eq!(r.read_u16().unwrap(), 0x002a);
    }

    #[test]
    fn tcp_reader_reports_peer_closed() {
        struct Empty;
        impl Read for Empty {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Ok(0)
            }
        }
        let mut r = TcpReader::new(Empty);
        assert!(matches!(r.read_u8(), Err(CodecError::PeerClosed)));
    }
}
