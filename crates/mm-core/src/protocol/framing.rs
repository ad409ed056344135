//! Packet framer: splits a TCP byte stream into terminator-delimited packets.
//!
//! TCP delivers a stream, not messages.  One `read()` may return half a
//! message, exactly one, or several pipelined ones.  The framer buffers
//! whatever arrives and hands out complete packets (including their `0x04`
//! terminator) one at a time.
//!
//! ```text
//! read #1: "MOVE␞1␞2␞0␞␄CLI"      -> packet "MOVE␞1␞2␞0␞␄", "CLI" kept
//! read #2: "CK␞L␞D␞␞␄"           -> packet "CLICK␞L␞D␞␞␄"
//! ```
//!
//! Callers must drain every buffered packet before reading the socket again;
//! clients pipeline messages and a packet left in the buffer would otherwise
//! wait for the next unrelated read.
//!
//! The buffer is bounded: a client that streams bytes without ever sending a
//! terminator is rejected once the pending bytes exceed the configured cap.

use thiserror::Error;

use super::TERMINATOR;

/// Default cap on buffered, not-yet-terminated bytes.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 64 * 1024;

/// Errors produced while buffering inbound bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The pending partial packet grew beyond the configured limit.
    #[error("packet exceeds {limit} bytes without a terminator ({pending} bytes pending)")]
    PacketTooLarge { limit: usize, pending: usize },
}

/// Accumulates raw bytes and yields complete packets.
#[derive(Debug)]
pub struct PacketFramer {
    buffer: Vec<u8>,
    max_packet_size: usize,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE)
    }
}

impl PacketFramer {
    /// Creates an empty framer that rejects partial packets longer than
    /// `max_packet_size` bytes.
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_packet_size: max_packet_size.max(1),
        }
    }

    /// Appends freshly read bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::PacketTooLarge`] when the bytes after the last
    /// terminator exceed the limit.  The framer should be discarded together
    /// with the connection after this error.
    pub fn push(&mut self, data: &[u8]) -> Result<(), FramingError> {
        self.buffer.extend_from_slice(data);

        let pending = match self.buffer.iter().rposition(|&b| b == TERMINATOR) {
            Some(last) => self.buffer.len() - last - 1,
            None => self.buffer.len(),
        };
        if pending > self.max_packet_size {
            return Err(FramingError::PacketTooLarge {
                limit: self.max_packet_size,
                pending,
            });
        }
        Ok(())
    }

    /// Splits off the next complete packet, terminator included.
    ///
    /// Returns `None` when the buffer holds no terminator; the remaining
    /// partial packet stays buffered for the next [`push`](Self::push).
    pub fn next_packet(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|&b| b == TERMINATOR)?;
        let rest = self.buffer.split_off(end + 1);
        Some(std::mem::replace(&mut self.buffer, rest))
    }

    /// Iterates over all packets currently buffered.
    pub fn packets(&mut self) -> Packets<'_> {
        Packets { framer: self }
    }

    /// Number of bytes buffered but not yet returned as a packet.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when at least one complete packet is buffered.
    pub fn has_packet(&self) -> bool {
        self.buffer.contains(&TERMINATOR)
    }
}

/// Draining iterator returned by [`PacketFramer::packets`].
pub struct Packets<'a> {
    framer: &'a mut PacketFramer,
}

impl Iterator for Packets<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_packet()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_packet_returns_none_for_partial_data() {
        // Arrange
        let mut framer = PacketFramer::default();
        framer.push(b"MOVE\x1e1\x1e2").unwrap();

        // Act / Assert
        assert_eq!(framer.next_packet(), None);
        assert_eq!(framer.pending_len(), 8);
    }

    #[test]
    fn test_next_packet_includes_terminator() {
        let mut framer = PacketFramer::default();
        framer.push(b"ZOOM\x1e1\x1e\x04").unwrap();

        assert_eq!(framer.next_packet(), Some(b"ZOOM\x1e1\x1e\x04".to_vec()));
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_pipelined_packets_are_all_returned_without_another_push() {
        // Arrange – two complete packets and a partial third in one read
        let mut framer = PacketFramer::default();
        framer.push(b"A\x04B\x04C").unwrap();

        // Act
        let packets: Vec<_> = framer.packets().collect();

        // Assert
        assert_eq!(packets, vec![b"A\x04".to_vec(), b"B\x04".to_vec()]);
        assert!(!framer.has_packet());
        assert_eq!(framer.pending_len(), 1);
    }

    #[test]
    fn test_partial_packet_is_completed_by_later_push() {
        let mut framer = PacketFramer::default();
        framer.push(b"KEYSTR").unwrap();
        assert!(!framer.has_packet());

        framer.push(b"ING\x1eab\x1e\x04").unwrap();

        assert_eq!(framer.next_packet(), Some(b"KEYSTRING\x1eab\x1e\x04".to_vec()));
    }

    #[test]
    fn test_empty_packet_of_just_terminator_is_returned() {
        let mut framer = PacketFramer::default();
        framer.push(b"\x04").unwrap();
        assert_eq!(framer.next_packet(), Some(vec![0x04]));
    }

    #[test]
    fn test_push_rejects_oversized_partial_packet() {
        // Arrange
        let mut framer = PacketFramer::new(8);

        // Act
        let result = framer.push(b"0123456789");

        // Assert
        assert_eq!(
            result,
            Err(FramingError::PacketTooLarge { limit: 8, pending: 10 })
        );
    }

    #[test]
    fn test_push_accepts_large_read_when_tail_is_small() {
        // Complete packets do not count toward the limit, only the unterminated tail.
        let mut framer = PacketFramer::new(8);
        assert!(framer.push(b"0123456789\x04abc").is_ok());
        assert_eq!(framer.next_packet(), Some(b"0123456789\x04".to_vec()));
    }
}
