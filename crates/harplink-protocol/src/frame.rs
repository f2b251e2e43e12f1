//! Harp frame encoder/decoder.
//!
//! The Harp binary protocol frames every message as:
//!
//! ```text
//! <msg_type> <length> <address> <port> <payload_type> [<timestamp>] [<payload>...] <checksum>
//! ```
//!
//! - `msg_type`: 1 = Read, 2 = Write, 3 = Event; bit `0x08` marks an
//!   error reply
//! - `length`: number of bytes after the length byte, checksum included
//! - `address`: register number (0–255)
//! - `port`: `0xFF` addresses the device itself; hubs use other values
//! - `payload_type`: element width plus signed/float flags; bit `0x10`
//!   means a 6-byte timestamp precedes the payload
//! - `checksum`: sum of all preceding bytes, mod 256
//!
//! Decoding is a pure function of a byte buffer. It performs no I/O and
//! reports "not enough bytes yet" as [`DecodeResult::Incomplete`] so
//! the framed reader can keep accumulating.

use bytes::{BufMut, BytesMut};
use harplink_core::types::TIMESTAMP_FLAG;
use harplink_core::{Error, HarpTimestamp, MessageType, PayloadType, Result};

/// Port value addressing the device itself rather than a hub channel.
pub const PORT_DEVICE: u8 = 0xFF;

/// Bytes preceding the length-counted region (msg_type + length).
const FRAME_PREFIX: usize = 2;

/// Minimum value of the length byte: address, port, payload_type,
/// checksum.
const MIN_LENGTH: usize = 4;

/// Compute the Harp checksum: the sum of all bytes, mod 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// A parsed Harp frame.
///
/// This is the wire-level representation of a single message, whether a
/// command from the host or a reply/event from the device. The payload
/// is kept as raw bytes; typed interpretation happens in
/// [`Reply`](crate::reply::Reply).
#[derive(Debug, Clone, PartialEq)]
pub struct HarpFrame {
    /// Message kind (Read/Write/Event).
    pub message_type: MessageType,
    /// `true` if the device flagged this reply as an error.
    pub is_error: bool,
    /// Register address.
    pub address: u8,
    /// Port byte (`0xFF` for the device itself).
    pub port: u8,
    /// The raw payload type byte, timestamp flag included.
    pub payload_type_raw: u8,
    /// Device timestamp, present when the payload type carries the
    /// timestamp flag.
    pub timestamp: Option<HarpTimestamp>,
    /// Raw little-endian payload bytes (may be empty).
    pub payload: Vec<u8>,
}

impl HarpFrame {
    /// The typed payload element type.
    ///
    /// Fails with [`Error::UnsupportedType`] for tags the protocol does
    /// not define.
    pub fn payload_type(&self) -> Result<PayloadType> {
        let (ty, _) = PayloadType::from_wire(self.payload_type_raw)?;
        Ok(ty)
    }
}

/// Encode a [`HarpFrame`] into raw bytes ready for transmission,
/// appending the checksum.
///
/// Fails with [`Error::InvalidParameter`] if the payload is too large
/// for the one-byte length field.
pub fn encode_frame(frame: &HarpFrame) -> Result<Vec<u8>> {
    let ts_len = frame.timestamp.map_or(0, |_| HarpTimestamp::WIRE_SIZE);
    let length = MIN_LENGTH + ts_len + frame.payload.len();
    if length > u8::MAX as usize {
        return Err(Error::InvalidParameter(format!(
            "payload of {} bytes does not fit in a frame",
            frame.payload.len()
        )));
    }

    let mut type_byte = frame.message_type.to_wire();
    if frame.is_error {
        type_byte |= harplink_core::types::ERROR_FLAG;
    }
    let mut payload_type = frame.payload_type_raw;
    if frame.timestamp.is_some() {
        payload_type |= TIMESTAMP_FLAG;
    } else {
        payload_type &= !TIMESTAMP_FLAG;
    }

    let mut buf = BytesMut::with_capacity(FRAME_PREFIX + length);
    buf.put_u8(type_byte);
    buf.put_u8(length as u8);
    buf.put_u8(frame.address);
    buf.put_u8(frame.port);
    buf.put_u8(payload_type);
    if let Some(ts) = frame.timestamp {
        buf.put_slice(&ts.to_wire());
    }
    buf.put_slice(&frame.payload);
    let sum = checksum(&buf);
    buf.put_u8(sum);
    Ok(buf.to_vec())
}

/// Decode exactly one frame occupying the whole buffer, strictly.
///
/// Unlike [`decode_frame`], this skips no garbage and tolerates no
/// trailing bytes, and a bad checksum is a hard [`Error::Checksum`]
/// instead of a resync hint. Intended for replaying captured traffic
/// and for tests that construct frames by hand.
pub fn parse_exact(bytes: &[u8]) -> Result<HarpFrame> {
    if bytes.len() < FRAME_PREFIX + MIN_LENGTH {
        return Err(Error::Protocol(format!(
            "frame truncated at {} bytes",
            bytes.len()
        )));
    }
    if !plausible_start(bytes[0]) {
        return Err(Error::Protocol(format!(
            "invalid message type byte: 0x{:02X}",
            bytes[0]
        )));
    }
    let total = FRAME_PREFIX + bytes[1] as usize;
    if total != bytes.len() {
        return Err(Error::Protocol(format!(
            "length byte declares {} bytes, buffer has {}",
            total,
            bytes.len()
        )));
    }
    let expected = bytes[total - 1];
    let computed = checksum(&bytes[..total - 1]);
    if computed != expected {
        return Err(Error::Checksum { expected, computed });
    }
    match decode_frame(bytes) {
        DecodeResult::Frame(frame, _) => Ok(frame),
        _ => Err(Error::Protocol("malformed frame".into())),
    }
}

/// Result of attempting to decode a frame from a byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    /// A complete, checksum-valid frame was decoded. The `usize` is the
    /// number of bytes consumed from the input buffer, leading garbage
    /// included.
    Frame(HarpFrame, usize),

    /// The buffer does not yet contain a complete frame. More data is
    /// needed; this is not an error.
    Incomplete,

    /// The buffer head is corrupt (bad checksum, bogus length, or no
    /// plausible frame start). The `usize` is the number of bytes to
    /// discard before trying again; a corrupt frame is never delivered.
    Corrupt(usize),
}

/// `true` for bytes that can legally start a frame.
fn plausible_start(byte: u8) -> bool {
    MessageType::from_wire(byte).is_ok()
}

/// Attempt to decode one Harp frame from a byte buffer.
///
/// Scans for a plausible message-type byte, reads the declared length,
/// and verifies the checksum over everything before the checksum byte.
/// A checksum mismatch consumes a single byte so the scan can resume at
/// the next plausible start; corrupt bytes on the wire must not wedge
/// the channel.
pub fn decode_frame(buf: &[u8]) -> DecodeResult {
    // Skip inter-frame garbage up to the first plausible start byte.
    let start = match buf.iter().position(|&b| plausible_start(b)) {
        Some(pos) => pos,
        None if buf.is_empty() => return DecodeResult::Incomplete,
        // Nothing in the buffer can start a frame; drop it all.
        None => return DecodeResult::Corrupt(buf.len()),
    };

    let frame_buf = &buf[start..];
    if frame_buf.len() < FRAME_PREFIX {
        return DecodeResult::Incomplete;
    }

    let length = frame_buf[1] as usize;
    if length < MIN_LENGTH {
        // Bogus length field; this was not a real frame start.
        return DecodeResult::Corrupt(start + 1);
    }

    let total = FRAME_PREFIX + length;
    if frame_buf.len() < total {
        return DecodeResult::Incomplete;
    }

    let expected = frame_buf[total - 1];
    let computed = checksum(&frame_buf[..total - 1]);
    if computed != expected {
        // A corrupt frame is discarded, never surfaced as data. Drop a
        // single byte and rescan from the next plausible start.
        return DecodeResult::Corrupt(start + 1);
    }

    // Checksum is valid; the type byte was pre-validated by the scan.
    let (message_type, is_error) = match MessageType::from_wire(frame_buf[0]) {
        Ok(parsed) => parsed,
        Err(_) => return DecodeResult::Corrupt(start + 1),
    };

    let address = frame_buf[2];
    let port = frame_buf[3];
    let payload_type_raw = frame_buf[4];
    let body = &frame_buf[5..total - 1];

    let (timestamp, payload) = if payload_type_raw & TIMESTAMP_FLAG != 0 {
        if body.len() < HarpTimestamp::WIRE_SIZE {
            // Checksum-valid but too short to hold its declared
            // timestamp; discard the whole frame.
            return DecodeResult::Corrupt(start + total);
        }
        let mut ts_bytes = [0u8; HarpTimestamp::WIRE_SIZE];
        ts_bytes.copy_from_slice(&body[..HarpTimestamp::WIRE_SIZE]);
        (
            Some(HarpTimestamp::from_wire(&ts_bytes)),
            body[HarpTimestamp::WIRE_SIZE..].to_vec(),
        )
    } else {
        (None, body.to_vec())
    };

    let frame = HarpFrame {
        message_type,
        is_error,
        address,
        port,
        payload_type_raw,
        timestamp,
        payload,
    };

    DecodeResult::Frame(frame, start + total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_u16_frame(address: u8, value: u16) -> HarpFrame {
        HarpFrame {
            message_type: MessageType::Write,
            is_error: false,
            address,
            port: PORT_DEVICE,
            payload_type_raw: PayloadType::U16.to_wire(),
            timestamp: None,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    // ---------------------------------------------------------------
    // Checksum
    // ---------------------------------------------------------------

    #[test]
    fn checksum_sums_mod_256() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[1, 2, 3]), 6);
        assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
    }

    // ---------------------------------------------------------------
    // Encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_write_u16() {
        // Write CounterFrequencyHz (34) = 60.
        let bytes = encode_frame(&write_u16_frame(34, 60)).unwrap();
        // msg_type=2, length=6, addr=34, port=0xFF, type=0x02, 60 LE, sum
        let expected_sum = checksum(&[2, 6, 34, 0xFF, 0x02, 60, 0]);
        assert_eq!(bytes, vec![2, 6, 34, 0xFF, 0x02, 60, 0, expected_sum]);
    }

    #[test]
    fn encode_read_has_empty_payload() {
        let frame = HarpFrame {
            message_type: MessageType::Read,
            is_error: false,
            address: 32,
            port: PORT_DEVICE,
            payload_type_raw: PayloadType::U16.to_wire(),
            timestamp: None,
            payload: vec![],
        };
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 4);
    }

    #[test]
    fn encode_sets_timestamp_flag() {
        let frame = HarpFrame {
            message_type: MessageType::Event,
            is_error: false,
            address: 33,
            port: PORT_DEVICE,
            payload_type_raw: PayloadType::U32.to_wire(),
            timestamp: Some(HarpTimestamp {
                seconds: 10,
                micros: 64,
            }),
            payload: 7u32.to_le_bytes().to_vec(),
        };
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(bytes[1] as usize, 4 + 6 + 4);
        assert_ne!(bytes[4] & TIMESTAMP_FLAG, 0);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let frame = HarpFrame {
            message_type: MessageType::Write,
            is_error: false,
            address: 12,
            port: PORT_DEVICE,
            payload_type_raw: PayloadType::U8.to_wire(),
            timestamp: None,
            payload: vec![0u8; 300],
        };
        assert!(matches!(
            encode_frame(&frame),
            Err(Error::InvalidParameter(_))
        ));
    }

    // ---------------------------------------------------------------
    // Decoding -- valid frames
    // ---------------------------------------------------------------

    #[test]
    fn round_trip_write() {
        let original = write_u16_frame(34, 60);
        let encoded = encode_frame(&original).unwrap();
        match decode_frame(&encoded) {
            DecodeResult::Frame(decoded, consumed) => {
                assert_eq!(decoded, original);
                assert_eq!(consumed, encoded.len());
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_timestamped_event() {
        let original = HarpFrame {
            message_type: MessageType::Event,
            is_error: false,
            address: 33,
            port: PORT_DEVICE,
            payload_type_raw: PayloadType::U32.to_wire() | TIMESTAMP_FLAG,
            timestamp: Some(HarpTimestamp {
                seconds: 42,
                micros: 992,
            }),
            payload: 123456u32.to_le_bytes().to_vec(),
        };
        let encoded = encode_frame(&original).unwrap();
        match decode_frame(&encoded) {
            DecodeResult::Frame(decoded, consumed) => {
                assert_eq!(decoded, original);
                assert_eq!(consumed, encoded.len());
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_error_reply() {
        let mut frame = write_u16_frame(34, 60);
        frame.is_error = true;
        let encoded = encode_frame(&frame).unwrap();
        assert_eq!(encoded[0], 10); // WriteError
        match decode_frame(&encoded) {
            DecodeResult::Frame(decoded, _) => {
                assert!(decoded.is_error);
                assert_eq!(decoded.message_type, MessageType::Write);
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_garbage_before_frame() {
        let mut buf = vec![0x00, 0xF7];
        let encoded = encode_frame(&write_u16_frame(35, 1)).unwrap();
        let frame_len = encoded.len();
        buf.extend_from_slice(&encoded);
        match decode_frame(&buf) {
            DecodeResult::Frame(frame, consumed) => {
                assert_eq!(frame.address, 35);
                assert_eq!(consumed, 2 + frame_len);
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_multiple_frames_in_buffer() {
        let first = encode_frame(&write_u16_frame(34, 1)).unwrap();
        let second = encode_frame(&write_u16_frame(34, 2)).unwrap();
        let mut buf = first.clone();
        buf.extend_from_slice(&second);

        match decode_frame(&buf) {
            DecodeResult::Frame(frame, consumed) => {
                assert_eq!(frame.payload, vec![1, 0]);
                assert_eq!(consumed, first.len());
                match decode_frame(&buf[consumed..]) {
                    DecodeResult::Frame(frame2, consumed2) => {
                        assert_eq!(frame2.payload, vec![2, 0]);
                        assert_eq!(consumed2, second.len());
                    }
                    other => panic!("expected second Frame, got {other:?}"),
                }
            }
            other => panic!("expected first Frame, got {other:?}"),
        }
    }

    // ---------------------------------------------------------------
    // Strict parsing
    // ---------------------------------------------------------------

    #[test]
    fn parse_exact_round_trip() {
        let original = write_u16_frame(34, 60);
        let encoded = encode_frame(&original).unwrap();
        assert_eq!(parse_exact(&encoded).unwrap(), original);
    }

    #[test]
    fn parse_exact_reports_checksum_bytes() {
        let mut encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        let last = encoded.len() - 1;
        let good = encoded[last];
        encoded[last] = good.wrapping_add(1);
        match parse_exact(&encoded) {
            Err(Error::Checksum { expected, computed }) => {
                assert_eq!(expected, good.wrapping_add(1));
                assert_eq!(computed, good);
            }
            other => panic!("expected Checksum error, got {other:?}"),
        }
    }

    #[test]
    fn parse_exact_rejects_trailing_bytes() {
        let mut encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        encoded.push(0x00);
        assert!(matches!(parse_exact(&encoded), Err(Error::Protocol(_))));
    }

    #[test]
    fn parse_exact_rejects_truncation() {
        let encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        assert!(parse_exact(&encoded[..encoded.len() - 1]).is_err());
    }

    // ---------------------------------------------------------------
    // Decoding -- incomplete buffers
    // ---------------------------------------------------------------

    #[test]
    fn decode_incomplete_empty() {
        assert_eq!(decode_frame(&[]), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_incomplete_partial_header() {
        assert_eq!(decode_frame(&[2]), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_incomplete_partial_body() {
        let encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        for cut in 1..encoded.len() {
            assert_eq!(
                decode_frame(&encoded[..cut]),
                DecodeResult::Incomplete,
                "prefix of {cut} bytes should be Incomplete"
            );
        }
    }

    // ---------------------------------------------------------------
    // Decoding -- corruption
    // ---------------------------------------------------------------

    #[test]
    fn decode_all_garbage_is_discarded() {
        let buf = vec![0x00, 0xF0, 0xF1, 0xF2];
        assert_eq!(decode_frame(&buf), DecodeResult::Corrupt(buf.len()));
    }

    #[test]
    fn decode_bad_checksum() {
        let mut encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(matches!(decode_frame(&encoded), DecodeResult::Corrupt(_)));
    }

    #[test]
    fn single_byte_flip_never_yields_frame() {
        // Flipping any one byte of a valid frame must fail the checksum
        // (a one-byte change always changes the mod-256 sum, except for
        // the flipped checksum byte itself, which then disagrees with
        // the recomputed sum).
        let encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        for i in 0..encoded.len() {
            let mut corrupted = encoded.clone();
            corrupted[i] ^= 0x40;
            match decode_frame(&corrupted) {
                DecodeResult::Frame(frame, _) => {
                    panic!("byte {i} flip decoded as valid frame {frame:?}")
                }
                DecodeResult::Corrupt(_) | DecodeResult::Incomplete => {}
            }
        }
    }

    #[test]
    fn decode_bogus_length_resyncs() {
        // A plausible type byte followed by length < 4 is not a frame.
        let mut buf = vec![2, 1];
        let encoded = encode_frame(&write_u16_frame(34, 60)).unwrap();
        buf.extend_from_slice(&encoded);
        // First attempt drops one byte, the next finds the real frame.
        let mut offset = 0;
        loop {
            match decode_frame(&buf[offset..]) {
                DecodeResult::Frame(frame, _) => {
                    assert_eq!(frame.address, 34);
                    break;
                }
                DecodeResult::Corrupt(n) => offset += n,
                DecodeResult::Incomplete => panic!("unexpected Incomplete"),
            }
        }
    }

    #[test]
    fn corrupt_then_valid_frame_recovers() {
        let mut corrupted = encode_frame(&write_u16_frame(34, 1)).unwrap();
        corrupted[3] ^= 0x01;
        let valid = encode_frame(&write_u16_frame(34, 2)).unwrap();
        let mut buf = corrupted;
        buf.extend_from_slice(&valid);

        let mut offset = 0;
        loop {
            match decode_frame(&buf[offset..]) {
                DecodeResult::Frame(frame, _) => {
                    assert_eq!(frame.payload, vec![2, 0]);
                    break;
                }
                DecodeResult::Corrupt(n) => {
                    assert!(n > 0, "resync must always make progress");
                    offset += n;
                }
                DecodeResult::Incomplete => panic!("unexpected Incomplete"),
            }
        }
    }
}
