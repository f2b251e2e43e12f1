//! Wire-level enums and the typed register value model.
//!
//! The Harp binary protocol tags every frame with a message type byte
//! and a payload type byte. The payload type byte packs the element
//! width (1/2/4/8 in the low nibble) with flag bits for signedness
//! (0x80), floating point (0x40), and timestamp presence (0x10).
//! Multi-byte values are little-endian throughout; there is no per-call
//! byte-order configurability.

use crate::error::{Error, Result};

/// Timestamp-present flag in the payload type byte.
pub const TIMESTAMP_FLAG: u8 = 0x10;

/// Signed-integer flag in the payload type byte.
pub const SIGNED_FLAG: u8 = 0x80;

/// Floating-point flag in the payload type byte.
pub const FLOAT_FLAG: u8 = 0x40;

/// Error flag in the message type byte (9 = ReadError, 10 = WriteError).
pub const ERROR_FLAG: u8 = 0x08;

/// The kind of a Harp message.
///
/// Commands from the host are `Read` or `Write`; the device answers with
/// the same type (error bit set on failure) and spontaneously emits
/// `Event` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Read a register (command) or carry its current value (reply).
    Read,
    /// Write a register (command) or echo the written value (reply).
    Write,
    /// An unsolicited message pushed by the device.
    Event,
}

impl MessageType {
    /// The wire byte for this message type, without the error bit.
    pub fn to_wire(self) -> u8 {
        match self {
            MessageType::Read => 1,
            MessageType::Write => 2,
            MessageType::Event => 3,
        }
    }

    /// Parse a message type byte into `(type, is_error)`.
    ///
    /// Fails with [`Error::Protocol`] for bytes outside the defined set.
    /// Event frames never carry the error bit.
    pub fn from_wire(byte: u8) -> Result<(MessageType, bool)> {
        let is_error = byte & ERROR_FLAG != 0;
        let ty = match byte & !ERROR_FLAG {
            1 => MessageType::Read,
            2 => MessageType::Write,
            3 if !is_error => MessageType::Event,
            _ => {
                return Err(Error::Protocol(format!(
                    "invalid message type byte: 0x{byte:02X}"
                )));
            }
        };
        Ok((ty, is_error))
    }
}

/// The element type of a register payload.
///
/// Array registers carry several elements of the same type; the element
/// count is implied by the payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PayloadType {
    /// Width of one element in bytes.
    pub fn width(self) -> usize {
        match self {
            PayloadType::U8 | PayloadType::I8 => 1,
            PayloadType::U16 | PayloadType::I16 => 2,
            PayloadType::U32 | PayloadType::I32 | PayloadType::F32 => 4,
            PayloadType::U64 | PayloadType::I64 | PayloadType::F64 => 8,
        }
    }

    /// The wire tag for this type, without the timestamp flag.
    pub fn to_wire(self) -> u8 {
        let width = self.width() as u8;
        match self {
            PayloadType::U8 | PayloadType::U16 | PayloadType::U32 | PayloadType::U64 => width,
            PayloadType::I8 | PayloadType::I16 | PayloadType::I32 | PayloadType::I64 => {
                SIGNED_FLAG | width
            }
            PayloadType::F32 | PayloadType::F64 => FLOAT_FLAG | width,
        }
    }

    /// Parse a payload type byte into `(type, timestamped)`.
    ///
    /// Fails fast with [`Error::UnsupportedType`] on tags the protocol
    /// does not define; unknown widths are never silently truncated.
    pub fn from_wire(byte: u8) -> Result<(PayloadType, bool)> {
        let timestamped = byte & TIMESTAMP_FLAG != 0;
        let base = byte & !TIMESTAMP_FLAG;
        let ty = match base {
            0x01 => PayloadType::U8,
            0x02 => PayloadType::U16,
            0x04 => PayloadType::U32,
            0x08 => PayloadType::U64,
            0x81 => PayloadType::I8,
            0x82 => PayloadType::I16,
            0x84 => PayloadType::I32,
            0x88 => PayloadType::I64,
            0x44 => PayloadType::F32,
            0x48 => PayloadType::F64,
            _ => return Err(Error::UnsupportedType(byte)),
        };
        Ok((ty, timestamped))
    }

    /// Short name used in error messages ("U16", "F32", ...).
    pub fn name(self) -> &'static str {
        match self {
            PayloadType::U8 => "U8",
            PayloadType::U16 => "U16",
            PayloadType::U32 => "U32",
            PayloadType::U64 => "U64",
            PayloadType::I8 => "I8",
            PayloadType::I16 => "I16",
            PayloadType::I32 => "I32",
            PayloadType::I64 => "I64",
            PayloadType::F32 => "F32",
            PayloadType::F64 => "F64",
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A device timestamp attached to a reply or event.
///
/// On the wire this is six bytes: a `u32` of whole seconds since the
/// device's epoch followed by a `u16` fractional count in 32 µs units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarpTimestamp {
    /// Whole seconds since the device clock epoch.
    pub seconds: u32,
    /// Microseconds within the current second (resolution 32 µs).
    pub micros: u32,
}

impl HarpTimestamp {
    /// Number of bytes a timestamp occupies on the wire.
    pub const WIRE_SIZE: usize = 6;

    /// Microseconds represented by one fractional count.
    const TICK_US: u32 = 32;

    /// Decode a timestamp from exactly six little-endian bytes.
    pub fn from_wire(bytes: &[u8; Self::WIRE_SIZE]) -> HarpTimestamp {
        let seconds = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let ticks = u16::from_le_bytes([bytes[4], bytes[5]]);
        HarpTimestamp {
            seconds,
            micros: ticks as u32 * Self::TICK_US,
        }
    }

    /// Encode this timestamp into its six-byte wire form.
    pub fn to_wire(self) -> [u8; Self::WIRE_SIZE] {
        let s = self.seconds.to_le_bytes();
        let ticks = ((self.micros / Self::TICK_US) as u16).to_le_bytes();
        [s[0], s[1], s[2], s[3], ticks[0], ticks[1]]
    }

    /// The timestamp as fractional seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.seconds as f64 + self.micros as f64 / 1_000_000.0
    }
}

/// One typed register value.
///
/// Values are immutable once constructed and freely passed between
/// tasks. The encode/decode pair per width round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl RegisterValue {
    /// The payload type this value encodes as.
    pub fn payload_type(self) -> PayloadType {
        match self {
            RegisterValue::U8(_) => PayloadType::U8,
            RegisterValue::U16(_) => PayloadType::U16,
            RegisterValue::U32(_) => PayloadType::U32,
            RegisterValue::U64(_) => PayloadType::U64,
            RegisterValue::I8(_) => PayloadType::I8,
            RegisterValue::I16(_) => PayloadType::I16,
            RegisterValue::I32(_) => PayloadType::I32,
            RegisterValue::I64(_) => PayloadType::I64,
            RegisterValue::F32(_) => PayloadType::F32,
            RegisterValue::F64(_) => PayloadType::F64,
        }
    }

    /// Append this value's little-endian bytes to `out`.
    pub fn encode_into(self, out: &mut Vec<u8>) {
        match self {
            RegisterValue::U8(v) => out.push(v),
            RegisterValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::I8(v) => out.push(v as u8),
            RegisterValue::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Decode one value of `ty` from exactly `ty.width()` bytes.
    ///
    /// Fails with [`Error::Protocol`] if the slice width is wrong.
    pub fn decode(bytes: &[u8], ty: PayloadType) -> Result<RegisterValue> {
        if bytes.len() != ty.width() {
            return Err(Error::Protocol(format!(
                "payload width {} does not match {} (expected {})",
                bytes.len(),
                ty,
                ty.width()
            )));
        }
        let v = match ty {
            PayloadType::U8 => RegisterValue::U8(bytes[0]),
            PayloadType::U16 => RegisterValue::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            PayloadType::U32 => RegisterValue::U32(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])),
            PayloadType::U64 => RegisterValue::U64(u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            PayloadType::I8 => RegisterValue::I8(bytes[0] as i8),
            PayloadType::I16 => RegisterValue::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
            PayloadType::I32 => RegisterValue::I32(i32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])),
            PayloadType::I64 => RegisterValue::I64(i64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            PayloadType::F32 => RegisterValue::F32(f32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])),
            PayloadType::F64 => RegisterValue::F64(f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
        };
        Ok(v)
    }

    /// Decode a whole payload as an array of `ty` elements.
    ///
    /// The payload length must be an exact multiple of the element
    /// width. Scalar registers simply decode to a one-element vector.
    pub fn decode_array(bytes: &[u8], ty: PayloadType) -> Result<Vec<RegisterValue>> {
        let width = ty.width();
        if bytes.len() % width != 0 {
            return Err(Error::Protocol(format!(
                "payload length {} is not a multiple of {} element width {}",
                bytes.len(),
                ty,
                width
            )));
        }
        bytes
            .chunks_exact(width)
            .map(|chunk| RegisterValue::decode(chunk, ty))
            .collect()
    }

    /// The value as `u64`, if it is an unsigned integer variant.
    pub fn as_unsigned(self) -> Option<u64> {
        match self {
            RegisterValue::U8(v) => Some(v as u64),
            RegisterValue::U16(v) => Some(v as u64),
            RegisterValue::U32(v) => Some(v as u64),
            RegisterValue::U64(v) => Some(v),
            _ => None,
        }
    }
}
