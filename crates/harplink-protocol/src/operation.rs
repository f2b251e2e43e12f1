//! Typed register operations.
//!
//! A [`RegisterOperation`] is what callers hand to the dispatcher: the
//! register address, a direction, a payload type, and (for writes) the
//! value. One constructor exists per (direction, type) pair, mirroring
//! how host scripts drive the device (`write_u16`, `read_u32`, ...).
//!
//! Encoding validates the value against the declared payload type
//! before any I/O: a mismatch fails with
//! [`Error::TypeMismatch`](harplink_core::Error::TypeMismatch) and
//! never reaches the wire.

use harplink_core::{Error, MessageType, PayloadType, RegisterValue, Result};

use crate::frame::{encode_frame, HarpFrame, PORT_DEVICE};

/// Whether an operation reads or writes the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// A register access ready to be sent to the device.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterOperation {
    /// Register address (0–255).
    pub address: u8,
    /// Read or write.
    pub direction: Direction,
    /// Declared payload type of the register.
    pub payload_type: PayloadType,
    /// The value to write. Present iff `direction` is `Write`.
    pub value: Option<RegisterValue>,
}

impl RegisterOperation {
    /// Build a read of `address` with the given declared type.
    pub fn read(address: u8, payload_type: PayloadType) -> Self {
        RegisterOperation {
            address,
            direction: Direction::Read,
            payload_type,
            value: None,
        }
    }

    /// Build a write of `value` to `address`. The payload type is taken
    /// from the value itself.
    pub fn write(address: u8, value: RegisterValue) -> Self {
        RegisterOperation {
            address,
            direction: Direction::Write,
            payload_type: value.payload_type(),
            value: Some(value),
        }
    }

    /// Read an unsigned 8-bit register.
    pub fn read_u8(address: u8) -> Self {
        Self::read(address, PayloadType::U8)
    }

    /// Read an unsigned 16-bit register.
    pub fn read_u16(address: u8) -> Self {
        Self::read(address, PayloadType::U16)
    }

    /// Read an unsigned 32-bit register.
    pub fn read_u32(address: u8) -> Self {
        Self::read(address, PayloadType::U32)
    }

    /// Read an unsigned 64-bit register.
    pub fn read_u64(address: u8) -> Self {
        Self::read(address, PayloadType::U64)
    }

    /// Write an unsigned 8-bit register.
    pub fn write_u8(address: u8, value: u8) -> Self {
        Self::write(address, RegisterValue::U8(value))
    }

    /// Write an unsigned 16-bit register.
    pub fn write_u16(address: u8, value: u16) -> Self {
        Self::write(address, RegisterValue::U16(value))
    }

    /// Write an unsigned 32-bit register.
    pub fn write_u32(address: u8, value: u32) -> Self {
        Self::write(address, RegisterValue::U32(value))
    }

    /// Write an unsigned 64-bit register.
    pub fn write_u64(address: u8, value: u64) -> Self {
        Self::write(address, RegisterValue::U64(value))
    }

    /// Write a 32-bit float register.
    pub fn write_f32(address: u8, value: f32) -> Self {
        Self::write(address, RegisterValue::F32(value))
    }

    /// The message type this operation puts on the wire.
    pub fn message_type(&self) -> MessageType {
        match self.direction {
            Direction::Read => MessageType::Read,
            Direction::Write => MessageType::Write,
        }
    }

    /// Encode this operation into its wire frame.
    ///
    /// Validates the value/type pairing first: writes must carry a
    /// value whose encoded width matches the declared payload type,
    /// reads must carry none.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = match (self.direction, self.value) {
            (Direction::Write, Some(value)) => {
                if value.payload_type() != self.payload_type {
                    return Err(Error::TypeMismatch {
                        expected: self.payload_type.name(),
                        actual: value.payload_type().name(),
                    });
                }
                let mut payload = Vec::with_capacity(self.payload_type.width());
                value.encode_into(&mut payload);
                payload
            }
            (Direction::Read, None) => Vec::new(),
            (Direction::Write, None) => {
                return Err(Error::InvalidParameter(
                    "write operation requires a value".into(),
                ));
            }
            (Direction::Read, Some(_)) => {
                return Err(Error::InvalidParameter(
                    "read operation must not carry a value".into(),
                ));
            }
        };

        encode_frame(&HarpFrame {
            message_type: self.message_type(),
            is_error: false,
            address: self.address,
            port: PORT_DEVICE,
            payload_type_raw: self.payload_type.to_wire(),
            timestamp: None,
            payload,
        })
    }
}
