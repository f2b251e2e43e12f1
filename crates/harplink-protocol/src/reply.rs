//! Typed replies and events.
//!
//! A [`Reply`] is the decoded form of a validated frame coming back
//! from the device. Whether it is the answer to a pending command or an
//! unsolicited [`Event`] is decided by the dispatcher's correlation
//! logic ([`Reply::matches`]); the shape is the same either way.
//!
//! Replies are immutable once constructed and owned exclusively by
//! whichever path produced them: the request/reply exchange or the
//! event queue.

use harplink_core::{HarpTimestamp, MessageType, PayloadType, RegisterValue, Result};

use crate::frame::HarpFrame;
use crate::operation::{Direction, RegisterOperation};

/// A decoded frame from the device, with the payload interpreted
/// according to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Register address the message concerns.
    pub address: u8,
    /// Read reply, write echo, or spontaneous event.
    pub message_type: MessageType,
    /// Element type of the payload.
    pub payload_type: PayloadType,
    /// Device timestamp, when the frame carried one.
    pub timestamp: Option<HarpTimestamp>,
    /// Decoded payload elements (one per array slot; scalar registers
    /// yield exactly one).
    pub values: Vec<RegisterValue>,
    /// `true` if the device flagged the exchange as failed.
    pub is_error: bool,
}

/// An unsolicited [`Reply`]: any frame the device emits that does not
/// answer the currently outstanding request.
pub type Event = Reply;

impl Reply {
    /// Decode a validated frame into a typed reply.
    ///
    /// Fails with `UnsupportedType` for unknown payload tags and with
    /// `Protocol` if the payload length is not a whole number of
    /// elements. Error replies legitimately carry no payload.
    pub fn from_frame(frame: &HarpFrame) -> Result<Reply> {
        let payload_type = frame.payload_type()?;
        let values = if frame.is_error && frame.payload.is_empty() {
            Vec::new()
        } else {
            RegisterValue::decode_array(&frame.payload, payload_type)?
        };
        Ok(Reply {
            address: frame.address,
            message_type: frame.message_type,
            payload_type,
            timestamp: frame.timestamp,
            values,
            is_error: frame.is_error,
        })
    }

    /// The first payload element, for the common scalar-register case.
    pub fn value(&self) -> Option<RegisterValue> {
        self.values.first().copied()
    }

    /// `true` if this reply answers `op`.
    ///
    /// Correlation is by address plus direction: a Read reply matches a
    /// pending Read, a Write echo matches a pending Write. Event frames
    /// never match anything.
    pub fn matches(&self, op: &RegisterOperation) -> bool {
        if self.address != op.address {
            return false;
        }
        match (self.message_type, op.direction) {
            (MessageType::Read, Direction::Read) => true,
            (MessageType::Write, Direction::Write) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PORT_DEVICE;

    fn reply_frame(message_type: MessageType, address: u8, payload: Vec<u8>) -> HarpFrame {
        HarpFrame {
            message_type,
            is_error: false,
            address,
            port: PORT_DEVICE,
            payload_type_raw: PayloadType::U16.to_wire(),
            timestamp: None,
            payload,
        }
    }

    #[test]
    fn decode_scalar_reply() {
        let frame = reply_frame(MessageType::Read, 32, vec![0x03, 0x00]);
        let reply = Reply::from_frame(&frame).unwrap();
        assert_eq!(reply.address, 32);
        assert_eq!(reply.value(), Some(RegisterValue::U16(3)));
        assert!(!reply.is_error);
    }

    #[test]
    fn decode_timestamped_event() {
        let mut frame = reply_frame(MessageType::Event, 33, vec![0x10, 0x00]);
        frame.payload_type_raw |= harplink_core::types::TIMESTAMP_FLAG;
        frame.timestamp = Some(HarpTimestamp {
            seconds: 5,
            micros: 0,
        });
        let reply = Reply::from_frame(&frame).unwrap();
        assert_eq!(reply.timestamp.unwrap().seconds, 5);
        assert_eq!(reply.value(), Some(RegisterValue::U16(16)));
    }

    #[test]
    fn decode_array_reply() {
        let frame = reply_frame(MessageType::Read, 12, vec![1, 0, 2, 0, 3, 0]);
        let reply = Reply::from_frame(&frame).unwrap();
        assert_eq!(reply.values.len(), 3);
    }

    #[test]
    fn decode_error_reply_without_payload() {
        let mut frame = reply_frame(MessageType::Write, 34, vec![]);
        frame.is_error = true;
        let reply = Reply::from_frame(&frame).unwrap();
        assert!(reply.is_error);
        assert!(reply.values.is_empty());
    }

    #[test]
    fn decode_rejects_ragged_payload() {
        let frame = reply_frame(MessageType::Read, 32, vec![0x01]);
        assert!(Reply::from_frame(&frame).is_err());
    }

    #[test]
    fn decode_rejects_unknown_payload_tag() {
        let mut frame = reply_frame(MessageType::Read, 32, vec![]);
        frame.payload_type_raw = 0x33;
        assert!(Reply::from_frame(&frame).is_err());
    }

    #[test]
    fn correlation_by_address_and_direction() {
        let op = RegisterOperation::read_u16(32);

        let reply = Reply::from_frame(&reply_frame(MessageType::Read, 32, vec![1, 0])).unwrap();
        assert!(reply.matches(&op));

        // Wrong address.
        let reply = Reply::from_frame(&reply_frame(MessageType::Read, 33, vec![1, 0])).unwrap();
        assert!(!reply.matches(&op));

        // Write echo does not answer a read.
        let reply = Reply::from_frame(&reply_frame(MessageType::Write, 32, vec![1, 0])).unwrap();
        assert!(!reply.matches(&op));

        // Events never match, even at the same address.
        let reply = Reply::from_frame(&reply_frame(MessageType::Event, 32, vec![1, 0])).unwrap();
        assert!(!reply.matches(&op));
    }

    #[test]
    fn write_echo_matches_write() {
        let op = RegisterOperation::write_u16(34, 60);
        let reply = Reply::from_frame(&reply_frame(MessageType::Write, 34, vec![60, 0])).unwrap();
        assert!(reply.matches(&op));
    }
}
