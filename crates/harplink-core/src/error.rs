//! Error types for harplink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Codec-layer, transport-layer, and
//! dispatch-layer errors are all captured here.
//!
//! Note that an incomplete frame is *not* an error: the codec reports it
//! through `DecodeResult::Incomplete` so the transport knows to keep
//! accumulating bytes.

/// The error type for all harplink operations.
///
/// Variants cover the full range of failure modes encountered when
/// talking to a Harp device: local encode validation, corrupt frames on
/// the wire, timeouts, and connection loss.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write value's width does not match the declared payload type.
    ///
    /// Raised locally at encode time, before any bytes touch the wire.
    #[error("payload type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The declared payload type name.
        expected: &'static str,
        /// The name of the value actually supplied.
        actual: &'static str,
    },

    /// A payload-type tag that the protocol does not define.
    #[error("unsupported payload type tag: 0x{0:02X}")]
    UnsupportedType(u8),

    /// A frame failed checksum verification.
    ///
    /// The framed reader recovers from this internally by resynchronizing;
    /// it only reaches callers that decode raw buffers themselves.
    #[error("checksum mismatch: frame says 0x{expected:02X}, computed 0x{computed:02X}")]
    Checksum {
        /// The checksum byte carried by the frame.
        expected: u8,
        /// The checksum computed over the received bytes.
        computed: u8,
    },

    /// Timed out waiting for a reply from the device.
    ///
    /// This typically indicates the device is unpowered, the port is
    /// wrong, or the register is not serviced by the firmware.
    #[error("timeout waiting for reply")]
    Timeout,

    /// A `send` was attempted while another exchange was still awaiting
    /// its reply. The protocol allows one outstanding command at a time.
    #[error("another command is awaiting its reply")]
    Busy,

    /// No connection to the device has been established, or the session
    /// has been disconnected.
    #[error("not connected")]
    NotConnected,

    /// The connection to the device was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A transport-level error (serial port open/configure failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed frame, reply of the wrong type).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An invalid parameter was passed to a harplink API.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_type_mismatch() {
        let e = Error::TypeMismatch {
            expected: "U16",
            actual: "U32",
        };
        assert_eq!(e.to_string(), "payload type mismatch: expected U16, got U32");
    }

    #[test]
    fn error_display_unsupported_type() {
        let e = Error::UnsupportedType(0x33);
        assert_eq!(e.to_string(), "unsupported payload type tag: 0x33");
    }

    #[test]
    fn error_display_checksum() {
        let e = Error::Checksum {
            expected: 0xAB,
            computed: 0xCD,
        };
        assert_eq!(
            e.to_string(),
            "checksum mismatch: frame says 0xAB, computed 0xCD"
        );
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for reply");
    }

    #[test]
    fn error_display_busy() {
        assert_eq!(
            Error::Busy.to_string(),
            "another command is awaiting its reply"
        );
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
