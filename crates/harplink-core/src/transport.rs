//! Transport trait for device communication.
//!
//! The [`Transport`] trait abstracts over the byte channel to a Harp
//! device. The real implementation is a serial port (USB CDC); tests
//! use the deterministic mock from `harplink-test-harness`.
//!
//! The framed reader and the dispatcher operate on a `Transport` rather
//! than directly on a serial port, so protocol behavior can be tested
//! without hardware.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a device.
///
/// Implementations handle only raw byte movement; frame assembly,
/// checksum validation, and resynchronization live above this trait in
/// the framed reader.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Implementations should not return until all bytes have been
    /// handed to the underlying channel (serial TX buffer flushed).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read, which may be any
    /// prefix of a frame. Waits up to `timeout` for data; returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing
    /// arrives within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// Idempotent: closing an already-closed transport succeeds. After
    /// closing, `send()` and `receive()` return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
