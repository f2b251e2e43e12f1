//! DeviceBuilder -- fluent builder for constructing [`Device`] sessions.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, the register map, timeouts, and traffic
//! capture before the port is opened.
//!
//! # Example
//!
//! ```no_run
//! use harplink_device::DeviceBuilder;
//! use harplink_core::registers::white_rabbit;
//! use std::time::Duration;
//!
//! # async fn example() -> harplink_core::Result<()> {
//! let device = DeviceBuilder::new(white_rabbit())
//!     .serial_port("/dev/ttyACM0")
//!     .baud_rate(1_000_000)
//!     .command_timeout(Duration::from_millis(300))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use harplink_core::error::{Error, Result};
use harplink_core::registers::RegisterMap;
use harplink_core::transport::Transport;
use harplink_transport::{FileSink, FramedPort, SerialTransport};

use crate::device::Device;

/// Fluent builder for [`Device`].
///
/// All configuration has defaults, so the simplest usage is:
///
/// ```ignore
/// let device = DeviceBuilder::new(white_rabbit())
///     .serial_port("/dev/ttyACM0")
///     .build()
///     .await?;
/// ```
pub struct DeviceBuilder {
    registers: RegisterMap,
    serial_port: Option<String>,
    baud_rate: u32,
    command_timeout: Duration,
    heartbeat_interval: Option<Duration>,
    traffic_log: Option<PathBuf>,
}

impl DeviceBuilder {
    /// Create a new builder for a device with the given register map.
    pub fn new(registers: RegisterMap) -> Self {
        DeviceBuilder {
            registers,
            serial_port: None,
            baud_rate: 115_200,
            command_timeout: Duration::from_millis(500),
            heartbeat_interval: None,
            traffic_log: None,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the timeout for waiting for the reply to a single register
    /// operation (default: 500ms).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Start the keep-alive heartbeat immediately after connecting.
    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Capture all serial traffic to a file, newly created at build
    /// time (an existing file at the path is truncated).
    pub fn traffic_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.traffic_log = Some(path.into());
        self
    }

    /// Build a [`Device`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `harplink-test-harness`) and for advanced
    /// use cases where the caller manages the transport directly.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Device> {
        let mut port = FramedPort::new(transport);
        if let Some(path) = &self.traffic_log {
            port.set_sink(Box::new(FileSink::create(path)?));
        }

        let device = Device::new(port, self.registers, self.command_timeout)?;
        if let Some(interval) = self.heartbeat_interval {
            device.enable_heartbeat(interval).await?;
        }
        Ok(device)
    }

    /// Build a [`Device`] over a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been
    /// called.
    pub async fn build(self) -> Result<Device> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harplink_core::registers::white_rabbit;
    use harplink_test_harness::MockTransport;

    #[tokio::test]
    async fn builder_defaults() {
        let mock = MockTransport::new();
        let device = DeviceBuilder::new(white_rabbit())
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert!(device.is_connected());
        assert!(device.registers().by_name("Counter").is_some());
        device.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = DeviceBuilder::new(white_rabbit()).build().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn builder_fluent_chain() {
        let mock = MockTransport::new();
        let device = DeviceBuilder::new(white_rabbit())
            .serial_port("/dev/ttyACM0")
            .baud_rate(1_000_000)
            .command_timeout(Duration::from_millis(200))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert!(device.is_connected());
        device.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn builder_starts_heartbeat() {
        let mut mock = MockTransport::new();
        mock.allow_unexpected_sends(true);
        let ctl = mock.controller();

        let device = DeviceBuilder::new(white_rabbit())
            .heartbeat(Duration::from_millis(10))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!ctl.sent_data().is_empty());
        device.disconnect().await.unwrap();
    }
}
