//! Transport implementations for harplink.
//!
//! This crate provides the physical layer and the frame-assembly layer:
//!
//! - [`SerialTransport`]: USB CDC / RS-232 serial ports via tokio-serial
//! - [`FramedPort`]: byte accumulation, checksum validation, and
//!   resynchronization over any [`Transport`](harplink_core::Transport)
//! - [`TrafficSink`] / [`FileSink`]: raw traffic capture
//!
//! # Example
//!
//! ```no_run
//! use harplink_transport::{FramedPort, SerialTransport};
//! use std::time::Duration;
//!
//! # async fn example() -> harplink_core::Result<()> {
//! let transport = SerialTransport::open("/dev/ttyACM0", 115_200).await?;
//! let mut port = FramedPort::new(Box::new(transport));
//! let frame = port.read_frame(Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod framed;
pub mod serial;
pub mod sink;

pub use framed::FramedPort;
pub use serial::{DataBits, Parity, SerialConfig, SerialTransport, StopBits};
pub use sink::{FileSink, TrafficSink};
