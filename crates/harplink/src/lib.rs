//! # harplink -- Async Harp Device Control
//!
//! `harplink` is an asynchronous Rust library for talking to
//! [Harp](https://harp-tech.org)-compliant instrumentation over a
//! serial port: timing synchronizers, behavior boxes, and other lab
//! devices that expose their state as addressed, typed registers.
//!
//! ## Quick Start
//!
//! Add `harplink` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! harplink = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to a device and read its identity register:
//!
//! ```no_run
//! use harplink::registers::white_rabbit;
//! use harplink::DeviceBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let device = DeviceBuilder::new(white_rabbit())
//!         .serial_port("/dev/ttyACM0")
//!         .build()
//!         .await?;
//!
//!     let who_am_i = device.read(0).await?;
//!     println!("WhoAmI: {:?}", who_am_i.value());
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                   | Purpose                                       |
//! |-------------------------|-----------------------------------------------|
//! | `harplink-core`         | Register value model, register maps, errors   |
//! | `harplink-protocol`     | Pure frame codec, operations, replies         |
//! | `harplink-transport`    | Serial transport, frame assembly, capture     |
//! | `harplink-device`       | Session, dispatcher, heartbeat, builder       |
//! | `harplink-test-harness` | Mock transports for tests                     |
//! | **`harplink`**          | This facade crate -- re-exports everything    |
//!
//! ## Commands and Events
//!
//! A Harp device interleaves command replies with spontaneous event
//! frames on the same wire. The [`Device`] session keeps the two paths
//! separate: [`send`](Device::send) (and the [`read`](Device::read) /
//! [`write`](Device::write) helpers) resolve with the correlated
//! reply, while every unsolicited frame lands in a FIFO queue drained
//! with the non-blocking [`poll_event`](Device::poll_event):
//!
//! ```no_run
//! # async fn example(device: &harplink::Device) {
//! while let Some(event) = device.poll_event() {
//!     println!("register {} -> {:?}", event.address, event.value());
//! }
//! # }
//! ```

pub use harplink_core::*;

/// The pure Harp frame codec and typed register operations.
pub mod protocol {
    pub use harplink_protocol::*;
}

/// Serial transport, frame assembly, and traffic capture.
pub mod transport {
    pub use harplink_transport::*;
}

pub use harplink_device::{Device, DeviceBuilder};
pub use harplink_protocol::{Direction, Event, RegisterOperation, Reply};
