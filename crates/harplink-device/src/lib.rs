//! Device session layer for harplink.
//!
//! This crate ties the frame codec and transport together into a usable
//! session: a background dispatcher task owns the port, correlates
//! replies with the outstanding command, queues unsolicited events, and
//! drives the keep-alive heartbeat.
//!
//! # Example
//!
//! ```no_run
//! use harplink_device::DeviceBuilder;
//! use harplink_core::registers::white_rabbit;
//!
//! # async fn example() -> harplink_core::Result<()> {
//! let device = DeviceBuilder::new(white_rabbit())
//!     .serial_port("/dev/ttyACM0")
//!     .build()
//!     .await?;
//!
//! let who_am_i = device.read(0).await?;
//! println!("WhoAmI: {:?}", who_am_i.value());
//! device.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod device;
mod dispatch;

pub use builder::DeviceBuilder;
pub use device::Device;
