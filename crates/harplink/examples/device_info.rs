//! Basic device identification example.
//!
//! Demonstrates connecting to a Harp device, reading its identity and
//! version registers, and printing a short summary.
//!
//! # Requirements
//!
//! - A Harp-compliant device connected via USB
//! - The serial port path adjusted for your system (e.g.,
//!   `/dev/ttyACM0` on Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p harplink --example device_info
//! ```

use std::time::Duration;

use harplink::registers::white_rabbit;
use harplink::DeviceBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyACM0";

    println!("Connecting to Harp device on {}...", serial_port);

    let device = DeviceBuilder::new(white_rabbit())
        .serial_port(serial_port)
        .command_timeout(Duration::from_millis(300))
        .build()
        .await?;

    let who_am_i = device.read(0).await?;
    println!("WhoAmI: {:?}", who_am_i.value());

    let hw_high = device.read(1).await?;
    let hw_low = device.read(2).await?;
    println!("Hardware: {:?}.{:?}", hw_high.value(), hw_low.value());

    let fw_high = device.read(6).await?;
    let fw_low = device.read(7).await?;
    println!("Firmware: {:?}.{:?}", fw_high.value(), fw_low.value());

    let timestamp = device.read(8).await?;
    println!("Device uptime: {:?} s", timestamp.value());

    device.disconnect().await?;
    println!("Disconnected.");
    Ok(())
}
