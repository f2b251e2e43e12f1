//! Configure the auxiliary UART port on a White Rabbit device.
//!
//! Sets the aux port mode and baud rate, capturing every byte of the
//! exchange to a binary traffic log for later inspection.
//!
//! # Requirements
//!
//! - A White Rabbit device connected via USB
//!
//! # Usage
//!
//! ```sh
//! cargo run -p harplink --example aux_port_setup
//! ```

use std::time::Duration;

use harplink::registers::white_rabbit;
use harplink::{DeviceBuilder, RegisterValue};

/// Aux port mode 1: UART pass-through.
const AUX_MODE_UART: u8 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let device = DeviceBuilder::new(white_rabbit())
        .serial_port("/dev/ttyACM0")
        .command_timeout(Duration::from_millis(300))
        .traffic_log("aux_port_setup.bin")
        .build()
        .await?;

    println!("Setting aux port baud rate to 115200...");
    let echo = device.write(36, RegisterValue::U32(115_200)).await?;
    if echo.is_error {
        anyhow::bail!("device rejected the baud rate");
    }

    println!("Enabling aux port UART mode...");
    let echo = device.write(35, RegisterValue::U8(AUX_MODE_UART)).await?;
    if echo.is_error {
        anyhow::bail!("device rejected the mode change");
    }

    let mode = device.read(35).await?;
    let baud = device.read(36).await?;
    println!("Aux port: mode {:?}, baud {:?}", mode.value(), baud.value());

    device.disconnect().await?;
    println!("Done; traffic captured to aux_port_setup.bin");
    Ok(())
}
