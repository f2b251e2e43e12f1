//! Stream counter events from a White Rabbit timing device.
//!
//! Demonstrates the event path: the device is configured to emit a
//! counter event on every timing pulse, and this example drains the
//! event queue and prints each update until Ctrl-C.
//!
//! Shutdown is driven by a cancellation token checked between polls,
//! so the session always tears down cleanly. The heartbeat is enabled
//! so the link stays verified even while the counter is quiet.
//!
//! # Requirements
//!
//! - A White Rabbit device connected via USB
//!
//! # Usage
//!
//! ```sh
//! cargo run -p harplink --example counter_events
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use harplink::registers::white_rabbit;
use harplink::{DeviceBuilder, RegisterValue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let device = DeviceBuilder::new(white_rabbit())
        .serial_port("/dev/ttyACM0")
        .heartbeat(Duration::from_secs(2))
        .build()
        .await?;

    // Zero the counter; events start flowing once it is written.
    let echo = device.write(33, RegisterValue::U32(0)).await?;
    if echo.is_error {
        anyhow::bail!("device rejected the counter reset");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }

    println!("Streaming counter events, Ctrl-C to stop...\n");

    while !cancel.is_cancelled() {
        while let Some(event) = device.poll_event() {
            let stamp = event
                .timestamp
                .map(|ts| format!("{:.6}", ts.as_secs_f64()))
                .unwrap_or_else(|| "-".into());
            println!("[{}] register {} -> {:?}", stamp, event.address, event.value());
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }

    println!("\nShutting down...");
    device.disconnect().await?;
    Ok(())
}
