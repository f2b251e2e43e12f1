//! Device session.
//!
//! [`Device`] is the caller-facing handle over one connected Harp
//! device. The port itself lives inside the background dispatcher task
//! ([`dispatch`](crate::dispatch)); the handle talks to it over
//! channels, so all methods take `&self` and the handle can be shared
//! behind an `Arc`.
//!
//! One command may be outstanding at a time. A `send` while another is
//! in flight fails immediately with [`Error::Busy`] instead of queueing,
//! matching the one-request-one-reply discipline of the wire protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use harplink_core::error::{Error, Result};
use harplink_core::registers::{RegisterMap, TIMESTAMP_SECONDS};
use harplink_core::RegisterValue;
use harplink_protocol::operation::RegisterOperation;
use harplink_protocol::reply::{Event, Reply};
use harplink_transport::FramedPort;

use crate::dispatch::{self, CommandRequest, DispatcherHandle};

/// A connected Harp device.
///
/// Constructed via [`DeviceBuilder`](crate::builder::DeviceBuilder).
/// All device communication goes through the dispatcher task spawned at
/// build time.
pub struct Device {
    cmd_tx: mpsc::Sender<CommandRequest>,
    dispatcher: Mutex<Option<DispatcherHandle>>,
    events: StdMutex<mpsc::UnboundedReceiver<Event>>,
    /// Set while a `send` is outstanding; a second `send` fails with `Busy`.
    in_flight: AtomicBool,
    connected: AtomicBool,
    cancel: CancellationToken,
    registers: RegisterMap,
    command_timeout: Duration,
}

impl Drop for Device {
    fn drop(&mut self) {
        // Graceful: signal the dispatcher to fail any in-progress
        // exchange at the next loop iteration.
        self.cancel.cancel();
        // Safety net: abort the task in case it is stuck in a transport
        // read that never returns (e.g. hung USB-serial).
        if let Ok(mut guard) = self.dispatcher.try_lock() {
            if let Some(handle) = guard.take() {
                handle.task_handle.abort();
            }
        }
    }
}

impl Device {
    /// Spawn the dispatcher over `port` and wrap it in a session handle.
    ///
    /// Called by [`DeviceBuilder`](crate::builder::DeviceBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        port: FramedPort,
        registers: RegisterMap,
        command_timeout: Duration,
    ) -> Result<Self> {
        let heartbeat_frame = RegisterOperation::read_u32(TIMESTAMP_SECONDS).encode()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = dispatch::spawn_dispatcher(port, heartbeat_frame, event_tx, cancel.clone());

        Ok(Device {
            cmd_tx: handle.cmd_tx.clone(),
            dispatcher: Mutex::new(Some(handle)),
            events: StdMutex::new(event_rx),
            in_flight: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            cancel,
            registers,
            command_timeout,
        })
    }

    /// The register map this session was built with.
    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    /// `true` until [`disconnect`](Self::disconnect) has been called.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Exchange one register operation with the device.
    ///
    /// Blocks until the correlated reply arrives or `timeout` expires.
    /// A reply the device flagged as failed is returned as `Ok` with
    /// [`Reply::is_error`] set; inspect it before trusting the payload.
    ///
    /// Fails with [`Error::Busy`] if another `send` is already
    /// outstanding; the session state is untouched in that case.
    pub async fn send(&self, op: RegisterOperation, timeout: Duration) -> Result<Reply> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        // Encode (and validate) before claiming the in-flight slot, so
        // a malformed operation never blocks a concurrent valid one.
        let frame_bytes = op.encode()?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Busy);
        }
        let _slot = InFlightSlot(&self.in_flight);

        debug!(address = op.address, direction = ?op.direction, "sending register operation");
        let (response_tx, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(CommandRequest::Exchange {
                op,
                frame_bytes,
                timeout,
                response_tx,
            })
            .await
            .map_err(|_| Error::NotConnected)?;

        // A dropped sender means the dispatcher exited mid-exchange.
        response_rx.await.map_err(|_| Error::NotConnected)?
    }

    /// Read a register by address, using the register map for its type.
    ///
    /// Fails with `InvalidParameter` if the address is not in the map
    /// or the register is write-only.
    pub async fn read(&self, address: u8) -> Result<Reply> {
        let spec = self
            .registers
            .by_address(address)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown register address {address}")))?;
        if !spec.access.readable() {
            return Err(Error::InvalidParameter(format!(
                "register {} ({}) is write-only",
                spec.name, address
            )));
        }
        let op = RegisterOperation::read(address, spec.payload_type);
        self.send(op, self.command_timeout).await
    }

    /// Write a register by address, validating the value against the
    /// register map's declared type and access mode.
    pub async fn write(&self, address: u8, value: RegisterValue) -> Result<Reply> {
        let spec = self
            .registers
            .by_address(address)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown register address {address}")))?;
        if !spec.access.writable() {
            return Err(Error::InvalidParameter(format!(
                "register {} ({}) is read-only",
                spec.name, address
            )));
        }
        if value.payload_type() != spec.payload_type {
            return Err(Error::TypeMismatch {
                expected: spec.payload_type.name(),
                actual: value.payload_type().name(),
            });
        }
        let op = RegisterOperation::write(address, value);
        self.send(op, self.command_timeout).await
    }

    /// Take the next queued device event, if any. Never blocks.
    ///
    /// Events are delivered in arrival order, each to exactly one
    /// caller. Returns `None` when the queue is empty or the session
    /// has been disconnected.
    pub fn poll_event(&self) -> Option<Event> {
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.try_recv().ok()
    }

    /// Start the keep-alive: a fire-and-forget timestamp read every
    /// `interval`, independent of command traffic.
    pub async fn enable_heartbeat(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidParameter(
                "heartbeat interval must be non-zero".into(),
            ));
        }
        self.set_heartbeat(Some(interval)).await
    }

    /// Stop the keep-alive.
    pub async fn disable_heartbeat(&self) -> Result<()> {
        self.set_heartbeat(None).await
    }

    async fn set_heartbeat(&self, interval: Option<Duration>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.cmd_tx
            .send(CommandRequest::SetHeartbeat { interval })
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Tear down the session: stop the heartbeat, fail any outstanding
    /// `send`, close the serial port, and drop queued events.
    ///
    /// Idempotent; a second call is a no-op. Safe to call while a
    /// `send` is blocked -- that send fails with `NotConnected`.
    pub async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("disconnecting device session");
            // Fail the in-progress exchange, if any, before asking the
            // dispatcher to shut down; the shutdown request queues
            // behind the exchange otherwise.
            self.cancel.cancel();

            let handle = self.dispatcher.lock().await.take();
            if let Some(handle) = handle {
                match handle.shutdown().await {
                    Ok(mut port) => {
                        if let Err(e) = port.close().await {
                            warn!(error = %e, "port close failed during disconnect");
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "dispatcher already gone during disconnect");
                    }
                }
            }

            // Anything still queued belongs to the dead session.
            while self.poll_event().is_some() {}
        }
        Ok(())
    }
}

/// Clears the in-flight flag when the current `send` resolves, whatever
/// the outcome.
struct InFlightSlot<'a>(&'a AtomicBool);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
