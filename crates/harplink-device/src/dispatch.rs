//! Background dispatcher task.
//!
//! A Harp device interleaves command replies with spontaneous event
//! frames on the same serial line, so a single task must own the port
//! and sort arriving frames into the two paths. This module provides
//! that task: commands are sent to it via an `mpsc` channel and their
//! replies returned via `oneshot`; every frame that does not answer the
//! outstanding command is diverted to the event queue.
//!
//! The task also drives the heartbeat: while enabled, a fire-and-forget
//! read of the device timestamp register goes out on every interval
//! tick, whether or not a command exchange is in progress.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use harplink_core::error::{Error, Result};
use harplink_protocol::operation::RegisterOperation;
use harplink_protocol::reply::{Event, Reply};
use harplink_transport::FramedPort;

/// Timeout for a single idle read while no command is outstanding.
/// Short enough that commands and heartbeat ticks are picked up
/// promptly.
const IDLE_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A request sent from the device handle to the dispatcher task.
pub(crate) enum CommandRequest {
    /// A register operation to exchange with the device.
    Exchange {
        op: RegisterOperation,
        frame_bytes: Vec<u8>,
        timeout: Duration,
        response_tx: oneshot::Sender<Result<Reply>>,
    },
    /// Enable the heartbeat with the given interval, or disable it.
    SetHeartbeat { interval: Option<Duration> },
    /// Shut down the dispatcher loop and return port ownership.
    Shutdown {
        port_tx: oneshot::Sender<FramedPort>,
    },
}

/// Handle to the background dispatcher task.
pub(crate) struct DispatcherHandle {
    pub cmd_tx: mpsc::Sender<CommandRequest>,
    /// Kept so the task can be joined on shutdown or aborted when the
    /// device is dropped.
    pub task_handle: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Shut down the dispatcher task and recover the port.
    ///
    /// Sends a `Shutdown` request, waits for the port to be returned
    /// via a oneshot channel, then joins the task.
    pub(crate) async fn shutdown(self) -> Result<FramedPort> {
        let (port_tx, port_rx) = oneshot::channel();
        // Send failure means the dispatcher already exited.
        let _ = self
            .cmd_tx
            .send(CommandRequest::Shutdown { port_tx })
            .await;
        let port = port_rx.await.map_err(|_| Error::NotConnected)?;
        let _ = self.task_handle.await;
        Ok(port)
    }
}

/// Heartbeat bookkeeping inside the dispatcher loop.
struct Heartbeat {
    /// Pre-encoded timestamp-read frame sent on every tick.
    frame_bytes: Vec<u8>,
    interval: Duration,
    next_at: Instant,
}

/// Spawn the background dispatcher task.
///
/// The task owns the port exclusively. Commands go in via the returned
/// handle's `cmd_tx` channel; frames that answer no outstanding command
/// are decoded and pushed to `event_tx` in arrival order.
pub(crate) fn spawn_dispatcher(
    port: FramedPort,
    heartbeat_frame: Vec<u8>,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
) -> DispatcherHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<CommandRequest>(16);

    let task_handle = tokio::spawn(dispatcher_loop(
        port,
        heartbeat_frame,
        event_tx,
        cmd_rx,
        cancel,
    ));

    DispatcherHandle {
        cmd_tx,
        task_handle,
    }
}

/// The main loop of the dispatcher task.
///
/// Uses `tokio::select! { biased; }` to prioritize command handling
/// over idle event reading.
async fn dispatcher_loop(
    mut port: FramedPort,
    heartbeat_frame: Vec<u8>,
    event_tx: mpsc::UnboundedSender<Event>,
    mut cmd_rx: mpsc::Receiver<CommandRequest>,
    cancel: CancellationToken,
) {
    let mut heartbeat: Option<Heartbeat> = None;

    loop {
        // Cancellation is the first step of disconnect: the heartbeat
        // stops before the pending exchange is failed and the port closed.
        if cancel.is_cancelled() {
            heartbeat = None;
        }
        tick_heartbeat(&mut port, &mut heartbeat).await;
        let idle_window = next_read_window(IDLE_READ_TIMEOUT, heartbeat.as_ref());

        tokio::select! {
            biased;

            // Priority: handle outgoing commands.
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(CommandRequest::Exchange { op, frame_bytes, timeout, response_tx }) => {
                        let result = execute_exchange(
                            &mut port,
                            &op,
                            &frame_bytes,
                            timeout,
                            &event_tx,
                            &mut heartbeat,
                            &cancel,
                        )
                        .await;
                        let _ = response_tx.send(result);
                    }
                    Some(CommandRequest::SetHeartbeat { interval }) => {
                        heartbeat = interval.map(|interval| Heartbeat {
                            frame_bytes: heartbeat_frame.clone(),
                            interval,
                            next_at: Instant::now() + interval,
                        });
                        debug!(enabled = heartbeat.is_some(), "heartbeat reconfigured");
                    }
                    Some(CommandRequest::Shutdown { port_tx }) => {
                        debug!("shutdown requested, returning port");
                        let _ = port_tx.send(port);
                        break;
                    }
                    None => {
                        // All senders dropped, the device handle is gone.
                        debug!("command channel closed, exiting dispatcher loop");
                        break;
                    }
                }
            }

            // Idle: read event frames from the device.
            _ = async {
                match port.read_frame(idle_window).await {
                    Ok(frame) => divert_to_events(&frame, &event_tx),
                    Err(Error::Timeout) => {}
                    Err(e) => {
                        debug!(error = %e, "idle read failed");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            } => {}
        }
    }
}

/// Execute one register exchange on the port.
///
/// Sends the encoded frame, then reads until a frame correlating with
/// `op` arrives or the deadline expires. Non-matching frames are
/// diverted to the event queue rather than dropped, so event delivery
/// continues during command exchanges.
async fn execute_exchange(
    port: &mut FramedPort,
    op: &RegisterOperation,
    frame_bytes: &[u8],
    timeout: Duration,
    event_tx: &mpsc::UnboundedSender<Event>,
    heartbeat: &mut Option<Heartbeat>,
    cancel: &CancellationToken,
) -> Result<Reply> {
    port.write_bytes(frame_bytes).await?;
    let deadline = Instant::now() + timeout;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::NotConnected);
        }
        tick_heartbeat(port, heartbeat).await;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout);
        }
        let window = next_read_window(remaining.min(IDLE_READ_TIMEOUT), heartbeat.as_ref());

        match port.read_frame(window).await {
            Ok(frame) => match Reply::from_frame(&frame) {
                Ok(reply) => {
                    if reply.matches(op) {
                        // The device never legitimately changes a
                        // register's type; a different tag on a
                        // successful reply means crossed wires.
                        if !reply.is_error && reply.payload_type != op.payload_type {
                            return Err(Error::Protocol(format!(
                                "register {} replied as {:?}, expected {:?}",
                                op.address, reply.payload_type, op.payload_type
                            )));
                        }
                        return Ok(reply);
                    }
                    divert_to_events(&frame, event_tx);
                }
                Err(e) => {
                    debug!(error = %e, address = frame.address, "undecodable frame, skipping");
                }
            },
            Err(Error::Timeout) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Decode a non-matching frame and push it onto the event queue.
///
/// Frames that fail typed decoding are logged and dropped; they already
/// passed checksum validation, so this only happens for unknown payload
/// tags or ragged payloads.
fn divert_to_events(
    frame: &harplink_protocol::frame::HarpFrame,
    event_tx: &mpsc::UnboundedSender<Event>,
) {
    match Reply::from_frame(frame) {
        Ok(event) => {
            // Receiver dropped means nobody is polling; harmless.
            let _ = event_tx.send(event);
        }
        Err(e) => {
            debug!(error = %e, address = frame.address, "dropping undecodable event frame");
        }
    }
}

/// Send a heartbeat frame if the tick is due. Failures are logged and
/// the tick rescheduled; the heartbeat is fire-and-forget and its reply
/// surfaces later as an ordinary event-path frame.
async fn tick_heartbeat(port: &mut FramedPort, heartbeat: &mut Option<Heartbeat>) {
    let Some(hb) = heartbeat.as_mut() else {
        return;
    };
    if Instant::now() < hb.next_at {
        return;
    }
    if let Err(e) = port.write_bytes(&hb.frame_bytes).await {
        warn!(error = %e, "heartbeat send failed");
    }
    hb.next_at = Instant::now() + hb.interval;
}

/// Bound a read window by the time until the next heartbeat tick so a
/// long blocking read cannot starve the keep-alive.
fn next_read_window(base: Duration, heartbeat: Option<&Heartbeat>) -> Duration {
    match heartbeat {
        Some(hb) => base.min(hb.next_at.saturating_duration_since(Instant::now())),
        None => base,
    }
}
