//! Framed reader over a raw transport.
//!
//! [`FramedPort`] owns the byte channel and turns it into a stream of
//! complete, checksum-valid frames. The serial port may deliver a frame
//! in arbitrary slices, so bytes are accumulated across reads and the
//! pure codec is re-run against the growing buffer until it produces a
//! frame or the deadline expires.
//!
//! Corrupt bytes on the wire must not wedge the channel: a checksum
//! failure discards bytes up to the next plausible frame start and the
//! scan continues. Corrupt frames are counted and logged, never
//! delivered.

use std::time::{Duration, Instant};

use harplink_core::{Error, HarpTimestamp, Result, Transport};
use harplink_protocol::frame::{decode_frame, DecodeResult, HarpFrame};

use crate::sink::TrafficSink;

/// Read chunk size for the underlying transport.
const READ_CHUNK: usize = 256;

/// Consecutive zero-length reads after which the stream is declared
/// dead. A serial port reports end-of-file this way once the device is
/// unplugged.
const MAX_ZERO_READS: u32 = 3;

/// A transport wrapped with frame assembly, resynchronization, and
/// optional traffic capture.
pub struct FramedPort {
    transport: Box<dyn Transport>,
    buffer: Vec<u8>,
    sink: Option<Box<dyn TrafficSink>>,
    attached_at: Instant,
    corrupt_frames: u64,
}

impl FramedPort {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        FramedPort {
            transport,
            buffer: Vec::new(),
            sink: None,
            attached_at: Instant::now(),
            corrupt_frames: 0,
        }
    }

    /// Attach a traffic sink. All bytes written and all validated
    /// frames received from now on are mirrored to it.
    pub fn set_sink(&mut self, sink: Box<dyn TrafficSink>) {
        self.attached_at = Instant::now();
        self.sink = Some(sink);
    }

    /// Number of corrupt frames discarded during resynchronization.
    pub fn corrupt_frames(&self) -> u64 {
        self.corrupt_frames
    }

    /// Write raw bytes to the device, mirroring them to the sink.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.send(bytes).await?;
        self.tee(bytes);
        Ok(())
    }

    /// Read the next complete, checksum-valid frame.
    ///
    /// Blocks up to `timeout`, accumulating partial reads. Returns
    /// [`Error::Timeout`] if no valid frame arrives within the
    /// deadline; bytes received so far stay buffered for the next call.
    /// Repeated zero-length reads mean the stream has ended and return
    /// [`Error::ConnectionLost`].
    pub async fn read_frame(&mut self, timeout: Duration) -> Result<HarpFrame> {
        let deadline = Instant::now() + timeout;
        let mut zero_reads = 0u32;

        loop {
            match decode_frame(&self.buffer) {
                DecodeResult::Frame(frame, consumed) => {
                    let wire_len = frame_wire_len(&frame);
                    let span_start = consumed - wire_len;
                    if span_start > 0 {
                        tracing::debug!(bytes = span_start, "skipped inter-frame garbage");
                    }
                    let span = self.buffer[span_start..consumed].to_vec();
                    self.buffer.drain(..consumed);
                    self.tee(&span);
                    return Ok(frame);
                }
                DecodeResult::Corrupt(n) => {
                    self.corrupt_frames += 1;
                    tracing::warn!(
                        discarded = n,
                        total_corrupt = self.corrupt_frames,
                        "corrupt frame on the wire, resynchronizing"
                    );
                    self.buffer.drain(..n);
                    continue;
                }
                DecodeResult::Incomplete => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.transport.receive(&mut chunk, remaining).await {
                Ok(0) => {
                    zero_reads += 1;
                    if zero_reads >= MAX_ZERO_READS {
                        tracing::warn!("transport reached end-of-stream, connection lost");
                        return Err(Error::ConnectionLost);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Ok(n) => {
                    zero_reads = 0;
                    self.buffer.extend_from_slice(&chunk[..n]);
                }
                Err(Error::Timeout) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the underlying transport. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Mirror a byte span to the sink, if one is attached.
    ///
    /// Sink failures are logged and otherwise ignored; capture must
    /// never corrupt the live exchange.
    fn tee(&mut self, bytes: &[u8]) {
        if let Some(sink) = self.sink.as_mut() {
            let timestamp = self.attached_at.elapsed();
            if let Err(e) = sink.write(bytes, timestamp) {
                tracing::warn!(error = %e, "traffic sink write failed");
            }
        }
    }
}

/// Wire length of a decoded frame: prefix (type + length bytes) plus
/// the counted region.
fn frame_wire_len(frame: &HarpFrame) -> usize {
    let ts_len = frame.timestamp.map_or(0, |_| HarpTimestamp::WIRE_SIZE);
    2 + 4 + ts_len + frame.payload.len()
}
