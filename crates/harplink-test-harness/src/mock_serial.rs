//! Mock transport for deterministic testing of the codec, framed
//! reader, and dispatcher.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs plus a few knobs the protocol tests need:
//! unsolicited byte injection (device events arriving without a
//! command), per-read chunking (partial frame delivery), and tolerance
//! for writes with no matching expectation (fire-and-forget
//! heartbeats).
//!
//! # Example
//!
//! ```
//! use harplink_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When this request is sent, these bytes become readable.
//! mock.expect(&[0x01, 0x04, 0x20, 0xFF, 0x02, 0x26],
//!             &[0x01, 0x06, 0x20, 0xFF, 0x02, 0x03, 0x00, 0x2B]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harplink_core::error::{Error, Result};
use harplink_core::transport::Transport;

/// A pre-loaded request/response pair.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes that become readable once the request is seen.
    response: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`, in arrival order.
    readable: VecDeque<u8>,
    /// Maximum bytes returned per `receive()` call, if set.
    chunk_size: Option<usize>,
    /// When `true`, sends with no matching expectation are recorded
    /// and succeed silently.
    allow_unexpected: bool,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
}

/// A mock [`Transport`] for testing protocol behavior without hardware.
///
/// Expectations are consumed in order: when `send()` matches the next
/// expectation, its response bytes are appended to the readable stream.
/// Unsolicited bytes pushed via [`push_unsolicited`](Self::push_unsolicited)
/// join the same stream, so tests can interleave events with replies
/// exactly as a device would.
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// A handle for driving a [`MockTransport`] after it has been boxed and
/// handed to the code under test.
#[derive(Debug, Clone)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                connected: true,
                ..Default::default()
            })),
        }
    }

    /// A controller sharing this transport's state.
    pub fn controller(&self) -> MockController {
        MockController {
            state: self.state.clone(),
        }
    }

    /// Add an expected request/response pair.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .expectations
            .push_back(Expectation {
                request: request.to_vec(),
                response: response.to_vec(),
            });
    }

    /// Make `bytes` readable without requiring any send first, as if
    /// the device emitted them spontaneously.
    pub fn push_unsolicited(&mut self, bytes: &[u8]) {
        self.state.lock().unwrap().readable.extend(bytes);
    }

    /// Limit every `receive()` call to at most `n` bytes, forcing the
    /// reader to reassemble frames from partial deliveries.
    pub fn set_chunk_size(&mut self, n: usize) {
        self.state.lock().unwrap().chunk_size = Some(n);
    }

    /// Allow sends with no matching expectation to succeed silently
    /// (they are still recorded in the sent log).
    pub fn allow_unexpected_sends(&mut self, allow: bool) {
        self.state.lock().unwrap().allow_unexpected = allow;
    }

    /// All data sent through this transport, one entry per `send()`.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().sent_log.clone()
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.state.lock().unwrap().expectations.len()
    }

    /// Force the connected state.
    pub fn set_connected(&mut self, connected: bool) {
        self.state.lock().unwrap().connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockController {
    /// Make `bytes` readable, as if the device emitted them.
    pub fn push_unsolicited(&self, bytes: &[u8]) {
        self.state.lock().unwrap().readable.extend(bytes);
    }

    /// Add an expected request/response pair.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.state.lock().unwrap().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// All data sent through the transport so far.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().sent_log.clone()
    }

    /// Drop the connection out from under the code under test.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().unwrap().connected = connected;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(data.to_vec());

        let matches_next = state
            .expectations
            .front()
            .is_some_and(|e| e.request.as_slice() == data);

        if matches_next {
            let expectation = state.expectations.pop_front().unwrap();
            state.readable.extend(expectation.response);
            Ok(())
        } else if state.allow_unexpected {
            Ok(())
        } else if let Some(expectation) = state.expectations.front() {
            Err(Error::Protocol(format!(
                "unexpected send data: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )))
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        // Give concurrently running test code a chance to push bytes.
        tokio::task::yield_now().await;
        if self.state.lock().unwrap().readable.is_empty() {
            // Stay silent briefly; callers with longer deadlines retry.
            tokio::time::sleep(timeout.min(Duration::from_millis(5))).await;
        }

        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.readable.is_empty() {
            return Err(Error::Timeout);
        }

        let limit = state.chunk_size.unwrap_or(usize::MAX);
        let n = buf.len().min(state.readable.len()).min(limit);
        for slot in buf.iter_mut().take(n) {
            // Queue length was checked above.
            *slot = state.readable.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.readable.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}
