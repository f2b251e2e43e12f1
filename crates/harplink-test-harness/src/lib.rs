//! harplink-test-harness: mock transports for testing harplink
//! protocol behavior without hardware.
//!
//! [`MockTransport`] provides deterministic request/response exchanges,
//! unsolicited frame injection, and partial-delivery chunking;
//! [`MockController`] drives a mock that has already been boxed and
//! handed to the code under test.

pub mod mock_serial;

pub use mock_serial::{MockController, MockTransport};
