//! harplink-protocol: the Harp binary frame codec and typed register
//! operations.
//!
//! Everything in this crate is pure: encoding and decoding operate on
//! byte buffers, perform no I/O, and mutate no shared state. The
//! transport and dispatcher crates drive these functions against the
//! live byte channel.
//!
//! # Key pieces
//!
//! - [`frame`] -- wire frames, checksum, incremental [`decode_frame`]
//! - [`operation`] -- [`RegisterOperation`] constructors and encoding
//! - [`reply`] -- typed [`Reply`]/[`Event`] decoding and correlation

pub mod frame;
pub mod operation;
pub mod reply;

pub use frame::{
    checksum, decode_frame, encode_frame, parse_exact, DecodeResult, HarpFrame, PORT_DEVICE,
};
pub use operation::{Direction, RegisterOperation};
pub use reply::{Event, Reply};
