//! harplink-core: Core types, register model, and trait definitions
//! for harplink.
//!
//! This crate defines the device-agnostic building blocks the rest of
//! the workspace is assembled from. Applications usually depend on the
//! `harplink` facade crate instead.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`RegisterValue`] / [`PayloadType`] -- the typed register model
//! - [`RegisterMap`] -- shared register-table configuration
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod registers;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use harplink_core::*`.
pub use error::{Error, Result};
pub use registers::{Access, RegisterMap, RegisterSpec};
pub use transport::Transport;
pub use types::{HarpTimestamp, MessageType, PayloadType, RegisterValue};
