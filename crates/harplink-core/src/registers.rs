//! Register map configuration.
//!
//! A Harp device exposes its state as addressed, typed register slots.
//! Which address means what is device firmware detail; the core treats
//! registers as opaque slots and carries the map purely as shared
//! configuration so that scripts stop re-declaring ad-hoc address
//! tables.
//!
//! Maps are defined as factory functions that return a fully populated
//! [`RegisterMap`]: [`harp_common()`] for the registers every
//! Harp-compliant device implements, and [`white_rabbit()`] for the
//! White Rabbit synchronizer's application registers on top of them.

use crate::types::PayloadType;

/// Register address of the device timestamp (whole seconds), used by
/// the heartbeat keep-alive.
pub const TIMESTAMP_SECONDS: u8 = 8;

/// Whether a register can be read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    /// `true` if the register accepts reads.
    pub fn readable(self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    /// `true` if the register accepts writes.
    pub fn writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

/// Static description of one register slot.
#[derive(Debug, Clone)]
pub struct RegisterSpec {
    /// Register address (0–255).
    pub address: u8,
    /// Human-readable register name (e.g. "Counter").
    pub name: &'static str,
    /// Element type of the register payload.
    pub payload_type: PayloadType,
    /// Allowed access directions.
    pub access: Access,
}

/// A device's register table, supplied to the dispatcher as shared
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct RegisterMap {
    specs: Vec<RegisterSpec>,
}

impl RegisterMap {
    /// Create an empty map.
    pub fn new() -> Self {
        RegisterMap { specs: Vec::new() }
    }

    /// Add a register definition, replacing any previous entry at the
    /// same address.
    pub fn insert(&mut self, spec: RegisterSpec) {
        self.specs.retain(|s| s.address != spec.address);
        self.specs.push(spec);
    }

    /// Look up a register by address.
    pub fn by_address(&self, address: u8) -> Option<&RegisterSpec> {
        self.specs.iter().find(|s| s.address == address)
    }

    /// Look up a register by name.
    pub fn by_name(&self, name: &str) -> Option<&RegisterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Iterate over all registers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterSpec> {
        self.specs.iter()
    }

    /// Number of registers in the map.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// `true` if the map contains no registers.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// The common registers defined by the Harp protocol core, present on
/// every compliant device.
pub fn harp_common() -> RegisterMap {
    let mut map = RegisterMap::new();
    for spec in [
        RegisterSpec {
            address: 0,
            name: "WhoAmI",
            payload_type: PayloadType::U16,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: 1,
            name: "HardwareVersionHigh",
            payload_type: PayloadType::U8,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: 2,
            name: "HardwareVersionLow",
            payload_type: PayloadType::U8,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: 6,
            name: "FirmwareVersionHigh",
            payload_type: PayloadType::U8,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: 7,
            name: "FirmwareVersionLow",
            payload_type: PayloadType::U8,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: TIMESTAMP_SECONDS,
            name: "TimestampSeconds",
            payload_type: PayloadType::U32,
            access: Access::ReadWrite,
        },
        RegisterSpec {
            address: 9,
            name: "TimestampMicroseconds",
            payload_type: PayloadType::U16,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: 10,
            name: "OperationControl",
            payload_type: PayloadType::U8,
            access: Access::ReadWrite,
        },
        RegisterSpec {
            address: 11,
            name: "ResetDevice",
            payload_type: PayloadType::U8,
            access: Access::WriteOnly,
        },
        RegisterSpec {
            address: 12,
            name: "DeviceName",
            payload_type: PayloadType::U8,
            access: Access::ReadWrite,
        },
    ] {
        map.insert(spec);
    }
    map
}

/// Register map for the White Rabbit timing synchronizer: the Harp
/// common registers plus its application registers.
pub fn white_rabbit() -> RegisterMap {
    let mut map = harp_common();
    for spec in [
        RegisterSpec {
            address: 32,
            name: "ConnectedDevices",
            payload_type: PayloadType::U16,
            access: Access::ReadOnly,
        },
        RegisterSpec {
            address: 33,
            name: "Counter",
            payload_type: PayloadType::U32,
            access: Access::ReadWrite,
        },
        RegisterSpec {
            address: 34,
            name: "CounterFrequencyHz",
            payload_type: PayloadType::U16,
            access: Access::ReadWrite,
        },
        RegisterSpec {
            address: 35,
            name: "AuxPortMode",
            payload_type: PayloadType::U8,
            access: Access::ReadWrite,
        },
        RegisterSpec {
            address: 36,
            name: "AuxPortBaudRate",
            payload_type: PayloadType::U32,
            access: Access::ReadWrite,
        },
    ] {
        map.insert(spec);
    }
    map
}
