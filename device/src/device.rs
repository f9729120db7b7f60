//! Compute target identity.
//!
//! A [`Device`] is a `(type, index)` pair. Only one instance per device type is supported for now,
//! so every index other than 0 is rejected at construction.
//!
//! Device strings have the form `<type>[:<index>]`, with the type matched case-insensitively:
//!
//! - `"cpu"` -> `cpu:0`
//! - `"CUDA:0"` -> `cuda:0`
//! - `""` -> `cpu:0` (with a warning)

use std::fmt;
use std::str::FromStr;

use snafu::{OptionExt, ensure};

use crate::error::{
    Error, InvalidDeviceIndexSnafu, InvalidDeviceStringSnafu, Result, UnknownDeviceTypeSnafu,
    UnsupportedDeviceIndexSnafu,
};

/// Index of a device among devices of the same type.
pub type DeviceIndex = usize;

/// Kind of compute target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::VariantArray, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceType {
    Cpu,
    Cuda,
    Metal,
    Vulkan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Device {
    kind: DeviceType,
    index: DeviceIndex,
}

impl Device {
    /// Create a validated device identity.
    pub fn new(kind: DeviceType, index: DeviceIndex) -> Result<Self> {
        // TODO: lift the restriction once a second instance of any device type can be driven.
        ensure!(index == 0, UnsupportedDeviceIndexSnafu { kind, index });
        Ok(Self { kind, index })
    }

    pub const fn cpu() -> Self {
        Self { kind: DeviceType::Cpu, index: 0 }
    }

    /// Parse a `<type>[:<index>]` device string.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            tracing::warn!(device = %Self::cpu(), "empty device string, using the default device");
            return Ok(Self::cpu());
        }

        let parts: Vec<&str> = input.split(':').collect();
        let (name, index) = match parts.as_slice() {
            [name] => (*name, 0),
            [name, index] => {
                let parsed = index.parse().ok().context(InvalidDeviceIndexSnafu { input, index: *index })?;
                (*name, parsed)
            }
            _ => return InvalidDeviceStringSnafu { input }.fail(),
        };

        let kind = DeviceType::from_str(name).ok().context(UnknownDeviceTypeSnafu { name })?;
        Self::new(kind, index)
    }

    pub fn kind(&self) -> DeviceType {
        self.kind
    }

    pub fn index(&self) -> DeviceIndex {
        self.index
    }

    pub fn is_cpu(&self) -> bool {
        self.kind == DeviceType::Cpu
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::cpu()
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.index)
    }
}
