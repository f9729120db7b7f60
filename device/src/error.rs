use snafu::Snafu;

use crate::device::DeviceType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Device string does not have the `<type>[:<index>]` form.
    #[snafu(display("cannot parse device string '{input}'"))]
    InvalidDeviceString { input: String },

    #[snafu(display("unknown device type '{name}'"))]
    UnknownDeviceType { name: String },

    #[snafu(display("device index '{index}' in '{input}' is not a number"))]
    InvalidDeviceIndex { input: String, index: String },

    /// Only one instance per device type is supported for now.
    #[snafu(display("device {kind} has no instance with index {index}, only index 0 is supported"))]
    UnsupportedDeviceIndex { kind: DeviceType, index: usize },

    /// Memory handed back to an allocator was null.
    #[snafu(display("cannot return a null pointer to the allocator"))]
    NullPointer,

    /// Memory handed back to an allocator was not issued by it or was already returned.
    #[snafu(display("pointer {address:#x} is not owned by the '{allocator}' allocator"))]
    ForeignPointer { address: usize, allocator: String },

    /// The host could not satisfy the request even after the cache was evicted.
    #[snafu(display("out of memory: cannot allocate {size} bytes on {allocator}"))]
    OutOfMemory { size: usize, allocator: String },

    #[snafu(display("invalid memory layout: {size} bytes aligned to {alignment}"))]
    InvalidLayout { size: usize, alignment: usize },

    /// A release context outlived the allocator that issued it.
    #[snafu(display("allocator that issued the buffer at {address:#x} no longer exists"))]
    AllocatorGone { address: usize },

    #[snafu(display("size mismatch: expected {expected}, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },
}
