//! Error types for the raw-input subsystem
//!
//! Each error is scoped to the smallest unit it can spoil: a host query, a
//! single device during enumeration, or a single packet during dispatch.

use super::registry::{DeviceClass, DeviceHandle};
use thiserror::Error;

/// A failed query against the host platform
#[derive(Debug, Error)]
pub enum HostError {
    /// The native call reported failure
    #[error("{call} failed with os error {code}")]
    Os { call: &'static str, code: i32 },
    /// The fill step returned a different size than the size step announced
    #[error("{call} filled {actual} of {expected} announced units")]
    Truncated {
        call: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The host has nothing to answer with (unknown message, missing device)
    #[error("{0}")]
    Unavailable(String),
}

/// The device-list query failed; fatal to one enumeration call only
#[derive(Debug, Error)]
#[error("Device enumeration failed: {0}")]
pub struct EnumerationError(#[source] pub HostError);

/// Resolving a device path against the platform catalog failed.
///
/// Both variants are recovered locally: the device is simply not confirmed
/// as a keyboard.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed device path: {0:?}")]
    MalformedDevicePath(String),
    #[error("Catalog lookup for {key} failed: {reason}")]
    LookupFailed { key: String, reason: String },
}

/// A packet buffer could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer is shorter than the structure being read
    #[error("{what} needs {needed} bytes, buffer holds {actual}")]
    Size {
        what: &'static str,
        needed: usize,
        actual: usize,
    },
    /// A payload variant was requested that the header does not carry
    #[error("Header carries a {actual} payload, not {expected}")]
    WrongClass {
        expected: DeviceClass,
        actual: DeviceClass,
    },
}

/// Why a single packet produced no event.
///
/// None of these stop the dispatcher; the packet is dropped and the next one
/// is processed normally.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Truncated packet: expected {expected} bytes, got {actual}")]
    TruncatedPacket { expected: usize, actual: usize },
    #[error("Packet could not be read: {0}")]
    Host(#[source] HostError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A keyboard packet arrived from a device that enumeration did not keep
    #[error("Packet from unknown device {0}")]
    UnknownDevice(DeviceHandle),
}

impl From<HostError> for DispatchError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::Truncated {
                expected, actual, ..
            } => DispatchError::TruncatedPacket { expected, actual },
            other => DispatchError::Host(other),
        }
    }
}

/// The platform refused the keyboard usage registration
#[derive(Debug, Error)]
#[error("Raw input registration failed: {0}")]
pub struct RegistrationError(#[source] pub HostError);
