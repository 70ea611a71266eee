//! Seam between the subsystem and the host platform
//!
//! Everything platform-specific (device list, device names, the catalog,
//! packet retrieval and usage registration) goes through [`InputHost`].
//! `platform::windows` talks to the real OS, `platform::capture` replays a
//! recorded session.

use super::catalog::{CatalogEntry, CatalogKey};
use super::error::{CatalogError, HostError};
use super::registry::{DeviceClass, DeviceHandle};

/// One row of the platform's device list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceEntry {
    pub handle: DeviceHandle,
    pub class: DeviceClass,
}

/// Services the raw-input subsystem needs from the host platform
pub trait InputHost {
    /// A delivered input notification (window message parameter on Windows)
    type Message;
    /// What keyboard usage is registered for (a window on Windows)
    type Target;

    /// Every attached raw input device
    fn device_list(&self) -> Result<Vec<RawDeviceEntry>, HostError>;

    /// Interface path of a device. An empty string is a valid answer.
    fn device_name(&self, handle: DeviceHandle) -> Result<String, HostError>;

    /// Catalog entry for a device.
    ///
    /// Missing keys and denied access are reported as
    /// [`CatalogError::LookupFailed`].
    fn catalog_entry(&self, key: &CatalogKey) -> Result<CatalogEntry, CatalogError>;

    /// Packet bytes carried by a message.
    ///
    /// A fill that returns a different size than announced is reported as
    /// [`HostError::Truncated`].
    fn read_packet(&self, message: &Self::Message) -> Result<Vec<u8>, HostError>;

    /// The parameter the message was delivered with; its high bits carry the
    /// coarse input source.
    fn delivery_param(&self, message: &Self::Message) -> isize;

    /// Ask for keyboard packets to be delivered to `target`
    fn register_keyboard(&self, target: &Self::Target) -> Result<(), HostError>;
}

/// Run a size-then-fill query as one call.
///
/// `query(None)` must report the number of elements required;
/// `query(Some(buf))` fills `buf` and reports how many elements it wrote. A
/// required size of zero yields an empty vector rather than an error. A fill
/// that writes a different count than announced fails with
/// [`HostError::Truncated`]. The buffer is dropped on every path.
pub fn fill_sized<T, F>(call: &'static str, mut query: F) -> Result<Vec<T>, HostError>
where
    T: Default + Clone,
    F: FnMut(Option<&mut [T]>) -> Result<usize, HostError>,
{
    let required = query(None)?;
    if required == 0 {
        return Ok(Vec::new());
    }

    let mut buffer = vec![T::default(); required];
    let filled = query(Some(&mut buffer))?;
    if filled != required {
        return Err(HostError::Truncated {
            call,
            expected: required,
            actual: filled,
        });
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_sized_returns_filled_buffer() {
        let source = [1u16, 2, 3];
        let result = fill_sized::<u16, _>("test", |buf| match buf {
            None => Ok(source.len()),
            Some(out) => {
                out.copy_from_slice(&source);
                Ok(out.len())
            }
        })
        .unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn zero_size_is_empty_not_error() {
        let mut fill_calls = 0;
        let result = fill_sized::<u8, _>("test", |buf| {
            if buf.is_some() {
                fill_calls += 1;
            }
            Ok(0)
        })
        .unwrap();
        assert!(result.is_empty());
        assert_eq!(fill_calls, 0);
    }

    #[test]
    fn short_fill_is_truncated() {
        let err = fill_sized::<u8, _>("GetRawInputData", |buf| match buf {
            None => Ok(40),
            Some(_) => Ok(24),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            HostError::Truncated {
                call: "GetRawInputData",
                expected: 40,
                actual: 24
            }
        ));
    }

    #[test]
    fn size_step_failure_propagates() {
        let err = fill_sized::<u8, _>("GetRawInputDeviceList", |_| {
            Err(HostError::Os {
                call: "GetRawInputDeviceList",
                code: 5,
            })
        })
        .unwrap_err();
        assert!(matches!(err, HostError::Os { code: 5, .. }));
    }
}
