//! Recorded raw input sessions
//!
//! A [`Capture`] holds what a host reported about its devices plus the packets
//! it delivered, serialized as JSON. [`CaptureHost`] plays one back through
//! the same [`InputHost`] interface the live platform uses.

use crate::rawinput::{
    fill_sized, CatalogEntry, CatalogError, CatalogKey, DeviceClass, DeviceHandle,
    EnumerationError, HostError, InputHost, RawDeviceEntry,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

/// Error type for capture files
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Capture format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// A device as the host reported it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedDevice {
    pub handle: u64,
    /// Raw device class code
    pub class: u32,
    /// Interface path, empty if the host had none
    pub name: String,
    /// Catalog entry, absent if the lookup failed
    #[serde(default)]
    pub catalog: Option<CatalogEntry>,
}

/// A delivered packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPacket {
    /// Delivery parameter of the message
    pub param: isize,
    pub bytes: Vec<u8>,
}

/// A recorded session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub devices: Vec<CapturedDevice>,
    #[serde(default)]
    pub packets: Vec<CapturedPacket>,
}

impl Capture {
    /// Record the device set a host currently reports
    pub fn snapshot<H: InputHost>(host: &H) -> Result<Self, EnumerationError> {
        let entries = host.device_list().map_err(EnumerationError)?;
        let devices = entries
            .into_iter()
            .map(|entry| {
                let name = host.device_name(entry.handle).unwrap_or_default();
                let catalog = CatalogKey::parse(&name)
                    .and_then(|key| host.catalog_entry(&key))
                    .ok();
                CapturedDevice {
                    handle: entry.handle.0,
                    class: entry.class.raw(),
                    name,
                    catalog,
                }
            })
            .collect();

        Ok(Self {
            devices,
            packets: Vec::new(),
        })
    }

    pub fn push_packet(&mut self, param: isize, bytes: Vec<u8>) {
        self.packets.push(CapturedPacket { param, bytes });
    }

    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CaptureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<(), CaptureError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// [`InputHost`] that answers from a [`Capture`].
///
/// Messages are packet indices.
#[derive(Debug, Clone)]
pub struct CaptureHost {
    capture: Capture,
    device_list_error: Option<i32>,
}

impl CaptureHost {
    pub fn new(capture: Capture) -> Self {
        Self {
            capture,
            device_list_error: None,
        }
    }

    /// Make the device-list query fail with `code`, as a host whose device
    /// list is unavailable would
    pub fn failing_device_list(mut self, code: i32) -> Self {
        self.device_list_error = Some(code);
        self
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    /// Every message this host can deliver, in recorded order
    pub fn messages(&self) -> Range<usize> {
        0..self.capture.packets.len()
    }

    fn device(&self, handle: DeviceHandle) -> Option<&CapturedDevice> {
        self.capture.devices.iter().find(|d| d.handle == handle.0)
    }
}

impl InputHost for CaptureHost {
    type Message = usize;
    type Target = ();

    fn device_list(&self) -> Result<Vec<RawDeviceEntry>, HostError> {
        if let Some(code) = self.device_list_error {
            return Err(HostError::Os {
                call: "GetRawInputDeviceList",
                code,
            });
        }
        Ok(self
            .capture
            .devices
            .iter()
            .map(|d| RawDeviceEntry {
                handle: DeviceHandle(d.handle),
                class: DeviceClass::from_raw(d.class),
            })
            .collect())
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String, HostError> {
        self.device(handle)
            .map(|d| d.name.clone())
            .ok_or_else(|| HostError::Unavailable(format!("No device {}", handle)))
    }

    fn catalog_entry(&self, key: &CatalogKey) -> Result<CatalogEntry, CatalogError> {
        self.capture
            .devices
            .iter()
            .find(|d| CatalogKey::parse(&d.name).is_ok_and(|k| &k == key))
            .and_then(|d| d.catalog.clone())
            .ok_or_else(|| CatalogError::LookupFailed {
                key: key.subkey(),
                reason: "no catalog entry".to_string(),
            })
    }

    fn read_packet(&self, message: &usize) -> Result<Vec<u8>, HostError> {
        let packet = self
            .capture
            .packets
            .get(*message)
            .ok_or_else(|| HostError::Unavailable(format!("No packet {}", message)))?;
        let bytes = &packet.bytes;

        // The size step answers with the size the header announces, so a
        // recording cut short shows up as a short fill.
        let announced = bytes
            .get(4..8)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            .unwrap_or(bytes.len());

        fill_sized("GetRawInputData", |buf: Option<&mut [u8]>| match buf {
            None => Ok(announced),
            Some(out) => {
                let n = out.len().min(bytes.len());
                out[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
        })
    }

    fn delivery_param(&self, message: &usize) -> isize {
        self.capture
            .packets
            .get(*message)
            .map(|p| p.param)
            .unwrap_or(0)
    }

    fn register_keyboard(&self, _target: &()) -> Result<(), HostError> {
        Ok(())
    }
}
