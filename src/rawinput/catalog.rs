//! Device catalog keys and entries
//!
//! Raw input names a device by an interface path such as
//! `\\?\HID#VID_046D&PID_C31C&MI_00#7&1a2b3c4d&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}`.
//! The first three `#` segments after the four character prefix locate the
//! device's entry in the platform catalog, which holds its description and
//! setup class.

use super::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Setup class identifier of keyboard devices
pub const KEYBOARD_CLASS_GUID: &str = "{4D36E96B-E325-11CE-BFC1-08002BE10318}";

/// Length of the `\\?\` / `\??\` prefix in front of every device path
const PATH_PREFIX_LEN: usize = 4;

/// Location of a device in the platform catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    /// Enumerator, e.g. `ACPI`, `HID`, `USB`
    pub bus_id: String,
    /// Hardware id, e.g. `PNP0303`
    pub device_id: String,
    /// Instance id, e.g. `3&13c0b0c5&0`
    pub instance_id: String,
}

impl CatalogKey {
    /// Parse the catalog key out of a raw device path.
    ///
    /// Fails with [`CatalogError::MalformedDevicePath`] when the path has fewer
    /// than three non-empty `#` segments after its prefix.
    pub fn parse(path: &str) -> Result<Self, CatalogError> {
        let malformed = || CatalogError::MalformedDevicePath(path.to_string());

        let body = path.get(PATH_PREFIX_LEN..).ok_or_else(malformed)?;
        let mut segments = body.split('#');
        let mut next = || {
            segments
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(malformed)
        };

        Ok(Self {
            bus_id: next()?,
            device_id: next()?,
            instance_id: next()?,
        })
    }

    /// Catalog subkey, `bus\device\instance`
    pub fn subkey(&self) -> String {
        format!("{}\\{}\\{}", self.bus_id, self.device_id, self.instance_id)
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subkey())
    }
}

/// What the catalog knows about a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Free-text description, possibly an indirect `@file,%id%;text` string
    pub description: String,
    /// Setup class identifier
    pub class_id: String,
}

impl CatalogEntry {
    pub fn new(description: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            class_id: class_id.into(),
        }
    }

    /// Whether the catalog files this device under the keyboard class
    pub fn is_keyboard_class(&self) -> bool {
        self.class_id.trim().eq_ignore_ascii_case(KEYBOARD_CLASS_GUID)
    }

    /// Description with any indirect-string prefix removed.
    ///
    /// `@keyboard.inf,%hid_device_system_keyboard%;HID Keyboard Device`
    /// becomes `HID Keyboard Device`.
    pub fn friendly_description(&self) -> &str {
        let desc = self.description.trim();
        if desc.starts_with('@') {
            if let Some((_, text)) = desc.rsplit_once(';') {
                return text.trim();
            }
        }
        desc
    }
}
