//! Device registry
//!
//! Enumerates raw input devices, keeps the ones the platform catalog confirms
//! as keyboards, and remembers the last key each of them sent.

use super::catalog::CatalogKey;
use super::error::EnumerationError;
use super::host::{InputHost, RawDeviceEntry};
use crate::keyboard::VirtualKey;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;

/// Opaque platform handle of a raw input device.
///
/// Stable while the device stays attached; a replugged device may come back
/// under a different handle, or a handle may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceHandle(pub u64);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Coarse device type reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mouse,
    Keyboard,
    /// Any other human interface device
    Hid,
    Unknown(u32),
}

impl DeviceClass {
    pub fn from_raw(code: u32) -> Self {
        match code {
            0 => DeviceClass::Mouse,
            1 => DeviceClass::Keyboard,
            2 => DeviceClass::Hid,
            other => DeviceClass::Unknown(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            DeviceClass::Mouse => 0,
            DeviceClass::Keyboard => 1,
            DeviceClass::Hid => 2,
            DeviceClass::Unknown(code) => code,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeviceClass::Mouse => "MOUSE",
            DeviceClass::Keyboard => "KEYBOARD",
            DeviceClass::Hid => "HID",
            DeviceClass::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A confirmed keyboard known to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub handle: DeviceHandle,
    /// Platform interface path; only used to query the catalog
    pub raw_name: String,
    pub class: DeviceClass,
    /// Catalog description, if the catalog had one
    pub friendly_name: Option<String>,
    /// Most recent key-down attributed to this device
    pub last_virtual_key: Option<VirtualKey>,
    pub last_key_label: Option<String>,
}

impl DeviceIdentity {
    pub fn new(
        handle: DeviceHandle,
        raw_name: impl Into<String>,
        class: DeviceClass,
        friendly_name: Option<String>,
    ) -> Self {
        Self {
            handle,
            raw_name: raw_name.into(),
            class,
            friendly_name,
            last_virtual_key: None,
            last_key_label: None,
        }
    }

    pub fn class_label(&self) -> &'static str {
        self.class.label()
    }

    /// Friendly name, falling back to the raw path
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.raw_name)
    }
}

/// Name-based exclusion rules applied before the catalog is consulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Marker of the virtual root devices used by remote desktop sessions,
    /// matched case-insensitively
    pub virtual_root_marker: String,
    /// Accepted interface path prefixes
    pub path_prefixes: Vec<String>,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            virtual_root_marker: "ROOT".to_string(),
            path_prefixes: vec![r"\\?\".to_string(), r"\??\".to_string()],
        }
    }
}

impl DeviceFilter {
    pub fn is_virtual_root(&self, name: &str) -> bool {
        !self.virtual_root_marker.is_empty()
            && name
                .to_uppercase()
                .contains(&self.virtual_root_marker.to_uppercase())
    }

    pub fn has_device_prefix(&self, name: &str) -> bool {
        self.path_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// What one enumeration pass saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationSummary {
    /// Rows in the platform device list
    pub listed: usize,
    /// Skipped because the name query failed or returned nothing
    pub unnamed: usize,
    /// Remote desktop / terminal services root devices
    pub virtual_root: usize,
    /// Name does not start with a device interface prefix
    pub foreign_path: usize,
    /// Mouse or unknown class
    pub other_class: usize,
    /// Catalog answered, but not with the keyboard class
    pub not_keyboard: usize,
    /// Catalog could not be consulted
    pub catalog_failed: usize,
    /// Confirmed keyboards that were already registered
    pub already_known: usize,
    /// Confirmed keyboards registered by this pass
    pub added: usize,
}

/// Handle to identity mapping for confirmed keyboards
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceHandle, DeviceIdentity>,
    filter: DeviceFilter,
    last_summary: EnumerationSummary,
}

impl DeviceRegistry {
    pub fn new(filter: DeviceFilter) -> Self {
        Self {
            devices: BTreeMap::new(),
            filter,
            last_summary: EnumerationSummary::default(),
        }
    }

    /// Enumerate devices and register newly confirmed keyboards.
    ///
    /// Returns how many keyboards this call added. Handles already present
    /// are left untouched, so calling this again with the same devices
    /// attached returns 0. Devices that went away are never pruned here; use
    /// [`DeviceRegistry::refresh`] for that.
    pub fn enumerate<H: InputHost>(&mut self, host: &H) -> Result<usize, EnumerationError> {
        let entries = host.device_list().map_err(EnumerationError)?;
        let mut summary = EnumerationSummary {
            listed: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            let Some(identity) = self.examine(host, entry, &mut summary) else {
                continue;
            };
            match self.devices.entry(identity.handle) {
                Entry::Occupied(_) => summary.already_known += 1,
                Entry::Vacant(slot) => {
                    info!(
                        "Registered keyboard {} ({})",
                        identity.handle,
                        identity.display_name()
                    );
                    slot.insert(identity);
                    summary.added += 1;
                }
            }
        }

        debug!("Enumeration finished: {:?}", summary);
        self.last_summary = summary;
        Ok(summary.added)
    }

    /// Replace the whole registry with a fresh enumeration.
    ///
    /// This is the only way removed devices disappear. Cached last keys are
    /// discarded. On failure the current contents are kept.
    pub fn refresh<H: InputHost>(&mut self, host: &H) -> Result<usize, EnumerationError> {
        let mut fresh = DeviceRegistry::new(self.filter.clone());
        let count = fresh.enumerate(host)?;
        *self = fresh;
        info!("Registry refreshed: {} keyboard(s)", count);
        Ok(count)
    }

    /// Decide whether one device-list row is a keyboard worth keeping
    fn examine<H: InputHost>(
        &self,
        host: &H,
        entry: RawDeviceEntry,
        summary: &mut EnumerationSummary,
    ) -> Option<DeviceIdentity> {
        let name = match host.device_name(entry.handle) {
            Ok(name) => name,
            Err(e) => {
                debug!("Skipping {}: name query failed: {}", entry.handle, e);
                summary.unnamed += 1;
                return None;
            }
        };
        if name.is_empty() {
            summary.unnamed += 1;
            return None;
        }

        if self.filter.is_virtual_root(&name) {
            debug!("Skipping virtual root device {}", name);
            summary.virtual_root += 1;
            return None;
        }
        if !self.filter.has_device_prefix(&name) {
            debug!("Skipping {}: not a device interface path", name);
            summary.foreign_path += 1;
            return None;
        }
        if !matches!(entry.class, DeviceClass::Keyboard | DeviceClass::Hid) {
            summary.other_class += 1;
            return None;
        }

        if self.devices.contains_key(&entry.handle) {
            summary.already_known += 1;
            return None;
        }

        let catalog = CatalogKey::parse(&name).and_then(|key| host.catalog_entry(&key));
        match catalog {
            Ok(entry_info) if entry_info.is_keyboard_class() => {
                let description = entry_info.friendly_description();
                let friendly_name = (!description.is_empty()).then(|| description.to_string());
                Some(DeviceIdentity::new(entry.handle, name, entry.class, friendly_name))
            }
            Ok(entry_info) => {
                debug!(
                    "{} is {} device, class {}",
                    name, entry.class, entry_info.class_id
                );
                summary.not_keyboard += 1;
                None
            }
            Err(e) => {
                warn!("Treating {} as not a keyboard: {}", entry.handle, e);
                summary.catalog_failed += 1;
                None
            }
        }
    }

    /// Update the cached last key of a device.
    ///
    /// Returns the updated identity, or `None` if the handle is not registered.
    pub fn record_key(&mut self, handle: DeviceHandle, key: VirtualKey) -> Option<&DeviceIdentity> {
        let device = self.devices.get_mut(&handle)?;
        device.last_virtual_key = Some(key);
        device.last_key_label = Some(key.name());
        Some(&*device)
    }

    pub fn get(&self, handle: DeviceHandle) -> Option<&DeviceIdentity> {
        self.devices.get(&handle)
    }

    pub fn contains(&self, handle: DeviceHandle) -> bool {
        self.devices.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Registered keyboards in handle order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.devices.values()
    }

    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    /// Counters from the most recent enumeration
    pub fn last_summary(&self) -> EnumerationSummary {
        self.last_summary
    }
}
