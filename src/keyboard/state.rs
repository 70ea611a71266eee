//! Per-device keystroke tracking

use super::{KeyEvent, VirtualKey};
use crate::rawinput::registry::DeviceHandle;
use std::collections::HashMap;
use std::time::Instant;

/// Keystroke statistics of a single keyboard
#[derive(Debug, Clone, Default)]
pub struct DeviceStats {
    /// Name at the time of the last keystroke
    pub name: String,
    /// Total key-downs attributed to the device
    pub keystrokes: u64,
    /// Key-downs per virtual key
    pub key_counts: HashMap<VirtualKey, u64>,
    pub first_keystroke: Option<Instant>,
    pub last_keystroke: Option<Instant>,
    pub last_label: Option<String>,
}

impl DeviceStats {
    /// Most pressed key, ties broken by lower code
    pub fn top_key(&self) -> Option<(VirtualKey, u64)> {
        self.key_counts
            .iter()
            .map(|(k, n)| (*k, *n))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }
}

/// Keystroke statistics across all keyboards
#[derive(Debug, Default)]
pub struct DeviceActivity {
    devices: HashMap<DeviceHandle, DeviceStats>,
    total_events: u64,
}

impl DeviceActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key event
    pub fn record(&mut self, event: &KeyEvent<'_>) {
        self.record_at(event, Instant::now());
    }

    fn record_at(&mut self, event: &KeyEvent<'_>, now: Instant) {
        self.total_events += 1;

        let stats = self.devices.entry(event.device.handle).or_default();
        stats.name = event.device.display_name().to_string();
        stats.keystrokes += 1;
        *stats.key_counts.entry(event.virtual_key).or_insert(0) += 1;
        stats.first_keystroke.get_or_insert(now);
        stats.last_keystroke = Some(now);
        stats.last_label = Some(event.key_label.clone());
    }

    pub fn get(&self, handle: DeviceHandle) -> Option<&DeviceStats> {
        self.devices.get(&handle)
    }

    /// Stats of every device that sent at least one key, in handle order
    pub fn devices(&self) -> Vec<(DeviceHandle, &DeviceStats)> {
        let mut all: Vec<_> = self.devices.iter().map(|(h, s)| (*h, s)).collect();
        all.sort_by_key(|(h, _)| *h);
        all
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Number of keyboards that have sent keys
    pub fn active_devices(&self) -> usize {
        self.devices.len()
    }

    pub fn reset(&mut self) {
        self.devices.clear();
        self.total_events = 0;
    }
}
