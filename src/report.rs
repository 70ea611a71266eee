//! Session report and export functionality

use crate::keyboard::DeviceActivity;
use crate::rawinput::{DeviceRegistry, DispatchStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Complete session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: SessionSummary,
    /// One entry per keyboard
    pub devices: Vec<DeviceReport>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report generation timestamp
    pub generated_at: String,
    /// Application version
    pub version: String,
    /// Session duration in seconds
    pub duration_secs: f64,
}

/// Session summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Key events delivered to subscribers
    pub total_events: u64,
    /// Keyboards in the registry at the end of the session
    pub keyboards: usize,
    /// Keyboards that sent at least one key
    pub active_keyboards: usize,
    pub packets_processed: u64,
    pub packets_ignored: u64,
    pub packets_failed: u64,
    pub unknown_device_packets: u64,
}

/// Single keyboard entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Handle as printed in logs
    pub handle: String,
    pub name: String,
    pub raw_name: String,
    pub class: String,
    pub keystrokes: u64,
    /// Label of the most pressed key
    pub top_key: Option<String>,
    pub last_key: Option<String>,
}

impl SessionReport {
    /// Create a new session report
    pub fn new(
        duration: Duration,
        registry: &DeviceRegistry,
        activity: &DeviceActivity,
        stats: DispatchStats,
        include_idle_devices: bool,
    ) -> Self {
        let now: DateTime<Utc> = Utc::now();

        let devices = registry
            .iter()
            .filter_map(|device| {
                let activity = activity.get(device.handle);
                let keystrokes = activity.map_or(0, |a| a.keystrokes);
                if keystrokes == 0 && !include_idle_devices {
                    return None;
                }
                Some(DeviceReport {
                    handle: device.handle.to_string(),
                    name: device.display_name().to_string(),
                    raw_name: device.raw_name.clone(),
                    class: device.class_label().to_string(),
                    keystrokes,
                    top_key: activity
                        .and_then(|a| a.top_key())
                        .map(|(key, _)| key.name()),
                    last_key: device.last_key_label.clone(),
                })
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                generated_at: now.to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                duration_secs: duration.as_secs_f64(),
            },
            summary: SessionSummary {
                total_events: activity.total_events(),
                keyboards: registry.len(),
                active_keyboards: activity.active_devices(),
                packets_processed: stats.processed,
                packets_ignored: stats.ignored,
                packets_failed: stats.failed,
                unknown_device_packets: stats.unknown_device,
            },
            devices,
        }
    }

    /// Export report to JSON file
    pub fn export_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Export report to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::VirtualKey;
    use crate::platform::{Capture, CaptureHost, CapturedDevice};
    use crate::rawinput::packet::{encode_keyboard_packet, Delivery, KeyboardPayload, MessageKind};
    use crate::rawinput::{
        CatalogEntry, DeviceFilter, DeviceHandle, Dispatcher, KEYBOARD_CLASS_GUID,
    };
    use std::cell::RefCell;
    use std::env;
    use std::rc::Rc;

    fn keyboard(handle: u64, name: &str, description: &str) -> CapturedDevice {
        CapturedDevice {
            handle,
            class: 1,
            name: name.to_string(),
            catalog: Some(CatalogEntry::new(description, KEYBOARD_CLASS_GUID)),
        }
    }

    fn key_down(handle: u64, vkey: u16) -> Vec<u8> {
        encode_keyboard_packet(
            DeviceHandle(handle),
            Delivery::Foreground,
            &KeyboardPayload {
                make_code: 0,
                flags: 0,
                virtual_key: VirtualKey(vkey),
                message: MessageKind::KeyDown,
                extra_info: 0,
            },
        )
    }

    /// Two keyboards, only the first one types
    fn session() -> (DeviceRegistry, DeviceActivity, DispatchStats) {
        let host = CaptureHost::new(Capture {
            devices: vec![
                keyboard(0x10, r"\\?\HID#VID_1#1&0#{g}", "Left Keyboard"),
                keyboard(0x20, r"\\?\HID#VID_2#2&0#{g}", "Right Keyboard"),
            ],
            packets: Vec::new(),
        });
        let mut registry = DeviceRegistry::new(DeviceFilter::default());
        registry.enumerate(&host).unwrap();

        let activity = Rc::new(RefCell::new(DeviceActivity::new()));
        let mut dispatcher = Dispatcher::new();
        let sink = Rc::clone(&activity);
        dispatcher.subscribe(move |event| sink.borrow_mut().record(event));

        for vkey in [0x41, 0x41, 0x42] {
            dispatcher
                .process(&mut registry, &key_down(0x10, vkey), 0)
                .unwrap();
        }
        let _ = dispatcher.process(&mut registry, &key_down(0x99, 0x41), 0);

        let stats = dispatcher.stats();
        drop(dispatcher);
        let activity = Rc::try_unwrap(activity).unwrap().into_inner();
        (registry, activity, stats)
    }

    #[test]
    fn summary_counts() {
        let (registry, activity, stats) = session();
        let report =
            SessionReport::new(Duration::from_secs(2), &registry, &activity, stats, true);

        assert_eq!(report.summary.total_events, 3);
        assert_eq!(report.summary.keyboards, 2);
        assert_eq!(report.summary.active_keyboards, 1);
        assert_eq!(report.summary.packets_processed, 4);
        assert_eq!(report.summary.unknown_device_packets, 1);
        assert_eq!(report.metadata.duration_secs, 2.0);
        assert_eq!(report.metadata.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn device_entries() {
        let (registry, activity, stats) = session();
        let report = SessionReport::new(Duration::ZERO, &registry, &activity, stats, true);

        assert_eq!(report.devices.len(), 2);
        let left = &report.devices[0];
        assert_eq!(left.handle, "0x10");
        assert_eq!(left.name, "Left Keyboard");
        assert_eq!(left.class, "KEYBOARD");
        assert_eq!(left.keystrokes, 3);
        assert_eq!(left.top_key.as_deref(), Some("A"));
        assert_eq!(left.last_key.as_deref(), Some("B"));

        let right = &report.devices[1];
        assert_eq!(right.keystrokes, 0);
        assert_eq!(right.top_key, None);
        assert_eq!(right.last_key, None);
    }

    #[test]
    fn idle_devices_can_be_left_out() {
        let (registry, activity, stats) = session();
        let report = SessionReport::new(Duration::ZERO, &registry, &activity, stats, false);

        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.devices[0].name, "Left Keyboard");
    }

    #[test]
    fn export_json_writes_file() {
        let (registry, activity, stats) = session();
        let report = SessionReport::new(Duration::ZERO, &registry, &activity, stats, true);
        let path = env::temp_dir().join(format!("multi-keyboard-report-{}.json", std::process::id()));

        report.export_json(&path).expect("Failed to export report");
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();

        assert_eq!(parsed["summary"]["keyboards"], 2);
        assert_eq!(parsed["devices"][0]["name"], "Left Keyboard");
        assert!(report.to_json().unwrap().contains("generated_at"));

        let _ = std::fs::remove_file(&path);
    }
}
