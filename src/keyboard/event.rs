//! Key events delivered to subscribers

use super::VirtualKey;
use crate::rawinput::packet::{MessageKind, RI_KEY_E0, RI_KEY_E1};
use crate::rawinput::registry::{DeviceClass, DeviceIdentity};
use std::fmt;

const FAPPCOMMAND_MASK: u16 = 0xF000;
const FAPPCOMMAND_MOUSE: u16 = 0x8000;
const FAPPCOMMAND_OEM: u16 = 0x1000;

/// Coarse input source guessed from the delivery parameter.
///
/// This is independent of the packet's device class and may disagree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceClassification {
    Key,
    Mouse,
    Oem,
}

impl SourceClassification {
    /// Classify from the high word of the delivery parameter
    pub fn from_delivery_param(param: isize) -> Self {
        let high_word = ((param >> 16) & 0xFFFF) as u16;
        match high_word & FAPPCOMMAND_MASK {
            FAPPCOMMAND_MOUSE => SourceClassification::Mouse,
            FAPPCOMMAND_OEM => SourceClassification::Oem,
            _ => SourceClassification::Key,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceClassification::Key => "Key",
            SourceClassification::Mouse => "Mouse",
            SourceClassification::Oem => "OEM",
        }
    }
}

impl fmt::Display for SourceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key-down attributed to a specific keyboard.
///
/// `device` borrows the registry entry and is only valid for the duration of
/// the subscriber call.
#[derive(Debug, Clone)]
pub struct KeyEvent<'a> {
    pub device: &'a DeviceIdentity,
    pub virtual_key: VirtualKey,
    pub key_label: String,
    /// Guess from the delivery parameter
    pub source: SourceClassification,
    /// Class from the packet header
    pub device_class: DeviceClass,
    pub message: MessageKind,
    /// Hardware scan code
    pub make_code: u16,
    pub flags: u16,
}

impl KeyEvent<'_> {
    /// Whether the key was pressed with Alt held (system key-down)
    pub fn is_system_key(&self) -> bool {
        self.message == MessageKind::SysKeyDown
    }

    /// Whether the scan code carried an E0 or E1 prefix
    pub fn is_extended(&self) -> bool {
        self.flags & (RI_KEY_E0 | RI_KEY_E1) != 0
    }

    /// Short label with `[sys]` / `[ext]` markers, e.g. `Enter [ext]`
    pub fn short_text(&self) -> String {
        let mut text = self.virtual_key.label();
        if self.is_system_key() {
            text.push_str(" [sys]");
        }
        if self.is_extended() {
            text.push_str(" [ext]");
        }
        text
    }
}
