//! Virtual-key codes and their display names

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Highest code the platform assigns to a real key (OEM Clear).
///
/// Key-down packets carrying a code at or above this value are artifacts of
/// extended-key encoding, not keystrokes.
pub const VK_LAST_KEY: u16 = 0xFE;

/// A platform virtual-key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    /// Whether this code is an extended-key artifact rather than a real key
    pub fn is_extended_artifact(&self) -> bool {
        self.0 >= VK_LAST_KEY
    }

    /// Display name of the key, e.g. `"Return"` or `"LShiftKey"`
    pub fn name(&self) -> String {
        get_key_info(*self).name.into_owned()
    }

    /// Short label for compact displays, e.g. `"Enter"` or `"Shift"`
    pub fn label(&self) -> String {
        get_key_info(*self).label.into_owned()
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Information about a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Name as the platform's key enumeration spells it
    pub name: Cow<'static, str>,
    /// Short label for compact displays
    pub label: Cow<'static, str>,
}

impl KeyInfo {
    const fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            label: Cow::Borrowed(label),
        }
    }

    /// Synthetic `VK_0xNN` entry for codes missing from the table
    fn unmapped(key: VirtualKey) -> Self {
        let text = format!("VK_0x{:02X}", key.0);
        Self {
            name: Cow::Owned(text.clone()),
            label: Cow::Owned(text),
        }
    }
}

/// Static table of virtual-key codes for a standard keyboard
pub static KEYMAP: LazyLock<HashMap<VirtualKey, KeyInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    let mut add = |code: u16, name: &'static str, label: &'static str| {
        map.insert(VirtualKey(code), KeyInfo::new(name, label));
    };

    // Editing and control
    add(0x03, "Cancel", "Cancel");
    add(0x08, "Back", "Bksp");
    add(0x09, "Tab", "Tab");
    add(0x0C, "Clear", "Clear");
    add(0x0D, "Return", "Enter");
    add(0x10, "ShiftKey", "Shift");
    add(0x11, "ControlKey", "Ctrl");
    add(0x12, "Menu", "Alt");
    add(0x13, "Pause", "Pause");
    add(0x14, "Capital", "Caps");
    add(0x15, "KanaMode", "Kana");
    add(0x17, "JunjaMode", "Junja");
    add(0x18, "FinalMode", "Final");
    add(0x19, "HanjaMode", "Hanja");
    add(0x1B, "Escape", "Esc");
    add(0x1C, "IMEConvert", "Conv");
    add(0x1D, "IMENonconvert", "NConv");
    add(0x20, "Space", "Space");

    // Navigation
    add(0x21, "PageUp", "PgUp");
    add(0x22, "Next", "PgDn");
    add(0x23, "End", "End");
    add(0x24, "Home", "Home");
    add(0x25, "Left", "←");
    add(0x26, "Up", "↑");
    add(0x27, "Right", "→");
    add(0x28, "Down", "↓");
    add(0x29, "Select", "Select");
    add(0x2A, "Print", "Print");
    add(0x2B, "Execute", "Exec");
    add(0x2C, "PrintScreen", "PrtSc");
    add(0x2D, "Insert", "Ins");
    add(0x2E, "Delete", "Del");
    add(0x2F, "Help", "Help");

    // Digit row
    add(0x30, "D0", "0");
    add(0x31, "D1", "1");
    add(0x32, "D2", "2");
    add(0x33, "D3", "3");
    add(0x34, "D4", "4");
    add(0x35, "D5", "5");
    add(0x36, "D6", "6");
    add(0x37, "D7", "7");
    add(0x38, "D8", "8");
    add(0x39, "D9", "9");

    // Letters
    add(0x41, "A", "A");
    add(0x42, "B", "B");
    add(0x43, "C", "C");
    add(0x44, "D", "D");
    add(0x45, "E", "E");
    add(0x46, "F", "F");
    add(0x47, "G", "G");
    add(0x48, "H", "H");
    add(0x49, "I", "I");
    add(0x4A, "J", "J");
    add(0x4B, "K", "K");
    add(0x4C, "L", "L");
    add(0x4D, "M", "M");
    add(0x4E, "N", "N");
    add(0x4F, "O", "O");
    add(0x50, "P", "P");
    add(0x51, "Q", "Q");
    add(0x52, "R", "R");
    add(0x53, "S", "S");
    add(0x54, "T", "T");
    add(0x55, "U", "U");
    add(0x56, "V", "V");
    add(0x57, "W", "W");
    add(0x58, "X", "X");
    add(0x59, "Y", "Y");
    add(0x5A, "Z", "Z");

    add(0x5B, "LWin", "Win");
    add(0x5C, "RWin", "Win");
    add(0x5D, "Apps", "Menu");
    add(0x5F, "Sleep", "Sleep");

    // Numpad
    add(0x60, "NumPad0", "Num0");
    add(0x61, "NumPad1", "Num1");
    add(0x62, "NumPad2", "Num2");
    add(0x63, "NumPad3", "Num3");
    add(0x64, "NumPad4", "Num4");
    add(0x65, "NumPad5", "Num5");
    add(0x66, "NumPad6", "Num6");
    add(0x67, "NumPad7", "Num7");
    add(0x68, "NumPad8", "Num8");
    add(0x69, "NumPad9", "Num9");
    add(0x6A, "Multiply", "*");
    add(0x6B, "Add", "+");
    add(0x6C, "Separator", "Sep");
    add(0x6D, "Subtract", "-");
    add(0x6E, "Decimal", ".");
    add(0x6F, "Divide", "/");

    // Function keys
    const FUNCTION_KEYS: [&str; 24] = [
        "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13",
        "F14", "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
    ];
    for (offset, name) in FUNCTION_KEYS.into_iter().enumerate() {
        add(0x70 + offset as u16, name, name);
    }

    add(0x90, "NumLock", "NumLk");
    add(0x91, "Scroll", "ScrLk");

    // Left/right modifiers
    add(0xA0, "LShiftKey", "Shift");
    add(0xA1, "RShiftKey", "Shift");
    add(0xA2, "LControlKey", "Ctrl");
    add(0xA3, "RControlKey", "Ctrl");
    add(0xA4, "LMenu", "Alt");
    add(0xA5, "RMenu", "Alt");

    // Browser and media
    add(0xA6, "BrowserBack", "Back");
    add(0xA7, "BrowserForward", "Fwd");
    add(0xA8, "BrowserRefresh", "Refresh");
    add(0xA9, "BrowserStop", "Stop");
    add(0xAA, "BrowserSearch", "Search");
    add(0xAB, "BrowserFavorites", "Fav");
    add(0xAC, "BrowserHome", "WebHome");
    add(0xAD, "VolumeMute", "Mute");
    add(0xAE, "VolumeDown", "Vol-");
    add(0xAF, "VolumeUp", "Vol+");
    add(0xB0, "MediaNextTrack", "Next");
    add(0xB1, "MediaPreviousTrack", "Prev");
    add(0xB2, "MediaStop", "Stop");
    add(0xB3, "MediaPlayPause", "Play");
    add(0xB4, "LaunchMail", "Mail");
    add(0xB5, "SelectMedia", "Media");
    add(0xB6, "LaunchApplication1", "App1");
    add(0xB7, "LaunchApplication2", "App2");

    // OEM punctuation
    add(0xBA, "OemSemicolon", ";");
    add(0xBB, "Oemplus", "=");
    add(0xBC, "Oemcomma", ",");
    add(0xBD, "OemMinus", "-");
    add(0xBE, "OemPeriod", ".");
    add(0xBF, "OemQuestion", "/");
    add(0xC0, "Oemtilde", "`");
    add(0xDB, "OemOpenBrackets", "[");
    add(0xDC, "OemPipe", "\\");
    add(0xDD, "OemCloseBrackets", "]");
    add(0xDE, "OemQuotes", "'");
    add(0xDF, "Oem8", "Oem8");
    add(0xE2, "OemBackslash", "\\");
    add(0xE5, "ProcessKey", "Proc");
    add(0xE7, "Packet", "Packet");
    add(0xF6, "Attn", "Attn");
    add(0xF7, "Crsel", "CrSel");
    add(0xF8, "Exsel", "ExSel");
    add(0xF9, "EraseEof", "ErEof");
    add(0xFA, "Play", "Play");
    add(0xFB, "Zoom", "Zoom");
    add(0xFD, "Pa1", "PA1");
    add(0xFE, "OemClear", "Clear");

    map
});

/// Get key info by code; unmapped codes get a synthetic `VK_0xNN` entry
pub fn get_key_info(key: VirtualKey) -> KeyInfo {
    KEYMAP
        .get(&key)
        .cloned()
        .unwrap_or_else(|| KeyInfo::unmapped(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_digits_use_platform_names() {
        assert_eq!(VirtualKey(0x41).name(), "A");
        assert_eq!(VirtualKey(0x5A).name(), "Z");
        assert_eq!(VirtualKey(0x30).name(), "D0");
        assert_eq!(VirtualKey(0x0D).name(), "Return");
    }

    #[test]
    fn function_keys_are_contiguous() {
        assert_eq!(VirtualKey(0x70).name(), "F1");
        assert_eq!(VirtualKey(0x7B).name(), "F12");
        assert_eq!(VirtualKey(0x87).name(), "F24");
    }

    #[test]
    fn unmapped_code_gets_hex_label() {
        let info = get_key_info(VirtualKey(0x07));
        assert_eq!(info.name, "VK_0x07");
        assert_eq!(info.label, "VK_0x07");
        assert_eq!(VirtualKey(0x07).name(), info.name);
        assert_eq!(VirtualKey(0x07).label(), "VK_0x07");
    }

    #[test]
    fn lookup_and_methods_agree() {
        for code in [0x0D, 0x41, 0xA0, 0xBE, 0xFE] {
            let key = VirtualKey(code);
            let info = get_key_info(key);
            assert_eq!(key.name(), info.name);
            assert_eq!(key.label(), info.label);
        }
    }

    #[test]
    fn labels_are_short_forms() {
        assert_eq!(VirtualKey(0x0D).label(), "Enter");
        assert_eq!(VirtualKey(0xA0).label(), "Shift");
        assert_eq!(VirtualKey(0xBE).label(), ".");
    }

    #[test]
    fn extended_artifact_threshold() {
        assert!(!VirtualKey(0xFD).is_extended_artifact());
        assert!(VirtualKey(VK_LAST_KEY).is_extended_artifact());
        assert!(VirtualKey(0xFF).is_extended_artifact());
    }
}
