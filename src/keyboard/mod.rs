//! Key vocabulary, key events and per-device activity

mod event;
mod state;
pub mod keymap;

pub use event::{KeyEvent, SourceClassification};
pub use state::{DeviceActivity, DeviceStats};
pub use keymap::{get_key_info, KeyInfo, VirtualKey, KEYMAP, VK_LAST_KEY};
