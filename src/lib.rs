//! Multi Keyboard - per-device keystroke attribution
//!
//! Tells apart several keyboards attached to one machine by listening to raw
//! input instead of the merged keyboard stream, and reports every key-down
//! together with the keyboard that produced it.

pub mod config;
pub mod keyboard;
pub mod platform;
pub mod rawinput;
pub mod report;

pub use config::Config;
pub use rawinput::RawInput;
