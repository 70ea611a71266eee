//! Input hosts
//!
//! [`capture`] replays recorded sessions on any platform; [`windows`] talks to
//! the live Raw Input API.

pub mod capture;
#[cfg(target_os = "windows")]
pub mod windows;

pub use capture::{Capture, CaptureError, CaptureHost, CapturedDevice, CapturedPacket};
