//! Raw input packet decoding
//!
//! A packet is a fixed header followed by a payload whose layout depends on the
//! header's device class. The layout matches the 64-bit platform structures:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | device class |
//! | 4 | 4 | total packet size, header included |
//! | 8 | 8 | originating device handle |
//! | 16 | 8 | delivery code (foreground / sink) |
//! | 24 | 2 | keyboard: make code |
//! | 26 | 2 | keyboard: flags |
//! | 28 | 2 | keyboard: reserved |
//! | 30 | 2 | keyboard: virtual key |
//! | 32 | 4 | keyboard: window message |
//! | 36 | 4 | keyboard: extra information |
//!
//! All fields are little-endian. Decoding only borrows the buffer; it never
//! allocates.

use super::error::DecodeError;
use super::registry::{DeviceClass, DeviceHandle};
use crate::keyboard::VirtualKey;

/// Size of the packet header in bytes
pub const HEADER_SIZE: usize = 24;
/// Size of the keyboard payload in bytes
pub const KEYBOARD_PAYLOAD_SIZE: usize = 16;
/// Size of a complete keyboard packet
pub const KEYBOARD_PACKET_SIZE: usize = HEADER_SIZE + KEYBOARD_PAYLOAD_SIZE;

/// Key was released
pub const RI_KEY_BREAK: u16 = 0x0001;
/// Scan code carried the E0 prefix
pub const RI_KEY_E0: u16 = 0x0002;
/// Scan code carried the E1 prefix
pub const RI_KEY_E1: u16 = 0x0004;

const WM_KEYDOWN: u32 = 0x0100;
const WM_KEYUP: u32 = 0x0101;
const WM_SYSKEYDOWN: u32 = 0x0104;
const WM_SYSKEYUP: u32 = 0x0105;

/// How the platform delivered the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The target window was in the foreground
    Foreground,
    /// Delivered to a background input sink
    Sink,
    Other(u64),
}

impl Delivery {
    pub fn from_raw(code: u64) -> Self {
        match code {
            0 => Delivery::Foreground,
            1 => Delivery::Sink,
            other => Delivery::Other(other),
        }
    }

    pub fn raw(self) -> u64 {
        match self {
            Delivery::Foreground => 0,
            Delivery::Sink => 1,
            Delivery::Other(code) => code,
        }
    }
}

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Selects the payload variant
    pub class: DeviceClass,
    /// Total packet size in bytes, header included
    pub size: u32,
    /// Device that produced the packet
    pub device: DeviceHandle,
    pub delivery: Delivery,
}

/// The window message a keyboard packet stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    KeyDown,
    KeyUp,
    /// Key-down while Alt is held, or F10
    SysKeyDown,
    SysKeyUp,
    Other(u32),
}

impl MessageKind {
    pub fn from_raw(message: u32) -> Self {
        match message {
            WM_KEYDOWN => MessageKind::KeyDown,
            WM_KEYUP => MessageKind::KeyUp,
            WM_SYSKEYDOWN => MessageKind::SysKeyDown,
            WM_SYSKEYUP => MessageKind::SysKeyUp,
            other => MessageKind::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            MessageKind::KeyDown => WM_KEYDOWN,
            MessageKind::KeyUp => WM_KEYUP,
            MessageKind::SysKeyDown => WM_SYSKEYDOWN,
            MessageKind::SysKeyUp => WM_SYSKEYUP,
            MessageKind::Other(message) => message,
        }
    }

    /// Plain or modified key-down
    pub fn is_key_down(self) -> bool {
        matches!(self, MessageKind::KeyDown | MessageKind::SysKeyDown)
    }
}

/// Keyboard variant of the packet payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardPayload {
    /// Hardware scan code
    pub make_code: u16,
    /// `RI_KEY_*` bits
    pub flags: u16,
    pub virtual_key: VirtualKey,
    pub message: MessageKind,
    /// Device-specific extra information
    pub extra_info: u32,
}

/// Payload of a packet, selected by the header's device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Keyboard(KeyboardPayload),
    /// Mouse, HID and unknown payloads are left undecoded
    Opaque { class: DeviceClass, bytes: &'a [u8] },
}

/// A decoded packet.
///
/// Only [`decode`] builds one, so the payload variant always agrees with
/// `header.class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPacket<'a> {
    header: Header,
    payload: Payload<'a>,
}

impl<'a> InputPacket<'a> {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload<'a> {
        &self.payload
    }

    /// Keyboard fields, present only when the header says keyboard
    pub fn keyboard(&self) -> Option<&KeyboardPayload> {
        match &self.payload {
            Payload::Keyboard(kbd) => Some(kbd),
            Payload::Opaque { .. } => None,
        }
    }
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

fn require(what: &'static str, needed: usize, buffer: &[u8]) -> Result<(), DecodeError> {
    if buffer.len() < needed {
        return Err(DecodeError::Size {
            what,
            needed,
            actual: buffer.len(),
        });
    }
    Ok(())
}

/// Decode the packet header
pub fn decode_header(buffer: &[u8]) -> Result<Header, DecodeError> {
    require("header", HEADER_SIZE, buffer)?;

    let header = Header {
        class: DeviceClass::from_raw(le_u32(buffer, 0)),
        size: le_u32(buffer, 4),
        device: DeviceHandle(le_u64(buffer, 8)),
        delivery: Delivery::from_raw(le_u64(buffer, 16)),
    };

    // A header announcing more bytes than were delivered means the tail is missing
    require("packet", header.size as usize, buffer)?;

    Ok(header)
}

/// Decode the keyboard payload that follows `header`.
///
/// Fails with [`DecodeError::WrongClass`] unless the header is a keyboard header.
pub fn decode_keyboard_payload(
    buffer: &[u8],
    header: &Header,
) -> Result<KeyboardPayload, DecodeError> {
    if header.class != DeviceClass::Keyboard {
        return Err(DecodeError::WrongClass {
            expected: DeviceClass::Keyboard,
            actual: header.class,
        });
    }
    require("keyboard payload", KEYBOARD_PACKET_SIZE, buffer)?;

    let base = HEADER_SIZE;
    Ok(KeyboardPayload {
        make_code: le_u16(buffer, base),
        flags: le_u16(buffer, base + 2),
        // base + 4 is reserved
        virtual_key: VirtualKey(le_u16(buffer, base + 6)),
        message: MessageKind::from_raw(le_u32(buffer, base + 8)),
        extra_info: le_u32(buffer, base + 12),
    })
}

/// Decode a complete packet
pub fn decode(buffer: &[u8]) -> Result<InputPacket<'_>, DecodeError> {
    let header = decode_header(buffer)?;
    let payload = match header.class {
        DeviceClass::Keyboard => Payload::Keyboard(decode_keyboard_payload(buffer, &header)?),
        class => Payload::Opaque {
            class,
            bytes: &buffer[HEADER_SIZE..],
        },
    };
    Ok(InputPacket { header, payload })
}

/// Build the header bytes for a packet
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[0..4].copy_from_slice(&header.class.raw().to_le_bytes());
    out[4..8].copy_from_slice(&header.size.to_le_bytes());
    out[8..16].copy_from_slice(&header.device.0.to_le_bytes());
    out[16..24].copy_from_slice(&header.delivery.raw().to_le_bytes());
    out
}

/// Build a complete keyboard packet, as the platform would deliver it
pub fn encode_keyboard_packet(
    device: DeviceHandle,
    delivery: Delivery,
    payload: &KeyboardPayload,
) -> Vec<u8> {
    let header = Header {
        class: DeviceClass::Keyboard,
        size: KEYBOARD_PACKET_SIZE as u32,
        device,
        delivery,
    };

    let mut out = Vec::with_capacity(KEYBOARD_PACKET_SIZE);
    out.extend_from_slice(&encode_header(&header));
    out.extend_from_slice(&payload.make_code.to_le_bytes());
    out.extend_from_slice(&payload.flags.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&payload.virtual_key.0.to_le_bytes());
    out.extend_from_slice(&payload.message.raw().to_le_bytes());
    out.extend_from_slice(&payload.extra_info.to_le_bytes());
    out
}
