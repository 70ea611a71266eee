//! Event dispatcher
//!
//! Turns keyboard packets into [`KeyEvent`]s attributed to a registered
//! device and hands them to subscribers.

use super::error::DispatchError;
use super::packet;
use super::registry::{DeviceClass, DeviceRegistry};
use crate::keyboard::{KeyEvent, SourceClassification};
use log::{debug, warn};

/// Callback receiving key events
pub type Subscriber = Box<dyn FnMut(&KeyEvent<'_>)>;

/// What happened to a packet that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A key event went out to subscribers
    Emitted,
    /// Mouse or other HID traffic
    NotKeyboard,
    /// Key-up or another non key-down message
    NotKeyDown,
    /// Virtual-key code produced by extended-key encoding
    ExtendedKeyArtifact,
}

/// Running packet counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub processed: u64,
    pub emitted: u64,
    /// Packets with a non-error outcome other than `Emitted`
    pub ignored: u64,
    /// Packets that ended in an error, unknown devices included
    pub failed: u64,
    pub unknown_device: u64,
}

/// Routes decoded keyboard packets to subscribers
#[derive(Default)]
pub struct Dispatcher {
    subscribers: Vec<Subscriber>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; subscribers are called in registration order
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&KeyEvent<'_>) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Process one packet.
    ///
    /// Emits at most one event. The device's cached last key is updated
    /// whether or not anyone is subscribed.
    pub fn process(
        &mut self,
        registry: &mut DeviceRegistry,
        buffer: &[u8],
        delivery_param: isize,
    ) -> Result<Outcome, DispatchError> {
        self.stats.processed += 1;
        let result = self.dispatch(registry, buffer, delivery_param);
        match &result {
            Ok(Outcome::Emitted) => self.stats.emitted += 1,
            Ok(_) => self.stats.ignored += 1,
            Err(e) => self.count_failure(e),
        }
        result
    }

    /// Account for a packet that failed before it could be processed
    pub fn drop_packet(&mut self, err: &DispatchError) {
        self.stats.processed += 1;
        self.count_failure(err);
    }

    fn count_failure(&mut self, err: &DispatchError) {
        self.stats.failed += 1;
        match err {
            DispatchError::UnknownDevice(handle) => {
                self.stats.unknown_device += 1;
                warn!("Keyboard packet from unregistered device {}", handle);
            }
            other => debug!("Dropped packet: {}", other),
        }
    }

    fn dispatch(
        &mut self,
        registry: &mut DeviceRegistry,
        buffer: &[u8],
        delivery_param: isize,
    ) -> Result<Outcome, DispatchError> {
        let header = packet::decode_header(buffer)?;
        if header.class != DeviceClass::Keyboard {
            return Ok(Outcome::NotKeyboard);
        }

        let kbd = packet::decode_keyboard_payload(buffer, &header)?;
        if !kbd.message.is_key_down() {
            return Ok(Outcome::NotKeyDown);
        }
        if kbd.virtual_key.is_extended_artifact() {
            return Ok(Outcome::ExtendedKeyArtifact);
        }

        let source = SourceClassification::from_delivery_param(delivery_param);
        let device = registry
            .record_key(header.device, kbd.virtual_key)
            .ok_or(DispatchError::UnknownDevice(header.device))?;

        let event = KeyEvent {
            device,
            virtual_key: kbd.virtual_key,
            key_label: kbd.virtual_key.name(),
            source,
            device_class: header.class,
            message: kbd.message,
            make_code: kbd.make_code,
            flags: kbd.flags,
        };
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }

        Ok(Outcome::Emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::VirtualKey;
    use crate::platform::capture::{Capture, CaptureHost, CapturedDevice};
    use crate::rawinput::catalog::{CatalogEntry, KEYBOARD_CLASS_GUID};
    use crate::rawinput::error::DecodeError;
    use crate::rawinput::packet::{
        encode_header, encode_keyboard_packet, Delivery, Header, KeyboardPayload, MessageKind,
        HEADER_SIZE,
    };
    use crate::rawinput::registry::DeviceHandle;
    use std::cell::RefCell;
    use std::rc::Rc;

    const LEFT: DeviceHandle = DeviceHandle(0x10041);
    const RIGHT: DeviceHandle = DeviceHandle(0x20043);

    fn registry() -> DeviceRegistry {
        let device = |handle: DeviceHandle, path: &str, desc: &str| CapturedDevice {
            handle: handle.0,
            class: 1,
            name: path.to_string(),
            catalog: Some(CatalogEntry::new(desc, KEYBOARD_CLASS_GUID)),
        };
        let host = CaptureHost::new(Capture {
            devices: vec![
                device(LEFT, r"\\?\HID#VID_1#1&0#{g}", "Left Keyboard"),
                device(RIGHT, r"\\?\HID#VID_2#2&0#{g}", "Right Keyboard"),
            ],
            packets: Vec::new(),
        });
        let mut registry = DeviceRegistry::default();
        registry.enumerate(&host).unwrap();
        registry
    }

    fn key(device: DeviceHandle, vk: u16, message: MessageKind) -> Vec<u8> {
        encode_keyboard_packet(
            device,
            Delivery::Foreground,
            &KeyboardPayload {
                make_code: 0x1E,
                flags: 0,
                virtual_key: VirtualKey(vk),
                message,
                extra_info: 0,
            },
        )
    }

    /// Subscribe a recorder that keeps `(handle, label, source)` of every event
    fn recorder(
        dispatcher: &mut Dispatcher,
    ) -> Rc<RefCell<Vec<(DeviceHandle, String, SourceClassification)>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        dispatcher.subscribe(move |event| {
            sink.borrow_mut()
                .push((event.device.handle, event.key_label.clone(), event.source));
        });
        seen
    }

    #[test]
    fn key_down_is_attributed_to_its_device() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let seen = recorder(&mut dispatcher);

        let outcome = dispatcher
            .process(&mut registry, &key(RIGHT, 0x41, MessageKind::KeyDown), 0)
            .unwrap();

        assert_eq!(outcome, Outcome::Emitted);
        assert_eq!(
            *seen.borrow(),
            vec![(RIGHT, "A".to_string(), SourceClassification::Key)]
        );
        let right = registry.get(RIGHT).unwrap();
        assert_eq!(right.last_virtual_key, Some(VirtualKey(0x41)));
        assert_eq!(right.last_key_label.as_deref(), Some("A"));
        assert_eq!(registry.get(LEFT).unwrap().last_virtual_key, None);
    }

    #[test]
    fn system_key_down_is_emitted() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let outcome = dispatcher
            .process(&mut registry, &key(LEFT, 0x73, MessageKind::SysKeyDown), 0)
            .unwrap();
        assert_eq!(outcome, Outcome::Emitted);
    }

    #[test]
    fn key_up_produces_no_event() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let seen = recorder(&mut dispatcher);

        let outcome = dispatcher
            .process(&mut registry, &key(LEFT, 0x41, MessageKind::KeyUp), 0)
            .unwrap();

        assert_eq!(outcome, Outcome::NotKeyDown);
        assert!(seen.borrow().is_empty());
        assert_eq!(registry.get(LEFT).unwrap().last_virtual_key, None);
    }

    #[test]
    fn extended_key_sentinel_is_discarded() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let seen = recorder(&mut dispatcher);

        let outcome = dispatcher
            .process(&mut registry, &key(LEFT, 0xFF, MessageKind::KeyDown), 0)
            .unwrap();

        assert_eq!(outcome, Outcome::ExtendedKeyArtifact);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn last_key_code_is_discarded_at_the_boundary() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let seen = recorder(&mut dispatcher);

        let outcome = dispatcher
            .process(&mut registry, &key(LEFT, 0xFE, MessageKind::KeyDown), 0)
            .unwrap();

        assert_eq!(outcome, Outcome::ExtendedKeyArtifact);
        assert!(seen.borrow().is_empty());
        assert_eq!(registry.get(LEFT).unwrap().last_virtual_key, None);
        assert_eq!(dispatcher.stats().ignored, 1);

        // One below is an ordinary key
        let outcome = dispatcher
            .process(&mut registry, &key(LEFT, 0xFD, MessageKind::KeyDown), 0)
            .unwrap();
        assert_eq!(outcome, Outcome::Emitted);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(
            registry.get(LEFT).unwrap().last_virtual_key,
            Some(VirtualKey(0xFD))
        );
    }

    #[test]
    fn mouse_packet_is_silently_ignored() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let seen = recorder(&mut dispatcher);
        let header = Header {
            class: DeviceClass::Mouse,
            size: (HEADER_SIZE + 24) as u32,
            device: DeviceHandle(0x40047),
            delivery: Delivery::Foreground,
        };
        let mut bytes = encode_header(&header).to_vec();
        bytes.extend_from_slice(&[0u8; 24]);

        let outcome = dispatcher.process(&mut registry, &bytes, 0).unwrap();

        assert_eq!(outcome, Outcome::NotKeyboard);
        assert!(seen.borrow().is_empty());
        assert_eq!(dispatcher.stats().failed, 0);
    }

    #[test]
    fn unregistered_device_is_reported() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let seen = recorder(&mut dispatcher);

        let err = dispatcher
            .process(
                &mut registry,
                &key(DeviceHandle(0xBAD), 0x41, MessageKind::KeyDown),
                0,
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::UnknownDevice(DeviceHandle(0xBAD))));
        assert!(seen.borrow().is_empty());
        assert_eq!(dispatcher.stats().unknown_device, 1);
    }

    #[test]
    fn short_buffer_is_size_error() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let bytes = key(LEFT, 0x41, MessageKind::KeyDown);

        let err = dispatcher
            .process(&mut registry, &bytes[..10], 0)
            .unwrap_err();

        assert!(matches!(err, DispatchError::Decode(DecodeError::Size { .. })));
        // The dispatcher keeps working afterwards
        let outcome = dispatcher.process(&mut registry, &bytes, 0).unwrap();
        assert_eq!(outcome, Outcome::Emitted);
    }

    #[test]
    fn cache_updates_without_subscribers() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.subscriber_count(), 0);

        dispatcher
            .process(&mut registry, &key(LEFT, 0x0D, MessageKind::KeyDown), 0)
            .unwrap();

        assert_eq!(
            registry.get(LEFT).unwrap().last_key_label.as_deref(),
            Some("Return")
        );
    }

    #[test]
    fn source_classification_is_kept_apart_from_device_class() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let classes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&classes);
        dispatcher.subscribe(move |event| {
            sink.borrow_mut().push((event.device_class, event.source));
        });

        let mouse_bits = 0x8000_0000u32 as i32 as isize;
        dispatcher
            .process(&mut registry, &key(LEFT, 0x41, MessageKind::KeyDown), mouse_bits)
            .unwrap();

        assert_eq!(
            *classes.borrow(),
            vec![(DeviceClass::Keyboard, SourceClassification::Mouse)]
        );
    }

    #[test]
    fn stats_track_outcomes() {
        let mut registry = registry();
        let mut dispatcher = Dispatcher::new();
        let _ = dispatcher.process(&mut registry, &key(LEFT, 0x41, MessageKind::KeyDown), 0);
        let _ = dispatcher.process(&mut registry, &key(LEFT, 0x41, MessageKind::KeyUp), 0);
        let _ = dispatcher.process(&mut registry, &[0u8; 4], 0);

        let stats = dispatcher.stats();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.failed, 1);
    }
}
