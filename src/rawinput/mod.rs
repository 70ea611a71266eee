//! Raw input subsystem
//!
//! Three parts, leaves first:
//! - [`registry`]: which keyboards exist and what they last typed
//! - [`packet`]: decoding of the binary packets the platform delivers
//! - [`dispatcher`]: turning keyboard packets into per-device key events
//!
//! [`RawInput`] ties them to an [`InputHost`]. It is single-threaded: the host
//! calls [`RawInput::handle_message`] from its event thread, and callers that
//! share an instance across threads must serialize access themselves.

pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod packet;
pub mod registry;

pub use catalog::{CatalogEntry, CatalogKey, KEYBOARD_CLASS_GUID};
pub use dispatcher::{DispatchStats, Dispatcher, Outcome};
pub use error::{
    CatalogError, DecodeError, DispatchError, EnumerationError, HostError, RegistrationError,
};
pub use host::{fill_sized, InputHost, RawDeviceEntry};
pub use packet::{InputPacket, KeyboardPayload, MessageKind, Payload};
pub use registry::{
    DeviceClass, DeviceFilter, DeviceHandle, DeviceIdentity, DeviceRegistry, EnumerationSummary,
};

use crate::keyboard::KeyEvent;
use log::info;

/// Host, registry and dispatcher bundled together
pub struct RawInput<H: InputHost> {
    host: H,
    registry: DeviceRegistry,
    dispatcher: Dispatcher,
}

impl<H: InputHost> RawInput<H> {
    /// Register for keyboard input on `target`.
    ///
    /// This is the only fallible step of construction; a host that refuses
    /// registration cannot deliver anything. The registry starts empty, call
    /// [`RawInput::enumerate`] to fill it.
    pub fn register(
        host: H,
        target: &H::Target,
        filter: DeviceFilter,
    ) -> Result<Self, RegistrationError> {
        host.register_keyboard(target).map_err(RegistrationError)?;
        info!("Registered for raw keyboard input");
        Ok(Self {
            host,
            registry: DeviceRegistry::new(filter),
            dispatcher: Dispatcher::new(),
        })
    }

    /// Register newly attached keyboards; see [`DeviceRegistry::enumerate`]
    pub fn enumerate(&mut self) -> Result<usize, EnumerationError> {
        self.registry.enumerate(&self.host)
    }

    /// Rebuild the registry from scratch; see [`DeviceRegistry::refresh`]
    pub fn refresh(&mut self) -> Result<usize, EnumerationError> {
        self.registry.refresh(&self.host)
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&KeyEvent<'_>) + 'static,
    {
        self.dispatcher.subscribe(subscriber);
    }

    /// Read the packet carried by `message` and dispatch it
    pub fn handle_message(&mut self, message: &H::Message) -> Result<Outcome, DispatchError> {
        let bytes = match self.host.read_packet(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = DispatchError::from(e);
                self.dispatcher.drop_packet(&err);
                return Err(err);
            }
        };
        let param = self.host.delivery_param(message);
        self.dispatcher.process(&mut self.registry, &bytes, param)
    }

    /// Dispatch packet bytes that were already read from the host
    pub fn handle_packet(
        &mut self,
        bytes: &[u8],
        delivery_param: isize,
    ) -> Result<Outcome, DispatchError> {
        self.dispatcher
            .process(&mut self.registry, bytes, delivery_param)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}
