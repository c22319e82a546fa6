use std::sync::Arc;
use std::time::Duration;

use crate::blob::DataBlob;
use crate::device::CaptureDevice;
use crate::error::Error;
use crate::registry::DeviceRegistry;

/// Thin coordinator over one capture device.
///
/// Owns a [`DeviceRegistry`] for device lookup and at most one active
/// device; forwards fetch and interrupt to it. Ending a session (explicitly
/// or by drop) closes the device and clears the stream accumulator.
pub struct Session {
    registry: DeviceRegistry,
    device: Option<Arc<dyn CaptureDevice>>,
}

impl Session {
    /// A session over the host's interfaces.
    pub fn new() -> Session {
        Session::with_registry(DeviceRegistry::system())
    }

    pub fn with_registry(registry: DeviceRegistry) -> Session {
        Session {
            registry,
            device: None,
        }
    }

    /// Starts a capture session on `device`, ending any prior session first.
    ///
    /// Fails with [`Error::UnknownDevice`] when the device is not known to
    /// the registry. Opening itself is silent on failure: test
    /// [`CaptureDevice::is_open`] before fetching.
    pub fn start(&mut self, device: &Arc<dyn CaptureDevice>) -> Result<(), Error> {
        if self.registry.lookup(device.name()).is_none() {
            return Err(Error::UnknownDevice(device.name().to_string()));
        }
        self.end();
        device.open();
        self.device = Some(Arc::clone(device));
        Ok(())
    }

    /// Ends the session: closes the device and resets the accumulator.
    /// No-op when no session is active.
    pub fn end(&mut self) {
        if let Some(device) = self.device.take() {
            device.interrupt();
            device.close();
        }
    }

    /// The device of the active session, if any.
    pub fn device(&self) -> Option<&Arc<dyn CaptureDevice>> {
        self.device.as_ref()
    }

    /// Forwards to [`CaptureDevice::fetch`]. Fails with [`Error::NotOpen`]
    /// when no session has been started.
    pub fn fetch(
        &self,
        timeout: Option<Duration>,
        packets_to_read: Option<usize>,
    ) -> Result<DataBlob, Error> {
        match &self.device {
            Some(device) => device.fetch(timeout, packets_to_read),
            None => Err(Error::NotOpen),
        }
    }

    /// Forwards to [`CaptureDevice::interrupt`]. Safe to call from any
    /// thread; no-op when no session is active.
    pub fn interrupt(&self) {
        if let Some(device) = &self.device {
            device.interrupt();
        }
    }

    /// When `include` is true, idle words are passed through instead of
    /// stripped. No-op when no session is active.
    pub fn set_include_idle_words(&self, include: bool) {
        if let Some(device) = &self.device {
            device.set_include_idle_words(include);
        }
    }

    /// Delegates to [`DeviceRegistry::lookup`].
    pub fn device_by_name(&self, name: &str) -> Option<Arc<dyn CaptureDevice>> {
        self.registry.lookup(name)
    }

    /// Delegates to [`DeviceRegistry::devices`].
    pub fn all_devices(&self) -> Vec<Arc<dyn CaptureDevice>> {
        self.registry.devices()
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}
