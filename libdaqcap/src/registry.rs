use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;

use crate::config::{CaptureOptions, Config};
use crate::device::CaptureDevice;
use crate::pcap_device::PcapDevice;

lazy_static! {
    // Process-wide name-to-device map. Repeated enumeration must hand back
    // the same instance per interface name, so handles stay stable for the
    // lifetime of the process.
    static ref SYSTEM_DEVICES: Mutex<HashMap<String, Arc<PcapDevice>>> =
        Mutex::new(HashMap::new());
}

enum Backend {
    System(CaptureOptions),
    Fixed(Vec<Arc<dyn CaptureDevice>>),
}

/// Enumerates the host's capture interfaces and hands out stable,
/// name-keyed device handles.
pub struct DeviceRegistry {
    backend: Backend,
}

impl DeviceRegistry {
    /// A registry over the host's interfaces with default capture options.
    pub fn system() -> DeviceRegistry {
        DeviceRegistry::with_config(&Config::default())
    }

    /// A registry over the host's interfaces, with capture options read from
    /// `config`.
    pub fn with_config(config: &Config) -> DeviceRegistry {
        DeviceRegistry {
            backend: Backend::System(CaptureOptions::from_config(config)),
        }
    }

    /// A registry over a fixed, caller-supplied device list. Behavioural
    /// tests use this to swap in [`MockDevice`](crate::MockDevice)s.
    pub fn fixed(devices: Vec<Arc<dyn CaptureDevice>>) -> DeviceRegistry {
        DeviceRegistry {
            backend: Backend::Fixed(devices),
        }
    }

    /// One handle per host interface. Enumeration failure degrades to an
    /// empty list: a user with restricted permissions sees no devices, not
    /// an error.
    pub fn devices(&self) -> Vec<Arc<dyn CaptureDevice>> {
        match &self.backend {
            Backend::Fixed(devices) => devices.clone(),
            Backend::System(options) => {
                let found = match pcap::Device::list() {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("could not enumerate capture devices: {}", e);
                        return Vec::new();
                    }
                };
                let mut map = SYSTEM_DEVICES.lock().unwrap();
                found
                    .into_iter()
                    .map(|d| {
                        let device = map.entry(d.name.clone()).or_insert_with(|| {
                            let description = d
                                .desc
                                .unwrap_or_else(|| "(No description available)".to_string());
                            Arc::new(PcapDevice::new(d.name, description, options.clone()))
                        });
                        Arc::clone(device) as Arc<dyn CaptureDevice>
                    })
                    .collect()
            }
        }
    }

    /// A handle by exact name match, or `None`.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CaptureDevice>> {
        if name.is_empty() {
            return None;
        }
        self.devices().into_iter().find(|d| d.name() == name)
    }
}
