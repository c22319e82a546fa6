//! Live capture of the fixed-format data stream emitted by a miniDAQ device
//! onto a local Ethernet segment.
//!
//! A consumer picks a device from the [`DeviceRegistry`], opens a capture
//! session on it and pulls batches of word-aligned data with
//! [`Session::fetch`]. Each batch is returned as a [`DataBlob`] carrying the
//! packet count and any warnings about packets lost since the previous batch.

#[macro_use]
extern crate log;

mod blob;
mod config;
mod device;
mod error;
mod frame;
mod mock;
mod pcap_device;
mod processor;
mod registry;
mod session;

pub use blob::*;
pub use config::*;
pub use device::*;
pub use error::Error;
pub use frame::*;
pub use mock::MockDevice;
pub use pcap_device::PcapDevice;
pub use processor::PacketProcessor;
pub use registry::DeviceRegistry;
pub use session::Session;
