use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use pcap::{Active, Capture};

use crate::blob::DataBlob;
use crate::config::CaptureOptions;
use crate::device::CaptureDevice;
use crate::error::Error;
use crate::frame::PacketFrame;
use crate::processor::PacketProcessor;

/// A capture device backed by a libpcap handle.
///
/// The handle is opened non-blocking; `fetch` polls it in a loop, sleeping
/// `poll_interval` between empty cycles, until the packet cap is reached, a
/// non-empty buffer has been drained, the deadline passes or the interrupt
/// flag is raised. The flag-based loop means interruption works on every
/// platform, without kernel breakloop support.
pub struct PcapDevice {
    name: String,
    description: String,
    options: CaptureOptions,
    handle: Mutex<Option<Capture<Active>>>,
    // Mirrors handle.is_some(); readable without taking the handle lock,
    // which a blocked fetch holds.
    open: AtomicBool,
    stop: AtomicBool,
    processor: Mutex<PacketProcessor>,
}

impl PcapDevice {
    pub(crate) fn new(name: String, description: String, options: CaptureOptions) -> PcapDevice {
        let include_idle_words = options.include_idle_words;
        PcapDevice {
            name,
            description,
            options,
            handle: Mutex::new(None),
            open: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            processor: Mutex::new(PacketProcessor::new(include_idle_words)),
        }
    }

    fn activate(&self) -> Result<Capture<Active>, Error> {
        let device = pcap::Device::list()?
            .into_iter()
            .find(|d| d.name == self.name)
            .ok_or_else(|| Error::UnknownDevice(self.name.clone()))?;

        let mut cap = Capture::from_device(device)?
            .snaplen(self.options.snaplen)
            .promisc(self.options.promisc)
            .immediate_mode(self.options.immediate)
            .open()?;

        cap.filter(&self.options.filter_expression(), true)?;

        // Non-blocking: next_packet() reports TimeoutExpired instead of
        // blocking when the buffer is empty, so fetch controls its own
        // deadline and can observe the interrupt flag.
        let cap = cap.setnonblock()?;
        Ok(cap)
    }
}

impl CaptureDevice for PcapDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn open(&self) {
        let mut handle = self.handle.lock().unwrap();
        if handle.is_some() {
            return;
        }
        match self.activate() {
            Ok(cap) => {
                debug!("device {} open", self.name);
                self.stop.store(false, Ordering::SeqCst);
                *handle = Some(cap);
                self.open.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                // The partially acquired handle, filter included, was
                // released when activate() returned.
                warn!("could not open device {}: {}", self.name, e);
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        // Raise the flag first so an in-flight fetch lets go of the handle
        // lock promptly.
        self.stop.store(true, Ordering::SeqCst);
        let mut handle = self.handle.lock().unwrap();
        if handle.take().is_some() {
            debug!("device {} closed", self.name);
        }
        self.open.store(false, Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
        self.processor.lock().unwrap().reset();
    }

    fn interrupt(&self) {
        if !self.is_open() {
            return;
        }
        self.stop.store(true, Ordering::SeqCst);
    }

    fn supports_interrupt(&self) -> bool {
        true
    }

    fn set_include_idle_words(&self, include: bool) {
        self.processor.lock().unwrap().set_include_idle_words(include);
    }

    fn fetch(
        &self,
        timeout: Option<Duration>,
        packets_to_read: Option<usize>,
    ) -> Result<DataBlob, Error> {
        let mut handle = self.handle.lock().unwrap();
        let cap = match handle.as_mut() {
            Some(cap) => cap,
            None => return Err(Error::NotOpen),
        };

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut frames: Vec<PacketFrame> = Vec::new();

        loop {
            // The flag is consumed here, so one interrupt satisfies exactly
            // one fetch: the one in flight, or the next one.
            if self.stop.swap(false, Ordering::SeqCst) {
                debug!("fetch interrupted on {}", self.name);
                break;
            }
            if let Some(limit) = packets_to_read {
                if frames.len() >= limit {
                    break;
                }
            }
            match cap.next_packet() {
                Ok(packet) => match PacketFrame::parse(packet.data) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => debug!("dropping frame on {}: {}", self.name, e),
                },
                Err(pcap::Error::TimeoutExpired) => {
                    // Non-blocking handle: the buffer is empty right now.
                    if !frames.is_empty() {
                        break;
                    }
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            return Err(Error::TimeoutExpired);
                        }
                    }
                    thread::sleep(Duration::from_micros(self.options.poll_interval));
                }
                Err(e) => {
                    error!("capture failure on {}: {}", self.name, e);
                    return Err(Error::Pcap(e));
                }
            }
        }

        let mut processor = self.processor.lock().unwrap();
        Ok(processor.process(&frames))
    }
}
