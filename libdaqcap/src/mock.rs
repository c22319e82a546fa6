use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::blob::DataBlob;
use crate::device::CaptureDevice;
use crate::error::Error;
use crate::frame::PacketFrame;
use crate::processor::PacketProcessor;

/// A scripted capture device for behavioural tests.
///
/// Construction takes no traffic; feed raw frame bytes with
/// [`push_batch`](MockDevice::push_batch). Every fetch consumes one batch and
/// runs it through the same frame parsing and stream accumulation as a real
/// device, so accumulator state spans fetches exactly as it does live. An
/// exhausted script fails with [`Error::TimeoutExpired`], which makes timeout
/// handling testable without a network.
pub struct MockDevice {
    name: String,
    description: String,
    open: AtomicBool,
    stop: AtomicBool,
    batches: Mutex<VecDeque<Vec<Vec<u8>>>>,
    processor: Mutex<PacketProcessor>,
}

impl MockDevice {
    pub fn new(name: &str, description: &str) -> MockDevice {
        MockDevice {
            name: name.to_string(),
            description: description.to_string(),
            open: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            batches: Mutex::new(VecDeque::new()),
            processor: Mutex::new(PacketProcessor::default()),
        }
    }

    /// Queues one fetch's worth of raw frames.
    pub fn push_batch(&self, frames: Vec<Vec<u8>>) {
        self.batches.lock().unwrap().push_back(frames);
    }

    /// Raw frames still queued.
    pub fn pending_frames(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

impl CaptureDevice for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn open(&self) {
        self.stop.store(false, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
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
        _timeout: Option<Duration>,
        packets_to_read: Option<usize>,
    ) -> Result<DataBlob, Error> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        if self.stop.swap(false, Ordering::SeqCst) {
            return Ok(self.processor.lock().unwrap().process(&[]));
        }

        let mut batches = self.batches.lock().unwrap();
        let mut batch = match batches.pop_front() {
            Some(batch) => batch,
            None => return Err(Error::TimeoutExpired),
        };

        // A cap below the batch size leaves the excess buffered for the next
        // fetch, like a real dispatch cycle would.
        if let Some(limit) = packets_to_read {
            if limit < batch.len() {
                let rest = batch.split_off(limit);
                batches.push_front(rest);
            }
        }
        drop(batches);

        let frames: Vec<PacketFrame> = batch
            .iter()
            .filter_map(|raw| PacketFrame::parse(raw).ok())
            .collect();

        Ok(self.processor.lock().unwrap().process(&frames))
    }
}
