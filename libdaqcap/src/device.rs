use std::time::Duration;

use crate::blob::DataBlob;
use crate::error::Error;

/// Timeout sentinel: wait for frames indefinitely.
pub const FOREVER: Option<Duration> = None;

/// Packet cap sentinel: drain whatever the backend delivers in one dispatch
/// cycle.
pub const ALL_PACKETS: Option<usize> = None;

/// One capture interface: lifecycle, interruption and timed blocking fetch.
///
/// `fetch` must not be called concurrently, even across different device
/// instances; the capture backend dispatches through one buffer per process.
/// `interrupt` and `close` may be called from any thread while another thread
/// is inside `fetch`.
pub trait CaptureDevice: Send + Sync {
    /// Interface name, stable for the device's lifetime.
    fn name(&self) -> &str;

    /// Human-readable description, stable for the device's lifetime.
    fn description(&self) -> &str;

    /// Opens a live capture handle on the interface. Failures are logged and
    /// leave the device closed; callers test [`is_open`](Self::is_open)
    /// before fetching. No-op when already open.
    fn open(&self);

    fn is_open(&self) -> bool;

    /// Releases the capture handle, interrupting any fetch in flight and
    /// clearing the accumulator state. Idempotent.
    fn close(&self);

    /// Forces any blocked fetch to return promptly with whatever it has
    /// already received. Safe to call from any thread; no-op when closed.
    fn interrupt(&self);

    /// Whether [`interrupt`](Self::interrupt) can unblock a fetch on this
    /// device.
    fn supports_interrupt(&self) -> bool;

    /// When `include` is true, idle words are passed through instead of
    /// stripped.
    fn set_include_idle_words(&self, include: bool);

    /// Blocks up to `timeout` waiting for frames, then returns up to
    /// `packets_to_read` of them processed into a [`DataBlob`].
    ///
    /// [`FOREVER`] never times out; `Some(Duration::ZERO)` polls and returns
    /// immediately. [`ALL_PACKETS`] drains one dispatch cycle. Expiry with no
    /// frames received fails with [`Error::TimeoutExpired`]; an interrupt
    /// returns a well-formed empty-or-partial blob instead of an error.
    /// Fails with [`Error::NotOpen`] when the device is closed.
    fn fetch(
        &self,
        timeout: Option<Duration>,
        packets_to_read: Option<usize>,
    ) -> Result<DataBlob, Error>;
}
