use std::convert::From;
use std::fmt;
use std::io;

use crate::frame::MIN_FRAME_SIZE;

/// Library error kinds.
#[derive(Debug)]
pub enum Error {
    /// A raw frame too short to hold the preamble and trailer. Raised by
    /// frame parsing and absorbed at intake; the frame is dropped.
    MalformedFrame(usize),
    /// Data was requested without an open capture session.
    NotOpen,
    /// The fetch deadline passed without any qualifying frames arriving.
    TimeoutExpired,
    /// The named device is not known to the registry.
    UnknownDevice(String),
    /// The underlying capture stack reported a failure.
    Pcap(pcap::Error),
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedFrame(len) => write!(
                f,
                "malformed frame: {} bytes, expected at least {}",
                len, MIN_FRAME_SIZE
            ),
            Error::NotOpen => write!(f, "data cannot be fetched without an open session"),
            Error::TimeoutExpired => write!(f, "fetch timed out"),
            Error::UnknownDevice(name) => write!(f, "device {} does not exist", name),
            Error::Pcap(e) => write!(f, "capture error: {}", e),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pcap(e) => Some(e),
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<pcap::Error> for Error {
    fn from(e: pcap::Error) -> Self {
        Error::Pcap(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}
