use std::mem;

use crate::blob::DataBlob;
use crate::frame::{PacketFrame, IDLE_WORD, WORD_SIZE};

/// Stateful stream accumulator.
///
/// Unwinds variable-length frames into a word-aligned byte stream, detects
/// sequence gaps (including across fetch boundaries) and strips idle words.
/// Trailing bytes that do not complete a word are held back and re-scanned at
/// the start of the next call, so a word split across two fetches is never
/// emitted prematurely or misaligned.
#[derive(Debug, Default)]
pub struct PacketProcessor {
    // Most recent frame seen, kept across calls for boundary gap checks.
    last_frame: Option<PacketFrame>,
    // Trailing partial word from the previous call; always < WORD_SIZE long.
    carry: Vec<u8>,
    include_idle_words: bool,
}

impl PacketProcessor {
    pub fn new(include_idle_words: bool) -> PacketProcessor {
        PacketProcessor {
            last_frame: None,
            carry: Vec::new(),
            include_idle_words,
        }
    }

    /// Unpacks a batch of frames, in capture order, into a [`DataBlob`].
    ///
    /// An empty batch yields an empty blob and leaves all accumulator state
    /// untouched.
    pub fn process(&mut self, frames: &[PacketFrame]) -> DataBlob {
        if frames.is_empty() {
            return DataBlob::default();
        }

        // Lost packet check: one walk covers both the boundary with the
        // previous fetch and the frames within this one.
        let mut warnings = Vec::new();
        {
            let mut prev = self.last_frame.as_ref();
            for frame in frames {
                if let Some(prev) = prev {
                    let gap = PacketFrame::gap(prev, frame);
                    if gap != 0 {
                        warnings.push(format!(
                            "{} packets lost! Packet = {}, Last = {}",
                            gap,
                            frame.sequence(),
                            prev.sequence()
                        ));
                    }
                }
                prev = Some(frame);
            }
        }
        self.last_frame = frames.last().cloned();

        // Unwind payloads into a working buffer that starts with the bytes
        // carried over from the previous call.
        let mut buffer = mem::take(&mut self.carry);
        buffer.reserve(frames.iter().map(PacketFrame::len).sum());
        for frame in frames {
            buffer.extend_from_slice(frame.payload());
        }

        // Hold back the trailing partial word; the buffer now starts at a
        // word boundary and ends on one.
        let aligned = buffer.len() - buffer.len() % WORD_SIZE;
        self.carry = buffer.split_off(aligned);

        // Word-aligned scan: drop idle words, keep everything else. An idle
        // sequence straddling a frame boundary still lines up here because
        // the scan never starts mid-word.
        let mut data = Vec::with_capacity(buffer.len());
        for word in buffer.chunks_exact(WORD_SIZE) {
            if self.include_idle_words || word != IDLE_WORD {
                data.extend_from_slice(word);
            }
        }

        DataBlob::new(frames.len(), data, warnings)
    }

    /// Clears the accumulator: no last frame, no carried bytes. Called when a
    /// capture session ends.
    pub fn reset(&mut self) {
        self.last_frame = None;
        self.carry.clear();
    }

    /// When `include` is true, idle words are passed through instead of
    /// stripped.
    pub fn set_include_idle_words(&mut self, include: bool) {
        self.include_idle_words = include;
    }

    pub fn include_idle_words(&self) -> bool {
        self.include_idle_words
    }

    /// Bytes held back from the previous call.
    pub fn carry(&self) -> &[u8] {
        &self.carry
    }
}
