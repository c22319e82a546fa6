use std::io;
use std::io::Write;

use crate::frame::WORD_SIZE;

/// An integer type holding one word of miniDAQ data.
pub type Word = u64;

/// A blob of miniDAQ data produced by one fetch.
///
/// Blobs contain exactly an integral number of words; trailing bytes that do
/// not complete a word are carried by the processor into the next fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBlob {
    packets: usize,
    data: Vec<u8>,
    warnings: Vec<String>,
}

impl DataBlob {
    pub(crate) fn new(packets: usize, data: Vec<u8>, warnings: Vec<String>) -> DataBlob {
        debug_assert_eq!(data.len() % WORD_SIZE, 0);
        DataBlob {
            packets,
            data,
            warnings,
        }
    }

    /// Number of frames consumed to produce this blob.
    pub fn packet_count(&self) -> usize {
        self.packets
    }

    /// The packed data bytes, idle words removed. Always a multiple of
    /// [`WORD_SIZE`] in length.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Warnings generated during the fetch, in observation order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn word_count(&self) -> usize {
        self.data.len() / WORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Writes the data bytes to `out` with no padding or metadata. A `.dat`
    /// file is exactly the concatenation of successive blobs.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.data)
    }
}

/// Packs bytes into words, one per [`WORD_SIZE`]-byte group, reading each
/// group MSB-first. Trailing bytes that do not fill a group are dropped.
///
/// The result of [`DataBlob::data`] is always well-formed input.
pub fn pack_data(data: &[u8]) -> Vec<Word> {
    data.chunks_exact(WORD_SIZE)
        .map(|group| {
            group
                .iter()
                .fold(0, |word, &byte| (word << 8) | Word::from(byte))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_data_reads_groups_big_endian() {
        let words = pack_data(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(words, vec![0x0102030405]);
    }

    #[test]
    fn pack_data_packs_each_full_group() {
        let data: Vec<u8> = (1..=10).collect();
        let words = pack_data(&data);
        assert_eq!(words, vec![0x0102030405, 0x060708090A]);
    }

    #[test]
    fn pack_data_drops_trailing_partial_group() {
        let data: Vec<u8> = (1..=12).collect();
        assert_eq!(pack_data(&data).len(), 2);
    }

    #[test]
    fn pack_data_on_empty_input() {
        assert!(pack_data(&[]).is_empty());
    }

    #[test]
    fn pack_data_bit_layout() {
        let word = pack_data(&[0xA0, 0xB1, 0xC2, 0xD3, 0xE4])[0];
        assert_eq!(
            word,
            (0xA0u64 << 32) | (0xB1 << 24) | (0xC2 << 16) | (0xD3 << 8) | 0xE4
        );
    }

    #[test]
    fn pack_data_round_trips_blob_data() {
        let data: Vec<u8> = (0..20).collect();
        let blob = DataBlob::new(4, data.clone(), Vec::new());
        let words = pack_data(blob.data());
        assert_eq!(words.len(), blob.word_count());
        for (i, word) in words.iter().enumerate() {
            let encoded: Vec<u8> = word.to_be_bytes()[3..].to_vec();
            assert_eq!(&encoded[..], &data[i * WORD_SIZE..(i + 1) * WORD_SIZE]);
        }
    }

    #[test]
    fn write_to_emits_exactly_the_data() {
        let blob = DataBlob::new(1, vec![1, 2, 3, 4, 5], Vec::new());
        let mut out = Vec::new();
        blob.write_to(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn default_blob_is_empty() {
        let blob = DataBlob::default();
        assert_eq!(blob.packet_count(), 0);
        assert!(blob.is_empty());
        assert!(blob.warnings().is_empty());
    }
}
