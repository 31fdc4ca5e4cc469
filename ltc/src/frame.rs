//! The 80 bit LTC frame.
//!
//! A frame is stored as five 16 bit words. The earliest received bit (bit 0)
//! is the most significant bit of word 0, and the sync word occupies word 4.
//! Multi-bit fields are read with their earliest bit as the most significant
//! one.

use std::fmt::Debug;

pub const BITS_PER_FRAME: usize = 80;
pub const BITS_PER_WORD: usize = 16;
pub const WORDS_PER_FRAME: usize = BITS_PER_FRAME / BITS_PER_WORD;
pub const BYTES_PER_FRAME: usize = BITS_PER_FRAME / 8;

/// Fixed pattern in the last 16 bits of every frame.
pub const SYNC_WORD: u16 = 0x3ffd;

/// A range of bits in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }
}

pub mod layout {
    use super::Span;

    pub const FRAME_UNITS: Span = Span::new(0, 4);
    pub const FRAME_TENS: Span = Span::new(8, 2);
    pub const DROP_FRAME: usize = 10;
    pub const COLOR_FRAME: usize = 11;
    pub const SECOND_UNITS: Span = Span::new(16, 4);
    pub const SECOND_TENS: Span = Span::new(24, 3);
    pub const PARITY: usize = 27;
    pub const MINUTE_UNITS: Span = Span::new(32, 4);
    pub const MINUTE_TENS: Span = Span::new(40, 3);
    pub const BINARY_GROUP_FLAG_1: usize = 43;
    pub const HOUR_UNITS: Span = Span::new(48, 4);
    pub const HOUR_TENS: Span = Span::new(56, 2);
    pub const RESERVED: usize = 58;
    pub const BINARY_GROUP_FLAG_2: usize = 59;

    /// The 8 groups of user bits, in transmission order.
    pub const USER_BITS: [Span; 8] = [
        Span::new(4, 4),
        Span::new(12, 4),
        Span::new(20, 4),
        Span::new(28, 4),
        Span::new(36, 4),
        Span::new(44, 4),
        Span::new(52, 4),
        Span::new(60, 4),
    ];
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LtcFrame {
    words: [u16; WORDS_PER_FRAME],
}

impl LtcFrame {
    #[inline]
    pub fn from_words(words: [u16; WORDS_PER_FRAME]) -> Self {
        Self { words }
    }

    #[inline]
    pub fn words(&self) -> [u16; WORDS_PER_FRAME] {
        self.words
    }

    /// Bytes in transmission order, each most significant bit first.
    pub fn to_bytes(&self) -> [u8; BYTES_PER_FRAME] {
        let mut bytes = [0; BYTES_PER_FRAME];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(self.words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: [u8; BYTES_PER_FRAME]) -> Self {
        let mut words = [0; WORDS_PER_FRAME];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(2)) {
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Self { words }
    }

    /// Collects exactly 80 bits. Returns `None` if there are fewer.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Option<Self> {
        let mut frame = Self::default();
        let mut bits = bits.into_iter();
        for index in 0..BITS_PER_FRAME {
            frame.set_bit(index, bits.next()?);
        }
        Some(frame)
    }

    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        let (word, mask) = bit_position(index);
        self.words[word] & mask != 0
    }

    #[inline]
    pub fn set_bit(&mut self, index: usize, value: bool) {
        let (word, mask) = bit_position(index);
        if value {
            self.words[word] |= mask;
        }
        else {
            self.words[word] &= !mask;
        }
    }

    /// All 80 bits in transmission order.
    pub fn bits(self) -> impl Iterator<Item = bool> {
        (0..BITS_PER_FRAME).map(move |index| self.bit(index))
    }

    pub fn field(&self, span: Span) -> u8 {
        debug_assert!(span.len <= 8);
        (span.start..span.start + span.len)
            .fold(0, |value, index| (value << 1) | u8::from(self.bit(index)))
    }

    /// Writes the lowest `span.len` bits of `value`.
    pub fn set_field(&mut self, span: Span, value: u8) {
        debug_assert!(span.len <= 8);
        for offset in 0..span.len {
            let shift = span.len - 1 - offset;
            self.set_bit(span.start + offset, (value >> shift) & 1 != 0);
        }
    }

    #[inline]
    pub fn sync_word(&self) -> u16 {
        self.words[WORDS_PER_FRAME - 1]
    }

    #[inline]
    pub fn has_sync(&self) -> bool {
        self.sync_word() == SYNC_WORD
    }

    /// Number of set bits among the data bits (everything but the sync word).
    #[inline]
    fn data_ones(&self) -> u32 {
        self.words[..WORDS_PER_FRAME - 1]
            .iter()
            .map(|word| word.count_ones())
            .sum()
    }

    /// The parity bit that makes the data bits odd, matching the odd parity of
    /// the sync word.
    pub fn compute_parity(&self) -> bool {
        let ones = self.data_ones() - u32::from(self.bit(layout::PARITY));
        ones % 2 == 0
    }

    #[inline]
    pub fn update_parity(&mut self) {
        let parity = self.compute_parity();
        self.set_bit(layout::PARITY, parity);
    }

    /// Whether the parity bit agrees with the data bits.
    #[inline]
    pub fn parity_ok(&self) -> bool {
        self.data_ones() % 2 == 1
    }
}

#[inline]
fn bit_position(index: usize) -> (usize, u16) {
    debug_assert!(index < BITS_PER_FRAME);
    let shift = BITS_PER_WORD - 1 - index % BITS_PER_WORD;
    (index / BITS_PER_WORD, 1 << shift)
}

impl From<[u16; WORDS_PER_FRAME]> for LtcFrame {
    #[inline]
    fn from(value: [u16; WORDS_PER_FRAME]) -> Self {
        Self::from_words(value)
    }
}

impl Debug for LtcFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LtcFrame({:04x} {:04x} {:04x} {:04x} {:04x})",
            self.words[0], self.words[1], self.words[2], self.words[3], self.words[4]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LtcFrame,
        SYNC_WORD,
        layout,
    };

    #[test]
    fn it_addresses_bits_msb_first() {
        let mut frame = LtcFrame::default();
        frame.set_bit(0, true);
        frame.set_bit(17, true);
        frame.set_bit(79, true);
        assert_eq!(frame.words(), [0x8000, 0x4000, 0, 0, 0x0001]);
        assert!(frame.bit(17));
        assert!(!frame.bit(16));
    }

    #[test]
    fn it_reads_and_writes_fields() {
        let mut frame = LtcFrame::default();
        frame.set_field(layout::SECOND_TENS, 5);
        frame.set_field(layout::FRAME_UNITS, 7);
        assert_eq!(frame.field(layout::SECOND_TENS), 5);
        assert_eq!(frame.field(layout::FRAME_UNITS), 7);
        assert_eq!(frame.words()[0], 0x7000);
        assert_eq!(frame.words()[1], 0x00a0);
    }

    #[test]
    fn it_converts_words_to_bytes() {
        let frame = LtcFrame::from_words([0x1234, 0x5678, 0x9abc, 0xdef0, SYNC_WORD]);
        let bytes = frame.to_bytes();
        assert_eq!(bytes, [
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x3f, 0xfd
        ]);
        assert_eq!(LtcFrame::from_bytes(bytes), frame);
    }

    #[test]
    fn it_serializes_bits_in_transmission_order() {
        let frame = LtcFrame::from_words([0x8001, 0, 0, 0, SYNC_WORD]);
        let bits = frame.bits().collect::<Vec<_>>();
        assert_eq!(bits.len(), 80);
        assert!(bits[0]);
        assert!(bits[15]);
        assert_eq!(bits.iter().filter(|bit| **bit).count(), 2 + 13);
        assert_eq!(
            &bits[64..],
            &[
                false, false, true, true, true, true, true, true, true, true, true, true, true,
                true, false, true
            ]
        );
        assert_eq!(LtcFrame::from_bits(bits), Some(frame));
        assert_eq!(LtcFrame::from_bits([true; 79]), None);
    }

    #[test]
    fn parity_makes_data_bits_odd() {
        let mut frame = LtcFrame::from_words([0x0001, 0, 0, 0, SYNC_WORD]);
        frame.update_parity();
        assert!(!frame.bit(layout::PARITY));
        assert!(frame.parity_ok());

        let mut frame = LtcFrame::from_words([0x0003, 0, 0, 0, SYNC_WORD]);
        frame.update_parity();
        assert!(frame.bit(layout::PARITY));
        assert!(frame.parity_ok());

        // the whole frame, sync word included, ends up even
        let ones: u32 = frame.words().iter().map(|word| word.count_ones()).sum();
        assert_eq!(ones % 2, 0);

        frame.set_bit(3, true);
        assert!(!frame.parity_ok());
    }
}
