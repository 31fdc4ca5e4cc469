use crate::frame::{
    LtcFrame,
    SYNC_WORD,
    WORDS_PER_FRAME,
};

/// The last 80 received bits.
///
/// New bits enter at the low end of the last word and move towards the first
/// word, so once a frame is complete the window has the same layout as
/// [`LtcFrame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftWindow {
    words: [u16; WORDS_PER_FRAME],
}

impl ShiftWindow {
    pub fn push(&mut self, bit: bool) {
        let mut carry = bit;
        for word in self.words.iter_mut().rev() {
            let overflow = *word & 0x8000 != 0;
            *word = (*word << 1) | u16::from(carry);
            carry = overflow;
        }
    }

    /// The 16 most recently received bits.
    #[inline]
    pub fn newest_word(&self) -> u16 {
        self.words[WORDS_PER_FRAME - 1]
    }

    #[inline]
    pub fn to_frame(&self) -> LtcFrame {
        LtcFrame::from_words(self.words)
    }
}

/// Signalled whenever the newest 16 bits of the window match the sync word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReady {
    pub frame: LtcFrame,
    /// Number of sync matches so far, including this one.
    pub frame_count: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSynchronizer {
    window: ShiftWindow,
    frame_count: u64,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bit: bool) -> Option<FrameReady> {
        self.window.push(bit);

        self.is_sync_point().then(|| {
            self.frame_count += 1;
            if self.frame_count == 1 {
                tracing::debug!("first sync word found");
            }
            FrameReady {
                frame: self.window.to_frame(),
                frame_count: self.frame_count,
            }
        })
    }

    #[inline]
    pub fn is_sync_point(&self) -> bool {
        self.window.newest_word() == SYNC_WORD
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn window(&self) -> &ShiftWindow {
        &self.window
    }

    /// Yields a frame for every sync match in `bits`.
    pub fn frames<I>(&mut self, bits: I) -> Frames<'_, I::IntoIter>
    where
        I: IntoIterator<Item = bool>,
    {
        Frames {
            synchronizer: self,
            bits: bits.into_iter(),
        }
    }
}

#[derive(Debug)]
pub struct Frames<'a, I> {
    synchronizer: &'a mut FrameSynchronizer,
    bits: I,
}

impl<I> Iterator for Frames<'_, I>
where
    I: Iterator<Item = bool>,
{
    type Item = FrameReady;

    fn next(&mut self) -> Option<Self::Item> {
        self.bits.by_ref().find_map(|bit| self.synchronizer.push(bit))
    }
}
