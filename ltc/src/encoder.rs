use crate::{
    frame::{
        LtcFrame,
        SYNC_WORD,
        Span,
        WORDS_PER_FRAME,
        layout,
    },
    timecode::{
        FrameRate,
        TimeCode,
        TimecodeError,
    },
};

/// Builds a frame from a timecode, with parity bit and sync word.
pub fn encode(timecode: &TimeCode) -> LtcFrame {
    let mut words = [0; WORDS_PER_FRAME];
    words[WORDS_PER_FRAME - 1] = SYNC_WORD;
    let mut frame = LtcFrame::from_words(words);

    write_decimal(
        &mut frame,
        timecode.frames(),
        layout::FRAME_TENS,
        layout::FRAME_UNITS,
    );
    write_decimal(
        &mut frame,
        timecode.seconds(),
        layout::SECOND_TENS,
        layout::SECOND_UNITS,
    );
    write_decimal(
        &mut frame,
        timecode.minutes(),
        layout::MINUTE_TENS,
        layout::MINUTE_UNITS,
    );
    write_decimal(
        &mut frame,
        timecode.hours(),
        layout::HOUR_TENS,
        layout::HOUR_UNITS,
    );

    for (index, span) in layout::USER_BITS.into_iter().enumerate() {
        frame.set_field(span, timecode.user_bits.group(index));
    }

    frame.set_bit(layout::DROP_FRAME, timecode.drop_frame);
    frame.set_bit(layout::COLOR_FRAME, timecode.color_frame);
    frame.set_bit(layout::BINARY_GROUP_FLAG_1, timecode.binary_group_flags[0]);
    frame.set_bit(layout::BINARY_GROUP_FLAG_2, timecode.binary_group_flags[1]);

    frame.update_parity();
    frame
}

fn write_decimal(frame: &mut LtcFrame, value: u8, tens: Span, units: Span) {
    frame.set_field(tens, value / 10);
    frame.set_field(units, value % 10);
}

/// Produces frames for consecutive timecodes.
#[derive(Clone, Copy, Debug)]
pub struct FrameEncoder {
    timecode: TimeCode,
}

impl FrameEncoder {
    /// Starts at `start`. Fails if `start` has a frame number that doesn't fit
    /// `rate`.
    pub fn new(start: TimeCode, rate: FrameRate) -> Result<Self, TimecodeError> {
        Ok(Self {
            timecode: start.with_rate(rate)?,
        })
    }

    /// The timecode of the next frame.
    #[inline]
    pub fn timecode(&self) -> &TimeCode {
        &self.timecode
    }

    /// Bits of all produced frames, in transmission order.
    pub fn bits(self) -> impl Iterator<Item = bool> {
        self.flat_map(LtcFrame::bits)
    }
}

impl Iterator for FrameEncoder {
    type Item = LtcFrame;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = encode(&self.timecode);
        // the rate is always set, so this can't fail
        self.timecode.increment(1).ok()?;
        Some(frame)
    }
}
