use crate::{
    frame::{
        BITS_PER_FRAME,
        LtcFrame,
        Span,
        layout,
    },
    timecode::{
        Field,
        FrameRate,
        InvalidField,
        Time,
        TimeCode,
        UserBits,
    },
};

/// Parses frames into timecodes and keeps track of the frame rate.
///
/// Until a rate is set explicitly, the rate is guessed from the highest frame
/// number seen so far.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimecodeCodec {
    rate: Option<FrameRate>,
    max_frame: Option<u8>,
}

impl TimecodeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(rate: FrameRate) -> Self {
        Self {
            rate: Some(rate),
            max_frame: None,
        }
    }

    /// The explicit rate, or the smallest rate consistent with all frames seen
    /// so far.
    pub fn rate(&self) -> Option<FrameRate> {
        self.rate.or_else(|| {
            self.max_frame
                .and_then(|max_frame| FrameRate::new(u32::from(max_frame) + 1))
        })
    }

    #[inline]
    pub fn explicit_rate(&self) -> Option<FrameRate> {
        self.rate
    }

    #[inline]
    pub fn set_rate(&mut self, rate: FrameRate) {
        self.rate = Some(rate);
    }

    #[inline]
    pub fn max_frame(&self) -> Option<u8> {
        self.max_frame
    }

    /// Sets the rate from a measured bit period.
    ///
    /// Leaves the rate untouched if the period doesn't match any known rate, or
    /// if the matching rate is too low for a frame number that was already
    /// parsed.
    pub fn infer_rate_from_bit_period(&mut self, bit_period: f64) -> Option<FrameRate> {
        self.infer_rate_from_frame_period(bit_period * BITS_PER_FRAME as f64)
    }

    /// Same as [`infer_rate_from_bit_period`](Self::infer_rate_from_bit_period),
    /// but with a period of a whole frame.
    pub fn infer_rate_from_frame_period(&mut self, frame_period: f64) -> Option<FrameRate> {
        let rate = FrameRate::from_frame_period(frame_period)?;
        if !self.admits(rate) {
            return None;
        }
        self.rate = Some(rate);
        Some(rate)
    }

    /// Whether all frame numbers seen so far fit into `rate`.
    pub fn admits(&self, rate: FrameRate) -> bool {
        self.max_frame
            .is_none_or(|max_frame| u32::from(max_frame) < rate.get())
    }

    /// Parses a frame.
    ///
    /// Fields are checked against their ranges. The frame number is only checked
    /// if the rate was set explicitly. Only frames that pass count towards the
    /// guessed rate.
    pub fn parse(&mut self, frame: &LtcFrame) -> Result<TimeCode, InvalidField> {
        let hours = read_decimal(frame, Field::Hours, layout::HOUR_TENS, layout::HOUR_UNITS)?;
        let minutes = read_decimal(
            frame,
            Field::Minutes,
            layout::MINUTE_TENS,
            layout::MINUTE_UNITS,
        )?;
        let seconds = read_decimal(
            frame,
            Field::Seconds,
            layout::SECOND_TENS,
            layout::SECOND_UNITS,
        )?;
        let frames = read_decimal(frame, Field::Frames, layout::FRAME_TENS, layout::FRAME_UNITS)?;

        let time = Time::new(hours, minutes, seconds, frames)?;
        if let Some(rate) = self.rate {
            time.check_rate(rate)?;
        }

        self.max_frame = Some(self.max_frame.map_or(frames, |max_frame| max_frame.max(frames)));

        let mut user_bits = UserBits::default();
        for (index, span) in layout::USER_BITS.into_iter().enumerate() {
            user_bits.set_group(index, frame.field(span));
        }

        let mut timecode = TimeCode::new(time)
            .with_user_bits(user_bits)
            .with_drop_frame(frame.bit(layout::DROP_FRAME));
        timecode.color_frame = frame.bit(layout::COLOR_FRAME);
        timecode.binary_group_flags = [
            frame.bit(layout::BINARY_GROUP_FLAG_1),
            frame.bit(layout::BINARY_GROUP_FLAG_2),
        ];
        if let Some(rate) = self.rate() {
            timecode.set_rate(rate)?;
        }

        Ok(timecode)
    }
}

fn read_decimal(frame: &LtcFrame, field: Field, tens: Span, units: Span) -> Result<u8, InvalidField> {
    let units = frame.field(units);
    if units > 9 {
        return Err(InvalidField::NotDecimal {
            field,
            digit: units,
        });
    }
    Ok(frame.field(tens) * 10 + units)
}
