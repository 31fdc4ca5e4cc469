use std::{
    fmt::{
        Debug,
        Display,
    },
    num::{
        NonZeroU32,
        ParseIntError,
    },
    str::FromStr,
};

use crate::frame::BITS_PER_FRAME;

pub const HOURS_PER_DAY: u8 = 24;
pub const MINUTES_PER_HOUR: u8 = 60;
pub const SECONDS_PER_MINUTE: u8 = 60;

/// The frame field has a 2 bit tens digit, so nothing above 39 fits into a
/// frame.
pub const MAX_FRAMES: u8 = 40;

/// Frame period thresholds in seconds, ordered by increasing period.
///
/// The first entry whose threshold is not exceeded by the measured frame period
/// wins.
pub const RATE_TABLE: [(f64, u32); 5] = [
    (0.033333, 30),
    // NTSC drop-frame
    (0.033366, 29),
    (0.04, 25),
    (0.0416667, 24),
    (0.0417083, 23),
];

/// Frames per second.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u32", into = "u32")
)]
pub struct FrameRate(NonZeroU32);

impl FrameRate {
    pub const FPS_23: Self = Self::from_const(23);
    pub const FPS_24: Self = Self::from_const(24);
    pub const FPS_25: Self = Self::from_const(25);
    pub const FPS_29: Self = Self::from_const(29);
    pub const FPS_30: Self = Self::from_const(30);

    const fn from_const(fps: u32) -> Self {
        match NonZeroU32::new(fps) {
            Some(fps) => Self(fps),
            None => panic!("frame rate must be non-zero"),
        }
    }

    /// Returns `None` if `fps` is zero or too large to be represented in a
    /// frame.
    pub fn new(fps: u32) -> Option<Self> {
        if fps > u32::from(MAX_FRAMES) {
            None
        }
        else {
            NonZeroU32::new(fps).map(Self)
        }
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Looks up the rate for a measured frame period (in seconds) in
    /// [`RATE_TABLE`].
    pub fn from_frame_period(frame_period: f64) -> Option<Self> {
        RATE_TABLE
            .iter()
            .find(|(threshold, _)| frame_period <= *threshold)
            .map(|(_, fps)| Self::from_const(*fps))
    }

    /// Same as [`from_frame_period`](Self::from_frame_period), but takes the
    /// period of a single bit.
    #[inline]
    pub fn from_bit_period(bit_period: f64) -> Option<Self> {
        Self::from_frame_period(bit_period * BITS_PER_FRAME as f64)
    }

    #[inline]
    pub fn frame_period(&self) -> f64 {
        1.0 / f64::from(self.get())
    }

    #[inline]
    pub fn bit_period(&self) -> f64 {
        self.frame_period() / BITS_PER_FRAME as f64
    }
}

impl Debug for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} fps", self.get())
    }
}

impl Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = InvalidFrameRate;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidFrameRate(value))
    }
}

impl From<FrameRate> for u32 {
    #[inline]
    fn from(value: FrameRate) -> Self {
        value.get()
    }
}

impl FromStr for FrameRate {
    type Err = ParseTimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::try_from(s.trim().parse::<u32>()?)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid frame rate: {0} (must be between 1 and {MAX_FRAMES})")]
pub struct InvalidFrameRate(pub u32);

/// Absolute number of frames since midnight.
///
/// Only meaningful together with the [`FrameRate`] it was computed with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    pub fn from_time(time: &Time, rate: FrameRate) -> Self {
        let seconds = (u64::from(time.hours) * u64::from(MINUTES_PER_HOUR)
            + u64::from(time.minutes))
            * u64::from(SECONDS_PER_MINUTE)
            + u64::from(time.seconds);
        Self(seconds * u64::from(rate.get()) + u64::from(time.frames))
    }

    /// Hours wrap around at midnight.
    pub fn to_time(&self, rate: FrameRate) -> Time {
        let rate = u64::from(rate.get());

        let frames = self.0 % rate;
        let total_seconds = self.0 / rate;
        let seconds = total_seconds % u64::from(SECONDS_PER_MINUTE);
        let total_minutes = total_seconds / u64::from(SECONDS_PER_MINUTE);
        let minutes = total_minutes % u64::from(MINUTES_PER_HOUR);
        let hours = (total_minutes / u64::from(MINUTES_PER_HOUR)) % u64::from(HOURS_PER_DAY);

        // all of these are bounded by their moduli, and rate <= MAX_FRAMES
        Time {
            hours: hours as u8,
            minutes: minutes as u8,
            seconds: seconds as u8,
            frames: frames as u8,
        }
    }

    /// Advances the index. The time fields are only derived again by
    /// [`to_time`](Self::to_time).
    #[inline]
    pub fn increment(&self, by: u64) -> Self {
        Self(self.0.wrapping_add(by))
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Hours,
    Minutes,
    Seconds,
    Frames,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Hours => "hours",
            Field::Minutes => "minutes",
            Field::Seconds => "seconds",
            Field::Frames => "frames",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidField {
    #[error("{field} is {value}, but must be less than {limit}")]
    OutOfRange { field: Field, value: u32, limit: u32 },
    #[error("{field} units digit is not decimal: {digit:#x}")]
    NotDecimal { field: Field, digit: u8 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error(transparent)]
    InvalidField(#[from] InvalidField),
    #[error("frame rate is not known yet")]
    RateUndetermined,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseTimecodeError {
    #[error("expected HH:MM:SS:FF or HH:MM:SS;FF, got {0:?}")]
    Format(String),
    #[error("invalid number")]
    Number(#[from] ParseIntError),
    #[error(transparent)]
    InvalidField(#[from] InvalidField),
    #[error(transparent)]
    InvalidFrameRate(#[from] InvalidFrameRate),
    #[error("invalid user bits: {0:?}")]
    UserBits(String),
}

/// Hours, minutes, seconds and frames, each checked against its range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Time {
    hours: u8,
    minutes: u8,
    seconds: u8,
    frames: u8,
}

impl Time {
    pub fn new(hours: u8, minutes: u8, seconds: u8, frames: u8) -> Result<Self, InvalidField> {
        check_range(Field::Hours, hours, HOURS_PER_DAY)?;
        check_range(Field::Minutes, minutes, MINUTES_PER_HOUR)?;
        check_range(Field::Seconds, seconds, SECONDS_PER_MINUTE)?;
        check_range(Field::Frames, frames, MAX_FRAMES)?;
        Ok(Self {
            hours,
            minutes,
            seconds,
            frames,
        })
    }

    #[inline]
    pub fn hours(&self) -> u8 {
        self.hours
    }

    #[inline]
    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    #[inline]
    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    #[inline]
    pub fn frames(&self) -> u8 {
        self.frames
    }

    pub fn check_rate(&self, rate: FrameRate) -> Result<(), InvalidField> {
        if u32::from(self.frames) < rate.get() {
            Ok(())
        }
        else {
            Err(InvalidField::OutOfRange {
                field: Field::Frames,
                value: self.frames.into(),
                limit: rate.get(),
            })
        }
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

fn check_range(field: Field, value: u8, limit: u8) -> Result<(), InvalidField> {
    if value < limit {
        Ok(())
    }
    else {
        Err(InvalidField::OutOfRange {
            field,
            value: value.into(),
            limit: limit.into(),
        })
    }
}

/// The 32 user bits of a frame, as 4 bytes. Each byte packs two 4 bit groups,
/// the earlier group in the high nibble.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UserBits(pub [u8; 4]);

impl UserBits {
    /// Returns one of the 8 groups of 4 bits, in transmission order.
    #[inline]
    pub fn group(&self, index: usize) -> u8 {
        let byte = self.0[index / 2];
        if index % 2 == 0 { byte >> 4 } else { byte & 0x0f }
    }

    #[inline]
    pub fn set_group(&mut self, index: usize, nibble: u8) {
        let byte = &mut self.0[index / 2];
        if index % 2 == 0 {
            *byte = (*byte & 0x0f) | (nibble << 4);
        }
        else {
            *byte = (*byte & 0xf0) | (nibble & 0x0f);
        }
    }
}

impl From<[u8; 4]> for UserBits {
    #[inline]
    fn from(value: [u8; 4]) -> Self {
        Self(value)
    }
}

impl From<u32> for UserBits {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl Debug for UserBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserBits({self})")
    }
}

impl Display for UserBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for UserBits {
    type Err = ParseTimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0x");
        if digits.len() != 8 {
            return Err(ParseTimecodeError::UserBits(s.to_owned()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from)
            .map_err(|_| ParseTimecodeError::UserBits(s.to_owned()))
    }
}

/// A decoded (or to be encoded) timecode.
///
/// The frame index is not stored. It is derived from the time fields and the
/// rate whenever it's needed, so both can't drift apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimeCode {
    time: Time,
    pub user_bits: UserBits,
    pub drop_frame: bool,
    pub color_frame: bool,
    pub binary_group_flags: [bool; 2],
    rate: Option<FrameRate>,
}

impl TimeCode {
    pub fn new(time: Time) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_user_bits(mut self, user_bits: impl Into<UserBits>) -> Self {
        self.user_bits = user_bits.into();
        self
    }

    #[inline]
    pub fn with_drop_frame(mut self, drop_frame: bool) -> Self {
        self.drop_frame = drop_frame;
        self
    }

    pub fn with_rate(mut self, rate: FrameRate) -> Result<Self, InvalidField> {
        self.set_rate(rate)?;
        Ok(self)
    }

    pub fn set_rate(&mut self, rate: FrameRate) -> Result<(), InvalidField> {
        self.time.check_rate(rate)?;
        self.rate = Some(rate);
        Ok(())
    }

    #[inline]
    pub fn time(&self) -> &Time {
        &self.time
    }

    #[inline]
    pub fn hours(&self) -> u8 {
        self.time.hours
    }

    #[inline]
    pub fn minutes(&self) -> u8 {
        self.time.minutes
    }

    #[inline]
    pub fn seconds(&self) -> u8 {
        self.time.seconds
    }

    #[inline]
    pub fn frames(&self) -> u8 {
        self.time.frames
    }

    #[inline]
    pub fn rate(&self) -> Option<FrameRate> {
        self.rate
    }

    pub fn index(&self) -> Result<FrameIndex, TimecodeError> {
        let rate = self.rate.ok_or(TimecodeError::RateUndetermined)?;
        Ok(FrameIndex::from_time(&self.time, rate))
    }

    /// Replaces the time fields with the ones derived from `index`.
    pub fn set_index(&mut self, index: FrameIndex) -> Result<(), TimecodeError> {
        let rate = self.rate.ok_or(TimecodeError::RateUndetermined)?;
        self.time = index.to_time(rate);
        Ok(())
    }

    /// Advances the timecode by `by` frames, wrapping around at midnight.
    pub fn increment(&mut self, by: u64) -> Result<(), TimecodeError> {
        let index = self.index()?;
        self.set_index(index.increment(by))
    }

    #[inline]
    pub fn display(&self, mode: DisplayMode) -> DisplayTimeCode<'_> {
        DisplayTimeCode {
            timecode: self,
            mode,
        }
    }
}

impl Display for TimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let separator = if self.drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{separator}{:02}",
            self.time.hours, self.time.minutes, self.time.seconds, self.time.frames
        )
    }
}

impl FromStr for TimeCode {
    type Err = ParseTimecodeError;

    /// Parses `HH:MM:SS:FF`. A `;` (or `.`) before the frames sets the
    /// drop-frame flag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let format_error = || ParseTimecodeError::Format(s.to_owned());

        let (hms, frames) = s.rsplit_once([':', ';', '.']).ok_or_else(format_error)?;
        let drop_frame = !s[hms.len()..].starts_with(':');

        let mut parts = hms.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format_error());
        };

        let time = Time::new(
            hours.parse()?,
            minutes.parse()?,
            seconds.parse()?,
            frames.parse()?,
        )?;

        Ok(Self::new(time).with_drop_frame(drop_frame))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum DisplayMode {
    /// `HH:MM:SS:FF`, with `;` before the frames for drop-frame.
    #[default]
    Compact,
    /// Timecode and user bits, each on a labeled line.
    Labeled,
    /// The frame index.
    Index,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(Self::Compact),
            "labeled" => Ok(Self::Labeled),
            "index" => Ok(Self::Index),
            _ => Err(format!("invalid display mode: {s}")),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DisplayTimeCode<'a> {
    timecode: &'a TimeCode,
    mode: DisplayMode,
}

impl Display for DisplayTimeCode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode {
            DisplayMode::Compact => write!(f, "{}", self.timecode),
            DisplayMode::Labeled => {
                writeln!(f, "Timecode : {}", self.timecode)?;
                write!(f, "Userbits : {}", self.timecode.user_bits)
            }
            DisplayMode::Index => {
                match self.timecode.index() {
                    Ok(index) => write!(f, "{index}"),
                    Err(_) => f.write_str("?"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        DisplayMode,
        Field,
        FrameIndex,
        FrameRate,
        InvalidField,
        Time,
        TimeCode,
        TimecodeError,
        UserBits,
    };

    fn rate(fps: u32) -> FrameRate {
        FrameRate::new(fps).unwrap()
    }

    #[test]
    fn it_counts_frames_since_midnight() {
        let time = Time::new(1, 19, 52, 23).unwrap();
        let index = FrameIndex::from_time(&time, FrameRate::FPS_25);
        assert_eq!(index.get(), ((60 + 19) * 60 + 52) * 25 + 23);
        assert_eq!(index.to_time(FrameRate::FPS_25), time);
    }

    #[test]
    fn it_increments_across_a_second() {
        let index = FrameIndex(0);
        assert_eq!(index.to_time(FrameRate::FPS_25), Time::default());

        let index = index.increment(1);
        assert_eq!(index.to_time(FrameRate::FPS_25), Time::new(0, 0, 0, 1).unwrap());

        let index = index.increment(25);
        assert_eq!(index.to_time(FrameRate::FPS_25), Time::new(0, 0, 1, 1).unwrap());
    }

    #[test]
    fn it_wraps_around_at_midnight() {
        let mut timecode = TimeCode::new(Time::new(23, 59, 59, 24).unwrap())
            .with_rate(FrameRate::FPS_25)
            .unwrap();
        timecode.increment(1).unwrap();
        assert_eq!(*timecode.time(), Time::default());
    }

    #[test]
    fn it_needs_a_rate_for_the_index() {
        let timecode = TimeCode::new(Time::new(0, 0, 1, 0).unwrap());
        assert_eq!(timecode.index(), Err(TimecodeError::RateUndetermined));
        assert_eq!(timecode.display(DisplayMode::Index).to_string(), "?");
    }

    #[test]
    fn it_rejects_frames_beyond_the_rate() {
        let timecode = TimeCode::new(Time::new(0, 0, 0, 29).unwrap());
        assert_eq!(
            timecode.with_rate(FrameRate::FPS_25),
            Err(InvalidField::OutOfRange {
                field: Field::Frames,
                value: 29,
                limit: 25
            })
        );
    }

    #[test]
    fn it_rejects_out_of_range_fields() {
        assert!(Time::new(24, 0, 0, 0).is_err());
        assert!(Time::new(0, 60, 0, 0).is_err());
        assert!(Time::new(0, 0, 60, 0).is_err());
        assert!(Time::new(0, 0, 0, 40).is_err());
        assert!(Time::new(23, 59, 59, 39).is_ok());
    }

    #[test]
    fn it_infers_rate_from_frame_period() {
        assert_eq!(FrameRate::from_frame_period(0.0333), Some(FrameRate::FPS_30));
        assert_eq!(FrameRate::from_frame_period(0.03335), Some(FrameRate::FPS_29));
        assert_eq!(FrameRate::from_frame_period(0.04), Some(FrameRate::FPS_25));
        assert_eq!(FrameRate::from_frame_period(0.04166), Some(FrameRate::FPS_24));
        assert_eq!(FrameRate::from_frame_period(0.0417), Some(FrameRate::FPS_23));
        assert_eq!(FrameRate::from_frame_period(0.05), None);
    }

    #[test]
    fn it_infers_rate_from_bit_period() {
        assert_eq!(FrameRate::from_bit_period(0.0004), Some(FrameRate::FPS_30));
        assert_eq!(FrameRate::from_bit_period(0.00049), Some(FrameRate::FPS_25));
        assert_eq!(
            FrameRate::from_bit_period(FrameRate::FPS_24.bit_period()),
            Some(FrameRate::FPS_24)
        );
        assert_eq!(FrameRate::from_bit_period(0.0007), None);
    }

    #[test]
    fn it_only_accepts_representable_rates() {
        assert_eq!(FrameRate::new(0), None);
        assert_eq!(FrameRate::new(41), None);
        assert_eq!(FrameRate::new(30), Some(FrameRate::FPS_30));
    }

    #[test]
    fn it_displays_all_modes() {
        let timecode = TimeCode::new(Time::new(1, 2, 3, 4).unwrap())
            .with_user_bits([0x16, 0x06, 0x17, 0x29])
            .with_rate(FrameRate::FPS_25)
            .unwrap();

        assert_eq!(timecode.display(DisplayMode::Compact).to_string(), "01:02:03:04");
        assert_eq!(
            timecode.display(DisplayMode::Labeled).to_string(),
            "Timecode : 01:02:03:04\nUserbits : 16061729"
        );
        assert_eq!(
            timecode.display(DisplayMode::Index).to_string(),
            (((60 + 2) * 60 + 3) * 25 + 4).to_string()
        );

        let timecode = timecode.with_drop_frame(true);
        assert_eq!(timecode.to_string(), "01:02:03;04");
    }

    #[test]
    fn it_parses_timecodes() {
        let timecode: TimeCode = "01:19:52:23".parse().unwrap();
        assert_eq!(*timecode.time(), Time::new(1, 19, 52, 23).unwrap());
        assert!(!timecode.drop_frame);

        let timecode: TimeCode = "10:00:00;02".parse().unwrap();
        assert_eq!(*timecode.time(), Time::new(10, 0, 0, 2).unwrap());
        assert!(timecode.drop_frame);

        assert!("10:00:00".parse::<TimeCode>().is_err());
        assert!("25:00:00:00".parse::<TimeCode>().is_err());
        assert!("aa:00:00:00".parse::<TimeCode>().is_err());
    }

    #[test]
    fn it_packs_user_bit_groups() {
        let mut user_bits = UserBits::from([0x16, 0x06, 0x17, 0x29]);
        assert_eq!(user_bits.group(0), 0x1);
        assert_eq!(user_bits.group(1), 0x6);
        assert_eq!(user_bits.group(7), 0x9);

        user_bits.set_group(7, 0xa);
        user_bits.set_group(0, 0xf);
        assert_eq!(user_bits.0, [0xf6, 0x06, 0x17, 0x2a]);

        assert_eq!(
            "16061729".parse::<UserBits>().unwrap(),
            UserBits([0x16, 0x06, 0x17, 0x29])
        );
        assert!("1606".parse::<UserBits>().is_err());
    }

    proptest! {
        #[test]
        fn index_round_trips(fps in 1u32..=30, index in 0u64..(24 * 3600 * 30)) {
            let rate = rate(fps);
            let index = FrameIndex(index % (24 * 3600 * u64::from(fps)));
            prop_assert_eq!(FrameIndex::from_time(&index.to_time(rate), rate), index);
        }

        #[test]
        fn increment_moves_forward(
            fps in 1u32..=30,
            index in 0u64..(24 * 3600 * 30),
            by in 1u64..(3600 * 30),
        ) {
            let rate = rate(fps);
            let day = 24 * 3600 * u64::from(fps);
            let index = FrameIndex(index % day);

            let before = index.to_time(rate);
            let after = index.increment(by).to_time(rate);

            // either later the same day, or wrapped past midnight
            if index.get() + by < day {
                prop_assert!(after > before);
            }
            else {
                prop_assert!(after < before);
            }
        }
    }
}
