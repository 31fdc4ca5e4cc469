//! Biphase mark coding
//!
//! Every bit starts with a transition. A 1 has an additional transition in the
//! middle of the bit, so it shows up as two short intervals, while a 0 is a
//! single long one.
//!
//! <https://www.avrfreaks.net/forum/tut-pc-avr-softunderstanding-bi-phase-mark-coding>

/// Number of ticks before the bit recoverer starts emitting bits.
pub const DEFAULT_SETTLE_TICKS: u32 = 32;

/// A transition on the line.
///
/// Timestamps are in seconds. Only the difference matters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeEvent {
    pub time: f64,
    pub last_time: f64,
}

impl EdgeEvent {
    #[inline]
    pub fn new(time: f64, last_time: f64) -> Self {
        Self { time, last_time }
    }

    #[inline]
    pub fn interval(&self) -> f64 {
        self.time - self.last_time
    }

    /// Pairs up consecutive timestamps. The first timestamp only serves as the
    /// start of the first interval.
    pub fn from_timestamps<I>(timestamps: I) -> impl Iterator<Item = Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut timestamps = timestamps.into_iter();
        let first = timestamps.next();
        timestamps.scan(first, |last_time, time| {
            let last = last_time.replace(time)?;
            Some(Self::new(time, last))
        })
    }

    /// Accumulates intervals into edges, starting at `start`.
    pub fn from_intervals<I>(intervals: I, start: f64) -> impl Iterator<Item = Self>
    where
        I: IntoIterator<Item = f64>,
    {
        intervals.into_iter().scan(start, |time, interval| {
            let last_time = *time;
            *time += interval;
            Some(Self::new(*time, last_time))
        })
    }
}

/// Recovers bits from the intervals between transitions.
///
/// Doesn't need to know the bit rate. Each interval is compared against the
/// previous one, so gradual changes in speed are tolerated.
#[derive(Clone, Copy, Debug)]
pub struct BitRecoverer {
    /// Estimated length of a whole bit, from the last interval.
    bit_period: f64,
    /// Running average of long intervals.
    long_periods: f64,
    /// Running average of short intervals.
    short_periods: f64,
    in_first_half: bool,
    settle_ticks: u32,
}

impl Default for BitRecoverer {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_TICKS)
    }
}

impl BitRecoverer {
    pub fn new(settle_ticks: u32) -> Self {
        Self {
            bit_period: 0.0,
            long_periods: 0.0,
            short_periods: 0.0,
            in_first_half: false,
            settle_ticks,
        }
    }

    /// Processes one interval and returns a bit, if one was completed.
    ///
    /// An interval longer than 3/4 of the estimated bit period is a 0. Anything
    /// shorter is half of a 1, which is emitted on the second half.
    ///
    /// Intervals that are zero, negative or not finite are ignored.
    pub fn tick(&mut self, interval: f64) -> Option<bool> {
        if !(interval.is_finite() && interval > 0.0) {
            tracing::trace!(interval, "ignoring invalid interval");
            return None;
        }

        // without a previous interval every interval looks long
        let has_estimate = self.bit_period > 0.0;

        let bit = if interval * 4.0 > self.bit_period * 3.0 {
            self.bit_period = interval;
            self.long_periods = (self.long_periods + interval) * 0.5;
            self.in_first_half = false;
            Some(false)
        }
        else {
            self.bit_period = interval * 2.0;
            self.short_periods = (self.short_periods + interval) * 0.5;
            if self.in_first_half {
                self.in_first_half = false;
                Some(true)
            }
            else {
                self.in_first_half = true;
                None
            }
        };

        if self.settle_ticks > 0 {
            // the statistics are worthless until the estimate has settled
            self.settle_ticks -= 1;
            self.long_periods = 0.0;
            self.short_periods = 0.0;
            if self.settle_ticks == 0 {
                tracing::debug!(bit_period = self.bit_period, "bit recovery settled");
            }
            return None;
        }
        if !has_estimate {
            return None;
        }

        if let Some(bit) = bit {
            tracing::trace!(bit);
        }
        bit
    }

    #[inline]
    pub fn tick_edge(&mut self, edge: &EdgeEvent) -> Option<bool> {
        self.tick(edge.interval())
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.settle_ticks == 0
    }

    /// Average length of a 0 bit since settling. This is the bit period.
    pub fn average_bit_period(&self) -> Option<f64> {
        (self.long_periods > 0.0).then_some(self.long_periods)
    }

    /// Average length of half a 1 bit since settling.
    pub fn average_half_period(&self) -> Option<f64> {
        (self.short_periods > 0.0).then_some(self.short_periods)
    }

    /// Lazily turns intervals into bits.
    pub fn bits<I>(&mut self, intervals: I) -> Bits<'_, I::IntoIter>
    where
        I: IntoIterator<Item = f64>,
    {
        Bits {
            recoverer: self,
            intervals: intervals.into_iter(),
        }
    }
}

#[derive(Debug)]
pub struct Bits<'a, I> {
    recoverer: &'a mut BitRecoverer,
    intervals: I,
}

impl<I> Iterator for Bits<'_, I>
where
    I: Iterator<Item = f64>,
{
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        self.intervals
            .by_ref()
            .find_map(|interval| self.recoverer.tick(interval))
    }
}

/// Turns bits into the intervals between transitions.
///
/// Only used to simulate a line, e.g. for tests or to generate edge files.
pub fn modulate<I>(bits: I, bit_period: f64) -> impl Iterator<Item = f64>
where
    I: IntoIterator<Item = bool>,
{
    let half_period = bit_period * 0.5;
    bits.into_iter().flat_map(move |bit| {
        if bit {
            std::iter::repeat_n(half_period, 2)
        }
        else {
            std::iter::repeat_n(bit_period, 1)
        }
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{
        BitRecoverer,
        EdgeEvent,
        modulate,
    };

    const SHORT: f64 = 0.00025;
    const LONG: f64 = 0.0005;

    fn short_short_long(groups: usize) -> Vec<f64> {
        [SHORT, SHORT, LONG].repeat(groups)
    }

    #[test]
    fn it_decodes_pairs_of_short_intervals_as_one() {
        // 30 ticks are exactly 10 groups, so the output starts with a 1
        let mut recoverer = BitRecoverer::new(30);
        let bits = recoverer.bits(short_short_long(20)).collect::<Vec<_>>();
        assert_eq!(bits, [true, false].repeat(10));
    }

    #[test]
    fn it_stays_quiet_while_settling() {
        let mut recoverer = BitRecoverer::default();
        let intervals = short_short_long(20);

        for interval in &intervals[..32] {
            assert!(!recoverer.is_settled());
            assert_eq!(recoverer.tick(*interval), None);
        }
        assert!(recoverer.is_settled());

        // 32 ticks end after the second short of a group
        let bits = recoverer.bits(intervals[32..].iter().copied()).collect::<Vec<_>>();
        assert_eq!(bits.len(), 19);
        assert!(!bits[0]);
        assert!(bits.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn first_interval_is_never_a_bit() {
        let mut recoverer = BitRecoverer::new(0);
        assert_eq!(recoverer.tick(LONG), None);
        assert_eq!(recoverer.tick(LONG), Some(false));
    }

    #[test]
    fn it_ignores_empty_intervals() {
        let mut recoverer = BitRecoverer::new(0);
        assert_eq!(recoverer.tick(LONG), None);
        for interval in [0.0, -LONG, f64::NAN, f64::INFINITY] {
            assert_eq!(recoverer.tick(interval), None);
        }
        // the estimate from the last valid interval is still there
        assert_eq!(recoverer.tick(LONG), Some(false));
        assert_eq!(recoverer.tick(SHORT), None);
        assert_eq!(recoverer.tick(SHORT), Some(true));

        let mut recoverer = BitRecoverer::new(1);
        assert_eq!(recoverer.tick(0.0), None);
        assert!(!recoverer.is_settled());
    }

    #[test]
    fn it_follows_gradual_speed_changes() {
        let mut recoverer = BitRecoverer::new(0);
        let mut period = LONG;
        let mut bits = vec![];
        for _ in 0..200 {
            bits.extend(recoverer.bits([period, period * 0.5, period * 0.5]));
            period *= 1.01;
        }
        assert_eq!(bits.len(), 399);
        assert!(bits[0]);
        assert!(bits.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn it_averages_periods() {
        let mut recoverer = BitRecoverer::new(3);
        assert_eq!(recoverer.average_bit_period(), None);

        let bits = [false, true].repeat(100);
        recoverer.bits(modulate(bits, LONG)).for_each(drop);

        assert_relative_eq!(
            recoverer.average_bit_period().unwrap(),
            LONG,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            recoverer.average_half_period().unwrap(),
            SHORT,
            max_relative = 1e-9
        );
    }

    #[test]
    fn it_round_trips_modulated_bits() {
        let bits = [false, true, true, false, false, false, true, false].repeat(10);
        let mut recoverer = BitRecoverer::new(0);
        // the first interval only primes the estimate
        let decoded = recoverer
            .bits(modulate(std::iter::once(false).chain(bits.clone()), LONG))
            .collect::<Vec<_>>();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn it_pairs_timestamps_into_edges() {
        let edges = EdgeEvent::from_timestamps([1.0, 1.5, 1.75]).collect::<Vec<_>>();
        assert_eq!(edges, [EdgeEvent::new(1.5, 1.0), EdgeEvent::new(1.75, 1.5)]);

        let edges = EdgeEvent::from_intervals([0.5, 0.25], 1.0).collect::<Vec<_>>();
        assert_eq!(edges, [EdgeEvent::new(1.5, 1.0), EdgeEvent::new(1.75, 1.5)]);
        assert_eq!(edges[1].interval(), 0.25);
    }
}
