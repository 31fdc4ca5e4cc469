use std::{
    pin::Pin,
    str::FromStr,
    task::{
        Context,
        Poll,
        ready,
    },
};

use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::{
    biphase::{
        BitRecoverer,
        DEFAULT_SETTLE_TICKS,
        EdgeEvent,
    },
    codec::TimecodeCodec,
    frame::{
        BITS_PER_FRAME,
        LtcFrame,
    },
    sync::{
        FrameReady,
        FrameSynchronizer,
    },
    timecode::{
        FrameRate,
        InvalidField,
        TimeCode,
    },
};

/// Number of consecutive frames that have to be locked before the bit period
/// is trusted enough to measure the frame rate.
pub const DEFAULT_RATE_LOCK_FRAMES: u64 = 100;

/// What to do with frames whose parity bit is wrong.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ParityPolicy {
    /// Accept the frame, but flag it in [`DecodedFrame::parity_ok`].
    #[default]
    Report,
    /// Drop the frame with [`DecodeError::ParityMismatch`].
    Reject,
}

impl FromStr for ParityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report" => Ok(Self::Report),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("invalid parity policy: {s}")),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DecoderConfig {
    pub settle_ticks: u32,
    pub rate_lock_frames: u64,
    pub parity: ParityPolicy,
    /// Known frame rate. If this is `None`, the rate is measured.
    pub rate: Option<FrameRate>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            settle_ticks: DEFAULT_SETTLE_TICKS,
            rate_lock_frames: DEFAULT_RATE_LOCK_FRAMES,
            parity: ParityPolicy::default(),
            rate: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    pub timecode: TimeCode,
    pub frame: LtcFrame,
    /// Number of sync words seen so far, including this frame.
    pub frame_count: u64,
    pub parity_ok: bool,
}

/// Reasons a frame was dropped. The decoder keeps going after any of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid frame #{frame_count}")]
    InvalidFrame {
        frame_count: u64,
        #[source]
        reason: InvalidField,
    },
    #[error("parity mismatch in frame #{frame_count}")]
    ParityMismatch { frame_count: u64 },
}

/// Decodes edges into timecodes.
///
/// Owns the whole pipeline state. Feed it edges in order from a single
/// context.
#[derive(Clone, Debug)]
pub struct LtcDecoder {
    config: DecoderConfig,
    recoverer: BitRecoverer,
    synchronizer: FrameSynchronizer,
    codec: TimecodeCodec,
    timecode: Option<TimeCode>,
    /// Bits since the last sync word.
    bits_since_sync: u64,
    /// Accepted frames in a row, each exactly one frame after the last.
    locked_frames: u64,
}

impl Default for LtcDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl LtcDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        let codec = config
            .rate
            .map_or_else(TimecodeCodec::new, TimecodeCodec::with_rate);

        Self {
            config,
            recoverer: BitRecoverer::new(config.settle_ticks),
            synchronizer: FrameSynchronizer::new(),
            codec,
            timecode: None,
            bits_since_sync: 0,
            locked_frames: 0,
        }
    }

    #[inline]
    pub fn tick(&mut self, edge: &EdgeEvent) -> Option<Result<DecodedFrame, DecodeError>> {
        self.push_interval(edge.interval())
    }

    pub fn push_interval(&mut self, interval: f64) -> Option<Result<DecodedFrame, DecodeError>> {
        let bit = self.recoverer.tick(interval)?;
        self.push_bit(bit)
    }

    pub fn push_bit(&mut self, bit: bool) -> Option<Result<DecodedFrame, DecodeError>> {
        self.bits_since_sync += 1;
        let ready = self.synchronizer.push(bit)?;

        let contiguous = self.bits_since_sync == BITS_PER_FRAME as u64;
        self.bits_since_sync = 0;
        if !contiguous && self.locked_frames > 0 {
            tracing::debug!(locked_frames = self.locked_frames, "lost lock");
            self.locked_frames = 0;
        }

        let result = self.accept(ready);
        if result.is_ok() {
            self.locked_frames += 1;
            if self.codec.explicit_rate().is_none()
                && self.locked_frames > self.config.rate_lock_frames
            {
                self.measure_rate();
            }
        }
        else {
            self.locked_frames = 0;
        }

        Some(result)
    }

    fn accept(&mut self, ready: FrameReady) -> Result<DecodedFrame, DecodeError> {
        let FrameReady { frame, frame_count } = ready;

        let parity_ok = frame.parity_ok();
        if !parity_ok {
            tracing::warn!(frame_count, ?frame, "parity mismatch");
            if self.config.parity == ParityPolicy::Reject {
                return Err(DecodeError::ParityMismatch { frame_count });
            }
        }

        let timecode = self.codec.parse(&frame).map_err(|reason| {
            tracing::warn!(frame_count, ?frame, %reason, "dropping invalid frame");
            DecodeError::InvalidFrame {
                frame_count,
                reason,
            }
        })?;

        if let Some(previous) = &self.timecode {
            if previous.drop_frame != timecode.drop_frame {
                tracing::debug!(drop_frame = timecode.drop_frame, "drop-frame flag changed");
            }
        }
        self.timecode = Some(timecode);

        Ok(DecodedFrame {
            timecode,
            frame,
            frame_count,
            parity_ok,
        })
    }

    fn measure_rate(&mut self) {
        let Some(bit_period) = self.recoverer.average_bit_period()
        else {
            return;
        };

        if let Some(rate) = self.codec.infer_rate_from_bit_period(bit_period) {
            tracing::debug!(bit_period, %rate, "measured frame rate");
        }
        else {
            tracing::trace!(
                bit_period,
                max_frame = ?self.codec.max_frame(),
                "bit period doesn't match a usable frame rate"
            );
        }
    }

    /// The last accepted timecode.
    #[inline]
    pub fn timecode(&self) -> Option<&TimeCode> {
        self.timecode.as_ref()
    }

    #[inline]
    pub fn rate(&self) -> Option<FrameRate> {
        self.codec.rate()
    }

    /// Whether the rate was measured (or configured), as opposed to guessed.
    #[inline]
    pub fn has_explicit_rate(&self) -> bool {
        self.codec.explicit_rate().is_some()
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.synchronizer.frame_count()
    }

    /// Number of frames accepted in a row without a gap.
    #[inline]
    pub fn locked_frames(&self) -> u64 {
        self.locked_frames
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[inline]
    pub fn bit_recoverer(&self) -> &BitRecoverer {
        &self.recoverer
    }

    /// Decodes edges lazily.
    pub fn decode<I>(&mut self, edges: I) -> Decode<'_, I::IntoIter>
    where
        I: IntoIterator<Item = EdgeEvent>,
    {
        Decode {
            decoder: self,
            edges: edges.into_iter(),
        }
    }
}

#[derive(Debug)]
pub struct Decode<'a, I> {
    decoder: &'a mut LtcDecoder,
    edges: I,
}

impl<I> Iterator for Decode<'_, I>
where
    I: Iterator<Item = EdgeEvent>,
{
    type Item = Result<DecodedFrame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.edges.by_ref().find_map(|edge| self.decoder.tick(&edge))
    }
}

pin_project! {
    /// Decodes a stream of edges.
    #[derive(Debug)]
    pub struct DecodeStream<S> {
        #[pin]
        edges: S,
        decoder: LtcDecoder,
    }
}

impl<S> DecodeStream<S> {
    pub fn new(edges: S, decoder: LtcDecoder) -> Self {
        Self { edges, decoder }
    }

    #[inline]
    pub fn decoder(&self) -> &LtcDecoder {
        &self.decoder
    }
}

impl<S> Stream for DecodeStream<S>
where
    S: Stream<Item = EdgeEvent>,
{
    type Item = Result<DecodedFrame, DecodeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            let Some(edge) = ready!(this.edges.as_mut().poll_next(cx))
            else {
                return Poll::Ready(None);
            };

            if let Some(result) = this.decoder.tick(&edge) {
                return Poll::Ready(Some(result));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.edges.size_hint().1)
    }
}
