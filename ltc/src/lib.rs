//! SMPTE/EBU linear timecode (LTC)
//!
//! Decoding goes edges → [`biphase`] → bits → [`sync`] → frames → [`codec`] →
//! timecodes, and [`decoder::LtcDecoder`] wires all of these together.
//! [`encoder`] goes the other way.

pub mod biphase;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod sync;
pub mod timecode;

pub use crate::{
    biphase::{
        BitRecoverer,
        EdgeEvent,
    },
    codec::TimecodeCodec,
    decoder::{
        DecodeError,
        DecodeStream,
        DecodedFrame,
        DecoderConfig,
        LtcDecoder,
        ParityPolicy,
    },
    encoder::{
        FrameEncoder,
        encode,
    },
    frame::LtcFrame,
    sync::FrameSynchronizer,
    timecode::{
        DisplayMode,
        FrameIndex,
        FrameRate,
        Time,
        TimeCode,
        UserBits,
    },
};
