mod args;
mod config;
mod edges;

use std::{
    fs::File,
    io::{
        BufReader,
        BufWriter,
        Write,
    },
};

use clap::Parser;
use color_eyre::eyre::{
    Error,
    bail,
};
use ltc::{
    DecoderConfig,
    EdgeEvent,
    FrameEncoder,
    LtcDecoder,
    LtcFrame,
    biphase::modulate,
};
use tracing_subscriber::EnvFilter;

use crate::{
    args::{
        Args,
        Command,
        DecodeArgs,
        EncodeArgs,
        GenerateArgs,
    },
    config::Config,
};

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args);

    let result = Config::load(args.config.as_deref()).and_then(|config| {
        match args.command {
            Command::Decode(decode_args) => decode(decode_args, config),
            Command::Encode(encode_args) => encode(encode_args),
            Command::Generate(generate_args) => generate(generate_args),
        }
    });

    if let Err(error) = &result {
        tracing::error!(?error);
    }

    result
}

fn decode(args: DecodeArgs, config: Config) -> Result<(), Error> {
    let mut decoder_config = DecoderConfig::from(config.decoder);
    if let Some(rate) = args.rate {
        decoder_config.rate = Some(rate);
    }
    if let Some(parity) = args.parity {
        decoder_config.parity = parity;
    }
    if let Some(settle_ticks) = args.settle_ticks {
        decoder_config.settle_ticks = settle_ticks;
    }
    let display = args.display.unwrap_or(config.display);

    let timestamps = if let Some(path) = &args.input {
        edges::read_timestamps(BufReader::new(File::open(path)?))?
    }
    else {
        edges::read_timestamps(std::io::stdin().lock())?
    };
    if timestamps.windows(2).any(|pair| pair[1] < pair[0]) {
        bail!("Edge timestamps must not decrease");
    }

    let mut decoder = LtcDecoder::new(decoder_config);
    let mut stdout = std::io::stdout().lock();
    let mut num_decoded = 0;
    let mut num_dropped = 0;

    for result in decoder.decode(EdgeEvent::from_timestamps(timestamps)) {
        match result {
            Ok(decoded) => {
                num_decoded += 1;
                writeln!(stdout, "{}", decoded.timecode.display(display))?;
            }
            Err(error) => {
                num_dropped += 1;
                if args.show_dropped {
                    writeln!(stdout, "# {error}")?;
                }
            }
        }
    }

    tracing::info!(
        num_decoded,
        num_dropped,
        rate = ?decoder.rate(),
        explicit_rate = decoder.has_explicit_rate(),
        "Decoding finished"
    );

    Ok(())
}

fn encode(args: EncodeArgs) -> Result<(), Error> {
    let mut timecode = args.timecode;
    if let Some(user_bits) = args.user_bits {
        timecode.user_bits = user_bits;
    }
    timecode.color_frame = args.color_frame;
    if let Some(rate) = args.rate {
        timecode = timecode.with_rate(rate)?;
    }

    let frame = ltc::encode(&timecode);
    let bits = frame
        .bits()
        .map(|bit| if bit { '1' } else { '0' })
        .collect::<Vec<_>>();
    let bits = bits
        .chunks(16)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    let words = frame
        .words()
        .map(|word| format!("{word:04x}"))
        .join(" ");

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{bits}")?;
    writeln!(stdout, "{words}")?;

    Ok(())
}

fn generate(args: GenerateArgs) -> Result<(), Error> {
    if args.frames == 0 {
        bail!("Number of frames must be greater than 0");
    }
    if !args.start_time.is_finite() {
        bail!("Start time must be a finite number");
    }

    let mut start = args.start;
    if let Some(user_bits) = args.user_bits {
        start.user_bits = user_bits;
    }

    let bits = FrameEncoder::new(start, args.rate)?
        .take(args.frames)
        .flat_map(LtcFrame::bits);
    let edges = EdgeEvent::from_intervals(modulate(bits, args.rate.bit_period()), args.start_time);

    let num_edges = if let Some(path) = &args.output {
        edges::write_edges(BufWriter::new(File::create(path)?), args.start_time, edges)?
    }
    else {
        edges::write_edges(std::io::stdout().lock(), args.start_time, edges)?
    };
    tracing::info!(num_edges, frames = args.frames, rate = %args.rate, "Generated edges");

    Ok(())
}
