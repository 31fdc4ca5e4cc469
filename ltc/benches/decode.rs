use std::{
    hint::black_box,
    time::Duration,
};

use criterion::{
    Criterion,
    Throughput,
    criterion_group,
    criterion_main,
};
use futures_util::{
    FutureExt,
    StreamExt,
    stream,
};
use ltc::{
    DecodeStream,
    EdgeEvent,
    FrameEncoder,
    FrameRate,
    LtcDecoder,
    LtcFrame,
    TimeCode,
    biphase::modulate,
};

pub fn bench_decode(c: &mut Criterion) {
    let num_frames = 25 * 60;
    let rate = FrameRate::FPS_25;

    let start = "01:00:00:00"
        .parse::<TimeCode>()
        .expect("invalid start timecode")
        .with_user_bits([0x16, 0x06, 0x17, 0x29]);
    let bits = FrameEncoder::new(start, rate)
        .expect("start doesn't fit rate")
        .take(num_frames)
        .flat_map(LtcFrame::bits);
    let edges = EdgeEvent::from_intervals(modulate(bits, rate.bit_period()), 0.0)
        .collect::<Vec<_>>();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(edges.len() as u64));
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("iterator", |b| {
        b.iter(|| {
            let mut decoder = LtcDecoder::default();
            for result in decoder.decode(edges.iter().copied()) {
                let _ = black_box(result);
            }
        })
    });

    group.bench_function("stream", |b| {
        b.iter(|| {
            let stream = DecodeStream::new(stream::iter(edges.iter().copied()), LtcDecoder::default());
            let count = stream
                .count()
                .now_or_never()
                .expect("edge stream returned pending");
            black_box(count);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
