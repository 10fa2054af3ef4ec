//! Criterion benchmarks for the pixelflut decoders and dispatcher.
//!
//! Measures how fast a buffered stream turns into framebuffer writes, which
//! bounds how much client input one drain pass can absorb before a flush.
//!
//! Run with:
//! ```bash
//! cargo bench --package pixelflut-core --bench decoder_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pixelflut_core::protocol::binary::encode_command;
use pixelflut_core::{
    Command, Decoded, Decoder, Dialect, Dispatcher, Framebuffer, Rgb, TelemetryCounters,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn set_pixel_stream(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| {
            encode_command(&Command::SetPixel {
                x: (i % 64) as u16,
                y: (i / 64 % 64) as u16,
                color: Rgb::new(i as u8, 0x80, 0xff),
            })
            .expect("coordinates fit in a byte")
        })
        .collect()
}

fn blit_stream(side: u16) -> Vec<u8> {
    let colors = (0..usize::from(side) * usize::from(side))
        .map(|i| Rgb::new(i as u8, (i >> 8) as u8, 0))
        .collect();
    encode_command(&Command::BlitRect {
        x: 0,
        y: 0,
        width: side,
        height: side,
        colors,
    })
    .expect("side fits in a byte")
}

fn text_stream(count: usize) -> Vec<u8> {
    (0..count)
        .map(|i| format!("PX {} {} {:06x}\n", i % 64, i / 64 % 64, i & 0xff_ffff))
        .collect::<String>()
        .into_bytes()
}

fn drain(decoder: &mut dyn Decoder, stream: &[u8], fb: &mut Framebuffer) -> TelemetryCounters {
    let mut counters = TelemetryCounters::default();
    let mut pos = 0;
    loop {
        match decoder.decode(&stream[pos..]) {
            Decoded::Command { command, consumed } => {
                Dispatcher::apply(fb, &command, consumed, &mut counters);
                pos += consumed;
            }
            Decoded::Reply { consumed, .. }
            | Decoded::Ignored { consumed }
            | Decoded::Malformed { consumed } => pos += consumed,
            Decoded::Incomplete => return counters,
        }
    }
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_set_pixel(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_pixel_stream");
    for count in [64usize, 4096] {
        let binary = set_pixel_stream(count);
        let text = text_stream(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("binary", count), &binary, |b, stream| {
            let mut decoder = Dialect::Binary.decoder(64, 64).expect("64x64 fits");
            let mut fb = Framebuffer::with_size(64, 64);
            b.iter(|| drain(decoder.as_mut(), black_box(stream), &mut fb));
        });
        group.bench_with_input(BenchmarkId::new("text", count), &text, |b, stream| {
            let mut decoder = Dialect::Text.decoder(64, 64).expect("text has no cap");
            let mut fb = Framebuffer::with_size(64, 64);
            b.iter(|| drain(decoder.as_mut(), black_box(stream), &mut fb));
        });
    }
    group.finish();
}

fn bench_blit(c: &mut Criterion) {
    let mut group = c.benchmark_group("blit_rect");
    for side in [8u16, 64, 255] {
        let stream = blit_stream(side);
        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side), &stream, |b, stream| {
            let mut decoder = Dialect::Binary.decoder(255, 255).expect("255 fits");
            let mut fb = Framebuffer::with_size(255, 255);
            b.iter(|| drain(decoder.as_mut(), black_box(stream), &mut fb));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_set_pixel, bench_blit);
criterion_main!(benches);
