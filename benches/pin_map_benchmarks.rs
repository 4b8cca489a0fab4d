use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pi_gpio_link::{
    gpio_for, pin_for,
    protocol::frame::{encode_command, Frame, FRAME_LEN},
    BoardType, Command,
};

/// Benchmark connector pin to GPIO lookups for each layout
fn bench_pin_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("pin_lookup");

    for board in [BoardType::Pi1, BoardType::Pi2, BoardType::Pi3] {
        group.bench_with_input(BenchmarkId::new("gpio_for", board), &board, |b, &board| {
            b.iter(|| {
                (1..=40u32)
                    .filter_map(|pin| gpio_for(board, black_box(pin)).gpio())
                    .count()
            })
        });
        group.bench_with_input(BenchmarkId::new("pin_for", board), &board, |b, &board| {
            b.iter(|| (0..=53u32).map(|gpio| pin_for(board, black_box(gpio))).sum::<u32>())
        });
    }

    group.finish();
}

/// Benchmark command frame encoding and response decoding
fn bench_frames(c: &mut Criterion) {
    c.bench_function("encode_command", |b| {
        b.iter(|| encode_command(black_box(Command::Write.code()), black_box(17), black_box(1), 0))
    });

    let response: [u8; FRAME_LEN] = encode_command(Command::Write.code(), 17, 1, 0);
    c.bench_function("decode_response", |b| {
        b.iter(|| Frame::decode(black_box(&response)).status())
    });
}

criterion_group!(benches, bench_pin_lookups, bench_frames);
criterion_main!(benches);
