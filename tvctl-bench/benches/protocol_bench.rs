//! Line codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tvctl_protocol::{Command, Decoder, Encoder, Notification};

fn bench_encode_command(c: &mut Criterion) {
    c.bench_function("encode_command", |b| {
        b.iter(|| black_box(Encoder::encode_command(black_box(Command::Channel5))));
    });
}

fn bench_decode_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_commands");

    for count in [1, 16, 256] {
        let input: Vec<u8> = (0..count)
            .flat_map(|i| format!("{}\n", i % 14).into_bytes())
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(input);
                let mut decoded = 0;
                while let Some(command) = decoder.decode_command().unwrap() {
                    black_box(command);
                    decoded += 1;
                }
                decoded
            });
        });
    }

    group.finish();
}

fn bench_notification_roundtrip(c: &mut Criterion) {
    let notification = Notification::Power {
        on: false,
        channel: Some(3),
    };

    c.bench_function("notification_format", |b| {
        b.iter(|| black_box(notification.to_string()));
    });

    let line = notification.to_string();
    c.bench_function("notification_parse", |b| {
        b.iter(|| black_box(line.parse::<Notification>().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_encode_command,
    bench_decode_commands,
    bench_notification_roundtrip,
);

criterion_main!(benches);
