use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use lzforge::{Codec, FormatId, MatchSearch, ParseStrategy, CRILAYLA_RAW_PREFIX};
use std::hint::black_box;
use std::time::Duration;

fn generate_test_data(size: usize, pattern: &str) -> Vec<u8> {
    match pattern {
        "text" => {
            // Generate Lorem ipsum style text data
            let base = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
            let mut data = Vec::with_capacity(size);
            while data.len() < size {
                data.extend_from_slice(base);
            }
            data.truncate(size);
            data
        }
        "binary" => {
            // Generate binary data with some patterns
            (0..size).map(|i| ((i * 17 + 11) % 256) as u8).collect()
        }
        "repetitive" => {
            // Highly repetitive data that compresses well
            let pattern = b"ABCDEFGHIJ";
            let mut data = Vec::with_capacity(size);
            while data.len() < size {
                data.extend_from_slice(pattern);
            }
            data.truncate(size);
            data
        }
        "random" => {
            // Pseudo-random data that compresses poorly
            let mut state = 1u32;
            (0..size)
                .map(|_| {
                    state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                    (state >> 24) as u8
                })
                .collect()
        }
        _ => panic!("Unknown pattern: {}", pattern),
    }
}

fn compression_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_throughput");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for size in [1024, 10240, 102400].iter() {
        let size_label = match *size {
            1024 => "1KB",
            10240 => "10KB",
            102400 => "100KB",
            _ => "unknown",
        };

        for pattern in ["text", "binary", "repetitive", "random"].iter() {
            let data = generate_test_data(*size, pattern);

            for format in FormatId::ALL {
                if format == FormatId::Crilayla && *size < CRILAYLA_RAW_PREFIX {
                    continue;
                }
                let codec = Codec::new(format);
                let benchmark_id =
                    BenchmarkId::from_parameter(format!("{}/{}/{}", size_label, pattern, format));

                group.throughput(Throughput::Bytes(*size as u64));
                group.bench_with_input(benchmark_id, &data, |b, data| {
                    b.iter(|| codec.compress(black_box(data)).expect("Compression failed"));
                });
            }
        }
    }

    group.finish();
}

fn parse_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_strategies");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    let data = generate_test_data(65536, "text");
    for strategy in [ParseStrategy::Optimal, ParseStrategy::Greedy] {
        for search in [MatchSearch::HashChain, MatchSearch::Exhaustive] {
            for format in [FormatId::Lz10, FormatId::Lz11, FormatId::Yaz0Be] {
                let codec = Codec::new(format).strategy(strategy).search(search);
                let benchmark_id = BenchmarkId::from_parameter(format!(
                    "{:?}/{:?}/{}",
                    strategy, search, format
                ));

                group.throughput(Throughput::Bytes(data.len() as u64));
                group.bench_with_input(benchmark_id, &data, |b, data| {
                    b.iter(|| codec.compress(black_box(data)).expect("Compression failed"));
                });
            }
        }
    }

    group.finish();
}

fn compression_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_ratio");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(10);

    for pattern in ["text", "binary", "repetitive", "random"].iter() {
        let data = generate_test_data(102400, pattern);

        for format in FormatId::ALL {
            let codec = Codec::new(format);
            let benchmark_id = BenchmarkId::from_parameter(format!("{}/{}", pattern, format));

            group.bench_with_input(benchmark_id, &data, |b, data| {
                b.iter_batched(
                    || data.clone(),
                    |data| {
                        let compressed =
                            codec.compress(black_box(&data)).expect("Compression failed");

                        // Return compression ratio
                        let ratio = compressed.len() as f64 / data.len() as f64;
                        black_box(ratio)
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

fn large_file_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_file_compression");
    group.measurement_time(Duration::from_secs(20));
    group.sample_size(10);

    // 4MB, well inside the 24-bit size fields
    let size = 4 * 1024 * 1024;
    let data = generate_test_data(size, "text");

    for format in [FormatId::Lz10, FormatId::Yaz0Be, FormatId::Huffman8, FormatId::Rle] {
        let codec = Codec::new(format);
        let benchmark_id = BenchmarkId::from_parameter(format!("4MB/{}", format));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(benchmark_id, &data, |b, data| {
            b.iter(|| codec.compress(black_box(data)).expect("Compression failed"));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    compression_throughput,
    parse_strategies,
    compression_ratio,
    large_file_compression
);
criterion_main!(benches);
