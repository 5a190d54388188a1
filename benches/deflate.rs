//! Benchmarks for the DEFLATE codec and the archive writer.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zipflate::{deflate, inflate, write_archive, DosDateTime, FileSpec};

/// Generate random (incompressible) data
fn generate_random_data(size: usize, seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = seed;
    for _ in 0..size {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        data.push((state & 0xFF) as u8);
    }
    data
}

/// Generate repetitive (highly compressible) data
fn generate_text_data(size: usize) -> Vec<u8> {
    let sentence = b"the quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        let chunk = (size - data.len()).min(sentence.len());
        data.extend_from_slice(&sentence[..chunk]);
    }
    data
}

fn bench_deflate(c: &mut Criterion) {
    let mut group = c.benchmark_group("deflate");

    for (label, data) in [
        ("text", generate_text_data(256 * 1024)),
        ("random", generate_random_data(256 * 1024, 0xDEADBEEF)),
    ] {
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &data, |b, data| {
            let mut dst = vec![0u8; data.len() * 2 + 100];
            b.iter(|| deflate(data, &mut dst).unwrap());
        });
    }
    group.finish();
}

fn bench_inflate(c: &mut Criterion) {
    let mut group = c.benchmark_group("inflate");

    for (label, data) in [
        ("text", generate_text_data(256 * 1024)),
        ("random", generate_random_data(256 * 1024, 0xDEADBEEF)),
    ] {
        let mut compressed = vec![0u8; data.len() * 2 + 100];
        let n = deflate(&data, &mut compressed).unwrap();
        compressed.truncate(n);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &compressed, |b, src| {
            let mut dst = vec![0u8; data.len()];
            b.iter(|| inflate(src, &mut dst).unwrap());
        });
    }
    group.finish();
}

fn bench_zip_write(c: &mut Criterion) {
    let data = generate_text_data(128 * 1024);
    let files = [FileSpec { name: b"bench.txt", data: &data, mtime: DosDateTime::EPOCH }];

    let mut group = c.benchmark_group("zip_write");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("one_member", |b| {
        b.iter(|| write_archive(&files, b"", None).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_deflate, bench_inflate, bench_zip_write);
criterion_main!(benches);
