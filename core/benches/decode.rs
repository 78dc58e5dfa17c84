//! Checksum and decode throughput across histogram sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use histo_core::integrity::checksum;
use histo_core::objects::{decode, encode_histogram, HistogramDraft, TypeTag};

fn histogram_frame(nbins: u32) -> Vec<u8> {
    let mut draft = HistogramDraft::uniform("TH1F", "bench", nbins, 0.0, nbins as f64);
    for (i, c) in draft.contents.iter_mut().enumerate() {
        *c = (i % 7) as f64;
    }
    encode_histogram(&draft).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let expected = TypeTag::from_name("TH1F").unwrap();
    let mut group = c.benchmark_group("frame");

    for &nbins in &[10u32, 100, 1_000, 10_000] {
        let frame = histogram_frame(nbins);
        group.throughput(Throughput::Bytes(frame.len() as u64));

        group.bench_with_input(BenchmarkId::new("checksum", nbins), &frame, |b, f| {
            b.iter(|| black_box(checksum(black_box(f))))
        });
        group.bench_with_input(BenchmarkId::new("decode", nbins), &frame, |b, f| {
            b.iter(|| black_box(decode(black_box(f), &expected)))
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
