//! Benchmark suite for `.gci` decoding.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gcif_benches::{generate_sprite_sheet, sizes};
use gcif_codec::{compress, decompress};
use std::hint::black_box;

fn bench_decode_sprite_sheets(c: &mut Criterion) {
	let mut group = c.benchmark_group("gci_decode");

	for (name, (width, height)) in
		[("small", sizes::SMALL), ("medium", sizes::MEDIUM), ("large", sizes::LARGE)]
	{
		let rgba = generate_sprite_sheet(width, height);
		let encoded =
			compress(&rgba, width as u32, height as u32, 2).expect("benchmark input encodes");

		group.throughput(Throughput::Elements((width * height) as u64));
		group.bench_with_input(BenchmarkId::new("decompress", name), &encoded, |b, data| {
			b.iter(|| {
				let image = decompress(black_box(data)).expect("benchmark input decodes");
				black_box(image)
			});
		});
	}

	group.finish();
}

fn bench_encode_levels(c: &mut Criterion) {
	let mut group = c.benchmark_group("gci_encode");
	let (width, height) = sizes::SMALL;
	let rgba = generate_sprite_sheet(width, height);

	for level in 0..4u32 {
		group.bench_with_input(BenchmarkId::new("level", level), &rgba, |b, rgba| {
			b.iter(|| {
				let encoded = compress(black_box(rgba), width as u32, height as u32, level)
					.expect("benchmark input encodes");
				black_box(encoded)
			});
		});
	}

	group.finish();
}

criterion_group!(benches, bench_decode_sprite_sheets, bench_encode_levels);
criterion_main!(benches);
