use std::hint::black_box;

use criterion::{
  BatchSize,
  BenchmarkId,
  Criterion,
  criterion_group,
  criterion_main,
};
use pagealloc::prelude::*;

const BASE: usize = 1 << 40;
const CHUNKS: usize = 64;

fn grown() -> PageAlloc {
  let mut pages = PageAlloc::new(BASE, CHUNKS).unwrap();
  pages
    .grow(BASE, CHUNKS * CHUNK_BYTES, Backing::Resident)
    .unwrap();
  pages
}

fn bench_alloc_free(c: &mut Criterion) {
  let mut group = c.benchmark_group("central_alloc_free");

  for n in [1, 8, 64, 600] {
    group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
      let mut pages = grown();
      b.iter(|| {
        let (addr, _) = pages.alloc(n).unwrap();
        pages.free_range(black_box(addr), n);
      });
    });
  }

  group.finish();
}

fn bench_find_fragmented(c: &mut Criterion) {
  let mut group = c.benchmark_group("central_find_fragmented");

  // Every chunk holds only single free pages, except a run in the last one.
  let mut pages = grown();
  pages.alloc_range(BASE, CHUNKS * CHUNK_PAGES);
  for i in (0..(CHUNKS - 1) * CHUNK_PAGES).step_by(2) {
    pages.free_range(BASE + i * PAGE_SIZE, 1);
  }
  pages.free_range(BASE + (CHUNKS * CHUNK_PAGES - 64) * PAGE_SIZE, 64);

  for n in [1, 2, 64] {
    group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
      b.iter(|| black_box(pages.find_free(black_box(n))));
    });
  }

  group.finish();
}

fn bench_scavenge(c: &mut Criterion) {
  c.bench_function("central_scavenge_all", |b| {
    b.iter_batched(
      grown,
      |mut pages| {
        pages.scavenge(usize::MAX, |addr, n| {
          black_box((addr, n));
        })
      },
      BatchSize::LargeInput,
    );
  });
}

criterion_group!(
  benches,
  bench_alloc_free,
  bench_find_fragmented,
  bench_scavenge
);
criterion_main!(benches);
