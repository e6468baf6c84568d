use std::hint::black_box;

use criterion::{
  BenchmarkId,
  Criterion,
  criterion_group,
  criterion_main,
};
use pagealloc::prelude::*;

fn bench_alloc_free(c: &mut Criterion) {
  let mut group = c.benchmark_group("fixalloc_alloc_free");

  for size in [16, 64, 128, 1024] {
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
      let mut fixed = FixAlloc::uninit();
      fixed.init(size, None, core::ptr::null_mut());
      b.iter(|| {
        let obj = fixed.alloc().unwrap();
        unsafe { fixed.free(black_box(obj)) };
      });
    });
  }

  group.finish();
}

fn bench_batch(c: &mut Criterion) {
  let mut group = c.benchmark_group("fixalloc_batch_256");

  for zero in [true, false] {
    group.bench_with_input(BenchmarkId::from_parameter(zero), &zero, |b, &zero| {
      let mut fixed = FixAlloc::uninit();
      fixed.init(128, None, core::ptr::null_mut());
      fixed.set_zero(zero);
      let mut objs = Vec::with_capacity(256);
      b.iter(|| {
        objs.extend((0..256).map(|_| fixed.alloc().unwrap()));
        for obj in objs.drain(..) {
          unsafe { fixed.free(obj) };
        }
      });
    });
  }

  group.finish();
}

criterion_group!(benches, bench_alloc_free, bench_batch);
criterion_main!(benches);
