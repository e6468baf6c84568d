use core::ptr::NonNull;

use pagealloc_list::Link;

use crate::{
  FIX_ALLOC_CHUNK,
  FixAlloc,
  FixedError,
  PERSISTENT_CHUNK,
  Persistent,
};

fn count_touch(arg: *mut (), _obj: NonNull<u8>) {
  unsafe { *(arg as *mut usize) += 1 };
}

#[test]
fn persistent_respects_alignment() {
  let mut persistent = Persistent::new();
  let a = persistent.alloc(3, 1).unwrap();
  let b = persistent.alloc(24, 64).unwrap();
  assert_eq!(b.as_ptr() as usize % 64, 0);
  assert!(b.as_ptr() as usize > a.as_ptr() as usize);
  assert_eq!(persistent.sys_bytes(), PERSISTENT_CHUNK);
}

#[test]
fn persistent_memory_is_zeroed() {
  let mut persistent = Persistent::new();
  let p = persistent.alloc(512, 8).unwrap();
  let bytes = unsafe { core::slice::from_raw_parts(p.as_ptr(), 512) };
  assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn persistent_maps_new_chunk_when_full() {
  let mut persistent = Persistent::new();
  let first = persistent.alloc(PERSISTENT_CHUNK - 8, 8).unwrap();
  let second = persistent.alloc(64, 8).unwrap();
  assert_ne!(first, second);
  assert_eq!(persistent.sys_bytes(), 2 * PERSISTENT_CHUNK);
}

#[test]
fn persistent_large_requests_get_own_mapping() {
  let mut persistent = Persistent::new();
  let big = persistent.alloc(PERSISTENT_CHUNK + 1, 8).unwrap();
  assert!(!big.as_ptr().is_null());
  assert!(persistent.sys_bytes() > PERSISTENT_CHUNK);
}

#[test]
fn persistent_rejects_empty() {
  let mut persistent = Persistent::new();
  assert!(matches!(persistent.alloc(0, 8), Err(FixedError::Invalid)));
}

#[test]
fn init_rounds_size_and_chunk() {
  let mut fixed = FixAlloc::uninit();
  fixed.init(1, None, core::ptr::null_mut());
  assert_eq!(fixed.size(), Link::SIZE);

  fixed.init(24, None, core::ptr::null_mut());
  assert_eq!(fixed.size(), 24);
  assert_eq!(fixed.chunk_bytes() % 24, 0);
  assert!(fixed.chunk_bytes() <= FIX_ALLOC_CHUNK);
  assert!(FIX_ALLOC_CHUNK - fixed.chunk_bytes() < 24);
}

#[test]
#[should_panic(expected = "before init")]
fn alloc_before_init_panics() {
  let mut fixed = FixAlloc::uninit();
  let _ = fixed.alloc();
}

#[test]
#[should_panic(expected = "too large")]
fn oversized_objects_panic() {
  let mut fixed = FixAlloc::uninit();
  fixed.init(FIX_ALLOC_CHUNK + 1, None, core::ptr::null_mut());
}

#[test]
fn recycles_in_lifo_order_without_first_touch() {
  let mut touched = 0usize;
  let mut fixed = FixAlloc::uninit();
  fixed.init(48, Some(count_touch), &mut touched as *mut usize as *mut ());

  let first: Vec<_> = (0..10).map(|_| fixed.alloc().unwrap()).collect();
  assert_eq!(touched, 10);
  assert_eq!(fixed.in_use(), 10 * 48);

  for &p in &first {
    unsafe { fixed.free(p) };
  }
  assert_eq!(fixed.in_use(), 0);

  let second: Vec<_> = (0..10).map(|_| fixed.alloc().unwrap()).collect();
  let expected: Vec<_> = first.iter().rev().copied().collect();
  assert_eq!(second, expected);
  assert_eq!(touched, 10, "recycled objects are never first-touched");
}

#[test]
fn fresh_objects_are_contiguous() {
  let mut fixed = FixAlloc::uninit();
  fixed.init(32, None, core::ptr::null_mut());
  let a = fixed.alloc().unwrap().as_ptr() as usize;
  let b = fixed.alloc().unwrap().as_ptr() as usize;
  assert_eq!(b - a, 32);
}

#[test]
fn recycled_objects_are_zeroed() {
  let mut fixed = FixAlloc::uninit();
  fixed.init(64, None, core::ptr::null_mut());

  let p = fixed.alloc().unwrap();
  unsafe { p.as_ptr().write_bytes(0xEE, 64) };
  unsafe { fixed.free(p) };

  let q = fixed.alloc().unwrap();
  assert_eq!(p, q);
  let bytes = unsafe { core::slice::from_raw_parts(q.as_ptr(), 64) };
  assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn zeroing_can_be_disabled() {
  let mut fixed = FixAlloc::uninit();
  fixed.init(64, None, core::ptr::null_mut());
  fixed.set_zero(false);

  let p = fixed.alloc().unwrap();
  unsafe { p.as_ptr().write_bytes(0xEE, 64) };
  unsafe { fixed.free(p) };

  let q = fixed.alloc().unwrap();
  let bytes = unsafe { core::slice::from_raw_parts(q.as_ptr(), 64) };
  assert!(bytes[Link::SIZE..].iter().all(|&b| b == 0xEE));
}

#[test]
fn spills_into_new_chunks() {
  let mut touched = 0usize;
  let mut fixed = FixAlloc::uninit();
  fixed.init(4096, Some(count_touch), &mut touched as *mut usize as *mut ());

  let per_chunk = fixed.chunk_bytes() / fixed.size();
  let objs: Vec<_> = (0..per_chunk * 2 + 1)
    .map(|_| fixed.alloc().unwrap().as_ptr() as usize)
    .collect();

  assert_eq!(touched, objs.len());
  let mut sorted = objs.clone();
  sorted.sort_unstable();
  sorted.dedup();
  assert_eq!(sorted.len(), objs.len(), "no object handed out twice");
}
