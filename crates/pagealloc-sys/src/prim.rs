use core::sync::atomic::{
  AtomicUsize,
  Ordering,
};

use crate::math::align_up;

#[derive(Debug, PartialEq)]
pub enum PrimError {
  Overflow,
}

pub type PrimResult<T> = Result<T, PrimError>;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
const COMMON_PAGE_SIZE: usize = 4096;

pub const fn word_width() -> usize {
  core::mem::size_of::<usize>()
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn os_page_size_helper() -> usize {
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn os_page_size_helper() -> usize {
  COMMON_PAGE_SIZE
}

/// Granularity of the OS mapping layer. Unrelated to the allocator's own
/// page size, which is a compile-time constant.
pub fn os_page_size() -> usize {
  static OS_PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

  match OS_PAGE_SIZE.load(Ordering::Acquire) {
    0 => {
      let size = os_page_size_helper();
      OS_PAGE_SIZE.store(size, Ordering::Release);
      size
    }
    size => size,
  }
}

pub fn os_page_align(value: usize) -> PrimResult<usize> {
  align_up(value, os_page_size()).ok_or(PrimError::Overflow)
}
