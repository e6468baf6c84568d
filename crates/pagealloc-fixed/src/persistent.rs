use core::ptr::NonNull;

use log::trace;
use pagealloc_sys::{
  extent::Extent,
  math::align_up,
};
use spin::Mutex;

use crate::{
  FixedError,
  FixedResult,
  PERSISTENT_CHUNK,
};

/// Process-wide source of memory that is never given back.
pub static PERSISTENT: Mutex<Persistent> = Mutex::new(Persistent::new());

/// Bump allocator over leaked OS mappings. Everything it hands out lives
/// until the process exits, which is what allocator metadata needs.
#[derive(Debug, Default)]
pub struct Persistent {
  cursor: usize,
  limit: usize,
  sys_bytes: usize,
}

impl Persistent {
  pub const fn new() -> Self {
    Self {
      cursor: 0,
      limit: 0,
      sys_bytes: 0,
    }
  }

  /// Bytes mapped from the OS so far.
  pub const fn sys_bytes(&self) -> usize {
    self.sys_bytes
  }

  fn map(&mut self, size: usize) -> FixedResult<&'static mut [u8]> {
    let slice = Extent::new(size)?.leak();
    self.sys_bytes += slice.len();
    trace!(
      "persistent: mapped {} bytes at {:#x}",
      slice.len(),
      slice.as_ptr() as usize
    );
    Ok(slice)
  }

  /// Returns `size` zeroed bytes aligned to `align`.
  pub fn alloc(&mut self, size: usize, align: usize) -> FixedResult<NonNull<u8>> {
    if size == 0 {
      return Err(FixedError::Invalid);
    }

    if size > PERSISTENT_CHUNK {
      let slice = self.map(size)?;
      return NonNull::new(slice.as_mut_ptr()).ok_or(FixedError::Invalid);
    }

    let mut start = align_up(self.cursor, align).ok_or(FixedError::Invalid)?;
    let fits = self.cursor != 0
      && start
        .checked_add(size)
        .is_some_and(|end| end <= self.limit);

    if !fits {
      let slice = self.map(PERSISTENT_CHUNK)?;
      self.cursor = slice.as_mut_ptr() as usize;
      self.limit = self.cursor + slice.len();
      start = align_up(self.cursor, align).ok_or(FixedError::Invalid)?;
    }

    self.cursor = start + size;
    NonNull::new(start as *mut u8).ok_or(FixedError::Invalid)
  }
}
