use core::ptr::NonNull;

use log::{
  error,
  trace,
};
use pagealloc_list::{
  FreeList,
  Link,
};
use pagealloc_sys::prim::word_width;

use crate::{
  FIX_ALLOC_CHUNK,
  FixedError,
  FixedResult,
  PERSISTENT,
};

/// Called once for every object carved from a fresh chunk, before the
/// object is returned. Never called for objects recycled from the free list.
pub type FirstTouch = fn(arg: *mut (), obj: NonNull<u8>);

enum Slot {
  Fresh(NonNull<u8>),
  Recycled(NonNull<u8>),
}

/// Free-list allocator for objects of one fixed size, carved from chunks of
/// persistent memory. Chunks are never returned.
///
/// Not synchronized: the owner serializes access, usually with the lock
/// that already protects the structure embedding it.
pub struct FixAlloc {
  size: usize,
  first: Option<FirstTouch>,
  arg: *mut (),
  list: FreeList,
  chunk: usize,
  nchunk: usize,
  nalloc: usize,
  in_use: usize,
  zero: bool,
}

impl Default for FixAlloc {
  fn default() -> Self {
    Self::uninit()
  }
}

impl FixAlloc {
  /// An allocator that must be `init`ed before use.
  pub const fn uninit() -> Self {
    Self {
      size: 0,
      first: None,
      arg: core::ptr::null_mut(),
      list: FreeList::new(),
      chunk: 0,
      nchunk: 0,
      nalloc: 0,
      in_use: 0,
      zero: true,
    }
  }

  /// Fixes the object size. Sizes below one link are rounded up, sizes
  /// above [`FIX_ALLOC_CHUNK`] are a bug and panic.
  pub fn init(&mut self, size: usize, first: Option<FirstTouch>, arg: *mut ()) {
    if size > FIX_ALLOC_CHUNK {
      error!("fixalloc: object size {size} exceeds chunk ceiling {FIX_ALLOC_CHUNK}");
      panic!("fixalloc size too large");
    }

    let size = size.max(Link::SIZE);
    *self = Self {
      size,
      first,
      arg,
      list: FreeList::new(),
      chunk: 0,
      nchunk: 0,
      // Exact multiple of size so no chunk has a tail nobody can use.
      nalloc: FIX_ALLOC_CHUNK / size * size,
      in_use: 0,
      zero: true,
    };
  }

  /// Whether recycled objects are cleared before being returned. Objects
  /// from fresh chunks are always zero.
  pub fn set_zero(&mut self, zero: bool) {
    self.zero = zero;
  }

  pub const fn size(&self) -> usize {
    self.size
  }

  /// Bytes per chunk.
  pub const fn chunk_bytes(&self) -> usize {
    self.nalloc
  }

  /// Bytes currently handed out.
  pub const fn in_use(&self) -> usize {
    self.in_use
  }

  fn take(&mut self) -> FixedResult<Slot> {
    if let Some(obj) = self.list.pop() {
      return Ok(Slot::Recycled(obj));
    }

    if self.nchunk < self.size {
      let chunk = PERSISTENT.lock().alloc(self.nalloc, word_width())?;
      trace!(
        "fixalloc: new {} byte chunk at {:#x}",
        self.nalloc,
        chunk.as_ptr() as usize
      );
      self.chunk = chunk.as_ptr() as usize;
      self.nchunk = self.nalloc;
    }

    let obj = NonNull::new(self.chunk as *mut u8).ok_or(FixedError::Invalid)?;
    self.chunk += self.size;
    self.nchunk -= self.size;
    Ok(Slot::Fresh(obj))
  }

  pub fn alloc(&mut self) -> FixedResult<NonNull<u8>> {
    if self.size == 0 {
      error!("fixalloc: alloc before init");
      panic!("use of FixAlloc before init");
    }

    let obj = match self.take()? {
      Slot::Recycled(obj) => {
        if self.zero {
          unsafe { obj.as_ptr().write_bytes(0, self.size) };
        }
        obj
      }
      Slot::Fresh(obj) => {
        if let Some(first) = self.first {
          first(self.arg, obj);
        }
        obj
      }
    };

    self.in_use += self.size;
    Ok(obj)
  }

  /// Returns `obj` for reuse. Its first word is overwritten.
  ///
  /// # Safety
  ///
  /// `obj` must come from `alloc` on this allocator and must not be used
  /// after this call.
  pub unsafe fn free(&mut self, obj: NonNull<u8>) {
    self.in_use -= self.size;
    unsafe { self.list.push(obj) };
  }
}

unsafe impl Send for FixAlloc {}
