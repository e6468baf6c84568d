use spin::Mutex;

use crate::{
  PageAllocResult,
  cache::PageCache,
  chunk::Backing,
  config::CACHE_THRESHOLD,
  pages::PageAlloc,
};

/// A `PageAlloc` behind the one lock that guards it. This is the handle
/// workers share; each worker brings its own `PageCache`.
pub struct Arena {
  pages: Mutex<PageAlloc>,
}

impl Arena {
  pub fn new(base: usize, max_chunks: usize) -> PageAllocResult<Self> {
    Ok(Self {
      pages: Mutex::new(PageAlloc::new(base, max_chunks)?),
    })
  }

  pub fn grow(&self, base: usize, size: usize, backing: Backing) -> PageAllocResult<()> {
    self.pages.lock().grow(base, size, backing)
  }

  /// Allocates `n` pages, from `cache` without taking the lock when it can.
  /// An empty cache is refilled first. Requests the cache cannot serve go
  /// to the central allocator.
  pub fn alloc(&self, cache: Option<&mut PageCache>, n: usize) -> Option<(usize, usize)> {
    if n == 0 {
      return None;
    }

    if let Some(cache) = cache.filter(|_| n < CACHE_THRESHOLD) {
      if cache.is_empty() {
        *cache = self.pages.lock().refill_cache();
      }
      if let Some(found) = cache.alloc(n) {
        return Some(found);
      }
    }

    self.pages.lock().alloc(n)
  }

  pub fn free(&self, base: usize, n: usize) {
    self.pages.lock().free_range(base, n);
  }

  /// Returns whatever is left in `cache` to the central allocator.
  pub fn release_cache(&self, cache: PageCache) {
    if !cache.is_empty() {
      self.pages.lock().flush_cache(cache);
    }
  }

  pub fn scavenge(&self, max_pages: usize, release: impl FnMut(usize, usize)) -> usize {
    self.pages.lock().scavenge(max_pages, release)
  }

  /// Runs `f` with the lock held.
  pub fn with<R>(&self, f: impl FnOnce(&mut PageAlloc) -> R) -> R {
    f(&mut self.pages.lock())
  }
}
