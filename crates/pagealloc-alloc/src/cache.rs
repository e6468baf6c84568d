use core::mem;

use getset::CopyGetters;
use log::trace;
use pagealloc_bitmap::find_bit_range64;
use pagealloc_sys::math::align_down;

use crate::{
  config::{
    CACHE_BYTES,
    CACHE_PAGES,
    PAGE_SIZE,
    SEARCH_ADDR_MAX,
  },
  pages::{
    PageAlloc,
    corrupt,
  },
};

/// Up to 64 pages owned by one worker, allocated without the central lock.
///
/// Bit `i` of `cache` is the page at `base + i * PAGE_SIZE`, set while that
/// page is free. Bit `i` of `scav` is set if that free page was scavenged.
/// The central allocator counts every page of the window as in use for as
/// long as the cache holds it, so the cache goes back by value through
/// [`PageAlloc::flush_cache`].
#[derive(Debug, Default, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct PageCache {
  base: usize,
  cache: u64,
  scav: u64,
}

impl PageCache {
  pub const fn new(base: usize, cache: u64, scav: u64) -> Self {
    Self {
      base,
      cache,
      scav: scav & cache,
    }
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    self.cache == 0
  }

  /// Free pages left.
  #[inline]
  pub const fn len(&self) -> usize {
    self.cache.count_ones() as usize
  }

  /// Takes `n` contiguous pages. Returns their address and how many of their
  /// bytes were scavenged.
  pub fn alloc(&mut self, n: usize) -> Option<(usize, usize)> {
    match n {
      0 => None,
      1 => self.alloc_one(),
      n => self.alloc_run(n),
    }
  }

  /// Takes the lowest free page.
  pub fn alloc_one(&mut self) -> Option<(usize, usize)> {
    if self.cache == 0 {
      return None;
    }
    let i = self.cache.trailing_zeros() as usize;
    let scav = (self.scav >> i) & 1;
    self.cache &= !(1 << i);
    self.scav &= !(1 << i);
    Some((self.base + i * PAGE_SIZE, scav as usize * PAGE_SIZE))
  }

  /// Takes the lowest run of `n` free pages. A run can never be longer than
  /// the 64 pages the cache covers.
  pub fn alloc_run(&mut self, n: usize) -> Option<(usize, usize)> {
    if self.cache == 0 || n == 0 || n > CACHE_PAGES {
      return None;
    }
    let i = find_bit_range64(self.cache, n);
    if i >= CACHE_PAGES {
      return None;
    }

    let mask = if n == CACHE_PAGES {
      u64::MAX
    } else {
      ((1 << n) - 1) << i
    };
    let scav = (self.scav & mask).count_ones() as usize;
    self.cache &= !mask;
    self.scav &= !mask;
    Some((self.base + i * PAGE_SIZE, scav * PAGE_SIZE))
  }

  /// Gives every page still in the cache back to `pages` and leaves the
  /// cache empty. The caller holds whatever lock guards `pages`.
  pub fn flush(&mut self, pages: &mut PageAlloc) {
    pages.flush_cache(mem::take(self));
  }
}

impl PageAlloc {
  /// Hands the free pages of one 64-page aligned block at or above
  /// `search_addr` to a new cache. They become in use here until the cache
  /// is flushed. Returns an empty cache when nothing is free.
  pub fn refill_cache(&mut self) -> PageCache {
    let search = self.search_addr;
    if self.chunk_index(search) >= self.end {
      return PageCache::default();
    }

    let ci = self.chunk_index(search);
    let found = if !self.leaf(ci).is_empty() {
      let cpi = self.chunk_page_index(search);
      match self.chunk_of(ci).find(1, cpi) {
        Some((j, _)) => self.chunk_base(ci) + j * PAGE_SIZE,
        None => corrupt(format_args!(
          "chunk {ci} summary {:?} has no free page at or after {cpi}",
          self.leaf(ci)
        )),
      }
    } else {
      match self.find_free(1) {
        Some((addr, _)) => addr,
        None => {
          self.search_addr = SEARCH_ADDR_MAX;
          return PageCache::default();
        }
      }
    };

    let Some(base) = align_down(found, CACHE_BYTES) else {
      corrupt(format_args!("cache window of {CACHE_BYTES} bytes is not a power of two"));
    };
    let ci = self.chunk_index(base);
    let cpi = self.chunk_page_index(base);

    let chunk = self.chunk_of_mut(ci);
    let (free, scav) = chunk.block64(cpi);
    chunk.take_block64(cpi, free);

    // Not contiguous: the block may have had in-use pages in it.
    self.update(base, CACHE_PAGES, false, true);
    // Every free page up to the end of the block now belongs to the cache.
    self.search_addr = base + CACHE_BYTES;

    trace!(
      "page allocator: cache refill at {base:#x} with {} pages",
      free.count_ones()
    );
    PageCache::new(base, free, scav)
  }

  /// Takes back the pages of `cache`, one at a time. Flushes are rare
  /// enough that the bitmaps are not updated a word at a time.
  pub fn flush_cache(&mut self, cache: PageCache) {
    if cache.is_empty() {
      return;
    }

    let base = cache.base;
    let ci = self.chunk_index(base);
    let cpi = self.chunk_page_index(base);

    let chunk = self.chunk_of_mut(ci);
    for i in 0..CACHE_PAGES {
      if cache.cache & (1 << i) != 0 {
        chunk.free1(cpi + i);
      }
      if cache.scav & (1 << i) != 0 {
        chunk.scavenge1(cpi + i);
      }
    }

    self.pull_search(base);
    self.update(base, CACHE_PAGES, false, false);
    trace!(
      "page allocator: cache flush at {base:#x} returned {} pages",
      cache.len()
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: usize = 1 << 30;

  fn page(i: usize) -> usize {
    BASE + i * PAGE_SIZE
  }

  #[test]
  fn empty_cache_allocates_nothing() {
    let mut cache = PageCache::default();
    assert!(cache.is_empty());
    assert_eq!(cache.alloc_one(), None);
    assert_eq!(cache.alloc_run(2), None);
    assert_eq!(cache.alloc(0), None);
  }

  #[test]
  fn alloc_one_takes_lowest_page() {
    let mut cache = PageCache::new(BASE, 0b1011_0100, 0b0010_0000);
    assert_eq!(cache.alloc(1), Some((page(2), 0)));
    assert_eq!(cache.alloc(1), Some((page(4), 0)));
    assert_eq!(cache.alloc(1), Some((page(5), PAGE_SIZE)));
    assert_eq!(cache.alloc(1), Some((page(7), 0)));
    assert!(cache.is_empty());
    assert_eq!(cache.scav(), 0);
  }

  #[test]
  fn alloc_run_finds_lowest_fit() {
    let mut cache = PageCache::new(BASE, 0b1111_0111, 0b0101_0000);
    assert_eq!(cache.alloc(4), Some((page(4), 2 * PAGE_SIZE)));
    assert_eq!(cache.cache(), 0b0111);
    assert_eq!(cache.scav(), 0);
    assert_eq!(cache.alloc(4), None);
    assert_eq!(cache.alloc(3), Some((page(0), 0)));
  }

  #[test]
  fn alloc_run_spanning_whole_cache() {
    let mut cache = PageCache::new(BASE, u64::MAX, u64::MAX);
    assert_eq!(cache.len(), 64);
    assert_eq!(cache.alloc(65), None);
    assert_eq!(cache.alloc(64), Some((page(0), 64 * PAGE_SIZE)));
    assert!(cache.is_empty());
  }

  #[test]
  fn scavenged_bits_never_outlive_free_bits() {
    let cache = PageCache::new(BASE, 0b0011, 0b1111);
    assert_eq!(cache.scav(), 0b0011);
  }
}
