use log::debug;

use crate::{
  config::{
    CHUNK_PAGES,
    PAGE_SIZE,
  },
  pages::PageAlloc,
};

impl PageAlloc {
  /// Marks up to `max_pages` free, resident pages as scavenged, highest
  /// addresses first, and reports each run to `release(addr, npages)` so the
  /// caller can give the memory back to the OS. Returns the pages marked.
  ///
  /// Free bits do not change, so no summary needs updating.
  pub fn scavenge(&mut self, max_pages: usize, mut release: impl FnMut(usize, usize)) -> usize {
    let mut left = max_pages;

    for ci in (self.start..self.end).rev() {
      if left == 0 {
        break;
      }
      if self.chunks[ci].is_none() {
        continue;
      }

      let chunk_base = self.chunk_base(ci);
      let chunk = self.chunk_of_mut(ci);
      let mut top = CHUNK_PAGES;
      while left > 0 {
        let Some(hi) = (0..top).rev().find(|&i| chunk.is_resident_free(i)) else {
          break;
        };
        let mut lo = hi;
        while lo > 0 && hi + 1 - lo < left && chunk.is_resident_free(lo - 1) {
          lo -= 1;
        }

        let n = hi + 1 - lo;
        chunk.scavenge_range(lo, n);
        release(chunk_base + lo * PAGE_SIZE, n);
        left -= n;
        top = lo;
      }
    }

    let marked = max_pages - left;
    debug!("page allocator: scavenged {marked} of {max_pages} requested pages");
    marked
  }
}
