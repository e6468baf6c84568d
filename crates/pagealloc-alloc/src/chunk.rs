use pagealloc_bitmap::Bitmap;

use crate::{
  config::{
    CHUNK_PAGES,
    CHUNK_WORDS,
  },
  summary::Summary,
};

pub type PageBits = Bitmap<CHUNK_WORDS>;

/// How the memory behind newly grown chunks starts out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
  /// Fresh mappings the OS has not backed yet: free and scavenged.
  Released,
  /// Already faulted in: free and unscavenged.
  Resident,
}

/// Page bookkeeping for one chunk. A set bit in `free` is a free page, a set
/// bit in `scavenged` is a page whose memory was given back to the OS. The
/// scavenged bit of an in-use page is always clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkData {
  free: PageBits,
  scavenged: PageBits,
}

impl ChunkData {
  pub fn new(backing: Backing) -> Self {
    let scavenged = match backing {
      Backing::Released => PageBits::ones(),
      Backing::Resident => PageBits::zero(),
    };
    Self {
      free: PageBits::ones(),
      scavenged,
    }
  }

  #[inline(always)]
  pub fn free(&self) -> &PageBits {
    &self.free
  }

  #[inline(always)]
  pub fn scavenged(&self) -> &PageBits {
    &self.scavenged
  }

  pub fn summarize(&self) -> Summary {
    self.free.runs().into()
  }

  /// First run of `n` free pages at or after the block holding `from`,
  /// along with the first free page seen on the way.
  pub fn find(&self, n: usize, from: usize) -> Option<(usize, usize)> {
    self.free.find_run(n, from)
  }

  /// Marks `[i, i+n)` in use and returns how many of those pages were
  /// scavenged.
  pub fn alloc_range(&mut self, i: usize, n: usize) -> usize {
    let scav = self.free.count_both(&self.scavenged, i, n);
    self.free.clear_range(i, n);
    self.scavenged.clear_range(i, n);
    scav
  }

  pub fn alloc_all(&mut self) -> usize {
    self.alloc_range(0, CHUNK_PAGES)
  }

  pub fn free_range(&mut self, i: usize, n: usize) {
    self.free.set_range(i, n);
  }

  pub fn free_all(&mut self) {
    self.free.set_all();
  }

  #[inline]
  pub fn free1(&mut self, i: usize) {
    self.free.set(i);
  }

  #[inline]
  pub fn scavenge1(&mut self, i: usize) {
    self.scavenged.set(i);
  }

  /// Free and scavenged bits of the 64-page block containing page `i`.
  pub fn block64(&self, i: usize) -> (u64, u64) {
    let free = self.free.block64(i);
    (free, free & self.scavenged.block64(i))
  }

  /// Hands the pages of `free` in the block containing `i` to someone else:
  /// they become in use here and lose their scavenged bit.
  pub fn take_block64(&mut self, i: usize, free: u64) {
    self.free.clear_block64(i, free);
    self.scavenged.clear_block64(i, free);
  }

  /// Whether page `i` is free and still backed.
  #[inline]
  pub fn is_resident_free(&self, i: usize) -> bool {
    self.free.get(i) && !self.scavenged.get(i)
  }

  pub fn scavenge_range(&mut self, i: usize, n: usize) {
    self.scavenged.set_range(i, n);
  }

  pub fn free_pages(&self) -> usize {
    self.free.count()
  }

  pub fn scavenged_pages(&self) -> usize {
    self.free.count_both(&self.scavenged, 0, CHUNK_PAGES)
  }
}
