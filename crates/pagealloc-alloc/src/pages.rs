use core::{
  fmt,
  mem::size_of,
  ops::Range,
  ptr::NonNull,
};

use getset::CopyGetters;
use log::{
  debug,
  error,
  warn,
};
use pagealloc_fixed::FixAlloc;
use pagealloc_sys::{
  extent::Table,
  math::is_aligned,
};

use crate::{
  PageAllocError,
  PageAllocResult,
  chunk::{
    Backing,
    ChunkData,
  },
  config::{
    CHUNK_BYTES,
    CHUNK_PAGES,
    LOG_CHUNK_BYTES,
    PAGE_SHIFT,
    PAGE_SIZE,
    SEARCH_ADDR_MAX,
    SUMMARY_FANOUT,
    SUMMARY_LEVEL_BITS,
    SUMMARY_LEVELS,
    level_log_pages,
    level_shift,
  },
  summary::Summary,
};

pub(crate) const LEAF: usize = SUMMARY_LEVELS - 1;

/// Index of the first entry of `level` in a summary table whose top level
/// has `top` entries.
#[inline(always)]
const fn level_offset(top: usize, level: usize) -> usize {
  top * ((1 << (level * SUMMARY_LEVEL_BITS)) - 1) / (SUMMARY_FANOUT - 1)
}

/// Logs the broken invariant and aborts the operation. Summaries and
/// bitmaps disagreeing means the allocator state can no longer be trusted.
#[cold]
pub(crate) fn corrupt(what: fmt::Arguments<'_>) -> ! {
  error!("page allocator: {what}");
  panic!("bad summary data");
}

/// The central page allocator for one arena of address space.
///
/// Addresses are absolute, but every index is relative to `base`, the
/// chunk-aligned start of the arena. Memory only becomes usable once it has
/// been added with [`PageAlloc::grow`].
///
/// All methods take `&mut self`; sharing goes through [`crate::Arena`].
#[derive(CopyGetters)]
pub struct PageAlloc {
  #[getset(get_copy = "pub")]
  base: usize,
  #[getset(get_copy = "pub")]
  max_chunks: usize,
  pub(crate) start: usize,
  pub(crate) end: usize,
  /// No page below this address is free.
  #[getset(get_copy = "pub")]
  pub(crate) search_addr: usize,
  pub(crate) chunks: Table<Option<NonNull<ChunkData>>>,
  /// Every summary level back to back, top level first. Level `l` has
  /// `top << 3l` entries and entry `i` covers entries `8i..8i+8` below it.
  summary: Table<Summary>,
  top: usize,
  records: FixAlloc,
}

unsafe impl Send for PageAlloc {}

impl PageAlloc {
  /// Creates an empty allocator for up to `max_chunks` chunks starting at
  /// `base`. No address is usable until it is grown.
  pub fn new(base: usize, max_chunks: usize) -> PageAllocResult<Self> {
    if base == 0 || is_aligned(base, CHUNK_BYTES) != Some(true) {
      return Err(PageAllocError::Misaligned);
    }
    max_chunks
      .checked_mul(CHUNK_BYTES)
      .and_then(|bytes| base.checked_add(bytes))
      .filter(|_| max_chunks > 0)
      .ok_or(PageAllocError::OutOfRange)?;

    let top = max_chunks.div_ceil(1 << (LEAF * SUMMARY_LEVEL_BITS));
    let chunks = unsafe { Table::zeroed(max_chunks) }.map_err(PageAllocError::Extent)?;
    let summary =
      unsafe { Table::zeroed(level_offset(top, SUMMARY_LEVELS)) }.map_err(PageAllocError::Extent)?;

    let mut records = FixAlloc::uninit();
    records.init(size_of::<ChunkData>(), None, core::ptr::null_mut());
    records.set_zero(false);

    Ok(Self {
      base,
      max_chunks,
      start: max_chunks,
      end: 0,
      search_addr: SEARCH_ADDR_MAX,
      chunks,
      summary,
      top,
      records,
    })
  }

  /// Chunk indices `[start, end)` that have been grown at least partly.
  pub fn bounds(&self) -> (usize, usize) {
    (self.start, self.end)
  }

  #[inline(always)]
  pub(crate) fn chunk_index(&self, addr: usize) -> usize {
    addr.wrapping_sub(self.base) >> LOG_CHUNK_BYTES
  }

  #[inline(always)]
  pub(crate) fn chunk_base(&self, ci: usize) -> usize {
    self.base + (ci << LOG_CHUNK_BYTES)
  }

  #[inline(always)]
  pub(crate) fn chunk_page_index(&self, addr: usize) -> usize {
    (addr.wrapping_sub(self.base) >> PAGE_SHIFT) % CHUNK_PAGES
  }

  #[inline(always)]
  pub(crate) fn level_index(&self, level: usize, addr: usize) -> usize {
    addr.wrapping_sub(self.base) >> level_shift(level)
  }

  #[inline(always)]
  pub(crate) fn level_addr(&self, level: usize, index: usize) -> usize {
    self.base + (index << level_shift(level))
  }

  /// Bookkeeping of chunk `ci`, if it has been grown.
  pub fn chunk(&self, ci: usize) -> Option<&ChunkData> {
    let ptr = (*self.chunks.get(ci)?)?;
    Some(unsafe { ptr.as_ref() })
  }

  pub(crate) fn chunk_of(&self, ci: usize) -> &ChunkData {
    match self.chunk(ci) {
      Some(chunk) => chunk,
      None => corrupt(format_args!("chunk {ci} was never grown")),
    }
  }

  pub(crate) fn chunk_of_mut(&mut self, ci: usize) -> &mut ChunkData {
    match self.chunks.get(ci).copied().flatten() {
      Some(mut ptr) => unsafe { ptr.as_mut() },
      None => corrupt(format_args!("chunk {ci} was never grown")),
    }
  }

  fn level_range(&self, level: usize) -> Range<usize> {
    level_offset(self.top, level)..level_offset(self.top, level + 1)
  }

  /// Entries of summary level `level`, 0 being the top.
  pub fn summary(&self, level: usize) -> &[Summary] {
    &self.summary[self.level_range(level)]
  }

  #[inline]
  pub(crate) fn leaf(&self, ci: usize) -> Summary {
    self.summary[level_offset(self.top, LEAF) + ci]
  }

  /// Moves `search_addr` down to `addr` if it is above it.
  #[inline]
  pub(crate) fn pull_search(&mut self, addr: usize) {
    if addr < self.search_addr {
      self.search_addr = addr;
    }
  }

  /// Adds `[base, base+size)` to the managed space. Both ends must be chunk
  /// aligned and inside the arena, and none of it may be grown already.
  pub fn grow(&mut self, base: usize, size: usize, backing: Backing) -> PageAllocResult<()> {
    if size == 0
      || is_aligned(base, CHUNK_BYTES) != Some(true)
      || is_aligned(size, CHUNK_BYTES) != Some(true)
    {
      return Err(PageAllocError::Misaligned);
    }
    if base < self.base {
      return Err(PageAllocError::OutOfRange);
    }

    let sc = self.chunk_index(base);
    let ec = sc + size / CHUNK_BYTES;
    if ec > self.max_chunks {
      return Err(PageAllocError::OutOfRange);
    }
    if self.chunks[sc..ec].iter().any(Option::is_some) {
      return Err(PageAllocError::AlreadyGrown);
    }

    for ci in sc..ec {
      let record = match self.records.alloc() {
        Ok(record) => record.cast::<ChunkData>(),
        Err(err) => {
          self.undo_records(sc, ci);
          return Err(PageAllocError::Fixed(err));
        }
      };
      unsafe { record.write(ChunkData::new(backing)) };
      self.chunks[ci] = Some(record);
    }

    self.start = self.start.min(sc);
    self.end = self.end.max(ec);
    self.update(base, size / PAGE_SIZE, true, false);
    self.pull_search(base);

    debug!(
      "page allocator: grew {} chunks at {base:#x} ({backing:?}), managing [{}, {})",
      ec - sc,
      self.start,
      self.end
    );
    Ok(())
  }

  fn undo_records(&mut self, sc: usize, ec: usize) {
    for ci in sc..ec {
      if let Some(record) = self.chunks[ci].take() {
        unsafe { self.records.free(record.cast()) };
      }
    }
  }

  /// Allocates `n` contiguous pages. Returns the address of the first page
  /// and the number of bytes in the run that had been scavenged, or `None`
  /// if no run is long enough.
  pub fn alloc(&mut self, n: usize) -> Option<(usize, usize)> {
    if n == 0 {
      return None;
    }
    let search = self.search_addr;
    if self.chunk_index(search) >= self.end {
      return None;
    }

    // Fast path: a long enough run in the chunk holding search_addr.
    let ci = self.chunk_index(search);
    let cpi = self.chunk_page_index(search);
    let mut found = None;
    if CHUNK_PAGES - cpi >= n && self.leaf(ci).max() >= n {
      let Some((j, seen)) = self.chunk_of(ci).find(n, cpi) else {
        corrupt(format_args!(
          "chunk {ci} summary {:?} has no run of {n} at page {cpi}",
          self.leaf(ci)
        ));
      };
      let chunk_base = self.chunk_base(ci);
      found = Some((chunk_base + j * PAGE_SIZE, chunk_base + seen * PAGE_SIZE));
    }

    let (addr, hint) = match found.or_else(|| self.find_free(n)) {
      Some(found) => found,
      None => {
        if n == 1 {
          self.search_addr = SEARCH_ADDR_MAX;
        }
        warn!("page allocator: no run of {n} pages");
        return None;
      }
    };

    let scav = self.alloc_range(addr, n);
    if self.search_addr < hint {
      self.search_addr = hint;
    }
    Some((addr, scav))
  }

  /// Marks `[base, base + n pages)` in use and returns how many of those
  /// bytes had been scavenged. An empty range changes nothing.
  pub fn alloc_range(&mut self, base: usize, n: usize) -> usize {
    if n == 0 {
      return 0;
    }
    let limit = base + n * PAGE_SIZE - 1;
    let (sc, ec) = (self.chunk_index(base), self.chunk_index(limit));
    let (si, ei) = (self.chunk_page_index(base), self.chunk_page_index(limit));

    let scav = if sc == ec {
      self.chunk_of_mut(sc).alloc_range(si, ei + 1 - si)
    } else {
      let mut scav = self.chunk_of_mut(sc).alloc_range(si, CHUNK_PAGES - si);
      for ci in sc + 1..ec {
        scav += self.chunk_of_mut(ci).alloc_all();
      }
      scav + self.chunk_of_mut(ec).alloc_range(0, ei + 1)
    };

    self.update(base, n, true, true);
    scav * PAGE_SIZE
  }

  /// Returns `[base, base + n pages)` to the allocator. The pages keep their
  /// scavenged bits clear: freed memory is assumed resident.
  pub fn free_range(&mut self, base: usize, n: usize) {
    if n == 0 {
      return;
    }
    self.pull_search(base);

    let limit = base + n * PAGE_SIZE - 1;
    let (sc, ec) = (self.chunk_index(base), self.chunk_index(limit));
    let (si, ei) = (self.chunk_page_index(base), self.chunk_page_index(limit));

    if n == 1 {
      self.chunk_of_mut(sc).free1(si);
    } else if sc == ec {
      self.chunk_of_mut(sc).free_range(si, ei + 1 - si);
    } else {
      self.chunk_of_mut(sc).free_range(si, CHUNK_PAGES - si);
      for ci in sc + 1..ec {
        self.chunk_of_mut(ci).free_all();
      }
      self.chunk_of_mut(ec).free_range(0, ei + 1);
    }

    self.update(base, n, true, false);
  }

  /// Brings every summary level in line with the bitmaps after a change to
  /// `[base, base + n pages)`.
  ///
  /// `contig` says the whole range went the same way (`alloc` says which),
  /// so chunks strictly inside it need no bitmap scan.
  pub(crate) fn update(&mut self, base: usize, n: usize, contig: bool, alloc: bool) {
    let limit = base + n * PAGE_SIZE - 1;
    let (sc, ec) = (self.chunk_index(base), self.chunk_index(limit));

    let leaf = level_offset(self.top, LEAF);

    if sc == ec {
      let sum = self.chunk_of(sc).summarize();
      if self.summary[leaf + sc] == sum {
        return;
      }
      self.summary[leaf + sc] = sum;
    } else if contig {
      let first = self.chunk_of(sc).summarize();
      let last = self.chunk_of(ec).summarize();
      let whole = if alloc {
        Summary::EMPTY
      } else {
        Summary::FREE_CHUNK
      };
      self.summary[leaf + sc] = first;
      self.summary[leaf + sc + 1..leaf + ec].fill(whole);
      self.summary[leaf + ec] = last;
    } else {
      for ci in sc..=ec {
        let sum = self.chunk_of(ci).summarize();
        self.summary[leaf + ci] = sum;
      }
    }

    let mut changed = true;
    for l in (0..LEAF).rev() {
      if !changed {
        break;
      }
      changed = false;

      let log_pages = level_log_pages(l + 1);
      let lo = self.level_index(l, base);
      let hi = self.level_index(l, limit) + 1;
      let parents = level_offset(self.top, l);
      let (upper, lower) = self.summary.split_at_mut(level_offset(self.top, l + 1));

      for i in lo..hi {
        let children = &lower[i * SUMMARY_FANOUT..(i + 1) * SUMMARY_FANOUT];
        let sum = Summary::merge(children, log_pages);
        if upper[parents + i] != sum {
          upper[parents + i] = sum;
          changed = true;
        }
      }
    }
  }

  /// Free pages across every grown chunk.
  pub fn free_pages(&self) -> usize {
    (self.start..self.end)
      .filter_map(|ci| self.chunk(ci))
      .map(ChunkData::free_pages)
      .sum()
  }

  /// Free pages whose memory has been handed back to the OS.
  pub fn scavenged_pages(&self) -> usize {
    (self.start..self.end)
      .filter_map(|ci| self.chunk(ci))
      .map(ChunkData::scavenged_pages)
      .sum()
  }
}
