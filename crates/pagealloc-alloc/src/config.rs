pub use pagealloc_fixed::{
  FIX_ALLOC_CHUNK,
  PERSISTENT_CHUNK,
};

pub const PAGE_SHIFT: usize = 13;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

pub const LOG_CHUNK_PAGES: usize = 9;
pub const CHUNK_PAGES: usize = 1 << LOG_CHUNK_PAGES;
pub const LOG_CHUNK_BYTES: usize = LOG_CHUNK_PAGES + PAGE_SHIFT;
pub const CHUNK_BYTES: usize = 1 << LOG_CHUNK_BYTES;
/// 64-bit words in one chunk bitmap.
pub const CHUNK_WORDS: usize = CHUNK_PAGES / 64;

/// Pages held by one `PageCache`, one per bit of a `u64`.
pub const CACHE_PAGES: usize = u64::BITS as usize;
pub const CACHE_BYTES: usize = CACHE_PAGES * PAGE_SIZE;
/// Requests below this many pages may be served from a `PageCache`.
pub const CACHE_THRESHOLD: usize = CACHE_PAGES / 4;

pub const SUMMARY_LEVELS: usize = 5;
pub const SUMMARY_LEVEL_BITS: usize = 3;
pub const SUMMARY_FANOUT: usize = 1 << SUMMARY_LEVEL_BITS;

pub const LOG_MAX_PACKED: usize = LOG_CHUNK_PAGES + (SUMMARY_LEVELS - 1) * SUMMARY_LEVEL_BITS;
/// Largest run a summary entry can report.
pub const MAX_PACKED: usize = 1 << LOG_MAX_PACKED;

/// `searchAddr` value meaning nothing is free anywhere.
pub const SEARCH_ADDR_MAX: usize = usize::MAX;

/// Log2 of the pages covered by one summary entry at `level`.
#[inline(always)]
pub const fn level_log_pages(level: usize) -> usize {
  LOG_CHUNK_PAGES + (SUMMARY_LEVELS - 1 - level) * SUMMARY_LEVEL_BITS
}

/// Log2 of the bytes covered by one summary entry at `level`.
#[inline(always)]
pub const fn level_shift(level: usize) -> usize {
  level_log_pages(level) + PAGE_SHIFT
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn geometry() {
    assert_eq!(PAGE_SIZE, 8192);
    assert_eq!(CHUNK_PAGES, 512);
    assert_eq!(CHUNK_BYTES, 4 << 20);
    assert_eq!(CHUNK_WORDS, 8);
    assert_eq!(MAX_PACKED, CHUNK_PAGES * SUMMARY_FANOUT.pow(4));
  }

  #[test]
  fn levels_cover_expected_pages() {
    let pages: Vec<_> = (0..SUMMARY_LEVELS).map(level_log_pages).collect();
    assert_eq!(pages, [21, 18, 15, 12, 9]);
    assert_eq!(level_shift(SUMMARY_LEVELS - 1), LOG_CHUNK_BYTES);
  }
}
