use core::fmt;

use pagealloc_bitmap::Runs;

use crate::config::{
  CHUNK_PAGES,
  LOG_MAX_PACKED,
  MAX_PACKED,
};

const FIELD_MASK: u64 = (1 << LOG_MAX_PACKED) - 1;
const MAX_BIT: u64 = 1 << 63;

/// Free-run summary of a region: pages free at its start, the longest free
/// run anywhere in it, and pages free at its end.
///
/// Three 21-bit fields packed into one word. A run of `MAX_PACKED` pages
/// does not fit in 21 bits, so a region that is entirely free at the largest
/// level is stored as bit 63 alone.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary(u64);

impl Summary {
  /// No free pages.
  pub const EMPTY: Self = Self(0);
  /// A chunk with every page free.
  pub const FREE_CHUNK: Self = Self::pack(CHUNK_PAGES, CHUNK_PAGES, CHUNK_PAGES);

  pub const fn pack(start: usize, max: usize, end: usize) -> Self {
    if max == MAX_PACKED {
      return Self(MAX_BIT);
    }
    Self(
      (start as u64 & FIELD_MASK)
        | (max as u64 & FIELD_MASK) << LOG_MAX_PACKED
        | (end as u64 & FIELD_MASK) << (2 * LOG_MAX_PACKED),
    )
  }

  #[inline]
  const fn field(self, i: usize) -> usize {
    if self.0 & MAX_BIT != 0 {
      return MAX_PACKED;
    }
    ((self.0 >> (i * LOG_MAX_PACKED)) & FIELD_MASK) as usize
  }

  #[inline]
  pub const fn start(self) -> usize {
    self.field(0)
  }

  #[inline]
  pub const fn max(self) -> usize {
    self.field(1)
  }

  #[inline]
  pub const fn end(self) -> usize {
    self.field(2)
  }

  pub const fn unpack(self) -> (usize, usize, usize) {
    (self.start(), self.max(), self.end())
  }

  #[inline]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  /// Combines the summaries of adjacent regions of `1 << log_pages` pages
  /// each into a summary of their concatenation.
  pub fn merge(children: &[Summary], log_pages: usize) -> Summary {
    let full = 1 << log_pages;
    let (mut start, mut max, mut end) = children[0].unpack();

    for (i, child) in children.iter().enumerate().skip(1) {
      let (si, mi, ei) = child.unpack();
      if start == i << log_pages {
        start += si;
      }
      max = max.max(end + si).max(mi);
      if ei == full {
        end += full;
      } else {
        end = ei;
      }
    }

    Summary::pack(start, max, end)
  }
}

impl From<Runs> for Summary {
  fn from(runs: Runs) -> Self {
    Summary::pack(runs.start, runs.max, runs.end)
  }
}

impl fmt::Debug for Summary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (start, max, end) = self.unpack();
    write!(f, "Summary({start}, {max}, {end})")
  }
}
