use crate::{
  config::{
    PAGE_SIZE,
    SUMMARY_FANOUT,
    SUMMARY_LEVEL_BITS,
    level_log_pages,
  },
  pages::{
    LEAF,
    PageAlloc,
    corrupt,
  },
};

/// Narrowest address range known to hold the first free page at or above
/// `search_addr`. Only ever shrinks during a search.
struct FirstFree {
  base: usize,
  bound: usize,
}

impl FirstFree {
  const fn new() -> Self {
    Self {
      base: 0,
      bound: usize::MAX,
    }
  }

  /// Records that `[addr, addr + size)` holds a free page. Ranges visited
  /// by the search are either nested in the current window or disjoint from
  /// it.
  fn found(&mut self, addr: usize, size: usize) {
    let last = addr + (size - 1);
    if self.base <= addr && last <= self.bound {
      self.base = addr;
      self.bound = last;
    } else if !(last < self.base || self.bound < addr) {
      corrupt(format_args!(
        "range [{addr:#x}, {last:#x}] partially overlaps [{:#x}, {:#x}]",
        self.base, self.bound
      ));
    }
  }
}

impl PageAlloc {
  /// Finds the lowest-addressed run of `n` free pages at or above
  /// `search_addr`.
  ///
  /// Returns the run's address and a new lower bound for `search_addr`: no
  /// page below the bound is free. `None` means no such run exists.
  ///
  /// A run may straddle summary entries, and so chunk boundaries. Free pages
  /// at the end of one entry and the start of the next are added up as the
  /// entries are walked in address order, and the first accumulated span of
  /// `n` pages wins unless an entry before it holds the whole run by itself.
  pub fn find_free(&self, n: usize) -> Option<(usize, usize)> {
    if n == 0 || self.chunk_index(self.search_addr) >= self.end {
      return None;
    }

    let mut first = FirstFree::new();
    let mut i = 0;

    'levels: for l in 0..=LEAF {
      let log_pages = level_log_pages(l);
      let level = self.summary(l);
      let search = self.level_index(l, self.search_addr);

      // The top level is scanned whole, lower levels one block of eight.
      let (entries, j0) = if l == 0 {
        (level, if search < level.len() { search } else { 0 })
      } else {
        i <<= SUMMARY_LEVEL_BITS;
        let block = &level[i..i + SUMMARY_FANOUT];
        let j0 = if search & !(SUMMARY_FANOUT - 1) == i {
          search & (SUMMARY_FANOUT - 1)
        } else {
          0
        };
        (block, j0)
      };

      let mut base = 0;
      let mut size = 0;
      for (j, sum) in entries.iter().enumerate().skip(j0) {
        if sum.is_empty() {
          size = 0;
          continue;
        }
        first.found(self.level_addr(l, i + j), (1 << log_pages) * PAGE_SIZE);

        let start = sum.start();
        if size + start >= n {
          if size == 0 {
            base = j << log_pages;
          }
          size += start;
          break;
        }

        if sum.max() >= n {
          i += j;
          continue 'levels;
        }

        if size == 0 || start < 1 << log_pages {
          size = sum.end();
          base = ((j + 1) << log_pages) - size;
          continue;
        }
        size += 1 << log_pages;
      }

      if size >= n {
        let addr = self.level_addr(l, i) + base * PAGE_SIZE;
        return Some((addr, first.base));
      }
      if l == 0 {
        return None;
      }
      corrupt(format_args!(
        "level {l} block {i} promised a run of {n} pages but holds none"
      ));
    }

    let ci = i;
    let Some((j, seen)) = self.chunk_of(ci).find(n, 0) else {
      corrupt(format_args!(
        "chunk {ci} summary {:?} has no run of {n}",
        self.leaf(ci)
      ));
    };

    let chunk_base = self.chunk_base(ci);
    let seen = chunk_base + seen * PAGE_SIZE;
    first.found(seen, self.chunk_base(ci + 1) - seen);
    Some((chunk_base + j * PAGE_SIZE, first.base))
  }
}
