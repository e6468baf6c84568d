#![cfg_attr(not(test), no_std)]

#[cfg(test)]
pub mod tests;

const WORD_BITS: usize = u64::BITS as usize;

/// Contiguous runs of set bits in a bitmap: the run touching bit 0, the
/// longest run anywhere, and the run touching the last bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Runs {
  pub start: usize,
  pub max: usize,
  pub end: usize,
}

/// Index of the first run of `n` consecutive set bits in `c`, or 64 if
/// there is none. `n` must be at least 1.
pub const fn find_bit_range64(mut c: u64, n: usize) -> usize {
  let mut p = n - 1;
  let mut k = 1;
  while p > 0 {
    if p <= k {
      c &= c >> (p & 63);
      break;
    }
    c &= c >> (k & 63);
    if c == 0 {
      return WORD_BITS;
    }
    p -= k;
    k *= 2;
  }
  c.trailing_zeros() as usize
}

/// Length of the longest run of set bits in `x`.
pub const fn longest_run64(mut x: u64) -> usize {
  let mut n = 0;
  while x != 0 {
    x &= x >> 1;
    n += 1;
  }
  n
}

#[inline(always)]
const fn mask(lo: usize, n: usize) -> u64 {
  if n == WORD_BITS {
    u64::MAX
  } else {
    ((1u64 << n) - 1) << lo
  }
}

/// A fixed-width bitmap of `WORDS * 64` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap<const WORDS: usize> {
  words: [u64; WORDS],
}

impl<const WORDS: usize> Default for Bitmap<WORDS> {
  fn default() -> Self {
    Self::zero()
  }
}

impl<const WORDS: usize> Bitmap<WORDS> {
  pub const BITS: usize = WORDS * WORD_BITS;

  pub const fn zero() -> Self {
    Self { words: [0; WORDS] }
  }

  pub const fn ones() -> Self {
    Self {
      words: [u64::MAX; WORDS],
    }
  }

  #[inline]
  pub fn get(&self, i: usize) -> bool {
    self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
  }

  #[inline]
  pub fn set(&mut self, i: usize) {
    self.words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
  }

  #[inline]
  pub fn clear(&mut self, i: usize) {
    self.words[i / WORD_BITS] &= !(1 << (i % WORD_BITS));
  }

  /// Calls `f` with each word index and mask covering bits `[i, i+n)`.
  #[inline]
  fn each_word(i: usize, n: usize, mut f: impl FnMut(usize, u64)) {
    debug_assert!(i + n <= Self::BITS);
    let end = i + n;
    let mut idx = i;
    while idx < end {
      let lo = idx % WORD_BITS;
      let take = core::cmp::min(WORD_BITS - lo, end - idx);
      f(idx / WORD_BITS, mask(lo, take));
      idx += take;
    }
  }

  pub fn set_range(&mut self, i: usize, n: usize) {
    Self::each_word(i, n, |w, m| self.words[w] |= m);
  }

  pub fn clear_range(&mut self, i: usize, n: usize) {
    Self::each_word(i, n, |w, m| self.words[w] &= !m);
  }

  pub fn set_all(&mut self) {
    self.words = [u64::MAX; WORDS];
  }

  /// Number of bits in `[i, i+n)` set in both `self` and `other`.
  pub fn count_both(&self, other: &Self, i: usize, n: usize) -> usize {
    let mut total = 0;
    Self::each_word(i, n, |w, m| {
      total += (self.words[w] & other.words[w] & m).count_ones() as usize
    });
    total
  }

  pub fn count(&self) -> usize {
    self.words.iter().map(|w| w.count_ones() as usize).sum()
  }

  /// The aligned 64-bit block containing bit `i`.
  #[inline]
  pub fn block64(&self, i: usize) -> u64 {
    self.words[i / WORD_BITS]
  }

  /// Clears the bits of `m` in the block containing bit `i`.
  #[inline]
  pub fn clear_block64(&mut self, i: usize, m: u64) {
    self.words[i / WORD_BITS] &= !m;
  }

  /// First set bit at or after the block containing `from`.
  pub fn find_set(&self, from: usize) -> Option<usize> {
    (from / WORD_BITS..WORDS).find_map(|w| match self.words[w] {
      0 => None,
      x => Some(w * WORD_BITS + x.trailing_zeros() as usize),
    })
  }

  /// Finds the first run of `n` set bits, scanning from the block holding
  /// `from`. Returns the run's index together with the first set bit seen
  /// during the scan, which is a valid lower bound for later searches.
  ///
  /// Bits below `from` in its block are not masked off: callers treat
  /// `from` as a hint below which nothing is set.
  pub fn find_run(&self, n: usize, from: usize) -> Option<(usize, usize)> {
    match n {
      0 => None,
      1 => self.find_set(from).map(|i| (i, i)),
      n if n <= WORD_BITS => self.find_small(n, from),
      n => self.find_large(n, from),
    }
  }

  fn find_small(&self, n: usize, from: usize) -> Option<(usize, usize)> {
    let mut end = 0;
    let mut first = None;
    for w in from / WORD_BITS..WORDS {
      let x = self.words[w];
      if x == 0 {
        end = 0;
        continue;
      }
      let seen = *first.get_or_insert(w * WORD_BITS + x.trailing_zeros() as usize);

      let start = x.trailing_ones() as usize;
      if end + start >= n {
        return Some((w * WORD_BITS - end, seen));
      }
      let j = find_bit_range64(x, n);
      if j < WORD_BITS {
        return Some((w * WORD_BITS + j, seen));
      }
      end = x.leading_ones() as usize;
    }
    None
  }

  fn find_large(&self, n: usize, from: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    let mut size = 0;
    let mut first = None;
    for w in from / WORD_BITS..WORDS {
      let x = self.words[w];
      if x == 0 {
        size = 0;
        continue;
      }
      let seen = *first.get_or_insert(w * WORD_BITS + x.trailing_zeros() as usize);

      if size == 0 {
        size = x.leading_ones() as usize;
        start = (w + 1) * WORD_BITS - size;
        continue;
      }

      let s = x.trailing_ones() as usize;
      if s != WORD_BITS {
        size += s;
        if size >= n {
          return Some((start, seen));
        }
        size = x.leading_ones() as usize;
        start = (w + 1) * WORD_BITS - size;
        continue;
      }

      size += WORD_BITS;
      if size >= n {
        return Some((start, seen));
      }
    }
    None
  }

  /// Summarizes the runs of set bits.
  pub fn runs(&self) -> Runs {
    let mut start = None;
    let mut max = 0;
    let mut cur = 0;

    for &x in self.words.iter() {
      if x == u64::MAX {
        cur += WORD_BITS;
        continue;
      }

      cur += x.trailing_ones() as usize;
      if start.is_none() {
        start = Some(cur);
      }
      max = max.max(cur).max(longest_run64(x));
      cur = x.leading_ones() as usize;
    }

    match start {
      None => Runs {
        start: Self::BITS,
        max: Self::BITS,
        end: Self::BITS,
      },
      Some(start) => Runs {
        start,
        max: max.max(cur),
        end: cur,
      },
    }
  }
}
