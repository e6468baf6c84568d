use super::*;

type Chunk = Bitmap<8>;

fn with_free(ranges: &[(usize, usize)]) -> Chunk {
  let mut bm = Chunk::zero();
  for &(i, n) in ranges {
    bm.set_range(i, n);
  }
  bm
}

#[test]
fn bit_range64_finds_lowest_run() {
  assert_eq!(find_bit_range64(0, 1), 64);
  assert_eq!(find_bit_range64(u64::MAX, 64), 0);
  assert_eq!(find_bit_range64(0b1011_0000, 2), 4);
  assert_eq!(find_bit_range64(0b1011_0000, 3), 64);
  assert_eq!(find_bit_range64(0xF0F0, 4), 4);
  assert_eq!(find_bit_range64(0xFF00_0000_0000_0000, 8), 56);
  assert_eq!(find_bit_range64(0x7FFF_FFFF_FFFF_FFFF, 64), 64);
}

#[test]
fn longest_run() {
  assert_eq!(longest_run64(0), 0);
  assert_eq!(longest_run64(u64::MAX), 64);
  assert_eq!(longest_run64(0b0111_0110_1111), 4);
}

#[test]
fn ranges_span_words() {
  let mut bm = Chunk::zero();
  bm.set_range(60, 10);
  assert_eq!(bm.block64(0), 0xF000_0000_0000_0000);
  assert_eq!(bm.block64(64), 0b11_1111);
  assert_eq!(bm.count(), 10);
  assert_eq!(bm.count_both(&Chunk::ones(), 62, 4), 4);

  bm.clear_range(63, 2);
  assert!(bm.get(62));
  assert!(!bm.get(63));
  assert!(!bm.get(64));
  assert!(bm.get(65));
  assert_eq!(bm.count(), 8);
}

#[test]
fn full_word_range() {
  let mut bm = Chunk::zero();
  bm.set_range(128, 64);
  assert_eq!(bm.block64(130), u64::MAX);
  assert_eq!(bm.block64(127), 0);
  bm.clear_range(0, Chunk::BITS);
  assert_eq!(bm, Chunk::zero());
}

#[test]
fn single_bits() {
  let mut bm = Chunk::zero();
  bm.set(511);
  bm.set(0);
  assert!(bm.get(511));
  assert_eq!(bm.find_set(0), Some(0));
  bm.clear(0);
  assert_eq!(bm.find_set(0), Some(511));
  assert_eq!(bm.find_set(448), Some(511));
}

#[test]
fn count_both_intersects() {
  let a = with_free(&[(0, 100)]);
  let b = with_free(&[(50, 100)]);
  assert_eq!(a.count_both(&b, 0, Chunk::BITS), 50);
  assert_eq!(a.count_both(&b, 90, 20), 10);
}

#[test]
fn block_masks() {
  let mut bm = Chunk::ones();
  bm.clear_block64(70, 0b1010);
  assert_eq!(bm.block64(64), !0b1010);
  assert_eq!(bm.block64(0), u64::MAX);
}

#[test]
fn find_run_single_page() {
  let bm = with_free(&[(77, 1)]);
  assert_eq!(bm.find_run(1, 0), Some((77, 77)));
  assert_eq!(Chunk::zero().find_run(1, 0), None);
}

#[test]
fn find_run_small_crossing_words() {
  let bm = with_free(&[(5, 2), (62, 4)]);
  assert_eq!(bm.find_run(2, 0), Some((5, 5)));
  assert_eq!(bm.find_run(3, 0), Some((62, 5)));
  assert_eq!(bm.find_run(4, 0), Some((62, 5)));
  assert_eq!(bm.find_run(5, 0), None);
}

#[test]
fn find_run_large() {
  let bm = with_free(&[(10, 64), (100, 200)]);
  assert_eq!(bm.find_run(64, 0), Some((10, 10)));
  assert_eq!(bm.find_run(65, 0), Some((100, 10)));
  assert_eq!(bm.find_run(200, 0), Some((100, 10)));
  assert_eq!(bm.find_run(201, 0), None);
  assert_eq!(Chunk::ones().find_run(512, 0), Some((0, 0)));
}

#[test]
fn find_run_respects_search_block() {
  let bm = with_free(&[(3, 3), (130, 3)]);
  assert_eq!(bm.find_run(3, 64), Some((130, 130)));
  assert_eq!(bm.find_run(3, 0), Some((3, 3)));
}

#[test]
fn find_run_reports_first_seen() {
  let bm = with_free(&[(1, 1), (200, 8)]);
  assert_eq!(bm.find_run(8, 0), Some((200, 1)));
}

#[test]
fn every_exact_run_is_found() {
  for n in 1..=Chunk::BITS {
    for at in [0, 1, 63, 64, 200, Chunk::BITS - n] {
      if at + n > Chunk::BITS {
        continue;
      }
      let bm = with_free(&[(at, n)]);
      assert_eq!(bm.find_run(n, 0).map(|r| r.0), Some(at), "n={n} at={at}");
      if n < Chunk::BITS {
        assert_eq!(bm.find_run(n + 1, 0), None, "n={n} at={at}");
      }
    }
  }
}

#[test]
fn runs_summary() {
  assert_eq!(
    Chunk::zero().runs(),
    Runs {
      start: 0,
      max: 0,
      end: 0
    }
  );
  assert_eq!(
    Chunk::ones().runs(),
    Runs {
      start: 512,
      max: 512,
      end: 512
    }
  );

  let bm = with_free(&[(0, 3), (100, 70), (500, 12)]);
  assert_eq!(
    bm.runs(),
    Runs {
      start: 3,
      max: 70,
      end: 12
    }
  );

  let inner = with_free(&[(10, 5), (20, 7)]);
  assert_eq!(
    inner.runs(),
    Runs {
      start: 0,
      max: 7,
      end: 0
    }
  );
}
