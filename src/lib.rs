#![no_std]

pub use pagealloc_alloc::{
  Arena,
  PageAlloc,
  PageCache,
};

pub mod prelude {
  pub use pagealloc_alloc::{
    Arena,
    Backing,
    ChunkData,
    PageAlloc,
    PageAllocError,
    PageAllocResult,
    PageCache,
    Summary,
    config::*,
  };
  pub use pagealloc_fixed::{
    FirstTouch,
    FixAlloc,
    FixedError,
    FixedResult,
    PERSISTENT,
    Persistent,
  };
  pub use pagealloc_sys::prelude::*;
}
