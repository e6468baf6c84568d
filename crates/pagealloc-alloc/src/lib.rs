#![cfg_attr(not(test), no_std)]

use pagealloc_fixed::FixedError;
use pagealloc_sys::extent::ExtentError;

pub mod arena;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod pages;
mod scavenge;
mod search;
pub mod summary;

pub use arena::Arena;
pub use cache::PageCache;
pub use chunk::{
  Backing,
  ChunkData,
};
pub use pages::PageAlloc;
pub use summary::Summary;

#[derive(Debug)]
pub enum PageAllocError {
  /// Base or size not chunk aligned, or a zero base.
  Misaligned,
  /// Outside the arena the allocator was created for.
  OutOfRange,
  AlreadyGrown,
  Extent(ExtentError),
  Fixed(FixedError),
}

pub type PageAllocResult<T> = Result<T, PageAllocError>;
