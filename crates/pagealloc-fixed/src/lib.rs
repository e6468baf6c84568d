#![cfg_attr(not(test), no_std)]

use pagealloc_sys::extent::ExtentError;

pub mod fixalloc;
pub mod persistent;

pub use fixalloc::{
  FirstTouch,
  FixAlloc,
};
pub use persistent::{
  PERSISTENT,
  Persistent,
};

/// Upper bound on a `FixAlloc` chunk, and therefore on its object size.
pub const FIX_ALLOC_CHUNK: usize = 16 << 10;
/// Unit in which `Persistent` maps memory from the OS.
pub const PERSISTENT_CHUNK: usize = 256 << 10;

#[derive(Debug)]
pub enum FixedError {
  Extent(ExtentError),
  Invalid,
}

pub type FixedResult<T> = Result<T, FixedError>;

impl From<ExtentError> for FixedError {
  fn from(err: ExtentError) -> Self {
    FixedError::Extent(err)
  }
}

#[cfg(test)]
mod tests;
