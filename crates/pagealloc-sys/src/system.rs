#[cfg(any(target_os = "linux", target_os = "macos"))]
use crate::unix::UNIX_SYSTEM;

#[derive(Debug)]
pub enum SysError {
  Unsupported,
  OutOfMemory,
  InvalidArgument,
}

pub type SysResult<T> = Result<T, SysError>;

/// Where allocator bookkeeping gets its memory: anonymous, zero-filled
/// mappings that are backed on first touch.
///
/// # Safety
///
/// Implementors must ensure that `alloc` returns zeroed, writable memory
/// aligned to the OS page size, and that `dealloc` only unmaps ranges
/// obtained from `alloc`.
pub unsafe trait System
where
  Self: Send + Sync,
{
  /// Maps `size` readable and writable bytes.
  ///
  /// # Safety
  ///
  /// `size` must be a multiple of the OS page size.
  unsafe fn alloc<'mem>(&self, size: usize) -> SysResult<&'mem mut [u8]> {
    _ = size;
    Err(SysError::Unsupported)
  }

  /// Unmaps memory.
  ///
  /// # Safety
  ///
  /// `slice` must have come from `alloc` on this system and must not be
  /// touched afterwards.
  unsafe fn dealloc(&self, slice: &[u8]) -> SysResult<()> {
    _ = slice;
    Err(SysError::Unsupported)
  }
}

pub struct UnsupportedSystem {}
unsafe impl System for UnsupportedSystem {}

#[cfg(any(target_os = "linux", target_os = "macos"))]
pub static GLOBAL_SYSTEM: &dyn System = &UNIX_SYSTEM;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub static GLOBAL_SYSTEM: &dyn System = &UnsupportedSystem {};
