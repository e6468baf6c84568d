#[cfg(any(target_os = "linux", target_os = "macos"))]
use crate::{
  math::is_aligned,
  prim::os_page_size,
  system::{
    SysError,
    SysResult,
    System,
  },
};

pub struct UnixSystem {}

#[cfg(any(target_os = "linux", target_os = "macos"))]
pub static UNIX_SYSTEM: UnixSystem = UnixSystem {};

#[cfg(any(target_os = "linux", target_os = "macos"))]
impl UnixSystem {
  const PROT: i32 = libc::PROT_READ | libc::PROT_WRITE;
  const FLAGS: i32 = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
unsafe impl System for UnixSystem {
  unsafe fn alloc<'mem>(&self, size: usize) -> SysResult<&'mem mut [u8]> {
    if size == 0 || is_aligned(size, os_page_size()) != Some(true) {
      return Err(SysError::InvalidArgument);
    }

    let ptr = unsafe { libc::mmap(core::ptr::null_mut(), size, Self::PROT, Self::FLAGS, -1, 0) };
    if ptr == libc::MAP_FAILED {
      return Err(SysError::OutOfMemory);
    }

    Ok(unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, size) })
  }

  unsafe fn dealloc(&self, slice: &[u8]) -> SysResult<()> {
    match unsafe { libc::munmap(slice.as_ptr() as *mut libc::c_void, slice.len()) } {
      0 => Ok(()),
      _ => Err(SysError::InvalidArgument),
    }
  }
}
