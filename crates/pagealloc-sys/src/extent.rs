use core::{
  marker::PhantomData,
  mem::ManuallyDrop,
  ops::{
    Deref,
    DerefMut,
  },
};

use crate::{
  GLOBAL_SYSTEM,
  prim::os_page_align,
  system::SysError,
};

#[derive(Debug)]
pub enum ExtentError {
  SystemError(SysError),
  Overflow,
  Empty,
}

pub type ExtentResult<T> = Result<T, ExtentError>;

/// An owned OS mapping, unmapped on drop unless leaked.
pub struct Extent {
  slice: &'static mut [u8],
}

impl Extent {
  pub fn new(size: usize) -> ExtentResult<Extent> {
    if size == 0 {
      return Err(ExtentError::Empty);
    }

    let size = os_page_align(size).map_err(|_| ExtentError::Overflow)?;
    let slice = unsafe { GLOBAL_SYSTEM.alloc(size) }.map_err(ExtentError::SystemError)?;

    Ok(Extent { slice })
  }

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.slice.len()
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.slice.is_empty()
  }

  /// Gives up ownership; the mapping stays alive for the rest of the process.
  pub fn leak(self) -> &'static mut [u8] {
    let mut this = ManuallyDrop::new(self);
    core::mem::take(&mut this.slice)
  }
}

impl AsRef<[u8]> for Extent {
  fn as_ref(&self) -> &[u8] {
    self.slice
  }
}

impl AsMut<[u8]> for Extent {
  fn as_mut(&mut self) -> &mut [u8] {
    self.slice
  }
}

impl Drop for Extent {
  fn drop(&mut self) {
    let _ = unsafe { GLOBAL_SYSTEM.dealloc(self.slice) };
  }
}

/// A fixed-length array of `T` living in its own mapping. Pages nobody
/// touches are never backed, so a table may be sized for the largest
/// layout it can ever need.
pub struct Table<T> {
  extent: Extent,
  len: usize,
  _marker: PhantomData<T>,
}

impl<T> Table<T> {
  /// # Safety
  ///
  /// The all-zero bit pattern must be a valid `T`.
  pub unsafe fn zeroed(len: usize) -> ExtentResult<Self> {
    let bytes = len
      .checked_mul(core::mem::size_of::<T>())
      .ok_or(ExtentError::Overflow)?;
    let extent = Extent::new(bytes.max(1))?;

    Ok(Self {
      extent,
      len,
      _marker: PhantomData,
    })
  }
}

impl<T> Deref for Table<T> {
  type Target = [T];

  fn deref(&self) -> &[T] {
    let ptr = self.extent.as_ref().as_ptr() as *const T;
    unsafe { core::slice::from_raw_parts(ptr, self.len) }
  }
}

impl<T> DerefMut for Table<T> {
  fn deref_mut(&mut self) -> &mut [T] {
    let ptr = self.extent.as_mut().as_mut_ptr() as *mut T;
    unsafe { core::slice::from_raw_parts_mut(ptr, self.len) }
  }
}

unsafe impl<T: Send> Send for Table<T> {}
unsafe impl<T: Sync> Sync for Table<T> {}
