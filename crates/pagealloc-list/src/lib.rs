#![cfg_attr(not(test), no_std)]

use core::ptr::NonNull;

/// The header written into a freed object. It overlays the object's first
/// word, so any object handed to a [`FreeList`] must be at least this big.
#[derive(Debug)]
pub struct Link {
  next: Option<NonNull<Link>>,
}

impl Link {
  pub const SIZE: usize = core::mem::size_of::<Link>();
}

/// Intrusive LIFO list of free objects.
#[derive(Debug, Default)]
pub struct FreeList {
  head: Option<NonNull<Link>>,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None }
  }

  /// Pushes `obj`, overwriting its first word.
  ///
  /// # Safety
  ///
  /// `obj` must be writable for [`Link::SIZE`] bytes, must not already be
  /// on this list, and must not be used by anyone else until popped.
  pub unsafe fn push(&mut self, obj: NonNull<u8>) {
    let link = obj.cast::<Link>();
    unsafe { link.as_ptr().write_unaligned(Link { next: self.head }) };
    self.head = Some(link);
  }

  /// Pops the most recently pushed object. Its first word is garbage.
  pub fn pop(&mut self) -> Option<NonNull<u8>> {
    let head = self.head?;
    let link = unsafe { head.as_ptr().read_unaligned() };
    self.head = link.next;
    Some(head.cast())
  }
}

unsafe impl Send for FreeList {}

pub mod prelude {
  pub use super::{
    FreeList,
    Link,
  };
}
