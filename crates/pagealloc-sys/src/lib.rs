#![cfg_attr(not(test), no_std)]

pub mod extent;
pub mod math;
pub mod prim;
pub mod system;
pub mod unix;

pub use system::GLOBAL_SYSTEM;

pub mod prelude {
  pub use super::{
    GLOBAL_SYSTEM,
    extent::{
      Extent,
      ExtentError,
      ExtentResult,
      Table,
    },
    math::{
      align_down,
      align_up,
      is_aligned,
    },
    prim::{
      os_page_align,
      os_page_size,
      word_width,
    },
    system::{
      SysError,
      SysResult,
      System,
    },
  };
}
