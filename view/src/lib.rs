//! Shape/stride metadata and the view algebra built on it.
//!
//! ```
//! use tessera_view::TensorView;
//!
//! let view = TensorView::contiguous(&[2, 3, 4]).unwrap();
//! let permuted = view.permute(&[2, 0, 1]).unwrap();
//! assert_eq!(permuted.shape(), &[4, 2, 3]);
//! assert!(!permuted.is_contiguous());
//! ```

pub mod error;
pub mod pack;
pub mod view;


pub use error::{Error, Result};
pub use pack::{MAX_INLINE_RANK, ViewPack};
pub use view::{Dims, TensorView, contiguous_strides};
