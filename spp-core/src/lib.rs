//! # spp-core
//!
//! Core building blocks for spatial pyramid pooling: element types, 4d
//! shapes, tensors with value & gradient buffers, the cpu device, layer traits
//! and the region-of-interest pooling kernel.
//!
//! The layers themselves live in the `spp` crate, which re-exports everything
//! in here.
//!
//! # Tensors
//!
//! *See [tensor] for more information.*
//!
//! A [`tensor::Tensor4D`] is a contiguous, row-major array indexed by
//! `(batch, channel, row, column)`. Next to its values it owns a same-shaped
//! gradient buffer that backward passes write into.
//!
//! Tensors are usually created with a device:
//!
//! ```rust
//! # use spp_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let t: Tensor4D<f32> = dev.zeros(Shape4D::new(2, 3, 4, 4));
//! assert_eq!(t.num_elements(), 96);
//! ```
//!
//! # ROI pooling
//!
//! *See [tensor_ops] for more information.*
//!
//! [`tensor_ops::RoiPoolOp`] describes adaptive pooling of a region of
//! interest into a fixed bin grid. Bins are derived with floor/ceil rounding,
//! so neighbouring bins may overlap when the ROI is not evenly divisible.
//!
//! ```rust
//! # use spp_core::prelude::*;
//! let op = RoiPoolOp::try_new(PoolMethod::Max, Roi::full(4, 4), (2, 2), Shape4D::new(1, 1, 4, 4)).unwrap();
//! let dev: Cpu = Default::default();
//! let x: Tensor4D<f32> = dev.tensor_from_vec((1..=16).map(|v| v as f32).collect(), Shape4D::new(1, 1, 4, 4));
//! let mut out = vec![0.0; 4];
//! let mut mask = vec![0usize; 4];
//! dev.forward(&op, x.data(), &mut out, &mut mask).unwrap();
//! assert_eq!(out, [6.0, 8.0, 14.0, 16.0]);
//! assert_eq!(mask, [5, 7, 13, 15]);
//! ```

pub mod dtypes;
pub mod nn_traits;
pub mod shapes;
pub mod tensor;
pub mod tensor_ops;

/// Contains subset of all public exports.
pub mod prelude {
    pub use crate::dtypes::*;
    pub use crate::nn_traits::*;
    pub use crate::shapes::*;
    pub use crate::tensor::*;
    pub use crate::tensor_ops::*;
}
