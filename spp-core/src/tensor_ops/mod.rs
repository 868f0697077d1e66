//! Operations on tensors that layers are built from.
//!
//! Currently this is the region-of-interest pooling kernel, see [RoiPoolOp]
//! and [RoiPoolKernel].

mod roi_pool;

pub use roi_pool::{PoolMethod, Roi, RoiPoolKernel, RoiPoolOp};
