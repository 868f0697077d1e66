//! Layers and their configurations.
//!
//! The pyramid layers are [PyramidLevel] (one ROI pooling resolution) and
//! [SpatialPyramidPooling] (several levels composed with [SplitInto],
//! [Flatten] and [Concat]).

pub mod layers;

pub use layers::*;
pub use spp_core::nn_traits::*;
