//! # spp
//!
//! Spatial pyramid pooling layers with explicit forward and backward passes.
//!
//! A spatial pyramid pools a feature map over a region of interest at several
//! bin-grid resolutions and concatenates the results, so that inputs of any
//! spatial size produce a descriptor of the same length:
//! `channels * sum(bins_i * bins_i)` values per batch item.
//!
//! See [spp_core] for tensors, the [tensor::Cpu] device and the pooling kernel.
//!
//! # Configuring and building layers
//!
//! Every layer has a configuration struct that is turned into a layer on a
//! device with [nn_traits::BuildLayerExt::build_layer]. Configurations are
//! validated while building.
//!
//! ```rust
//! # use spp::prelude::*;
//! let dev: Cpu = Default::default();
//! let config = SpatialPyramidPoolingConfig::new(vec![1, 2, 4]);
//! let spp = dev.build_layer::<f32>(config);
//! ```
//!
//! # Running layers
//!
//! Layers follow the set up / forward / backward protocol of [nn_traits::Layer].
//! Inputs ("bottoms") and outputs ("tops") are owned by the caller.
//!
//! ```rust
//! # use spp::prelude::*;
//! # let dev: Cpu = Default::default();
//! # let mut spp = dev.build_layer::<f32>(SpatialPyramidPoolingConfig::new(vec![1, 2, 4]));
//! let x: Tensor4D<f32> = dev.sample_normal(Shape4D::new(2, 8, 13, 17));
//! let mut y = Tensor4D::default();
//! spp.set_up(&[&x], &mut [&mut y]);
//! spp.forward(&[&x], &mut [&mut y]);
//! assert_eq!(y.shape(), &Shape4D::vector(2, 8 * (1 + 4 + 16)));
//!
//! let mut x = x;
//! y.fill_grad(1.0);
//! spp.backward(&[&y], &[true], &mut [&mut x]);
//! ```

pub mod nn;

pub use spp_core::*;

pub mod prelude {
    pub use crate::nn::*;
    pub use spp_core::prelude::*;
}
