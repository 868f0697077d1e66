//! Traits shared by every layer: the set up / forward / backward protocol and
//! building layers from their configuration.

use crate::{
    dtypes::Dtype,
    tensor::{Cpu, Error, Tensor4D},
};

/// A computation with explicit forward and backward passes over externally
/// owned tensors.
///
/// The protocol is:
/// 1. [Layer::try_set_up] checks the bottoms, captures their shapes and
///    shapes the tops.
/// 2. [Layer::try_forward] reads the bottoms' values and writes the tops'.
/// 3. [Layer::try_backward] reads the tops' gradients (and any state saved by
///    the preceding forward pass) and writes the bottoms' gradients.
///
/// A bottom whose shape changes requires a new set up before the next forward.
/// Backward must follow the forward call of the same pass on the same layer.
pub trait Layer<E: Dtype> {
    /// Fallible version of [Layer::set_up].
    fn try_set_up(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error>;

    /// Fallible version of [Layer::forward]. Returns this layer's scalar loss
    /// contribution.
    fn try_forward(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<E, Error>;

    /// Fallible version of [Layer::backward]. `propagate_down` holds one flag
    /// per bottom, bottoms whose flag is `false` are left untouched.
    fn try_backward(
        &mut self,
        top: &[&Tensor4D<E>],
        propagate_down: &[bool],
        bottom: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error>;

    fn set_up(&mut self, bottom: &[&Tensor4D<E>], top: &mut [&mut Tensor4D<E>]) {
        self.try_set_up(bottom, top).unwrap()
    }

    fn forward(&mut self, bottom: &[&Tensor4D<E>], top: &mut [&mut Tensor4D<E>]) -> E {
        self.try_forward(bottom, top).unwrap()
    }

    fn backward(
        &mut self,
        top: &[&Tensor4D<E>],
        propagate_down: &[bool],
        bottom: &mut [&mut Tensor4D<E>],
    ) {
        self.try_backward(top, propagate_down, bottom).unwrap()
    }
}

/// Something that can be built into a layer on a device, validating itself in
/// the process.
pub trait BuildOnDevice<E: Dtype>: Clone {
    type Built: Layer<E>;
    fn build_on_device(&self, device: &Cpu) -> Self::Built {
        self.try_build_on_device(device).unwrap()
    }
    fn try_build_on_device(&self, device: &Cpu) -> Result<Self::Built, Error>;
}

/// Extension method to build layers that is implemented on the device.
///
/// ```rust
/// # use spp_core::prelude::*;
/// # #[derive(Clone)]
/// # struct Noop;
/// # impl<E: Dtype> BuildOnDevice<E> for Noop {
/// #     type Built = NoopLayer;
/// #     fn try_build_on_device(&self, _: &Cpu) -> Result<NoopLayer, Error> { Ok(NoopLayer) }
/// # }
/// # struct NoopLayer;
/// # impl<E: Dtype> Layer<E> for NoopLayer {
/// #     fn try_set_up(&mut self, _: &[&Tensor4D<E>], _: &mut [&mut Tensor4D<E>]) -> Result<(), Error> { Ok(()) }
/// #     fn try_forward(&mut self, _: &[&Tensor4D<E>], _: &mut [&mut Tensor4D<E>]) -> Result<E, Error> { Ok(E::default()) }
/// #     fn try_backward(&mut self, _: &[&Tensor4D<E>], _: &[bool], _: &mut [&mut Tensor4D<E>]) -> Result<(), Error> { Ok(()) }
/// # }
/// let dev: Cpu = Default::default();
/// let _layer = dev.build_layer::<f32>(Noop);
/// ```
pub trait BuildLayerExt<M>: Sized {
    fn build_layer<E: Dtype>(&self, m: M) -> M::Built
    where
        M: BuildOnDevice<E>,
    {
        self.try_build_layer::<E>(m).unwrap()
    }

    fn try_build_layer<E: Dtype>(&self, m: M) -> Result<M::Built, Error>
    where
        M: BuildOnDevice<E>;
}

impl<M> BuildLayerExt<M> for Cpu {
    fn try_build_layer<E: Dtype>(&self, m: M) -> Result<M::Built, Error>
    where
        M: BuildOnDevice<E>,
    {
        m.try_build_on_device(self)
    }
}

/// Checks that a layer received exactly `expected` tensors or flags.
pub fn check_num_tensors(expected: usize, found: usize) -> Result<(), Error> {
    if expected != found {
        return Err(Error::WrongNumTensors { expected, found });
    }
    Ok(())
}
