use rand::distributions::{Distribution, Standard};
use rand_distr::StandardNormal;

use crate::{dtypes::Unit, shapes::Shape4D};

use super::{Error, Tensor4D};

/// Construct tensors filled with zeros.
pub trait ZerosTensor<E: Unit> {
    /// Creates a tensor filled with zeros.
    fn zeros(&self, shape: Shape4D) -> Tensor4D<E> {
        self.try_zeros(shape).unwrap()
    }

    /// Fallible version of [ZerosTensor::zeros]
    fn try_zeros(&self, shape: Shape4D) -> Result<Tensor4D<E>, Error>;
}

/// Construct tensors from rust vectors.
pub trait TensorFromVec<E: Unit> {
    fn tensor_from_vec(&self, src: Vec<E>, shape: Shape4D) -> Tensor4D<E> {
        self.try_tensor_from_vec(src, shape).unwrap()
    }

    fn try_tensor_from_vec(&self, src: Vec<E>, shape: Shape4D) -> Result<Tensor4D<E>, Error>;
}

/// Constructs tensors filled with random values from a given distribution.
pub trait SampleTensor<E: Unit> {
    /// Samples a tensor with a given shape from a uniform distribution
    fn sample_uniform(&self, shape: Shape4D) -> Tensor4D<E>
    where
        Standard: Distribution<E>,
    {
        self.sample(shape, Standard)
    }

    /// Samples a tensor with a given shape from a normal distribution
    fn sample_normal(&self, shape: Shape4D) -> Tensor4D<E>
    where
        StandardNormal: Distribution<E>,
    {
        self.sample(shape, StandardNormal)
    }

    /// Samples a tensor with a given shape from a given distribution.
    fn sample<D: Distribution<E>>(&self, shape: Shape4D, distr: D) -> Tensor4D<E> {
        self.try_sample(shape, distr).unwrap()
    }

    /// Fallible version of [SampleTensor::sample]
    fn try_sample<D: Distribution<E>>(
        &self,
        shape: Shape4D,
        distr: D,
    ) -> Result<Tensor4D<E>, Error>;
}
