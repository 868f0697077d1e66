use rand::{distributions::Distribution, Rng};

use crate::{
    dtypes::Unit,
    shapes::Shape4D,
    tensor::{storage_traits::*, Error, Tensor4D},
};

use super::Cpu;

impl<E: Unit> ZerosTensor<E> for Cpu {
    fn try_zeros(&self, shape: Shape4D) -> Result<Tensor4D<E>, Error> {
        Ok(Tensor4D::zeros(shape))
    }
}

impl<E: Unit> TensorFromVec<E> for Cpu {
    fn try_tensor_from_vec(&self, src: Vec<E>, shape: Shape4D) -> Result<Tensor4D<E>, Error> {
        Tensor4D::try_from_vec(src, shape)
    }
}

impl<E: Unit> SampleTensor<E> for Cpu {
    fn try_sample<D: Distribution<E>>(
        &self,
        shape: Shape4D,
        distr: D,
    ) -> Result<Tensor4D<E>, Error> {
        let mut tensor = Tensor4D::zeros(shape);
        {
            let mut rng = self.rng.lock().unwrap();
            for v in tensor.data.iter_mut() {
                *v = rng.sample(&distr);
            }
        }
        Ok(tensor)
    }
}
