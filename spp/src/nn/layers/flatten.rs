use crate::prelude::*;

/// Flattens every batch item into one feature vector:
/// `(n, c, h, w)` becomes `(n, c * h * w, 1, 1)`.
///
/// Values and gradients keep their row-major order, so both passes are copies.
#[derive(Debug, Default, Clone)]
pub struct Flatten {
    shape: Option<Shape4D>,
}

impl Flatten {
    pub fn output_shape(inp: &Shape4D) -> Shape4D {
        Shape4D::vector(inp.batch, inp.item_size())
    }
}

impl<E: Dtype> Layer<E> for Flatten {
    fn try_set_up(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(1, top.len())?;
        let shape = *bottom[0].shape();
        top[0].reshape(Self::output_shape(&shape));
        self.shape = Some(shape);
        Ok(())
    }

    fn try_forward(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<E, Error> {
        let shape = self.shape.ok_or(Error::NotSetUp)?;
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(1, top.len())?;
        bottom[0].check_shape(&shape)?;
        top[0].check_shape(&Self::output_shape(&shape))?;
        top[0].copy_from(bottom[0].data());
        Ok(E::default())
    }

    fn try_backward(
        &mut self,
        top: &[&Tensor4D<E>],
        propagate_down: &[bool],
        bottom: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        let shape = self.shape.ok_or(Error::NotSetUp)?;
        check_num_tensors(1, top.len())?;
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(1, propagate_down.len())?;
        if !propagate_down[0] {
            return Ok(());
        }
        top[0].check_shape(&Self::output_shape(&shape))?;
        bottom[0].check_shape(&shape)?;
        bottom[0].copy_grad_from(top[0].grad());
        Ok(())
    }
}
