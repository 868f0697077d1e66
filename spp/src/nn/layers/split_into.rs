use crate::prelude::*;

/// Broadcasts one bottom into any number of independent tops.
///
/// Every top is a copy of the bottom, so the branches consuming them never
/// alias each other. The backward pass writes the **sum** of all tops'
/// gradients into the bottom's gradient.
///
/// # Examples
/// ```rust
/// # use spp::prelude::*;
/// let dev: Cpu = Default::default();
/// let x: Tensor4D<f32> = dev.sample_normal(Shape4D::new(1, 2, 3, 3));
/// let (mut a, mut b) = (Tensor4D::default(), Tensor4D::default());
/// let mut split = SplitInto::default();
/// split.set_up(&[&x], &mut [&mut a, &mut b]);
/// split.forward(&[&x], &mut [&mut a, &mut b]);
/// assert_eq!(a.data(), x.data());
/// assert_eq!(b.data(), x.data());
/// ```
#[derive(Debug, Default, Clone)]
pub struct SplitInto {
    shape: Option<Shape4D>,
}

impl<E: Dtype> Layer<E> for SplitInto {
    fn try_set_up(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        check_num_tensors(1, bottom.len())?;
        if top.is_empty() {
            return Err(Error::WrongNumTensors {
                expected: 1,
                found: 0,
            });
        }
        let shape = *bottom[0].shape();
        for t in top.iter_mut() {
            t.reshape(shape);
        }
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
        bottom[0].check_shape(&shape)?;
        for t in top.iter_mut() {
            t.check_shape(&shape)?;
            t.copy_from(bottom[0].data());
        }
        Ok(E::default())
    }

    fn try_backward(
        &mut self,
        top: &[&Tensor4D<E>],
        propagate_down: &[bool],
        bottom: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        let shape = self.shape.ok_or(Error::NotSetUp)?;
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(1, propagate_down.len())?;
        if !propagate_down[0] {
            return Ok(());
        }
        bottom[0].check_shape(&shape)?;
        let (first, rest) = top.split_first().ok_or(Error::WrongNumTensors {
            expected: 1,
            found: 0,
        })?;
        first.check_shape(&shape)?;
        bottom[0].copy_grad_from(first.grad());
        for t in rest {
            t.check_shape(&shape)?;
            for (g, &t_g) in bottom[0].grad_mut().iter_mut().zip(t.grad()) {
                *g += t_g;
            }
        }
        Ok(())
    }
}
