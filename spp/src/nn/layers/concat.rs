use crate::prelude::*;

/// Concatenates bottoms along the channel axis, in bottom order.
///
/// All bottoms must share batch size, height and width. For flattened
/// `(n, f_i, 1, 1)` bottoms this joins feature vectors into one
/// `(n, sum(f_i), 1, 1)` vector per batch item.
#[derive(Debug, Default, Clone)]
pub struct Concat {
    shapes: Vec<Shape4D>,
}

impl Concat {
    fn output_shape(shapes: &[Shape4D]) -> Shape4D {
        let first = shapes[0];
        let chan = shapes.iter().map(|s| s.chan).sum();
        Shape4D::new(first.batch, chan, first.height, first.width)
    }
}

impl<E: Dtype> Layer<E> for Concat {
    fn try_set_up(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        check_num_tensors(1, top.len())?;
        let first = *bottom
            .first()
            .ok_or(Error::WrongNumTensors {
                expected: 1,
                found: 0,
            })?
            .shape();
        let mut shapes = Vec::with_capacity(bottom.len());
        for b in bottom {
            let s = *b.shape();
            if (s.batch, s.height, s.width) != (first.batch, first.height, first.width) {
                return Err(Error::ShapeMismatch {
                    expected: Shape4D { chan: s.chan, ..first },
                    found: s,
                });
            }
            shapes.push(s);
        }
        top[0].reshape(Self::output_shape(&shapes));
        self.shapes = shapes;
        Ok(())
    }

    fn try_forward(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<E, Error> {
        if self.shapes.is_empty() {
            return Err(Error::NotSetUp);
        }
        check_num_tensors(self.shapes.len(), bottom.len())?;
        check_num_tensors(1, top.len())?;
        for (b, s) in bottom.iter().zip(self.shapes.iter()) {
            b.check_shape(s)?;
        }
        let out_shape = Self::output_shape(&self.shapes);
        top[0].check_shape(&out_shape)?;

        let out_item = out_shape.item_size();
        let out = top[0].data_mut();
        let mut offset = 0;
        for b in bottom {
            let item = b.shape().item_size();
            if item == 0 {
                continue;
            }
            for (n, src) in b.data().chunks_exact(item).enumerate() {
                let start = n * out_item + offset;
                out[start..start + item].copy_from_slice(src);
            }
            offset += item;
        }
        Ok(E::default())
    }

    fn try_backward(
        &mut self,
        top: &[&Tensor4D<E>],
        propagate_down: &[bool],
        bottom: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        if self.shapes.is_empty() {
            return Err(Error::NotSetUp);
        }
        check_num_tensors(1, top.len())?;
        check_num_tensors(self.shapes.len(), bottom.len())?;
        check_num_tensors(self.shapes.len(), propagate_down.len())?;
        let out_shape = Self::output_shape(&self.shapes);
        top[0].check_shape(&out_shape)?;

        let out_item = out_shape.item_size();
        let grad_out = top[0].grad();
        let mut offset = 0;
        for ((b, s), &propagate) in bottom.iter_mut().zip(self.shapes.iter()).zip(propagate_down) {
            let item = s.item_size();
            if propagate && item > 0 {
                b.check_shape(s)?;
                for (n, dst) in b.grad_mut().chunks_exact_mut(item).enumerate() {
                    let start = n * out_item + offset;
                    dst.copy_from_slice(&grad_out[start..start + item]);
                }
            }
            offset += item;
        }
        Ok(())
    }
}
