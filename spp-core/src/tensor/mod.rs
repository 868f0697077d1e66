//! The [Tensor4D] struct, the [Cpu] device and the [Error] type.
//!
//! # Creating tensors
//!
//! Tensors are created through traits implemented by the device:
//! - [ZerosTensor] for zero filled tensors
//! - [TensorFromVec] for tensors copied out of a `Vec`
//! - [SampleTensor] for randomly initialized tensors
//!
//! ```rust
//! # use spp_core::prelude::*;
//! let dev = Cpu::seed_from_u64(0);
//! let a: Tensor4D<f32> = dev.zeros(Shape4D::new(1, 2, 3, 3));
//! let b: Tensor4D<f32> = dev.tensor_from_vec(vec![1.0, 2.0, 3.0, 4.0], Shape4D::new(1, 1, 2, 2));
//! let c: Tensor4D<f32> = dev.sample_normal(Shape4D::new(4, 8, 5, 5));
//! ```
//!
//! # Gradients
//!
//! Every tensor owns a gradient buffer shaped like its values. Layers read the
//! gradient of their outputs and write the gradient of their inputs during
//! backward passes, there is no global tape.

mod cpu;
mod error;
mod storage_traits;

pub use cpu::Cpu;
pub use error::Error;
pub use storage_traits::{SampleTensor, TensorFromVec, ZerosTensor};

use crate::{dtypes::Unit, shapes::Shape4D};

/// A contiguous 4d array with a same-shaped gradient buffer.
///
/// Reshaping resizes both buffers in place, the way a layer (re)allocates its
/// outputs during set up.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tensor4D<E> {
    pub(crate) shape: Shape4D,
    pub(crate) data: Vec<E>,
    pub(crate) grad: Vec<E>,
}

impl<E: Unit> Tensor4D<E> {
    pub fn zeros(shape: Shape4D) -> Self {
        let numel = shape.num_elements();
        Self {
            shape,
            data: vec![Default::default(); numel],
            grad: vec![Default::default(); numel],
        }
    }

    pub fn try_from_vec(data: Vec<E>, shape: Shape4D) -> Result<Self, Error> {
        if data.len() != shape.num_elements() {
            return Err(Error::WrongNumElements);
        }
        let grad = vec![Default::default(); data.len()];
        Ok(Self { shape, data, grad })
    }

    /// Changes the shape, resizing values and gradients. Existing elements are
    /// kept where they still fit, new elements are zero.
    pub fn reshape(&mut self, shape: Shape4D) {
        let numel = shape.num_elements();
        self.shape = shape;
        self.data.resize(numel, Default::default());
        self.grad.resize(numel, Default::default());
    }

    pub fn shape(&self) -> &Shape4D {
        &self.shape
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[E] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    pub fn grad(&self) -> &[E] {
        &self.grad
    }

    pub fn grad_mut(&mut self) -> &mut [E] {
        &mut self.grad
    }

    /// Copies the values out into a new `Vec`.
    pub fn as_vec(&self) -> Vec<E> {
        self.data.clone()
    }

    pub fn get(&self, n: usize, c: usize, h: usize, w: usize) -> E {
        self.data[self.shape.offset(n, c, h, w)]
    }

    pub fn fill_grad(&mut self, value: E) {
        self.grad.fill(value);
    }

    /// Copies `src` into the values. Panics if the lengths differ.
    pub fn copy_from(&mut self, src: &[E]) {
        self.data.copy_from_slice(src);
    }

    /// Copies `src` into the gradients. Panics if the lengths differ.
    pub fn copy_grad_from(&mut self, src: &[E]) {
        self.grad.copy_from_slice(src);
    }

    /// Returns an error unless this tensor has exactly `expected` shape.
    pub fn check_shape(&self, expected: &Shape4D) -> Result<(), Error> {
        if &self.shape != expected {
            return Err(Error::ShapeMismatch {
                expected: *expected,
                found: self.shape,
            });
        }
        Ok(())
    }
}
