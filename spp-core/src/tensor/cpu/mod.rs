mod allocate;
mod device;

pub use device::Cpu;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shapes::*, tensor::*};

    #[test]
    fn test_same_seed_same_samples() {
        let a: Tensor4D<f32> = Cpu::seed_from_u64(7).sample_normal(Shape4D::new(1, 2, 3, 3));
        let b: Tensor4D<f32> = Cpu::seed_from_u64(7).sample_normal(Shape4D::new(1, 2, 3, 3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_clones_share_rng() {
        let dev: Cpu = Default::default();
        let other = dev.clone();
        let a: Tensor4D<f32> = dev.sample_uniform(Shape4D::new(1, 1, 2, 2));
        let b: Tensor4D<f32> = other.sample_uniform(Shape4D::new(1, 1, 2, 2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_zeros_has_zero_grad() {
        let dev: Cpu = Default::default();
        let t: Tensor4D<f64> = dev.zeros(Shape4D::new(2, 1, 2, 3));
        assert!(t.data().iter().all(|&v| v == 0.0));
        assert!(t.grad().iter().all(|&v| v == 0.0));
    }
}
