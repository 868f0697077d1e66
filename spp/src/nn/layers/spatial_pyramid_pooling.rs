use crate::prelude::*;

use super::{Concat, Flatten, PyramidLevel, PyramidLevelConfig, SplitInto};

/// Configuration of a [SpatialPyramidPooling] layer.
///
/// `spatial_bins[i]` is the number of bins along both axes of level `i`.
/// Every level shares the pooling method and the region of interest, whose
/// unset bounds default to the full input extent.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialPyramidPoolingConfig {
    pub spatial_bins: Vec<usize>,
    pub pool: PoolMethod,
    pub roi_start_h: Option<usize>,
    pub roi_start_w: Option<usize>,
    pub roi_end_h: Option<usize>,
    pub roi_end_w: Option<usize>,
}

impl SpatialPyramidPoolingConfig {
    pub fn new(spatial_bins: Vec<usize>) -> Self {
        Self {
            spatial_bins,
            ..Default::default()
        }
    }

    pub fn with_pool(mut self, pool: PoolMethod) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi_start_h = Some(roi.start_h);
        self.roi_start_w = Some(roi.start_w);
        self.roi_end_h = Some(roi.end_h);
        self.roi_end_w = Some(roi.end_w);
        self
    }

    /// The configuration of the level pooling into `bins x bins` cells.
    pub fn level(&self, bins: usize) -> PyramidLevelConfig {
        PyramidLevelConfig {
            pool: self.pool,
            roi_start_h: self.roi_start_h,
            roi_start_w: self.roi_start_w,
            roi_end_h: self.roi_end_h,
            roi_end_w: self.roi_end_w,
            ..PyramidLevelConfig::new(bins, bins)
        }
    }
}

impl<E: Dtype> BuildOnDevice<E> for SpatialPyramidPoolingConfig {
    type Built = SpatialPyramidPooling<E>;
    fn try_build_on_device(&self, device: &Cpu) -> Result<Self::Built, Error> {
        let mut levels = self
            .spatial_bins
            .iter()
            .map(|&k| BuildOnDevice::<E>::try_build_on_device(&self.level(k), device))
            .collect::<Result<Vec<PyramidLevel>, Error>>()?;
        let topology = match levels.len() {
            0 => return Err(Error::NoPyramidLevels),
            1 => Topology::Single(levels.remove(0)),
            _ => Topology::Pyramid {
                split: SplitInto::default(),
                branches: levels.into_iter().map(Branch::new).collect(),
                concat: Concat::default(),
            },
        };
        Ok(SpatialPyramidPooling {
            config: self.clone(),
            topology,
            shape: None,
        })
    }
}

/// One pyramid level with the tensors feeding and leaving it.
#[derive(Debug, Clone)]
struct Branch<E> {
    input: Tensor4D<E>,
    level: PyramidLevel,
    pooled: Tensor4D<E>,
    flatten: Flatten,
    flat: Tensor4D<E>,
}

impl<E: Default> Branch<E> {
    fn new(level: PyramidLevel) -> Self {
        Self {
            input: Default::default(),
            level,
            pooled: Default::default(),
            flatten: Default::default(),
            flat: Default::default(),
        }
    }
}

#[derive(Debug, Clone)]
enum Topology<E> {
    /// A lone level is run directly on the caller's tensors.
    Single(PyramidLevel),
    Pyramid {
        split: SplitInto,
        branches: Vec<Branch<E>>,
        concat: Concat,
    },
}

/// Spatial pyramid pooling: max pools the bottom over a shared region of
/// interest at several bin resolutions and joins the results.
///
/// With levels `k_1, ..., k_n` the top of a `(batch, channels, h, w)` bottom
/// is a `(batch, channels * sum(k_i * k_i), 1, 1)` vector whatever `h` and `w`
/// are. Per batch item it holds the flattened pooled map of every level, in
/// level order.
///
/// A single level is not flattened: its top is the level's
/// `(batch, channels, k, k)` output.
///
/// # Examples
/// ```rust
/// # use spp::prelude::*;
/// let dev: Cpu = Default::default();
/// let mut spp = dev.build_layer::<f32>(SpatialPyramidPoolingConfig::new(vec![1, 2]));
/// let x: Tensor4D<f32> = dev.tensor_from_vec(vec![3.0; 16], Shape4D::new(1, 1, 4, 4));
/// let mut y = Tensor4D::default();
/// spp.set_up(&[&x], &mut [&mut y]);
/// spp.forward(&[&x], &mut [&mut y]);
/// assert_eq!(y.data(), [3.0; 5]);
/// ```
#[derive(Debug, Clone)]
pub struct SpatialPyramidPooling<E> {
    config: SpatialPyramidPoolingConfig,
    topology: Topology<E>,
    shape: Option<Shape4D>,
}

impl<E> SpatialPyramidPooling<E> {
    pub fn config(&self) -> &SpatialPyramidPoolingConfig {
        &self.config
    }

    pub fn num_levels(&self) -> usize {
        match &self.topology {
            Topology::Single(_) => 1,
            Topology::Pyramid { branches, .. } => branches.len(),
        }
    }

    pub fn level(&self, i: usize) -> Option<&PyramidLevel> {
        match &self.topology {
            Topology::Single(level) => (i == 0).then_some(level),
            Topology::Pyramid { branches, .. } => branches.get(i).map(|b| &b.level),
        }
    }

    pub fn is_set_up(&self) -> bool {
        self.shape.is_some()
    }

    /// The region of interest shared by all levels, once set up.
    pub fn roi(&self) -> Option<Roi> {
        self.level(0).and_then(PyramidLevel::roi)
    }

    /// The shape of the top for the bottom captured at set up.
    pub fn output_shape(&self) -> Option<Shape4D> {
        let shape = self.shape?;
        Some(match &self.topology {
            Topology::Single(level) => {
                let (h, w) = level.bins();
                Shape4D::new(shape.batch, shape.chan, h, w)
            }
            Topology::Pyramid { branches, .. } => {
                let cells: usize = branches
                    .iter()
                    .map(|b| b.level.bins())
                    .map(|(h, w)| h * w)
                    .sum();
                Shape4D::vector(shape.batch, shape.chan * cells)
            }
        })
    }

    /// Moves the region of interest of every level.
    pub fn try_set_roi(&mut self, roi: Roi) -> Result<(), Error> {
        let shape = self.shape.ok_or(Error::NotSetUp)?;
        roi.check(shape.height, shape.width)?;
        match &mut self.topology {
            Topology::Single(level) => level.try_set_roi(roi),
            Topology::Pyramid { branches, .. } => branches
                .iter_mut()
                .try_for_each(|b| b.level.try_set_roi(roi)),
        }
    }

    pub fn set_roi(&mut self, roi: Roi) {
        self.try_set_roi(roi).unwrap()
    }
}

impl<E: Dtype> Layer<E> for SpatialPyramidPooling<E> {
    fn try_set_up(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(1, top.len())?;
        self.shape = None;
        match &mut self.topology {
            Topology::Single(level) => level.try_set_up(bottom, top)?,
            Topology::Pyramid {
                split,
                branches,
                concat,
            } => {
                let mut inputs: Vec<_> = branches.iter_mut().map(|b| &mut b.input).collect();
                split.try_set_up(bottom, &mut inputs)?;
                for b in branches.iter_mut() {
                    b.level.try_set_up(&[&b.input], &mut [&mut b.pooled])?;
                    b.flatten.try_set_up(&[&b.pooled], &mut [&mut b.flat])?;
                }
                let flats: Vec<_> = branches.iter().map(|b| &b.flat).collect();
                concat.try_set_up(&flats, top)?;
            }
        }
        self.shape = Some(*bottom[0].shape());
        log::debug!(
            "spatial pyramid pooling {:?}: set up for {:?}, output {:?}",
            self.config.spatial_bins,
            bottom[0].shape(),
            top[0].shape()
        );
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
        log::trace!("spatial pyramid pooling {:?}: forward", self.config.spatial_bins);

        match &mut self.topology {
            Topology::Single(level) => level.try_forward(bottom, top),
            Topology::Pyramid {
                split,
                branches,
                concat,
            } => {
                let mut inputs: Vec<_> = branches.iter_mut().map(|b| &mut b.input).collect();
                let mut loss = split.try_forward(bottom, &mut inputs)?;
                for b in branches.iter_mut() {
                    loss += b.level.try_forward(&[&b.input], &mut [&mut b.pooled])?;
                    loss += b.flatten.try_forward(&[&b.pooled], &mut [&mut b.flat])?;
                }
                let flats: Vec<_> = branches.iter().map(|b| &b.flat).collect();
                loss += concat.try_forward(&flats, top)?;
                Ok(loss)
            }
        }
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
        bottom[0].check_shape(&shape)?;
        log::trace!("spatial pyramid pooling {:?}: backward", self.config.spatial_bins);

        match &mut self.topology {
            Topology::Single(level) => level.try_backward(top, propagate_down, bottom),
            Topology::Pyramid {
                split,
                branches,
                concat,
            } => {
                let all = vec![true; branches.len()];
                let mut flats: Vec<_> = branches.iter_mut().map(|b| &mut b.flat).collect();
                concat.try_backward(top, &all, &mut flats)?;
                for b in branches.iter_mut().rev() {
                    b.flatten.try_backward(&[&b.flat], &[true], &mut [&mut b.pooled])?;
                    b.level.try_backward(&[&b.pooled], &[true], &mut [&mut b.input])?;
                }
                let inputs: Vec<_> = branches.iter().map(|b| &b.input).collect();
                split.try_backward(&inputs, propagate_down, bottom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn test_build_errors() {
        let dev: TestDevice = Default::default();
        let r = dev.try_build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![]));
        assert_eq!(r.unwrap_err(), Error::NoPyramidLevels);
        let r = dev.try_build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 0, 4]));
        assert_eq!(r.unwrap_err(), Error::ZeroBinNum);
    }

    #[test]
    fn test_two_levels_of_constant_input() {
        let dev: TestDevice = Default::default();
        let x: Tensor4D<TestDtype> = dev.tensor_from_vec(vec![3.0; 16], Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 2]));
        assert_eq!(spp.num_levels(), 2);
        spp.set_up(&[&x], &mut [&mut y]);
        let loss = spp.forward(&[&x], &mut [&mut y]);
        assert_eq!(loss, 0.0);
        assert_eq!(y.shape(), &Shape4D::vector(1, 5));
        assert_close_to_literal!(y.data(), [3.0; 5]);
    }

    #[test]
    fn test_levels_in_order_per_item() {
        let dev: TestDevice = Default::default();
        let data = (1..=32).map(|v| v as TestDtype).collect();
        let x: Tensor4D<TestDtype> = dev.tensor_from_vec(data, Shape4D::new(2, 1, 4, 4));
        let mut y = Tensor4D::default();
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 2]));
        spp.set_up(&[&x], &mut [&mut y]);
        spp.forward(&[&x], &mut [&mut y]);
        assert_close_to_literal!(
            y.data(),
            [16.0, 6.0, 8.0, 14.0, 16.0, 32.0, 22.0, 24.0, 30.0, 32.0]
        );
    }

    #[test]
    fn test_output_size_is_independent_of_input_size() {
        let dev = TestDevice::seed_from_u64(5);
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 2, 4]));
        for (h, w) in [(4, 4), (7, 13), (16, 5), (32, 32)] {
            let x: Tensor4D<TestDtype> = dev.sample_normal(Shape4D::new(3, 2, h, w));
            let mut y = Tensor4D::default();
            spp.set_up(&[&x], &mut [&mut y]);
            spp.forward(&[&x], &mut [&mut y]);
            assert_eq!(y.shape(), &Shape4D::vector(3, 2 * 21));
            assert_eq!(spp.output_shape(), Some(Shape4D::vector(3, 42)));
        }
    }

    #[test]
    fn test_single_level_is_not_flattened() {
        let dev: TestDevice = Default::default();
        let data = (1..=16).map(|v| v as TestDtype).collect();
        let x: Tensor4D<TestDtype> = dev.tensor_from_vec(data, Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![2]));
        spp.set_up(&[&x], &mut [&mut y]);
        spp.forward(&[&x], &mut [&mut y]);
        assert_eq!(y.shape(), &Shape4D::new(1, 1, 2, 2));
        assert_close_to_literal!(y.data(), [6.0, 8.0, 14.0, 16.0]);
        assert_eq!(spp.level(0).unwrap().mask().unwrap().data(), [5, 7, 13, 15]);
    }

    #[test]
    fn test_backward_sums_levels() {
        let dev: TestDevice = Default::default();
        let data = (1..=16).map(|v| v as TestDtype).collect();
        let mut x: Tensor4D<TestDtype> = dev.tensor_from_vec(data, Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 2]));
        spp.set_up(&[&x], &mut [&mut y]);
        spp.forward(&[&x], &mut [&mut y]);
        y.copy_grad_from(&[10.0, 1.0, 2.0, 3.0, 4.0]);
        spp.backward(&[&y], &[true], &mut [&mut x]);
        // 16 is picked by the 1x1 level and by the last cell of the 2x2 level
        #[rustfmt::skip]
        assert_close_to_literal!(
            x.grad(),
            [
                0., 0., 0., 0.,
                0., 1., 0., 2.,
                0., 0., 0., 0.,
                0., 3., 0., 14.,
            ]
        );
    }

    #[test]
    fn test_backward_without_propagation_is_noop() {
        let dev: TestDevice = Default::default();
        let mut x: Tensor4D<TestDtype> = dev.sample_normal(Shape4D::new(1, 2, 5, 5));
        let mut y = Tensor4D::default();
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 3]));
        spp.set_up(&[&x], &mut [&mut y]);
        spp.forward(&[&x], &mut [&mut y]);
        y.fill_grad(1.0);
        x.fill_grad(-2.0);
        spp.backward(&[&y], &[false], &mut [&mut x]);
        assert!(x.grad().iter().all(|&g| g == -2.0));
    }

    #[test]
    fn test_average_fails_at_forward() {
        let dev: TestDevice = Default::default();
        let x: Tensor4D<TestDtype> = dev.sample_normal(Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let config = SpatialPyramidPoolingConfig::new(vec![1, 2]).with_pool(PoolMethod::Average);
        let mut spp = dev.build_layer::<TestDtype>(config);
        spp.set_up(&[&x], &mut [&mut y]);
        assert_eq!(
            spp.try_forward(&[&x], &mut [&mut y]),
            Err(Error::Unsupported(PoolMethod::Average))
        );
    }

    #[test]
    fn test_stochastic_backward_fails() {
        let dev: TestDevice = Default::default();
        let mut x: Tensor4D<TestDtype> = dev.sample_normal(Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let config = SpatialPyramidPoolingConfig::new(vec![1, 2]).with_pool(PoolMethod::Stochastic);
        let mut spp = dev.build_layer::<TestDtype>(config);
        spp.set_up(&[&x], &mut [&mut y]);
        y.fill_grad(1.0);
        assert_eq!(
            spp.try_backward(&[&y], &[true], &mut [&mut x]),
            Err(Error::Unsupported(PoolMethod::Stochastic))
        );
    }

    #[test]
    fn test_roi_reaches_every_level() {
        let dev: TestDevice = Default::default();
        let data = (1..=16).map(|v| v as TestDtype).collect();
        let x: Tensor4D<TestDtype> = dev.tensor_from_vec(data, Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let config = SpatialPyramidPoolingConfig::new(vec![1, 2]).with_roi(Roi::new(0, 0, 2, 2));
        let mut spp = dev.build_layer::<TestDtype>(config);
        spp.set_up(&[&x], &mut [&mut y]);
        for i in 0..2 {
            assert_eq!(spp.level(i).unwrap().roi(), Some(Roi::new(0, 0, 2, 2)));
        }
        spp.forward(&[&x], &mut [&mut y]);
        assert_close_to_literal!(y.data(), [6.0, 1.0, 2.0, 5.0, 6.0]);

        spp.set_roi(Roi::new(2, 2, 4, 4));
        assert_eq!(spp.roi(), Some(Roi::new(2, 2, 4, 4)));
        spp.forward(&[&x], &mut [&mut y]);
        assert_close_to_literal!(y.data(), [16.0, 11.0, 12.0, 15.0, 16.0]);
    }

    #[test]
    fn test_invalid_roi_fails_at_set_up() {
        let dev: TestDevice = Default::default();
        let x: Tensor4D<TestDtype> = dev.zeros(Shape4D::new(1, 1, 4, 4));
        let mut y = Tensor4D::default();
        let config = SpatialPyramidPoolingConfig::new(vec![1, 2]).with_roi(Roi::new(0, 0, 4, 6));
        let mut spp = dev.build_layer::<TestDtype>(config);
        assert!(matches!(
            spp.try_set_up(&[&x], &mut [&mut y]),
            Err(Error::InvalidRoi { .. })
        ));
        assert!(!spp.is_set_up());
        assert_eq!(spp.try_set_roi(Roi::full(4, 4)), Err(Error::NotSetUp));
    }

    #[test]
    fn test_new_input_shape_requires_set_up() {
        let dev: TestDevice = Default::default();
        let a: Tensor4D<TestDtype> = dev.sample_normal(Shape4D::new(1, 2, 6, 6));
        let b: Tensor4D<TestDtype> = dev.sample_normal(Shape4D::new(1, 2, 9, 4));
        let mut y = Tensor4D::default();
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 2]));
        spp.set_up(&[&a], &mut [&mut y]);
        assert!(matches!(
            spp.try_forward(&[&b], &mut [&mut y]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_number_of_tensors() {
        let dev: TestDevice = Default::default();
        let x: Tensor4D<TestDtype> = dev.zeros(Shape4D::new(1, 1, 4, 4));
        let (mut y, mut z) = (Tensor4D::default(), Tensor4D::default());
        let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(vec![1, 2]));
        assert_eq!(
            spp.try_set_up(&[&x], &mut [&mut y, &mut z]),
            Err(Error::WrongNumTensors {
                expected: 1,
                found: 2
            })
        );
        assert_eq!(spp.try_forward(&[&x], &mut [&mut y]), Err(Error::NotSetUp));
    }

    #[test]
    fn test_empty_input_fails_for_every_topology() {
        let dev: TestDevice = Default::default();
        let shape = Shape4D::new(1, 0, 4, 4);
        let x: Tensor4D<TestDtype> = dev.zeros(shape);
        for bins in [vec![2], vec![1, 2]] {
            let mut y = Tensor4D::default();
            let mut spp = dev.build_layer::<TestDtype>(SpatialPyramidPoolingConfig::new(bins));
            assert_eq!(
                spp.try_set_up(&[&x], &mut [&mut y]),
                Err(Error::EmptyInput(shape))
            );
            assert_eq!(spp.try_forward(&[&x], &mut [&mut y]), Err(Error::NotSetUp));
        }
    }
}
