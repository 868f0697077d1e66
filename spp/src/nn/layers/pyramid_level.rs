use crate::prelude::*;

/// Configuration of a [PyramidLevel].
///
/// `bin_num_h` and `bin_num_w` are required and must be positive. The ROI
/// bounds default to the full input extent. `with_mask_output` makes the layer
/// expect a second top that receives the argmax mask as floating point
/// encoded indices; otherwise the mask is kept inside the layer.
///
/// # Examples
/// ```rust
/// # use spp::prelude::*;
/// let config = PyramidLevelConfig::new(3, 3)
///     .with_pool(PoolMethod::Max)
///     .with_roi(Roi::new(0, 0, 12, 12));
/// let dev: Cpu = Default::default();
/// let level = dev.build_layer::<f32>(config);
/// assert_eq!(level.bins(), (3, 3));
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PyramidLevelConfig {
    pub bin_num_h: Option<usize>,
    pub bin_num_w: Option<usize>,
    pub pool: PoolMethod,
    pub roi_start_h: Option<usize>,
    pub roi_start_w: Option<usize>,
    pub roi_end_h: Option<usize>,
    pub roi_end_w: Option<usize>,
    pub with_mask_output: bool,
}

impl PyramidLevelConfig {
    pub fn new(bin_num_h: usize, bin_num_w: usize) -> Self {
        Self {
            bin_num_h: Some(bin_num_h),
            bin_num_w: Some(bin_num_w),
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

    pub fn with_mask_output(mut self, with_mask_output: bool) -> Self {
        self.with_mask_output = with_mask_output;
        self
    }

    /// Fills unset ROI bounds with the full `height x width` extent.
    pub fn resolve_roi(&self, height: usize, width: usize) -> Roi {
        Roi::new(
            self.roi_start_h.unwrap_or(0),
            self.roi_start_w.unwrap_or(0),
            self.roi_end_h.unwrap_or(height),
            self.roi_end_w.unwrap_or(width),
        )
    }

    fn bins(&self) -> Result<(usize, usize), Error> {
        match (self.bin_num_h, self.bin_num_w) {
            (Some(h), Some(w)) if h > 0 && w > 0 => Ok((h, w)),
            (Some(_), Some(_)) => Err(Error::ZeroBinNum),
            _ => Err(Error::MissingBinNum),
        }
    }
}

impl<E: Dtype> BuildOnDevice<E> for PyramidLevelConfig {
    type Built = PyramidLevel;
    fn try_build_on_device(&self, device: &Cpu) -> Result<Self::Built, Error> {
        let bins = self.bins()?;
        Ok(PyramidLevel {
            device: device.clone(),
            config: self.clone(),
            bins,
            op: None,
            max_idx: None,
        })
    }
}

/// Adaptive max pooling of a region of interest into a fixed bin grid.
///
/// Pools every `(batch, channel)` plane of the bottom over its ROI into
/// `bins_h x bins_w` cells, producing a `(batch, channels, bins_h, bins_w)`
/// top whatever the input's spatial size. See [RoiPoolOp] for how bin windows
/// are derived; windows of neighbouring bins may overlap.
///
/// The forward pass records the position of each cell's maximum. The backward
/// pass routes each cell's gradient to that position, summing where several
/// cells picked the same input.
///
/// The layer is unconfigured until [Layer::try_set_up] succeeds. Set up
/// captures the bottom's shape; a bottom with another shape is rejected by
/// forward until the layer is set up again.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    device: Cpu,
    config: PyramidLevelConfig,
    bins: (usize, usize),
    op: Option<RoiPoolOp>,
    max_idx: Option<Tensor4D<usize>>,
}

impl PyramidLevel {
    pub fn config(&self) -> &PyramidLevelConfig {
        &self.config
    }

    pub fn bins(&self) -> (usize, usize) {
        self.bins
    }

    pub fn pool_method(&self) -> PoolMethod {
        self.config.pool
    }

    pub fn is_set_up(&self) -> bool {
        self.op.is_some()
    }

    /// The current region of interest, once set up.
    pub fn roi(&self) -> Option<Roi> {
        self.op.as_ref().map(|op| op.roi)
    }

    /// The `(rows, cols)` extent of a bin, once set up.
    pub fn bin_size(&self) -> Option<(f32, f32)> {
        self.op.as_ref().map(|op| (op.bin_size_h, op.bin_size_w))
    }

    pub fn output_shape(&self) -> Option<Shape4D> {
        self.op.as_ref().map(RoiPoolOp::out_shape)
    }

    /// The argmax mask of the last forward pass, when it is kept internally.
    pub fn mask(&self) -> Option<&Tensor4D<usize>> {
        self.max_idx.as_ref()
    }

    /// Replaces the region of interest, validating it against the input
    /// extent captured at set up and recomputing the bin sizes.
    pub fn try_set_roi(&mut self, roi: Roi) -> Result<(), Error> {
        let op = self.op.as_ref().ok_or(Error::NotSetUp)?;
        let op = RoiPoolOp::try_new(op.method, roi, self.bins, op.inp_shape())?;
        log::debug!(
            "pyramid level {}x{}: roi {:?}, bin size {}x{}",
            self.bins.0,
            self.bins.1,
            op.roi,
            op.bin_size_h,
            op.bin_size_w
        );
        self.op = Some(op);
        Ok(())
    }

    pub fn set_roi(&mut self, roi: Roi) {
        self.try_set_roi(roi).unwrap()
    }

    fn num_tops(&self) -> usize {
        if self.config.with_mask_output {
            2
        } else {
            1
        }
    }
}

impl<E: Dtype> Layer<E> for PyramidLevel {
    fn try_set_up(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(self.num_tops(), top.len())?;
        let shape = *bottom[0].shape();
        if shape.num_elements() == 0 {
            return Err(Error::EmptyInput(shape));
        }
        let roi = self.config.resolve_roi(shape.height, shape.width);
        let op = RoiPoolOp::try_new(self.config.pool, roi, self.bins, shape)?;
        let out_shape = op.out_shape();
        for t in top.iter_mut() {
            t.reshape(out_shape);
        }
        self.max_idx = (op.method == PoolMethod::Max && !self.config.with_mask_output)
            .then(|| Tensor4D::zeros(out_shape));
        log::debug!(
            "pyramid level {}x{}: set up for {:?}, roi {:?}, bin size {}x{}",
            self.bins.0,
            self.bins.1,
            shape,
            op.roi,
            op.bin_size_h,
            op.bin_size_w
        );
        self.op = Some(op);
        Ok(())
    }

    fn try_forward(
        &mut self,
        bottom: &[&Tensor4D<E>],
        top: &mut [&mut Tensor4D<E>],
    ) -> Result<E, Error> {
        let op = self.op.as_ref().ok_or(Error::NotSetUp)?;
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(self.num_tops(), top.len())?;
        if op.method != PoolMethod::Max {
            return Err(Error::Unsupported(op.method));
        }
        bottom[0].check_shape(&op.inp_shape())?;
        let out_shape = op.out_shape();
        for t in top.iter() {
            t.check_shape(&out_shape)?;
        }
        log::trace!("pyramid level {}x{}: forward", self.bins.0, self.bins.1);

        match self.max_idx.as_mut() {
            Some(mask) => {
                self.device
                    .forward(op, bottom[0].data(), top[0].data_mut(), mask.data_mut())?
            }
            None => {
                let (out, mask) = top.split_at_mut(1);
                self.device
                    .forward(op, bottom[0].data(), out[0].data_mut(), mask[0].data_mut())?
            }
        }
        Ok(E::default())
    }

    fn try_backward(
        &mut self,
        top: &[&Tensor4D<E>],
        propagate_down: &[bool],
        bottom: &mut [&mut Tensor4D<E>],
    ) -> Result<(), Error> {
        let op = self.op.as_ref().ok_or(Error::NotSetUp)?;
        check_num_tensors(self.num_tops(), top.len())?;
        check_num_tensors(1, bottom.len())?;
        check_num_tensors(1, propagate_down.len())?;
        if !propagate_down[0] {
            return Ok(());
        }
        if op.method != PoolMethod::Max {
            return Err(Error::Unsupported(op.method));
        }
        bottom[0].check_shape(&op.inp_shape())?;
        top[0].check_shape(&op.out_shape())?;
        log::trace!("pyramid level {}x{}: backward", self.bins.0, self.bins.1);

        match self.max_idx.as_ref() {
            Some(mask) => self
                .device
                .backward(op, bottom[0].grad_mut(), top[0].grad(), mask.data()),
            None => self
                .device
                .backward(op, bottom[0].grad_mut(), top[0].grad(), top[1].data()),
        }
    }
}
