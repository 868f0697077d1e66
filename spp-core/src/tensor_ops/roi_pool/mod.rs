mod cpu_kernel;

use crate::{dtypes::*, shapes::Shape4D, tensor::Error};

/// How a bin's window is reduced to a single value.
///
/// Only [PoolMethod::Max] has a forward/backward pass. The other methods are
/// accepted in configurations but fail with [Error::Unsupported] as soon as a
/// pass is run with them.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolMethod {
    #[default]
    Max,
    Average,
    Stochastic,
}

/// A rectangular region `[start_h, end_h) x [start_w, end_w)` of an input
/// plane.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Roi {
    pub start_h: usize,
    pub start_w: usize,
    pub end_h: usize,
    pub end_w: usize,
}

impl Roi {
    pub const fn new(start_h: usize, start_w: usize, end_h: usize, end_w: usize) -> Self {
        Self {
            start_h,
            start_w,
            end_h,
            end_w,
        }
    }

    /// The whole `height x width` plane.
    pub const fn full(height: usize, width: usize) -> Self {
        Self::new(0, 0, height, width)
    }

    /// Checks `start < end <= extent` along both axes.
    pub fn check(&self, height: usize, width: usize) -> Result<(), Error> {
        if self.end_h > height
            || self.end_w > width
            || self.end_h <= self.start_h
            || self.end_w <= self.start_w
        {
            return Err(Error::InvalidRoi {
                roi: *self,
                height,
                width,
            });
        }
        Ok(())
    }
}

/// Adaptive pooling of a [Roi] into a fixed `bins_h x bins_w` grid.
///
/// Bin `p` along an axis covers
/// `[start + floor(p * bin_size), min(start + ceil((p + 1) * bin_size), end))`
/// where `bin_size = (end - start) / bins`, computed in `f32`. When the ROI is
/// not a multiple of the bin count, neighbouring windows overlap and have
/// different sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiPoolOp {
    pub method: PoolMethod,
    pub roi: Roi,
    pub bins_h: usize,
    pub bins_w: usize,
    pub bin_size_h: f32,
    pub bin_size_w: f32,
    pub batch: usize,
    pub chan: usize,
    pub h_in: usize,
    pub w_in: usize,
    rows: Vec<(usize, usize)>,
    cols: Vec<(usize, usize)>,
}

impl RoiPoolOp {
    pub fn try_new(
        method: PoolMethod,
        roi: Roi,
        (bins_h, bins_w): (usize, usize),
        inp: Shape4D,
    ) -> Result<Self, Error> {
        if bins_h == 0 || bins_w == 0 {
            return Err(Error::ZeroBinNum);
        }
        roi.check(inp.height, inp.width)?;
        let bin_size_h = (roi.end_h - roi.start_h) as f32 / bins_h as f32;
        let bin_size_w = (roi.end_w - roi.start_w) as f32 / bins_w as f32;
        let rows = windows(roi.start_h, roi.end_h, bins_h, bin_size_h)
            .map_err(|ph| Error::EmptyBin { ph, pw: 0 })?;
        let cols = windows(roi.start_w, roi.end_w, bins_w, bin_size_w)
            .map_err(|pw| Error::EmptyBin { ph: 0, pw })?;
        Ok(Self {
            method,
            roi,
            bins_h,
            bins_w,
            bin_size_h,
            bin_size_w,
            batch: inp.batch,
            chan: inp.chan,
            h_in: inp.height,
            w_in: inp.width,
            rows,
            cols,
        })
    }

    pub fn inp_shape(&self) -> Shape4D {
        Shape4D::new(self.batch, self.chan, self.h_in, self.w_in)
    }

    pub fn out_shape(&self) -> Shape4D {
        Shape4D::new(self.batch, self.chan, self.bins_h, self.bins_w)
    }

    /// The half-open `(rows, cols)` window of bin `(ph, pw)`.
    pub fn window(&self, ph: usize, pw: usize) -> ((usize, usize), (usize, usize)) {
        (self.rows[ph], self.cols[pw])
    }

    fn check_buffers(&self, inp: usize, out: usize, mask: usize) -> Result<(), Error> {
        let out_numel = self.out_shape().num_elements();
        if inp != self.inp_shape().num_elements() || out != out_numel || mask != out_numel {
            return Err(Error::WrongNumElements);
        }
        Ok(())
    }
}

/// Returns the index of the first empty window on failure.
fn windows(
    start: usize,
    end: usize,
    bins: usize,
    bin_size: f32,
) -> Result<Vec<(usize, usize)>, usize> {
    (0..bins)
        .map(|p| {
            let lo = start + (p as f32 * bin_size).floor().max(0.0) as usize;
            let hi = (start + ((p + 1) as f32 * bin_size).ceil() as usize).min(end);
            if lo < hi {
                Ok((lo, hi))
            } else {
                Err(p)
            }
        })
        .collect()
}

pub trait RoiPoolKernel<E: Dtype> {
    /// Pools `inp` (laid out as [RoiPoolOp::inp_shape]) into `out` and records
    /// for every output cell the flat `h * w_in + w` index of its maximum in
    /// `mask`. Ties keep the first maximum in row-major scan order.
    fn forward<M: MaskIndex>(
        &self,
        op: &RoiPoolOp,
        inp: &[E],
        out: &mut [E],
        mask: &mut [M],
    ) -> Result<(), Error>;

    /// Zeroes `grad_inp` then adds every output gradient onto the input
    /// position its mask entry points to.
    fn backward<M: MaskIndex>(
        &self,
        op: &RoiPoolOp,
        grad_inp: &mut [E],
        grad_out: &[E],
        mask: &[M],
    ) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_windows() {
        let op =
            RoiPoolOp::try_new(PoolMethod::Max, Roi::full(4, 4), (2, 2), Shape4D::new(1, 1, 4, 4))
                .unwrap();
        assert_eq!(op.bin_size_h, 2.0);
        assert_eq!(op.window(0, 0), ((0, 2), (0, 2)));
        assert_eq!(op.window(1, 1), ((2, 4), (2, 4)));
        assert_eq!(op.out_shape(), Shape4D::new(1, 1, 2, 2));
    }

    #[test]
    fn test_uneven_windows_overlap() {
        let op =
            RoiPoolOp::try_new(PoolMethod::Max, Roi::full(3, 5), (2, 3), Shape4D::new(1, 1, 3, 5))
                .unwrap();
        assert_eq!(op.bin_size_h, 1.5);
        assert_eq!(op.window(0, 0).0, (0, 2));
        assert_eq!(op.window(1, 0).0, (1, 3));
        let cols: Vec<_> = (0..3).map(|pw| op.window(0, pw).1).collect();
        assert_eq!(cols, [(0, 2), (1, 4), (3, 5)]);
    }

    #[test]
    fn test_more_bins_than_rows() {
        let op =
            RoiPoolOp::try_new(PoolMethod::Max, Roi::full(2, 2), (3, 3), Shape4D::new(1, 1, 2, 2))
                .unwrap();
        let rows: Vec<_> = (0..3).map(|ph| op.window(ph, 0).0).collect();
        assert_eq!(rows, [(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_windows_offset_by_roi_start() {
        let op = RoiPoolOp::try_new(
            PoolMethod::Max,
            Roi::new(1, 2, 5, 4),
            (2, 1),
            Shape4D::new(1, 1, 6, 6),
        )
        .unwrap();
        assert_eq!(op.window(0, 0), ((1, 3), (2, 4)));
        assert_eq!(op.window(1, 0), ((3, 5), (2, 4)));
    }

    #[test]
    fn test_invalid_rois() {
        let shape = Shape4D::new(1, 1, 4, 4);
        for roi in [
            Roi::new(2, 0, 2, 4),
            Roi::new(0, 3, 4, 1),
            Roi::new(0, 0, 5, 4),
            Roi::new(0, 0, 4, 5),
        ] {
            assert_eq!(
                RoiPoolOp::try_new(PoolMethod::Max, roi, (1, 1), shape),
                Err(Error::InvalidRoi {
                    roi,
                    height: 4,
                    width: 4
                })
            );
        }
    }

    #[test]
    fn test_zero_bins() {
        let r = RoiPoolOp::try_new(PoolMethod::Max, Roi::full(4, 4), (0, 2), Shape4D::new(1, 1, 4, 4));
        assert_eq!(r, Err(Error::ZeroBinNum));
    }
}
