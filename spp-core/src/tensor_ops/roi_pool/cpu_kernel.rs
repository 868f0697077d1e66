use crate::{
    dtypes::{Dtype, MaskIndex},
    tensor::{Cpu, Error},
};

use super::{PoolMethod, RoiPoolKernel, RoiPoolOp};

impl<E: Dtype> RoiPoolKernel<E> for Cpu {
    fn forward<M: MaskIndex>(
        &self,
        op: &RoiPoolOp,
        inp: &[E],
        out: &mut [E],
        mask: &mut [M],
    ) -> Result<(), Error> {
        if op.method != PoolMethod::Max {
            return Err(Error::Unsupported(op.method));
        }
        op.check_buffers(inp.len(), out.len(), mask.len())?;

        let plane = op.h_in * op.w_in;
        let bins = op.bins_h * op.bins_w;
        let planes = inp
            .chunks_exact(plane)
            .zip(out.chunks_exact_mut(bins))
            .zip(mask.chunks_exact_mut(bins));
        for ((img, out), mask) in planes {
            for (ph, &(h_start, h_end)) in op.rows.iter().enumerate() {
                for (pw, &(w_start, w_end)) in op.cols.iter().enumerate() {
                    let mut max = E::min_value();
                    let mut argmax = h_start * op.w_in + w_start;
                    for h in h_start..h_end {
                        for w in w_start..w_end {
                            let i = h * op.w_in + w;
                            if img[i] > max {
                                max = img[i];
                                argmax = i;
                            }
                        }
                    }
                    let o = ph * op.bins_w + pw;
                    out[o] = max;
                    mask[o] = M::from_index(argmax);
                }
            }
        }
        Ok(())
    }

    fn backward<M: MaskIndex>(
        &self,
        op: &RoiPoolOp,
        grad_inp: &mut [E],
        grad_out: &[E],
        mask: &[M],
    ) -> Result<(), Error> {
        if op.method != PoolMethod::Max {
            return Err(Error::Unsupported(op.method));
        }
        op.check_buffers(grad_inp.len(), grad_out.len(), mask.len())?;

        grad_inp.fill(Default::default());
        let plane = op.h_in * op.w_in;
        let bins = op.bins_h * op.bins_w;
        let planes = grad_inp
            .chunks_exact_mut(plane)
            .zip(grad_out.chunks_exact(bins))
            .zip(mask.chunks_exact(bins));
        for ((grad_img, grad_out), mask) in planes {
            for (&g, &m) in grad_out.iter().zip(mask.iter()) {
                let i = m
                    .to_index()
                    .filter(|&i| i < plane)
                    .ok_or(Error::InvalidMaskIndex)?;
                grad_img[i] += g;
            }
        }
        Ok(())
    }
}
