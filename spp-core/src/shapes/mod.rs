//! The 4d `(batch, channel, row, column)` shape every tensor in this crate uses.
//!
//! Per-item feature vectors of length `F` are represented as `(batch, F, 1, 1)`.

/// Runtime shape of a [crate::tensor::Tensor4D].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape4D {
    pub batch: usize,
    pub chan: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape4D {
    pub const fn new(batch: usize, chan: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            chan,
            height,
            width,
        }
    }

    /// Shape of a batch of flat feature vectors.
    pub const fn vector(batch: usize, features: usize) -> Self {
        Self::new(batch, features, 1, 1)
    }

    #[inline(always)]
    pub const fn num_elements(&self) -> usize {
        self.batch * self.chan * self.height * self.width
    }

    /// Number of elements in one `(height, width)` plane.
    #[inline(always)]
    pub const fn plane_size(&self) -> usize {
        self.height * self.width
    }

    /// Number of elements per batch item.
    #[inline(always)]
    pub const fn item_size(&self) -> usize {
        self.chan * self.height * self.width
    }

    /// Row-major strides.
    pub const fn strides(&self) -> [usize; 4] {
        [
            self.chan * self.height * self.width,
            self.height * self.width,
            self.width,
            1,
        ]
    }

    #[inline(always)]
    pub const fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        ((n * self.chan + c) * self.height + h) * self.width + w
    }

    pub const fn concrete(&self) -> [usize; 4] {
        [self.batch, self.chan, self.height, self.width]
    }
}

impl From<(usize, usize, usize, usize)> for Shape4D {
    fn from((batch, chan, height, width): (usize, usize, usize, usize)) -> Self {
        Self::new(batch, chan, height, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_follow_strides() {
        let s = Shape4D::new(2, 3, 4, 5);
        let [sn, sc, sh, sw] = s.strides();
        assert_eq!(s.num_elements(), 120);
        assert_eq!(s.offset(1, 2, 3, 4), sn + 2 * sc + 3 * sh + 4 * sw);
        assert_eq!(s.offset(1, 2, 3, 4), s.num_elements() - 1);
        assert_eq!(s.plane_size(), 20);
        assert_eq!(s.item_size(), 60);
    }

    #[test]
    fn test_vector_shape() {
        let s = Shape4D::vector(3, 7);
        assert_eq!(s.concrete(), [3, 7, 1, 1]);
        assert_eq!(s, (3, 7, 1, 1).into());
    }
}
