use crate::{
    shapes::Shape4D,
    tensor_ops::{PoolMethod, Roi},
};

/// Represents a number of different errors that can occur from creating tensors,
/// configuring layers or running their forward/backward passes.
///
/// None of these are recoverable: they are configuration or programming errors
/// and are surfaced to the caller as soon as they are detected.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Not enough elements were provided when creating a tensor
    WrongNumElements,
    /// Both `bin_num_h` and `bin_num_w` are required
    MissingBinNum,
    /// Bin numbers must be greater than zero
    ZeroBinNum,
    /// A spatial pyramid needs at least one level
    NoPyramidLevels,
    /// The input to pool has no elements
    EmptyInput(Shape4D),
    /// The region of interest is empty or does not fit inside the input
    InvalidRoi {
        roi: Roi,
        height: usize,
        width: usize,
    },
    /// A bin's pooling window contains no input positions
    EmptyBin { ph: usize, pw: usize },
    /// The layer was used before a successful set up
    NotSetUp,
    /// A layer received the wrong number of bottoms, tops or propagate flags
    WrongNumTensors { expected: usize, found: usize },
    /// A tensor's shape differs from the one captured at set up
    ShapeMismatch { expected: Shape4D, found: Shape4D },
    /// An argmax mask entry does not point into its input plane
    InvalidMaskIndex,
    /// The pooling method can be configured but has no forward/backward pass
    Unsupported(PoolMethod),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {}
