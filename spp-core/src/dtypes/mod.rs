//! Module for data type related traits. Contains things like [Unit], [Dtype] and [MaskIndex].

/// Represents a unit type, but no arithmetic.
pub trait Unit:
    'static
    + Copy
    + Clone
    + Default
    + std::fmt::Debug
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + std::marker::Unpin
{
}

impl Unit for f32 {}
impl Unit for f64 {}
impl Unit for usize {}

/// Represents a floating point data type that tensors can hold and that
/// pooling can be computed over. `Default::default()` is zero.
///
/// Every [Dtype] is also a [MaskIndex], so an argmax mask can be handed out
/// through a regular tensor.
pub trait Dtype:
    Unit
    + std::ops::Add<Self, Output = Self>
    + std::ops::Sub<Self, Output = Self>
    + std::ops::Mul<Self, Output = Self>
    + std::ops::Div<Self, Output = Self>
    + std::ops::AddAssign
    + std::ops::SubAssign
    + std::ops::MulAssign
    + std::ops::DivAssign
    + num_traits::Float
    + num_traits::FromPrimitive
    + MaskIndex
{
}
impl Dtype for f32 {}
impl Dtype for f64 {}

/// An element that can store a flat spatial index, used for argmax masks.
///
/// `usize` is the native representation. Floating point types store the
/// index as an exactly representable integer value, which is how a mask is
/// exposed through a second layer output.
pub trait MaskIndex: Unit {
    fn from_index(index: usize) -> Self;

    /// Returns `None` if the value does not encode a valid index.
    fn to_index(self) -> Option<usize>;
}

impl MaskIndex for usize {
    #[inline(always)]
    fn from_index(index: usize) -> Self {
        index
    }
    #[inline(always)]
    fn to_index(self) -> Option<usize> {
        Some(self)
    }
}

macro_rules! float_mask_index {
    ($type:ty) => {
        impl MaskIndex for $type {
            #[inline(always)]
            fn from_index(index: usize) -> Self {
                index as $type
            }
            #[inline(always)]
            fn to_index(self) -> Option<usize> {
                if self.fract() != 0.0 {
                    return None;
                }
                num_traits::ToPrimitive::to_usize(&self)
            }
        }
    };
}

float_mask_index!(f32);
float_mask_index!(f64);
