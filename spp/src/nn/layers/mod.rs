mod concat;
mod flatten;
mod pyramid_level;
mod spatial_pyramid_pooling;
mod split_into;

pub use concat::Concat;
pub use flatten::Flatten;
pub use pyramid_level::{PyramidLevel, PyramidLevelConfig};
pub use spatial_pyramid_pooling::{SpatialPyramidPooling, SpatialPyramidPoolingConfig};
pub use split_into::SplitInto;
