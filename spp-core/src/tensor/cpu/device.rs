use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Arc, Mutex};

/// A device that stores data on the heap and runs every kernel on the calling
/// thread.
///
/// Clones share the same random number generator.
#[derive(Clone, Debug)]
pub struct Cpu {
    pub(crate) rng: Arc<Mutex<StdRng>>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::seed_from_u64(0)
    }
}

impl Cpu {
    /// Constructs rng with the given seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}
