mod slab;
pub use slab::*;
