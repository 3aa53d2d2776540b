//! Multi valued signal lattice and bus arithmetic.
mod logic;
mod value;
pub use logic::*;
pub use value::*;
