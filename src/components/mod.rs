//! Built-in components.
mod clock;
mod constant;
mod gates;
mod pin;
mod register;
mod splitter;
mod subcircuit;
pub use clock::*;
pub use constant::*;
pub use gates::*;
pub use pin::*;
pub use register::*;
pub use splitter::*;
pub use subcircuit::*;
