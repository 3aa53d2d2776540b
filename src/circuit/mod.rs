//! Static structure of circuits: nets, placed components and the wiring between them.
mod definition;
mod dot;
mod handles;
mod resolver;
pub use definition::*;
pub use handles::*;
pub use resolver::*;
