//! Event driven signal propagation for hierarchical digital logic circuits.
//!
//! Circuits are built as [CircuitDefinition]s out of [Component]s connected by nets, registered
//! with a [LockManager] (or a [Project]) and simulated by a [Simulation]. Every instantiation of a
//! circuit, including each placement as a [Subcircuit], keeps its own values in a [StateTree].
//!
//! # Example
//! ```
//! # use logicprop::{CircuitDefinition, LockManager, Simulation, SimConfig, BitWidth, Value};
//! let mut c = CircuitDefinition::new("nand");
//! let w = BitWidth::ONE;
//! let a = c.add_net("a", w).unwrap();
//! let b = c.add_net("b", w).unwrap();
//! let y = c.add_net("y", w).unwrap();
//! c.input_pin("a", a).unwrap();
//! c.input_pin("b", b).unwrap();
//! c.output_pin("y", y).unwrap();
//! c.nand2("g", a, b, y).unwrap();
//! let circuit = LockManager::new().register(c);
//!
//! let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();
//! sim.set_input("a", Value::bool(true)).unwrap();
//! sim.set_input("b", Value::bool(true)).unwrap();
//! assert!(sim.step().unwrap().status.is_converged());
//! assert_eq!(sim.output("y").unwrap(), Value::bool(false));
//! ```
pub mod circuit;
pub mod component;
pub mod components;
mod config;
pub mod data_structures;
mod error;
pub mod signal;
pub mod sim;
pub use circuit::*;
pub use component::*;
pub use components::*;
pub use config::*;
pub use error::*;
pub use signal::*;
pub use sim::*;
