//! The contract every circuit element implements.
//!
//! A component is a static description (ports, attributes, delay) plus one behaviour:
//! given the values on its input ports and its private per-instantiation data, compute
//! the values of its output ports. Components never touch nets or other components, the
//! [Propagator](crate::Propagator) does that for them.
mod attributes;
mod registry;
pub use attributes::*;
pub use registry::*;

use crate::components::{Clock, Pin, Subcircuit};
use crate::error::Result;
use crate::signal::{BitWidth, Value};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};

/// Private per-instantiation data of a component, for example the contents of a register.
///
/// Every instantiation of a circuit owns its own copy, created by [Component::init_data].
pub type InstanceData = Box<dyn Any + Send + Sync>;

/// Values of the output ports of a component, in port order.
pub type Outputs = SmallVec<[Value; 2]>;

/// Whether a component reads or drives a port.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// The component reads the resolved value of the net connected to the port.
    Input,
    /// The component drives the net connected to the port.
    Output,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    pub width: BitWidth,
}

impl Port {
    pub fn input<S: Into<String>>(name: S, width: BitWidth) -> Port {
        Port {
            name: name.into(),
            direction: Direction::Input,
            width,
        }
    }

    pub fn output<S: Into<String>>(name: S, width: BitWidth) -> Port {
        Port {
            name: name.into(),
            direction: Direction::Output,
            width,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            Direction::Input => "<-",
            Direction::Output => "->",
        };
        write!(f, "{}{}[{}]", arrow, self.name, self.width)
    }
}

/// A circuit element.
///
/// [Component::propagate] must be a pure function of its inputs and private data: no wall
/// clock, no I/O, no randomness. Replaying the same inputs from a reset has to produce the same
/// history.
///
/// Optional capabilities the engine needs to know about ([Component::as_pin],
/// [Component::as_clock], [Component::as_subcircuit]) are answered once per component,
/// components that don't have them keep the default [None].
pub trait Component: Debug + Send + Sync {
    /// Name of the kind of component, the same name it is registered with in a [ComponentRegistry].
    fn kind(&self) -> &str;

    /// Every port of the component, inputs and outputs interleaved in any order.
    fn ports(&self) -> &[Port];

    /// Abstract time between reading the inputs and the outputs being driven.
    fn delay(&self) -> u64 {
        1
    }

    /// Private data of a fresh or reset instantiation.
    fn init_data(&self) -> Option<InstanceData> {
        None
    }

    /// Computes the output port values from `inputs`, the values of the input ports in port order.
    ///
    /// `data` is the instance data created by [Component::init_data], or [None] if it returned [None].
    /// Clocked components must only change the stored value on their active clock edge.
    fn propagate(&self, inputs: &[Value], data: Option<&mut InstanceData>) -> Result<Outputs>;

    fn as_pin(&self) -> Option<&Pin> {
        None
    }

    fn as_clock(&self) -> Option<&Clock> {
        None
    }

    fn as_subcircuit(&self) -> Option<&Subcircuit> {
        None
    }
}

/// Returns the instance data of type `T`, or [SimError::MissingData](crate::SimError::MissingData).
pub fn downcast_data<'a, T: Any>(
    component: &str,
    data: Option<&'a mut InstanceData>,
) -> Result<&'a mut T> {
    data.and_then(|d| (**d).downcast_mut::<T>())
        .ok_or_else(|| crate::SimError::MissingData(component.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Logic;

    #[derive(Debug)]
    struct Counter {
        ports: Vec<Port>,
    }

    impl Component for Counter {
        fn kind(&self) -> &str {
            "counter"
        }
        fn ports(&self) -> &[Port] {
            &self.ports
        }
        fn init_data(&self) -> Option<InstanceData> {
            Some(Box::new(0u64))
        }
        fn propagate(&self, _inputs: &[Value], data: Option<&mut InstanceData>) -> Result<Outputs> {
            let count = downcast_data::<u64>(self.kind(), data)?;
            *count += 1;
            Ok(smallvec::smallvec![Value::from_u64(*count, BitWidth::new(4)?)])
        }
    }

    #[test]
    fn test_private_data() {
        let c = Counter {
            ports: vec![Port::output("q", BitWidth::new(4).unwrap())],
        };
        let mut data = c.init_data();
        c.propagate(&[], data.as_mut()).unwrap();
        let out = c.propagate(&[], data.as_mut()).unwrap();
        assert_eq!(out[0].to_u64(), Some(2));
        assert!(c.as_pin().is_none());
        assert_eq!(
            c.propagate(&[], None),
            Err(crate::SimError::MissingData("counter".into()))
        );
    }

    #[test]
    fn test_port_display() {
        let p = Port::input("d", BitWidth::new(8).unwrap());
        assert!(p.is_input());
        assert_eq!(p.to_string(), "<-d[8]");
        assert_eq!(Value::single(Logic::One).width(), BitWidth::ONE);
    }
}
