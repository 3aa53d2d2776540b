use crate::component::{
    downcast_data, Attributes, Component, Direction, InstanceData, Outputs, Port,
};
use crate::error::Result;
use crate::signal::{BitWidth, Value};
use smallvec::{smallvec, SmallVec};

/// Private data of a [Pin]: the value an input pin drives, or the last value an output pin observed.
#[derive(Debug, Clone, PartialEq)]
pub struct PinData {
    pub value: Value,
}

/// Boundary of a circuit.
///
/// Input pins drive the value stored in their [PinData], initially all 0. At the top of the hierarchy
/// the value is set with [Simulation::set_input](crate::Simulation::set_input), inside a subcircuit
/// it is forwarded from the port of the parent's subcircuit component.
///
/// Output pins read their net, inside a subcircuit the value is driven onto the matching port of the
/// parent's subcircuit component.
#[derive(Debug, Clone)]
pub struct Pin {
    direction: Direction,
    width: BitWidth,
    ports: [Port; 1],
}

impl Pin {
    /// Returns an input pin, it has a single output port `out`.
    pub fn input(width: BitWidth) -> Pin {
        Pin {
            direction: Direction::Input,
            width,
            ports: [Port::output("out", width)],
        }
    }

    /// Returns an output pin, it has a single input port `in`.
    pub fn output(width: BitWidth) -> Pin {
        Pin {
            direction: Direction::Output,
            width,
            ports: [Port::input("in", width)],
        }
    }

    /// Builds a pin from the `width` and `output` attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Pin> {
        let width = attributes.width()?;
        Ok(if attributes.bool_or("output", false)? {
            Pin::output(width)
        } else {
            Pin::input(width)
        })
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// Stores `value` as the value of the pin.
    pub fn set(&self, data: Option<&mut InstanceData>, value: Value) -> Result<()> {
        value.check_width(self.width)?;
        downcast_data::<PinData>(self.kind(), data)?.value = value;
        Ok(())
    }
}

impl Component for Pin {
    fn kind(&self) -> &str {
        "pin"
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn init_data(&self) -> Option<InstanceData> {
        let value = if self.is_input() {
            Value::zero(self.width)
        } else {
            Value::unknown(self.width)
        };
        Some(Box::new(PinData { value }))
    }

    fn propagate(&self, inputs: &[Value], data: Option<&mut InstanceData>) -> Result<Outputs> {
        let data = downcast_data::<PinData>(self.kind(), data)?;
        if self.is_input() {
            return Ok(smallvec![data.value.clone()]);
        }
        if let [input] = inputs {
            input.check_width(self.width)?;
            data.value = input.clone();
        }
        Ok(SmallVec::new())
    }

    fn as_pin(&self) -> Option<&Pin> {
        Some(self)
    }
}
