use crate::component::{
    downcast_data, Attributes, Component, Edge, InstanceData, Outputs, Port,
};
use crate::error::{Result, SimError};
use crate::signal::{BitWidth, Logic, Value};
use smallvec::smallvec;

/// Private data of a [Register].
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterData {
    pub stored: Value,
    /// Clock level seen by the previous evaluation, used to detect edges.
    pub last_clock: Logic,
}

/// D register.
///
/// Ports in order: `d`, `clk`, `en` if enabled, `clr` if enabled, then the output `q`.
/// `d` is stored on the configured clock [Edge] unless `en` reads 0, `clr` at 1 clears the
/// contents immediately regardless of the clock. Starts at 0.
#[derive(Debug, Clone)]
pub struct Register {
    width: BitWidth,
    edge: Edge,
    enable: bool,
    clear: bool,
    ports: Vec<Port>,
}

impl Register {
    pub fn new(width: BitWidth, edge: Edge, enable: bool, clear: bool) -> Register {
        let mut ports = vec![Port::input("d", width), Port::input("clk", BitWidth::ONE)];
        if enable {
            ports.push(Port::input("en", BitWidth::ONE));
        }
        if clear {
            ports.push(Port::input("clr", BitWidth::ONE));
        }
        ports.push(Port::output("q", width));
        Register {
            width,
            edge,
            enable,
            clear,
            ports,
        }
    }

    /// Builds a register from the `width`, `edge`, `enable` and `clear` attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Register> {
        Ok(Register::new(
            attributes.width()?,
            attributes.edge()?,
            attributes.bool_or("enable", false)?,
            attributes.bool_or("clear", false)?,
        ))
    }

    fn inputs(&self) -> usize {
        self.ports.len() - 1
    }
}

impl Component for Register {
    fn kind(&self) -> &str {
        "register"
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn init_data(&self) -> Option<InstanceData> {
        Some(Box::new(RegisterData {
            stored: Value::zero(self.width),
            last_clock: Logic::X,
        }))
    }

    fn propagate(&self, inputs: &[Value], data: Option<&mut InstanceData>) -> Result<Outputs> {
        if inputs.len() != self.inputs() {
            return Err(SimError::ArityMismatch {
                component: self.kind().into(),
                expected: self.inputs(),
                actual: inputs.len(),
            });
        }
        let data = downcast_data::<RegisterData>(self.kind(), data)?;
        let d = &inputs[0];
        d.check_width(self.width)?;
        let single = |value: &Value| -> Result<Logic> {
            value.check_width(BitWidth::ONE)?;
            Ok(value.bits()[0].read())
        };
        let clock = single(&inputs[1])?;
        let mut rest = inputs[2..].iter();
        let en = if self.enable { rest.next() } else { None };
        let clr = if self.clear { rest.next() } else { None };
        let enabled = match en {
            Some(en) => single(en)? != Logic::Zero,
            None => true,
        };
        let cleared = match clr {
            Some(clr) => single(clr)? == Logic::One,
            None => false,
        };

        if cleared {
            data.stored = Value::zero(self.width);
        } else if enabled && self.edge.is_triggered(data.last_clock, clock) {
            data.stored = d.clone();
        }
        data.last_clock = clock;
        Ok(smallvec![data.stored.clone()])
    }
}
