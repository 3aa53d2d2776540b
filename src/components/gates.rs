use crate::component::{Attributes, Component, InstanceData, Outputs, Port};
use crate::error::{Result, SimError};
use crate::signal::{BitWidth, Logic, Value};
use smallvec::smallvec;
use strum_macros::{Display, EnumIter, EnumString};

/// Enum representing the different kinds of combinational gates.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum GateKind {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
    Not,
    Buffer,
}
use GateKind::*;

impl GateKind {
    /// Folds the state of one more input into `acc`.
    /// Keep in mind if the gate [is negated](GateKind::is_negated) the result should be negated.
    ///
    /// # Panics
    ///
    /// Panics if `self` is Not or Buffer because those gates only have one input.
    #[inline(always)]
    pub fn accumulate(self, acc: Logic, b: Logic) -> Logic {
        match self {
            Or | Nor => acc.or(b),
            And | Nand => acc.and(b),
            Xor | Xnor => acc.xor(b),
            Not | Buffer => unreachable!("Accumulate only works on gates with multiple inputs"),
        }
    }

    /// Returns the value that doesn't affect the [accumulation](GateKind::accumulate).
    #[inline(always)]
    pub fn init(self) -> Logic {
        match self {
            And | Nand => Logic::One,
            Or | Nor | Xor | Xnor | Not | Buffer => Logic::Zero,
        }
    }

    /// Returns true if a single input can decide the output on its own, a 0 for and gates,
    /// a 1 for or gates.
    ///
    /// Xor gates need the state of every input, so they never short-circuit.
    #[inline(always)]
    pub fn short_circuits(self) -> bool {
        matches!(self, Or | Nor | And | Nand)
    }

    #[inline(always)]
    pub fn is_negated(self) -> bool {
        matches!(self, Nand | Nor | Xnor | Not)
    }

    /// Returns true if the gate has exactly one input.
    pub fn is_unary(self) -> bool {
        matches!(self, Not | Buffer)
    }
}

/// A logic gate of any width, evaluated bit by bit over the [Logic] lattice.
///
/// Floating inputs read as [Logic::X]. A 0 decides an and gate even if other inputs are
/// [Logic::Error], a 1 decides an or gate. Xor gates with more than two inputs compute the parity.
///
/// # Example
/// ```
/// # use logicprop::{Component, Gate, GateKind, Value, BitWidth};
/// let nand = Gate::new(GateKind::Nand, BitWidth::new(2).unwrap(), 2).unwrap();
///
/// let out = nand.propagate(&["11".parse().unwrap(), "1z".parse().unwrap()], None).unwrap();
/// assert_eq!(out[0].to_string(), "0x");
/// ```
#[derive(Debug, Clone)]
pub struct Gate {
    kind: GateKind,
    width: BitWidth,
    ports: Vec<Port>,
}

impl Gate {
    /// Maximum number of inputs of a gate.
    pub const MAX_INPUTS: usize = 32;

    /// Returns a new gate with `inputs` inputs of `width` bits and one output named `out`.
    ///
    /// Unary gates must have exactly one input, the rest between 2 and [Gate::MAX_INPUTS].
    pub fn new(kind: GateKind, width: BitWidth, inputs: usize) -> Result<Gate> {
        let valid = if kind.is_unary() {
            inputs == 1
        } else {
            (2..=Self::MAX_INPUTS).contains(&inputs)
        };
        if !valid {
            return Err(SimError::Attribute {
                name: "inputs".into(),
                reason: format!("a {} gate can't have {} inputs", kind, inputs),
            });
        }
        let mut ports: Vec<Port> = (0..inputs)
            .map(|i| Port::input(format!("in{}", i), width))
            .collect();
        ports.push(Port::output("out", width));
        Ok(Gate { kind, width, ports })
    }

    /// Builds a gate from the `width` and `inputs` attributes.
    pub fn from_attributes(kind: GateKind, attributes: &Attributes) -> Result<Gate> {
        let default_inputs = if kind.is_unary() { 1 } else { 2 };
        let inputs = attributes.int_or("inputs", default_inputs)?;
        Self::new(kind, attributes.width()?, inputs as usize)
    }

    pub fn gate_kind(&self) -> GateKind {
        self.kind
    }

    /// Returns the number of inputs.
    pub fn inputs(&self) -> usize {
        self.ports.len() - 1
    }

    /// Computes bit `i` of the output, stopping early once the result can't change anymore.
    fn fold_bit(&self, inputs: &[Value], i: usize) -> Logic {
        let mut acc = match self.kind {
            Not | Buffer => inputs[0].bits()[i].read(),
            kind => {
                let init = kind.init();
                let short = init.not();
                let mut acc = init;
                for input in inputs {
                    acc = kind.accumulate(acc, input.bits()[i]);
                    if kind.short_circuits() && acc == short {
                        break;
                    }
                }
                acc
            }
        };
        if self.kind.is_negated() {
            acc = acc.not();
        }
        acc
    }
}

impl Component for Gate {
    fn kind(&self) -> &str {
        match self.kind {
            And => "and",
            Or => "or",
            Xor => "xor",
            Nand => "nand",
            Nor => "nor",
            Xnor => "xnor",
            Not => "not",
            Buffer => "buffer",
        }
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn propagate(&self, inputs: &[Value], _data: Option<&mut InstanceData>) -> Result<Outputs> {
        if inputs.len() != self.inputs() {
            return Err(SimError::ArityMismatch {
                component: self.kind().into(),
                expected: self.inputs(),
                actual: inputs.len(),
            });
        }
        for input in inputs {
            input.check_width(self.width)?;
        }
        let out = Value::from_bits((0..self.width.get()).map(|i| self.fold_bit(inputs, i)))?;
        Ok(smallvec![out])
    }
}

/// Buffer with an enable input, drives [Logic::Z] while disabled.
///
/// Ports: `in`, `en` (1 bit) and `out`. An undefined enable drives [Logic::X].
#[derive(Debug, Clone)]
pub struct ControlledBuffer {
    width: BitWidth,
    ports: Vec<Port>,
}

impl ControlledBuffer {
    pub fn new(width: BitWidth) -> ControlledBuffer {
        ControlledBuffer {
            width,
            ports: vec![
                Port::input("in", width),
                Port::input("en", BitWidth::ONE),
                Port::output("out", width),
            ],
        }
    }
}

impl Component for ControlledBuffer {
    fn kind(&self) -> &str {
        "tristate"
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn propagate(&self, inputs: &[Value], _data: Option<&mut InstanceData>) -> Result<Outputs> {
        let (input, enable) = match inputs {
            [input, enable] => (input, enable),
            _ => {
                return Err(SimError::ArityMismatch {
                    component: self.kind().into(),
                    expected: 2,
                    actual: inputs.len(),
                })
            }
        };
        input.check_width(self.width)?;
        enable.check_width(BitWidth::ONE)?;
        let out = match enable.bits()[0].read() {
            Logic::One => Value::from_bits(input.bits().iter().map(|b| b.read()))?,
            Logic::Zero => Value::floating(self.width),
            _ => Value::unknown(self.width),
        };
        Ok(smallvec![out])
    }
}
