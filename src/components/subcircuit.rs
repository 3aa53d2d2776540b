use crate::circuit::ComponentId;
use crate::component::{Component, InstanceData, Outputs, Port};
use crate::error::Result;
use crate::signal::Value;
use crate::sim::Circuit;
use smallvec::SmallVec;

/// An instance of another circuit.
///
/// Its ports mirror the pins of the child circuit at the time the component is created: input pins
/// first, then output pins, each group in the order the pins were added. Every state node holding a
/// subcircuit owns a child state node for it, the engine forwards values across the boundary itself
/// so [Component::propagate] is never called.
#[derive(Debug, Clone)]
pub struct Subcircuit {
    circuit: Circuit,
    ports: Vec<Port>,
    pins: Vec<ComponentId>,
}

impl Subcircuit {
    /// Returns a new instance of `circuit`.
    ///
    /// Briefly takes the permit of `circuit`, so it must be created before taking the permit of
    /// the circuit it will be placed into.
    pub fn new(circuit: &Circuit) -> Subcircuit {
        let (inputs, outputs): (Vec<_>, Vec<_>) = circuit.read(|definition| {
            definition
                .pins()
                .map(|(id, name, pin)| {
                    let port = if pin.is_input() {
                        Port::input(name, pin.width())
                    } else {
                        Port::output(name, pin.width())
                    };
                    (id, port)
                })
                .partition(|(_, port)| port.is_input())
        });
        let (pins, ports) = inputs.into_iter().chain(outputs).unzip();
        Subcircuit {
            circuit: circuit.clone(),
            ports,
            pins,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Pin of the child circuit behind each port, in port order.
    pub fn pins(&self) -> &[ComponentId] {
        &self.pins
    }

    /// Returns the port backed by `pin`.
    pub fn port_of(&self, pin: ComponentId) -> Option<usize> {
        self.pins.iter().position(|p| *p == pin)
    }
}

impl Component for Subcircuit {
    fn kind(&self) -> &str {
        self.circuit.name()
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Values cross the boundary through the pins of the child, without delay of their own.
    fn delay(&self) -> u64 {
        0
    }

    fn propagate(&self, _inputs: &[Value], _data: Option<&mut InstanceData>) -> Result<Outputs> {
        Ok(SmallVec::new())
    }

    fn as_subcircuit(&self) -> Option<&Subcircuit> {
        Some(self)
    }
}
