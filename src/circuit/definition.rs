use super::handles::*;
use crate::component::{Component, Direction};
use crate::components::{Gate, GateKind, Pin, Subcircuit};
use crate::data_structures::Slab;
use crate::error::{Result, SimError};
use crate::signal::{BitWidth, Logic};
use casey::pascal;
use concat_idents::concat_idents;
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use std::sync::Arc;

use GateKind::*;

/// Creates gatename2 and gatenamex constructors for every gate with a variable number of inputs.
/// The constructors place gates with 2 and x inputs respectively.
macro_rules! gate_constructors {
    ($name:ident,$($rest:ident),*) => {
        gate_constructors!($name);
        gate_constructors!($($rest),*);
    };
    ($name:ident) => {
        concat_idents!(name2 = $name, 2 {
            /// Places a new gate reading nets `a` and `b` and driving net `out`.
            ///
            /// The width of the gate is the width of `out`.
            pub fn name2<S: Into<String>>(
                &mut self,
                name: S,
                a: NetId,
                b: NetId,
                out: NetId,
            ) -> Result<ComponentId> {
                self.place_gate(name, pascal!($name), &[a, b], out)
            }
        });

        concat_idents!(namex = $name, x {
            /// Places a new gate with one input per net in `inputs`, in order, driving net `out`.
            ///
            /// The width of the gate is the width of `out`.
            pub fn namex<S: Into<String>>(
                &mut self,
                name: S,
                inputs: &[NetId],
                out: NetId,
            ) -> Result<ComponentId> {
                self.place_gate(name, pascal!($name), inputs, out)
            }
        });
    };
}

/// Maximal set of connection points joined by wires, every point observes the same resolved value.
#[derive(Debug, Clone)]
pub struct Net {
    name: String,
    width: BitWidth,
    pull: Option<Logic>,
    drivers: IndexSet<PortRef>,
    readers: IndexSet<PortRef>,
}

impl Net {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// Value floating bits are pulled to, if any.
    pub fn pull(&self) -> Option<Logic> {
        self.pull
    }

    /// Output ports driving the net, in connection order.
    pub fn drivers(&self) -> &IndexSet<PortRef> {
        &self.drivers
    }

    /// Input ports reading the net, in connection order.
    pub fn readers(&self) -> &IndexSet<PortRef> {
        &self.readers
    }
}

/// A component placed in a circuit, with the net connected to each of its ports.
#[derive(Debug, Clone)]
pub struct PlacedComponent {
    name: String,
    component: Arc<dyn Component>,
    connections: SmallVec<[Option<NetId>; 4]>,
}

impl PlacedComponent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Net connected to each port, in port order.
    pub fn connections(&self) -> &[Option<NetId>] {
        &self.connections
    }

    pub fn connection(&self, port: usize) -> Option<NetId> {
        self.connections.get(port).copied().flatten()
    }
}

/// Static description of a circuit: placed components, nets, and the wiring between them.
///
/// Every instantiation of the circuit shares the definition, see [StateTree](crate::StateTree)
/// for the runtime side. Every edit bumps the [revision](CircuitDefinition::revision), running
/// simulations catch up at the start of their next step.
///
/// # Example
/// ```
/// # use logicprop::{CircuitDefinition, BitWidth};
/// let mut c = CircuitDefinition::new("half_adder");
/// let w = BitWidth::ONE;
///
/// let a = c.add_net("a", w).unwrap();
/// let b = c.add_net("b", w).unwrap();
/// let sum = c.add_net("sum", w).unwrap();
/// let carry = c.add_net("carry", w).unwrap();
///
/// c.xor2("x", a, b, sum).unwrap();
/// c.and2("c", a, b, carry).unwrap();
///
/// assert_eq!(c.net(a).unwrap().readers().len(), 2);
/// assert_eq!(c.net(sum).unwrap().drivers().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CircuitDefinition {
    name: String,
    components: Slab<PlacedComponent>,
    nets: Slab<Net>,
    component_names: IndexMap<String, ComponentId>,
    net_names: IndexMap<String, NetId>,
    revision: u64,
}

impl CircuitDefinition {
    /// Returns a new empty circuit.
    pub fn new<S: Into<String>>(name: S) -> CircuitDefinition {
        CircuitDefinition {
            name: name.into(),
            components: Slab::new(),
            nets: Slab::new(),
            component_names: Default::default(),
            net_names: Default::default(),
            revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of edits made to the circuit so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Returns the [NetId] of a new net without connections.
    pub fn add_net<S: Into<String>>(&mut self, name: S, width: BitWidth) -> Result<NetId> {
        let name = name.into();
        if self.net_names.contains_key(&name) {
            return Err(SimError::DuplicateName { kind: "net", name });
        }
        let id = NetId(self.nets.insert(Net {
            name: name.clone(),
            width,
            pull: None,
            drivers: Default::default(),
            readers: Default::default(),
        }));
        self.net_names.insert(name, id);
        self.touch();
        Ok(id)
    }

    /// Returns the [ComponentId] of `component` placed with every port unconnected.
    pub fn add_component<S: Into<String>>(
        &mut self,
        name: S,
        component: Arc<dyn Component>,
    ) -> Result<ComponentId> {
        let name = name.into();
        if self.component_names.contains_key(&name) {
            return Err(SimError::DuplicateName {
                kind: "component",
                name,
            });
        }
        let connections = SmallVec::from_elem(None, component.ports().len());
        let id = ComponentId(self.components.insert(PlacedComponent {
            name: name.clone(),
            component,
            connections,
        }));
        self.component_names.insert(name, id);
        self.touch();
        Ok(id)
    }

    /// Places `component` and connects port `i` to `nets[i]`.
    ///
    /// Nothing is placed if `nets` doesn't have one net per port or a width doesn't match.
    pub fn place<S: Into<String>>(
        &mut self,
        name: S,
        component: Arc<dyn Component>,
        nets: &[NetId],
    ) -> Result<ComponentId> {
        let name = name.into();
        let ports = component.ports();
        if nets.len() != ports.len() {
            return Err(SimError::ArityMismatch {
                component: name,
                expected: ports.len(),
                actual: nets.len(),
            });
        }
        for (port, net) in ports.iter().zip(nets) {
            let net = self.nets.get(net.0).ok_or(SimError::Stale("net"))?;
            if net.width != port.width {
                return Err(SimError::WidthMismatch {
                    expected: port.width.get(),
                    actual: net.width.get(),
                });
            }
        }
        let id = self.add_component(name, component)?;
        for (port, net) in nets.iter().enumerate() {
            self.connect(id, port, *net)?;
        }
        Ok(id)
    }

    /// Connects `port` of `component` to `net`, replacing its previous connection.
    pub fn connect(&mut self, component: ComponentId, port: usize, net: NetId) -> Result<()> {
        let placed = self
            .components
            .get(component.0)
            .ok_or(SimError::Stale("component"))?;
        let (direction, width) = match placed.component.ports().get(port) {
            Some(p) => (p.direction, p.width),
            None => {
                return Err(SimError::NoSuchPort {
                    component: placed.name.clone(),
                    port,
                })
            }
        };
        let target = self.nets.get(net.0).ok_or(SimError::Stale("net"))?;
        if target.width != width {
            return Err(SimError::WidthMismatch {
                expected: width.get(),
                actual: target.width.get(),
            });
        }

        self.disconnect(component, port)?;
        let port_ref = PortRef { component, port };
        if let Some(target) = self.nets.get_mut(net.0) {
            match direction {
                Direction::Input => target.readers.insert(port_ref),
                Direction::Output => target.drivers.insert(port_ref),
            };
        }
        if let Some(placed) = self.components.get_mut(component.0) {
            placed.connections[port] = Some(net);
        }
        self.touch();
        Ok(())
    }

    /// Disconnects `port` of `component`, returns the net it was connected to.
    pub fn disconnect(&mut self, component: ComponentId, port: usize) -> Result<Option<NetId>> {
        let placed = self
            .components
            .get_mut(component.0)
            .ok_or(SimError::Stale("component"))?;
        let old = match placed.connections.get_mut(port) {
            Some(slot) => slot.take(),
            None => {
                return Err(SimError::NoSuchPort {
                    component: placed.name.clone(),
                    port,
                })
            }
        };
        if let Some(old) = old {
            if let Some(net) = self.nets.get_mut(old.0) {
                let port_ref = PortRef { component, port };
                net.readers.shift_remove(&port_ref);
                net.drivers.shift_remove(&port_ref);
            }
            self.touch();
        }
        Ok(old)
    }

    /// Removes `component` and all of its connections.
    pub fn remove_component(&mut self, component: ComponentId) -> Result<Arc<dyn Component>> {
        let ports = self
            .components
            .get(component.0)
            .ok_or(SimError::Stale("component"))?
            .connections
            .len();
        for port in 0..ports {
            self.disconnect(component, port)?;
        }
        let placed = self
            .components
            .remove(component.0)
            .ok_or(SimError::Stale("component"))?;
        self.component_names.shift_remove(&placed.name);
        self.touch();
        Ok(placed.component)
    }

    /// Removes `net`, every port connected to it is left unconnected.
    pub fn remove_net(&mut self, net: NetId) -> Result<()> {
        let removed = self.nets.remove(net.0).ok_or(SimError::Stale("net"))?;
        for port_ref in removed.drivers.iter().chain(removed.readers.iter()) {
            if let Some(placed) = self.components.get_mut(port_ref.component.0) {
                placed.connections[port_ref.port] = None;
            }
        }
        self.net_names.shift_remove(&removed.name);
        self.touch();
        Ok(())
    }

    /// Wires `merged` into `keep`: every port of `merged` moves to `keep` and `merged` is removed.
    ///
    /// `keep` inherits the pull of `merged` if it isn't pulled itself.
    pub fn join(&mut self, keep: NetId, merged: NetId) -> Result<NetId> {
        if keep == merged {
            return Ok(keep);
        }
        let keep_width = self.nets.get(keep.0).ok_or(SimError::Stale("net"))?.width;
        let merged_width = self.nets.get(merged.0).ok_or(SimError::Stale("net"))?.width;
        if keep_width != merged_width {
            return Err(SimError::WidthMismatch {
                expected: keep_width.get(),
                actual: merged_width.get(),
            });
        }
        let gone = self.nets.remove(merged.0).ok_or(SimError::Stale("net"))?;
        self.net_names.shift_remove(&gone.name);
        for port_ref in gone.drivers.iter().chain(gone.readers.iter()) {
            if let Some(placed) = self.components.get_mut(port_ref.component.0) {
                placed.connections[port_ref.port] = Some(keep);
            }
        }
        if let Some(net) = self.nets.get_mut(keep.0) {
            net.drivers.extend(gone.drivers);
            net.readers.extend(gone.readers);
            if net.pull.is_none() {
                net.pull = gone.pull;
            }
        }
        self.touch();
        Ok(keep)
    }

    /// Pulls floating bits of `net` to `pull`, or stops pulling them if [None].
    pub fn set_pull(&mut self, net: NetId, pull: Option<Logic>) -> Result<()> {
        self.nets
            .get_mut(net.0)
            .ok_or(SimError::Stale("net"))?
            .pull = pull;
        self.touch();
        Ok(())
    }

    pub fn net(&self, net: NetId) -> Option<&Net> {
        self.nets.get(net.0)
    }

    pub fn component(&self, component: ComponentId) -> Option<&PlacedComponent> {
        self.components.get(component.0)
    }

    pub fn net_id(&self, name: &str) -> Result<NetId> {
        self.net_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownNet(name.into()))
    }

    pub fn component_id(&self, name: &str) -> Result<ComponentId> {
        self.component_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownComponent(name.into()))
    }

    /// Returns an iterator over every net in slot order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets.iter().map(|(i, net)| (NetId(i), net))
    }

    /// Returns an iterator over every component in slot order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &PlacedComponent)> {
        self.components.iter().map(|(i, c)| (ComponentId(i), c))
    }

    /// Returns an iterator over the pins of the circuit in the order they were added.
    pub fn pins(&self) -> impl Iterator<Item = (ComponentId, &str, &Pin)> {
        self.component_names.values().filter_map(move |id| {
            let placed = self.components.get(id.0)?;
            Some((*id, placed.name.as_str(), placed.component.as_pin()?))
        })
    }

    /// Returns an iterator over the subcircuit components of the circuit.
    pub fn subcircuits(&self) -> impl Iterator<Item = (ComponentId, &Subcircuit)> {
        self.components()
            .filter_map(|(id, placed)| Some((id, placed.component.as_subcircuit()?)))
    }

    fn place_gate<S: Into<String>>(
        &mut self,
        name: S,
        kind: GateKind,
        inputs: &[NetId],
        out: NetId,
    ) -> Result<ComponentId> {
        let width = self.nets.get(out.0).ok_or(SimError::Stale("net"))?.width;
        let gate = Gate::new(kind, width, inputs.len())?;
        let nets: SmallVec<[NetId; 4]> = inputs.iter().copied().chain(Some(out)).collect();
        self.place(name, Arc::new(gate), &nets)
    }

    /// Places a new not gate reading `input` and driving `out`.
    pub fn not1<S: Into<String>>(&mut self, name: S, input: NetId, out: NetId) -> Result<ComponentId> {
        self.place_gate(name, Not, &[input], out)
    }

    /// Places a new buffer reading `input` and driving `out`.
    pub fn buffer1<S: Into<String>>(
        &mut self,
        name: S,
        input: NetId,
        out: NetId,
    ) -> Result<ComponentId> {
        self.place_gate(name, Buffer, &[input], out)
    }

    // Create constructors for all gate kinds with a variable number of inputs.
    gate_constructors!(or, nor, and, nand, xor, xnor);

    /// Places an input pin driving `net`, it takes the width of `net`.
    pub fn input_pin<S: Into<String>>(&mut self, name: S, net: NetId) -> Result<ComponentId> {
        let width = self.nets.get(net.0).ok_or(SimError::Stale("net"))?.width;
        self.place(name, Arc::new(Pin::input(width)), &[net])
    }

    /// Places an output pin reading `net`, it takes the width of `net`.
    pub fn output_pin<S: Into<String>>(&mut self, name: S, net: NetId) -> Result<ComponentId> {
        let width = self.nets.get(net.0).ok_or(SimError::Stale("net"))?.width;
        self.place(name, Arc::new(Pin::output(width)), &[net])
    }
}
