use super::event::{Action, Event, EventQueue};
use super::lock::{enforce, Circuit, PermitSet};
use super::state_tree::{NodeId, StateNode, StateTree};
use crate::circuit::{resolve, CircuitDefinition, ComponentId, NetId, PortRef};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::signal::{Logic, Value};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use smallvec::SmallVec;
use std::collections::VecDeque;
use strum_macros::Display;

type NetKey = (NodeId, NetId);

/// Where the engine is in its per step state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Nothing was drained yet.
    Idle,
    /// A step is draining the event queue.
    Draining,
    /// The last step emptied the queue.
    Converged,
    /// The last step hit the iteration limit.
    Unstable,
    /// Reset, the next step recomputes everything from scratch.
    Reset,
}

/// A net whose value changed during a step, with its value at the end of the step.
#[derive(Debug, Clone, PartialEq)]
pub struct NetDelta {
    /// Full path of the net, see [StateTree::lookup].
    pub path: String,
    pub value: Value,
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Every net settled.
    Converged,
    /// The iteration limit was hit, `nets` still changing at the end were set to error.
    Unstable { nets: Vec<String> },
}

impl StepStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, StepStatus::Converged)
    }
}

/// Outcome of a [Propagator::step].
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub status: StepStatus,
    /// Time slots drained.
    pub iterations: usize,
    /// Events applied.
    pub events: usize,
    /// Events whose target was removed or destroyed before they came due.
    pub dropped: usize,
    /// Nets whose value differs from the one they had before the step, in order of first change.
    pub deltas: Vec<NetDelta>,
}

impl StepReport {
    /// Folds a later step into this one.
    pub(crate) fn absorb(&mut self, later: StepReport) {
        if self.status.is_converged() {
            self.status = later.status;
        }
        self.iterations += later.iterations;
        self.events += later.events;
        self.dropped += later.dropped;
        for delta in later.deltas {
            match self.deltas.iter_mut().find(|d| d.path == delta.path) {
                Some(earlier) => earlier.value = delta.value,
                None => self.deltas.push(delta),
            }
        }
    }
}

/// Discrete event engine driving a [StateTree] to quiescence.
///
/// Every [step](Propagator::step) drains the queue one time slot at a time. A slot applies every
/// event due at that time as one batch: driven values are stored, the nets they touch are
/// resolved, and every component reading a net that changed is evaluated, scheduling the values
/// of its outputs [delay](crate::Component::delay) slots later. The step converges when the queue
/// is empty and gives up after [SimConfig::iteration_limit] slots, whatever the size of the circuit.
///
/// # Example
/// ```
/// # use logicprop::{LockManager, CircuitDefinition, Propagator, SimConfig, BitWidth, Logic, StepStatus, with_hierarchy};
/// let mut c = CircuitDefinition::new("ring");
/// let a = c.add_net("a", BitWidth::ONE).unwrap();
/// c.set_pull(a, Some(Logic::Zero)).unwrap();
/// c.not1("n", a, a).unwrap();
/// let ring = LockManager::new().register(c);
///
/// let report = with_hierarchy(&ring, |permits| {
///     let mut engine = Propagator::new(permits, SimConfig::default(), &ring)?;
///     engine.step(permits)
/// })
/// .unwrap();
///
/// assert_eq!(report.status, StepStatus::Unstable { nets: vec!["a".into()] });
/// assert_eq!(report.iterations, 1000);
/// ```
#[derive(Debug)]
pub struct Propagator {
    tree: StateTree,
    queue: EventQueue,
    root: NodeId,
    time: u64,
    phase: Phase,
    config: SimConfig,
    /// Nodes whose nets and components are all recomputed at the start of the next step.
    stale: IndexSet<NodeId>,
}

impl Propagator {
    /// Instantiates `circuit`, nothing is computed before the first step.
    pub fn new(permits: &PermitSet<'_>, config: SimConfig, circuit: &Circuit) -> Result<Propagator> {
        let mut tree = StateTree::new();
        let root = tree.create_root(permits, &config, circuit)?;
        let stale = tree.subtree(root).into_iter().collect();
        Ok(Propagator {
            tree,
            queue: EventQueue::new(),
            root,
            time: 0,
            phase: Phase::Idle,
            config,
            stale,
        })
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Time of the last drained slot.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of events waiting for the next step.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Schedules `action` on `component` of `node` in the current time slot.
    pub fn schedule(&mut self, node: NodeId, component: ComponentId, action: Action) {
        self.queue.push(self.time, node, component, action);
    }

    /// Schedules a toggle of every clock of every node, returns how many there are.
    pub fn toggle_clocks(&mut self) -> usize {
        let clocks: Vec<(NodeId, ComponentId)> = self
            .tree
            .nodes()
            .flat_map(|(node, state)| {
                state
                    .components()
                    .filter(|(_, c)| c.as_clock().is_some())
                    .map(move |(component, _)| (node, component))
            })
            .collect();
        for (node, component) in clocks.iter() {
            self.schedule(*node, *component, Action::Toggle);
        }
        clocks.len()
    }

    /// Overwrites the value of `net` in `node` and schedules every component reading it.
    pub fn poke(
        &mut self,
        permits: &PermitSet<'_>,
        node: NodeId,
        net: NetId,
        value: Value,
    ) -> Result<()> {
        self.tree.set_value(permits, &self.config, node, net, value)?;
        let definition = self.definition(permits, node)?;
        let net = definition.net(net).ok_or(SimError::Stale("net"))?;
        for reader in net.readers() {
            self.schedule(node, reader.component, Action::Recompute);
        }
        Ok(())
    }

    /// Discards every pending event, sets every net undefined and every component back to its
    /// initial data.
    ///
    /// Needs no permit: everything is recomputed at the start of the next step.
    pub fn reset(&mut self) {
        let discarded = self.queue.clear();
        self.tree.reset();
        self.time = 0;
        self.stale = self.tree.subtree(self.root).into_iter().collect();
        self.phase = Phase::Reset;
        debug!("reset, {} pending events discarded", discarded);
    }

    /// Catches up with structural edits, then drains the queue until the circuit settles or the
    /// iteration limit is hit.
    ///
    /// `permits` must hold every circuit of the hierarchy, see [with_hierarchy](crate::with_hierarchy).
    pub fn step(&mut self, permits: &PermitSet<'_>) -> Result<StepReport> {
        let result = self.drain_all(permits);
        if result.is_err() {
            self.phase = Phase::Idle;
        }
        result
    }

    fn drain_all(&mut self, permits: &PermitSet<'_>) -> Result<StepReport> {
        for node in self.tree.subtree(self.root) {
            let refresh = self.tree.sync(permits, &self.config, node)?;
            self.stale.extend(refresh);
        }

        let mut changes: IndexMap<NetKey, Value> = IndexMap::new();
        for node in std::mem::take(&mut self.stale) {
            if self.tree.contains(node) {
                self.refresh(permits, node, &mut changes)?;
            }
        }

        self.phase = Phase::Draining;
        let mut window: VecDeque<IndexSet<NetKey>> = VecDeque::new();
        let mut iterations = 0;
        let mut events = 0;
        let mut dropped = 0;
        let mut status = StepStatus::Converged;
        while let Some(time) = self.queue.next_time() {
            if iterations >= self.config.iteration_limit {
                status = self.give_up(&window, &mut changes);
                break;
            }
            self.time = time;
            let batch = self.queue.pop_batch();
            iterations += 1;
            events += batch.len();
            trace!("draining {} events at time {}", batch.len(), time);
            let changed = self.drain(permits, batch, &mut changes, &mut dropped)?;
            if window.len() == self.config.oscillation_window {
                window.pop_front();
            }
            window.push_back(changed);
        }

        self.phase = match status {
            StepStatus::Converged => Phase::Converged,
            StepStatus::Unstable { .. } => Phase::Unstable,
        };
        let tree = &self.tree;
        let deltas = changes
            .into_iter()
            .filter_map(|((node, net), old)| {
                let state = tree.node(node).ok()?;
                let value = state.value(net)?;
                if *value == old {
                    return None;
                }
                Some(NetDelta {
                    path: state.net_path(net)?,
                    value: value.clone(),
                })
            })
            .collect::<Vec<_>>();
        debug!(
            "step ended in phase {} at time {}: {} slots, {} events, {} dropped, {} nets changed",
            self.phase,
            self.time,
            iterations,
            events,
            dropped,
            deltas.len()
        );
        Ok(StepReport {
            status,
            iterations,
            events,
            dropped,
            deltas,
        })
    }

    fn definition<'p>(
        &self,
        permits: &'p PermitSet<'_>,
        node: NodeId,
    ) -> Result<&'p CircuitDefinition> {
        let state = self.tree.node(node)?;
        enforce(&self.config, permits.definition(state.circuit()))
    }

    /// Resolves every net of `node` and schedules every component of it.
    fn refresh(
        &mut self,
        permits: &PermitSet<'_>,
        node: NodeId,
        changes: &mut IndexMap<NetKey, Value>,
    ) -> Result<()> {
        let definition = self.definition(permits, node)?;
        for (net, _) in definition.nets() {
            self.resolve_net(permits, node, net, changes)?;
        }
        let state = self.tree.node(node)?;
        for (component, _) in state.components() {
            self.queue.push(self.time, node, component, Action::Recompute);
        }
        Ok(())
    }

    /// Recomputes the value of `net` from its drivers, returns true if it changed.
    fn resolve_net(
        &mut self,
        permits: &PermitSet<'_>,
        node: NodeId,
        net: NetId,
        changes: &mut IndexMap<NetKey, Value>,
    ) -> Result<bool> {
        let definition = self.definition(permits, node)?;
        let net_def = match definition.net(net) {
            Some(net_def) => net_def,
            None => return Ok(false),
        };
        let state = self.tree.node_mut(node)?;
        let resolved = resolve(
            net_def.width(),
            net_def.pull(),
            net_def
                .drivers()
                .iter()
                .filter_map(|port| state.driven.get(port)),
        )?;
        Ok(write_net(state, node, net, resolved, changes))
    }

    /// Applies one time slot, returns the nets that changed.
    fn drain(
        &mut self,
        permits: &PermitSet<'_>,
        batch: Vec<Event>,
        changes: &mut IndexMap<NetKey, Value>,
        dropped: &mut usize,
    ) -> Result<IndexSet<NetKey>> {
        let mut touched: IndexSet<NetKey> = IndexSet::new();
        let mut dirty: IndexSet<(NodeId, ComponentId)> = IndexSet::new();

        for Event {
            node,
            component,
            action,
            ..
        } in batch
        {
            let target = match self.tree.node(node).ok().and_then(|s| s.component(component)) {
                Some(target) => target.clone(),
                None => {
                    *dropped += 1;
                    continue;
                }
            };
            match action {
                Action::Drive { port, value } => {
                    let net = self
                        .definition(permits, node)?
                        .component(component)
                        .and_then(|placed| placed.connection(port));
                    self.tree
                        .node_mut(node)?
                        .driven
                        .insert(PortRef { component, port }, value);
                    if let Some(net) = net {
                        touched.insert((node, net));
                    }
                }
                Action::Recompute => {
                    dirty.insert((node, component));
                }
                Action::Input(value) => match target.as_pin() {
                    Some(pin) => {
                        let state = self.tree.node_mut(node)?;
                        pin.set(state.data.get_mut(&component), value)?;
                        dirty.insert((node, component));
                    }
                    None => *dropped += 1,
                },
                Action::Toggle => match target.as_clock() {
                    Some(clock) => {
                        let state = self.tree.node_mut(node)?;
                        clock.toggle(state.data.get_mut(&component))?;
                        dirty.insert((node, component));
                    }
                    None => *dropped += 1,
                },
            }
        }

        let mut changed = IndexSet::new();
        for (node, net) in touched {
            if self.resolve_net(permits, node, net, changes)? {
                changed.insert((node, net));
            }
        }
        for (node, net) in changed.iter() {
            if let Some(net) = self.definition(permits, *node)?.net(*net) {
                for reader in net.readers() {
                    dirty.insert((*node, reader.component));
                }
            }
        }
        for (node, component) in dirty {
            self.evaluate(permits, node, component)?;
        }
        Ok(changed)
    }

    /// Runs `component` of `node` on the current values of its input nets.
    fn evaluate(&mut self, permits: &PermitSet<'_>, node: NodeId, component: ComponentId) -> Result<()> {
        let definition = self.definition(permits, node)?;
        let placed = match definition.component(component) {
            Some(placed) => placed,
            None => return Ok(()),
        };
        let target = placed.component().clone();
        let state = self.tree.node(node)?;
        // Until a component has driven a net it also reads, unknown bits of that net read as 0.
        let unseeded = |net: NetId| {
            definition.net(net).map_or(false, |net| {
                net.drivers()
                    .iter()
                    .any(|port| port.component == component && !state.driven.contains_key(port))
            })
        };
        let inputs: SmallVec<[Value; 4]> = target
            .ports()
            .iter()
            .enumerate()
            .filter(|(_, port)| port.is_input())
            .map(|(i, port)| match placed.connection(i) {
                Some(net) => {
                    let value = state
                        .value(net)
                        .cloned()
                        .unwrap_or_else(|| Value::floating(port.width));
                    if unseeded(net) {
                        value.defined_or(Logic::Zero)
                    } else {
                        value
                    }
                }
                None => Value::floating(port.width),
            })
            .collect();
        let parent = state.parent();

        if let Some(sub) = target.as_subcircuit() {
            // Inputs cross into the child in the same slot, through its input pins.
            if let Some(child) = state.child(component) {
                for (pin, value) in sub.pins().iter().zip(inputs) {
                    self.queue.push(self.time, child, *pin, Action::Input(value));
                }
            }
            return Ok(());
        }

        let state = self.tree.node_mut(node)?;
        let outputs = target.propagate(&inputs, state.data.get_mut(&component))?;

        if let (Some(pin), Some((parent, instance))) = (target.as_pin(), parent) {
            if !pin.is_input() {
                if let Some(value) = inputs.into_iter().next() {
                    self.forward(permits, parent, instance, component, value)?;
                }
            }
        }

        let output_ports: SmallVec<[usize; 2]> = target
            .ports()
            .iter()
            .enumerate()
            .filter(|(_, port)| port.is_output())
            .map(|(i, _)| i)
            .collect();
        if outputs.len() != output_ports.len() {
            return Err(SimError::ArityMismatch {
                component: placed.name().into(),
                expected: output_ports.len(),
                actual: outputs.len(),
            });
        }
        let at = self.time + target.delay();
        for (port, value) in output_ports.into_iter().zip(outputs) {
            value.check_width(target.ports()[port].width)?;
            self.queue
                .push(at, node, component, Action::Drive { port, value });
        }
        Ok(())
    }

    /// Drives the value an output pin of a child node sees onto the matching port of the
    /// subcircuit `instance` in `parent`.
    fn forward(
        &mut self,
        permits: &PermitSet<'_>,
        parent: NodeId,
        instance: ComponentId,
        pin: ComponentId,
        value: Value,
    ) -> Result<()> {
        let port = self
            .definition(permits, parent)?
            .component(instance)
            .and_then(|placed| placed.component().as_subcircuit())
            .and_then(|sub| sub.port_of(pin));
        if let Some(port) = port {
            self.queue
                .push(self.time, parent, instance, Action::Drive { port, value });
        }
        Ok(())
    }

    /// Marks every net that changed in the oscillation window as error and discards pending events.
    fn give_up(
        &mut self,
        window: &VecDeque<IndexSet<NetKey>>,
        changes: &mut IndexMap<NetKey, Value>,
    ) -> StepStatus {
        let implicated: IndexSet<NetKey> = window.iter().flatten().copied().collect();
        let mut nets = Vec::with_capacity(implicated.len());
        for (node, net) in implicated {
            let state = match self.tree.node_mut(node) {
                Ok(state) => state,
                Err(_) => continue,
            };
            let width = match state.value(net) {
                Some(value) => value.width(),
                None => continue,
            };
            write_net(state, node, net, Value::error(width), changes);
            if let Some(path) = state.net_path(net) {
                nets.push(path);
            }
        }
        let discarded = self.queue.clear();
        warn!(
            "circuit didn't settle after {} time slots, {} nets set to error and {} events discarded: {}",
            self.config.iteration_limit,
            nets.len(),
            discarded,
            nets.join(", ")
        );
        StepStatus::Unstable { nets }
    }
}

/// Stores `value` as the value of `net`, remembering the value it had before the step.
fn write_net(
    state: &mut StateNode,
    node: NodeId,
    net: NetId,
    value: Value,
    changes: &mut IndexMap<NetKey, Value>,
) -> bool {
    match state.values.get_mut(&net) {
        Some(current) if *current != value => {
            let old = std::mem::replace(current, value);
            changes.entry((node, net)).or_insert(old);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitDefinition;
    use crate::components::Subcircuit;
    use crate::signal::BitWidth;
    use crate::sim::{with_hierarchy, LockManager};
    use std::sync::Arc;

    fn step(engine: &mut Propagator, circuit: &Circuit) -> StepReport {
        with_hierarchy(circuit, |permits| engine.step(permits)).unwrap()
    }

    fn engine(circuit: &Circuit, config: SimConfig) -> Propagator {
        with_hierarchy(circuit, |permits| Propagator::new(permits, config, circuit)).unwrap()
    }

    fn value(engine: &Propagator, path: &str) -> String {
        let (node, net) = engine.tree().lookup(engine.root(), path).unwrap();
        engine.tree().value(node, net).unwrap().to_string()
    }

    #[test]
    fn test_buffer_chain_delays() {
        let mut c = CircuitDefinition::new("chain");
        let nets: Vec<NetId> = (0..4)
            .map(|i| c.add_net(format!("n{}", i), BitWidth::ONE).unwrap())
            .collect();
        c.input_pin("in", nets[0]).unwrap();
        for i in 0..3 {
            c.buffer1(format!("b{}", i), nets[i], nets[i + 1]).unwrap();
        }
        let circuit = LockManager::new().register(c);
        let mut engine = engine(&circuit, SimConfig::default());
        assert_eq!(value(&engine, "n3"), "x");

        let report = step(&mut engine, &circuit);
        assert!(report.status.is_converged());
        assert_eq!(value(&engine, "n3"), "0");
        assert_eq!(engine.time(), 4);
        assert_eq!(engine.phase(), Phase::Converged);
        let paths: Vec<&str> = report.deltas.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["n0", "n1", "n2", "n3"]);

        // Nothing left to do.
        let report = step(&mut engine, &circuit);
        assert_eq!(report.iterations, 0);
        assert!(report.deltas.is_empty());
    }

    #[test]
    fn test_inverter_ring_is_unstable() {
        let mut c = CircuitDefinition::new("ring");
        let a = c.add_net("a", BitWidth::ONE).unwrap();
        let b = c.add_net("b", BitWidth::ONE).unwrap();
        c.not1("n", a, a).unwrap();
        c.input_pin("quiet", b).unwrap();
        let circuit = LockManager::new().register(c);
        let config = SimConfig::default().with_iteration_limit(50);
        let mut engine = engine(&circuit, config);

        let report = step(&mut engine, &circuit);
        assert_eq!(report.status, StepStatus::Unstable { nets: vec!["a".into()] });
        assert_eq!(report.iterations, 50);
        assert_eq!(value(&engine, "a"), "E");
        assert_eq!(value(&engine, "b"), "0");
        assert_eq!(engine.pending(), 0);
        assert_eq!(engine.phase(), Phase::Unstable);

        // Error is absorbing, nothing is left to drain.
        assert!(step(&mut engine, &circuit).status.is_converged());
        assert_eq!(value(&engine, "a"), "E");

        // Defined values oscillate again.
        with_hierarchy(&circuit, |permits| {
            let (node, net) = engine.tree().lookup(engine.root(), "a").unwrap();
            engine.poke(permits, node, net, Value::single(Logic::One))
        })
        .unwrap();
        assert!(!step(&mut engine, &circuit).status.is_converged());

        // So does a ring after a reset.
        engine.reset();
        assert_eq!(value(&engine, "a"), "x");
        assert!(!step(&mut engine, &circuit).status.is_converged());
        assert_eq!(value(&engine, "a"), "E");
    }

    #[test]
    fn test_feedback_through_other_gates_is_not_seeded() {
        let mut c = CircuitDefinition::new("latch");
        let w = BitWidth::ONE;
        let (r, s, q, nq) = (
            c.add_net("r", w).unwrap(),
            c.add_net("s", w).unwrap(),
            c.add_net("q", w).unwrap(),
            c.add_net("nq", w).unwrap(),
        );
        c.nor2("top", r, nq, q).unwrap();
        c.nor2("bottom", s, q, nq).unwrap();
        let circuit = LockManager::new().register(c);
        let mut engine = engine(&circuit, SimConfig::default());

        // Floating set and reset read as unknown, the latch holds an unknown state.
        assert!(step(&mut engine, &circuit).status.is_converged());
        assert_eq!(value(&engine, "q"), "x");
        assert_eq!(value(&engine, "nq"), "x");
    }

    #[test]
    fn test_removed_component_events_are_dropped() {
        let mut c = CircuitDefinition::new("c");
        let a = c.add_net("a", BitWidth::ONE).unwrap();
        let b = c.add_net("b", BitWidth::ONE).unwrap();
        let n = c.not1("n", a, b).unwrap();
        let circuit = LockManager::new().register(c);
        let mut engine = engine(&circuit, SimConfig::default());
        step(&mut engine, &circuit);

        let root = engine.root();
        engine.schedule(root, n, Action::Recompute);
        circuit.mutate(|c| c.remove_component(n)).unwrap();
        let report = step(&mut engine, &circuit);
        assert_eq!(report.dropped, 1);
        assert!(report.status.is_converged());
        assert_eq!(value(&engine, "b"), "z");
    }

    #[test]
    fn test_destroyed_node_events_are_dropped() {
        let locks = LockManager::new();
        let mut inner = CircuitDefinition::new("inner");
        let x = inner.add_net("x", BitWidth::ONE).unwrap();
        let y = inner.add_net("y", BitWidth::ONE).unwrap();
        inner.not1("n", x, y).unwrap();
        let inner = locks.register(inner);

        let mut c = CircuitDefinition::new("outer");
        let s = c
            .add_component("s", Arc::new(Subcircuit::new(&inner)))
            .unwrap();
        let circuit = locks.register(c);
        let mut engine = engine(&circuit, SimConfig::default());
        step(&mut engine, &circuit);
        assert_eq!(engine.tree().len(), 2);

        with_hierarchy(&circuit, |permits| {
            let (node, net) = engine.tree().lookup(engine.root(), "s/x").unwrap();
            engine.poke(permits, node, net, Value::single(Logic::One))
        })
        .unwrap();
        assert_eq!(engine.pending(), 1);
        circuit.mutate(|c| c.remove_component(s)).unwrap();

        let report = step(&mut engine, &circuit);
        assert!(report.dropped >= 1);
        assert!(report.status.is_converged());
        assert_eq!(engine.tree().len(), 1);
        assert!(engine.tree().lookup(engine.root(), "s/x").is_err());
    }

    #[test]
    fn test_reset() {
        let mut c = CircuitDefinition::new("c");
        let a = c.add_net("a", BitWidth::ONE).unwrap();
        c.place("k", std::sync::Arc::new(crate::components::Constant::new(Value::single(Logic::One))), &[a])
            .unwrap();
        let circuit = LockManager::new().register(c);
        let mut engine = engine(&circuit, SimConfig::default());
        step(&mut engine, &circuit);
        assert_eq!(value(&engine, "a"), "1");

        engine.toggle_clocks();
        let root = engine.root();
        let k = engine.tree().node(root).unwrap().component_id("k").unwrap();
        engine.schedule(root, k, Action::Recompute);
        engine.reset();
        assert_eq!(engine.pending(), 0);
        assert_eq!(engine.phase(), Phase::Reset);
        assert_eq!(value(&engine, "a"), "x");
        assert_eq!(engine.time(), 0);

        step(&mut engine, &circuit);
        assert_eq!(value(&engine, "a"), "1");
    }

    #[test]
    fn test_absorb() {
        let mut first = StepReport {
            status: StepStatus::Converged,
            iterations: 2,
            events: 3,
            dropped: 0,
            deltas: vec![NetDelta {
                path: "a".into(),
                value: Value::single(Logic::One),
            }],
        };
        first.absorb(StepReport {
            status: StepStatus::Unstable { nets: vec![] },
            iterations: 1,
            events: 1,
            dropped: 1,
            deltas: vec![
                NetDelta {
                    path: "a".into(),
                    value: Value::single(Logic::Zero),
                },
                NetDelta {
                    path: "b".into(),
                    value: Value::single(Logic::Zero),
                },
            ],
        });
        assert!(!first.status.is_converged());
        assert_eq!(first.iterations, 3);
        assert_eq!(first.deltas.len(), 2);
        assert_eq!(first.deltas[0].value, Value::single(Logic::Zero));
    }
}
