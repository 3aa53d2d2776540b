use super::lock::{enforce, Circuit, PermitSet};
use crate::circuit::{CircuitDefinition, ComponentId, NetId, PortRef};
use crate::component::{Component, InstanceData};
use crate::config::SimConfig;
use crate::data_structures::{Slab, SlabIndex};
use crate::error::{Result, SimError};
use crate::signal::Value;
use indexmap::IndexMap;
use log::debug;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Deepest nesting of subcircuit instances, a circuit that contains itself stops here.
pub const MAX_NESTING: usize = 32;

/// Identifies a [StateNode] in a [StateTree].
///
/// Ids of destroyed nodes never match a later node.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NodeId(SlabIndex);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Runtime state of one instantiation of a circuit.
///
/// Mirrors the [CircuitDefinition] it was created from at [StateNode::revision]: one value per
/// net, one value per driven output port, private data per component and one child node per
/// subcircuit component.
#[derive(Debug)]
pub struct StateNode {
    circuit: Circuit,
    parent: Option<(NodeId, ComponentId)>,
    path: String,
    depth: usize,
    revision: u64,
    pub(crate) values: IndexMap<NetId, Value>,
    pub(crate) driven: IndexMap<PortRef, Value>,
    pub(crate) data: IndexMap<ComponentId, InstanceData>,
    components: IndexMap<ComponentId, Arc<dyn Component>>,
    children: IndexMap<ComponentId, NodeId>,
    net_names: IndexMap<NetId, String>,
    component_names: IndexMap<ComponentId, String>,
}

impl StateNode {
    fn new(
        circuit: &Circuit,
        parent: Option<(NodeId, ComponentId)>,
        path: String,
        depth: usize,
    ) -> StateNode {
        StateNode {
            circuit: circuit.clone(),
            parent,
            path,
            depth,
            revision: 0,
            values: Default::default(),
            driven: Default::default(),
            data: Default::default(),
            components: Default::default(),
            children: Default::default(),
            net_names: Default::default(),
            component_names: Default::default(),
        }
    }

    /// Brings nets, components and names up to date with `definition`, children excluded.
    ///
    /// State of nets and components that still exist is kept.
    fn load(&mut self, definition: &CircuitDefinition) {
        self.values.retain(|net, _| definition.net(*net).is_some());
        self.components
            .retain(|component, _| definition.component(*component).is_some());
        let components = &self.components;
        self.data.retain(|component, _| components.contains_key(component));
        self.driven
            .retain(|port, _| components.contains_key(&port.component));

        self.net_names.clear();
        for (id, net) in definition.nets() {
            self.values
                .entry(id)
                .or_insert_with(|| Value::unknown(net.width()));
            self.net_names.insert(id, net.name().into());
        }
        self.component_names.clear();
        for (id, placed) in definition.components() {
            if !self.components.contains_key(&id) {
                let component = placed.component().clone();
                if let Some(data) = component.init_data() {
                    self.data.insert(id, data);
                }
                self.components.insert(id, component);
            }
            self.component_names.insert(id, placed.name().into());
        }
        self.revision = definition.revision();
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Parent node and the subcircuit component this node instantiates, [None] for a root.
    pub fn parent(&self) -> Option<(NodeId, ComponentId)> {
        self.parent
    }

    /// Component names leading from the root to this node, joined by `/`. Empty for a root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Revision of the definition the node last caught up with.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn value(&self, net: NetId) -> Option<&Value> {
        self.values.get(&net)
    }

    /// Returns an iterator over the value of every net, in definition order.
    pub fn values(&self) -> impl Iterator<Item = (NetId, &Value)> {
        self.values.iter().map(|(id, value)| (*id, value))
    }

    /// Value `port` currently asserts, [None] if it never drove anything.
    pub fn driven(&self, port: PortRef) -> Option<&Value> {
        self.driven.get(&port)
    }

    pub fn data(&self, component: ComponentId) -> Option<&InstanceData> {
        self.data.get(&component)
    }

    pub fn component(&self, component: ComponentId) -> Option<&Arc<dyn Component>> {
        self.components.get(&component)
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Arc<dyn Component>)> {
        self.components.iter().map(|(id, c)| (*id, c))
    }

    pub fn child(&self, component: ComponentId) -> Option<NodeId> {
        self.children.get(&component).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (ComponentId, NodeId)> + '_ {
        self.children.iter().map(|(c, n)| (*c, *n))
    }

    pub fn net_id(&self, name: &str) -> Option<NetId> {
        self.net_names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.component_names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn net_name(&self, net: NetId) -> Option<&str> {
        self.net_names.get(&net).map(String::as_str)
    }

    pub fn component_name(&self, component: ComponentId) -> Option<&str> {
        self.component_names.get(&component).map(String::as_str)
    }

    /// Full path of `net`, `path/name`.
    pub fn net_path(&self, net: NetId) -> Option<String> {
        let name = self.net_name(net)?;
        Some(join_path(&self.path, name))
    }

    /// Returns an iterator over the name and value of every net, in definition order.
    pub fn named_values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.net_names
            .iter()
            .filter_map(move |(id, name)| Some((name.as_str(), self.values.get(id)?)))
    }

    /// Forgets every value and puts every component back in its initial state.
    fn reset(&mut self) {
        for value in self.values.values_mut() {
            *value = Value::unknown(value.width());
        }
        self.driven.clear();
        self.data.clear();
        for (id, component) in self.components.iter() {
            if let Some(data) = component.init_data() {
                self.data.insert(*id, data);
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Every instantiation of the circuits of a simulation.
///
/// Each root node instantiates a circuit, each node owns one child node per subcircuit component
/// of its circuit. Two instances of the same circuit share its definition but never their state.
///
/// # Example
/// ```
/// # use logicprop::{LockManager, CircuitDefinition, Subcircuit, StateTree, SimConfig, BitWidth, with_hierarchy};
/// # use std::sync::Arc;
/// let locks = LockManager::new();
/// let mut inner = CircuitDefinition::new("inner");
/// let a = inner.add_net("a", BitWidth::ONE).unwrap();
/// inner.input_pin("a", a).unwrap();
/// let inner = locks.register(inner);
///
/// let top = locks.register(CircuitDefinition::new("top"));
/// let sub = Arc::new(Subcircuit::new(&inner));
/// top.mutate(|c| c.add_component("left", sub.clone())).unwrap();
/// top.mutate(|c| c.add_component("right", sub)).unwrap();
///
/// let mut tree = StateTree::new();
/// let root = with_hierarchy(&top, |permits| {
///     tree.create_root(permits, &SimConfig::default(), &top)
/// })
/// .unwrap();
///
/// assert_eq!(tree.len(), 3);
/// let (node, net) = tree.lookup(root, "right/a").unwrap();
/// assert_eq!(tree.node(node).unwrap().path(), "right");
/// assert_eq!(tree.value(node, net).unwrap().to_string(), "x");
/// ```
#[derive(Debug, Default)]
pub struct StateTree {
    nodes: Slab<StateNode>,
}

impl StateTree {
    pub fn new() -> StateTree {
        Default::default()
    }

    /// Instantiates `circuit` and, recursively, every subcircuit in it.
    pub fn create_root(
        &mut self,
        permits: &PermitSet<'_>,
        config: &SimConfig,
        circuit: &Circuit,
    ) -> Result<NodeId> {
        self.instantiate(permits, config, circuit, None, String::new(), 0)
    }

    /// Instantiates the subcircuit `component` of `parent` below it.
    pub fn create_child(
        &mut self,
        permits: &PermitSet<'_>,
        config: &SimConfig,
        parent: NodeId,
        component: ComponentId,
    ) -> Result<NodeId> {
        let parent_node = self.node(parent)?;
        let definition = enforce(config, permits.definition(parent_node.circuit()))?;
        let placed = definition
            .component(component)
            .ok_or(SimError::Stale("component"))?;
        let sub = placed
            .component()
            .as_subcircuit()
            .ok_or_else(|| SimError::UnknownCircuit(placed.name().into()))?;
        let depth = parent_node.depth + 1;
        if depth > MAX_NESTING {
            return Err(SimError::Recursion(sub.circuit().name().into(), MAX_NESTING));
        }
        let path = join_path(&parent_node.path, placed.name());
        if let Some(old) = parent_node.child(component) {
            self.destroy(old);
        }
        let child = self.instantiate(
            permits,
            config,
            sub.circuit(),
            Some((parent, component)),
            path,
            depth,
        )?;
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.insert(component, child);
        }
        Ok(child)
    }

    fn instantiate(
        &mut self,
        permits: &PermitSet<'_>,
        config: &SimConfig,
        circuit: &Circuit,
        parent: Option<(NodeId, ComponentId)>,
        path: String,
        depth: usize,
    ) -> Result<NodeId> {
        let definition = enforce(config, permits.definition(circuit))?;
        let mut node = StateNode::new(circuit, parent, path, depth);
        node.load(definition);
        let id = NodeId(self.nodes.insert(node));
        debug!("instantiated `{}` as {} at depth {}", circuit.name(), id, depth);

        let subcircuits: Vec<ComponentId> = definition.subcircuits().map(|(c, _)| c).collect();
        for component in subcircuits {
            if let Err(err) = self.create_child(permits, config, id, component) {
                self.destroy(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Destroys `node` and every node below it, returns false if it was already gone.
    pub fn destroy(&mut self, node: NodeId) -> bool {
        let removed = match self.nodes.remove(node.0) {
            Some(removed) => removed,
            None => return false,
        };
        if let Some((parent, component)) = removed.parent {
            if let Some(parent) = self.nodes.get_mut(parent.0) {
                if parent.children.get(&component) == Some(&node) {
                    parent.children.shift_remove(&component);
                }
            }
        }
        for (_, child) in removed.children {
            self.destroy(child);
        }
        debug!("destroyed {} `{}`", node, removed.circuit.name());
        true
    }

    pub fn node(&self, node: NodeId) -> Result<&StateNode> {
        self.nodes.get(node.0).ok_or(SimError::Stale("state node"))
    }

    pub fn node_mut(&mut self, node: NodeId) -> Result<&mut StateNode> {
        self.nodes.get_mut(node.0).ok_or(SimError::Stale("state node"))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node.0)
    }

    /// Returns an iterator over every node, parents before their children.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &StateNode)> {
        self.nodes.iter().map(|(i, node)| (NodeId(i), node))
    }

    /// Returns `node` and every node below it, parents first.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(state) = self.nodes.get(next.0) {
                found.push(next);
                stack.extend(state.children.values().rev());
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current value of `net` in `node`.
    pub fn value(&self, node: NodeId, net: NetId) -> Result<&Value> {
        self.node(node)?
            .value(net)
            .ok_or_else(|| SimError::UnknownNet(net.to_string()))
    }

    /// Overwrites the value of `net` in `node`. Nothing is recomputed.
    pub fn set_value(
        &mut self,
        permits: &PermitSet<'_>,
        config: &SimConfig,
        node: NodeId,
        net: NetId,
        value: Value,
    ) -> Result<()> {
        let state = self.nodes.get_mut(node.0).ok_or(SimError::Stale("state node"))?;
        enforce(config, permits.definition(&state.circuit))?;
        let current = state
            .values
            .get_mut(&net)
            .ok_or_else(|| SimError::UnknownNet(net.to_string()))?;
        value.check_width(current.width())?;
        *current = value;
        Ok(())
    }

    /// Catches `node` up with the edits made to its definition since it was last synchronised.
    ///
    /// Children of removed subcircuit components are destroyed, new subcircuit components get a
    /// child. Returns every node whose values have to be recomputed: `node` and the new children
    /// with their subtrees, nothing if the definition didn't change.
    pub fn sync(
        &mut self,
        permits: &PermitSet<'_>,
        config: &SimConfig,
        node: NodeId,
    ) -> Result<Vec<NodeId>> {
        let state = match self.nodes.get_mut(node.0) {
            Some(state) => state,
            None => return Ok(Vec::new()),
        };
        let definition = enforce(config, permits.definition(&state.circuit))?;
        if definition.revision() == state.revision {
            return Ok(Vec::new());
        }
        state.load(definition);

        let orphans: Vec<NodeId> = state
            .children
            .iter()
            .filter(|(component, _)| !state.components.contains_key(*component))
            .map(|(_, child)| *child)
            .collect();
        let missing: Vec<ComponentId> = definition
            .subcircuits()
            .map(|(component, _)| component)
            .filter(|component| !state.children.contains_key(component))
            .collect();
        debug!(
            "synchronised {} with revision {} of `{}`",
            node,
            definition.revision(),
            definition.name()
        );

        for orphan in orphans {
            self.destroy(orphan);
        }
        let mut refresh = vec![node];
        for component in missing {
            let child = self.create_child(permits, config, node, component)?;
            refresh.extend(self.subtree(child));
        }
        Ok(refresh)
    }

    /// Resets every node: nets read undefined, components hold their initial data.
    ///
    /// Needs no permit, the structure of the tree doesn't change.
    pub fn reset(&mut self) {
        for index in self.nodes.indexes().collect::<Vec<_>>() {
            if let Some(node) = self.nodes.get_mut(index) {
                node.reset();
            }
        }
    }

    /// Resolves a path like `"cpu/alu/carry"` to the node instantiating `cpu/alu` below `root`
    /// and its net `carry`.
    pub fn lookup(&self, root: NodeId, path: &str) -> Result<(NodeId, NetId)> {
        let (prefix, name) = match path.rsplit_once('/') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, path),
        };
        let node = match prefix {
            Some(prefix) => self.find_node(root, prefix)?,
            None => root,
        };
        let net = self
            .node(node)?
            .net_id(name)
            .ok_or_else(|| SimError::UnknownNet(path.into()))?;
        Ok((node, net))
    }

    /// Resolves a path of subcircuit component names, separated by `/`, to a node below `root`.
    pub fn find_node(&self, root: NodeId, path: &str) -> Result<NodeId> {
        let mut node = root;
        for name in path.split('/').filter(|name| !name.is_empty()) {
            let state = self.node(node)?;
            node = state
                .component_id(name)
                .and_then(|component| state.child(component))
                .ok_or_else(|| SimError::UnknownComponent(path.into()))?;
        }
        Ok(node)
    }
}
