use super::lock::{Circuit, LockManager};
use super::simulation::Simulation;
use super::test_vector::{TestReport, TestVector};
use crate::circuit::CircuitDefinition;
use crate::component::{Attributes, Component, ComponentRegistry};
use crate::components::Subcircuit;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use indexmap::IndexMap;
use std::sync::Arc;

/// Every circuit of a design, the registry that builds their components and the settings their
/// simulations run with.
///
/// # Example
/// ```
/// # use logicprop::{Project, CircuitDefinition, SimConfig, Attributes, BitWidth};
/// let mut project = Project::new(SimConfig::default());
/// let mut c = CircuitDefinition::new("buffer");
/// let a = c.add_net("a", BitWidth::ONE).unwrap();
/// let y = c.add_net("y", BitWidth::ONE).unwrap();
/// let buffer = project.create_component("buffer", &Attributes::new()).unwrap();
/// c.place("b", buffer, &[a, y]).unwrap();
/// project.add_circuit(c).unwrap();
///
/// // Two simulations of the same circuit share nothing.
/// let mut first = project.simulation("buffer").unwrap();
/// let second = project.simulation("buffer").unwrap();
/// first.step().unwrap();
/// assert_eq!(first.value("y").unwrap().to_string(), "x");
/// assert_eq!(second.value("y").unwrap().to_string(), "x");
/// assert_eq!(second.ticks(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Project {
    locks: LockManager,
    circuits: IndexMap<String, Circuit>,
    registry: ComponentRegistry,
    config: SimConfig,
}

impl Project {
    /// Returns an empty project using the built-in components.
    pub fn new(config: SimConfig) -> Project {
        Project {
            locks: LockManager::new(),
            circuits: IndexMap::new(),
            registry: ComponentRegistry::builtin(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Registry to add custom component kinds to.
    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Builds a component of a registered kind.
    pub fn create_component(
        &self,
        kind: &str,
        attributes: &Attributes,
    ) -> Result<Arc<dyn Component>> {
        self.registry.create(kind, attributes)
    }

    /// Adds `definition` to the project under its name.
    pub fn add_circuit(&mut self, definition: CircuitDefinition) -> Result<Circuit> {
        if self.circuits.contains_key(definition.name()) {
            return Err(SimError::DuplicateName {
                kind: "circuit",
                name: definition.name().into(),
            });
        }
        let circuit = self.locks.register(definition);
        self.circuits
            .insert(circuit.name().to_string(), circuit.clone());
        Ok(circuit)
    }

    /// Removes a circuit from the project. Instances of it already placed in other circuits and
    /// running simulations keep it alive.
    pub fn remove_circuit(&mut self, name: &str) -> Result<Circuit> {
        self.circuits
            .shift_remove(name)
            .ok_or_else(|| SimError::UnknownCircuit(name.into()))
    }

    pub fn circuit(&self, name: &str) -> Result<&Circuit> {
        self.circuits
            .get(name)
            .ok_or_else(|| SimError::UnknownCircuit(name.into()))
    }

    /// Returns an iterator over every circuit in the order they were added.
    pub fn circuits(&self) -> impl Iterator<Item = &Circuit> {
        self.circuits.values()
    }

    /// Returns a component instantiating circuit `name`, to be placed in another circuit.
    pub fn instance(&self, name: &str) -> Result<Arc<Subcircuit>> {
        Ok(Arc::new(Subcircuit::new(self.circuit(name)?)))
    }

    /// Starts a new independent simulation of circuit `name`.
    pub fn simulation(&self, name: &str) -> Result<Simulation> {
        Simulation::new(self.circuit(name)?, self.config.clone())
    }

    /// Runs `vector` against circuit `name` on a simulation of its own.
    pub fn run_test_vector(&self, name: &str, vector: &TestVector) -> Result<TestReport> {
        vector.run(self.circuit(name)?, self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{BitWidth, Value};

    fn inverter(project: &mut Project) -> Circuit {
        let mut c = CircuitDefinition::new("inv");
        let a = c.add_net("a", BitWidth::ONE).unwrap();
        let y = c.add_net("y", BitWidth::ONE).unwrap();
        c.input_pin("a", a).unwrap();
        c.output_pin("y", y).unwrap();
        let not = project.create_component("not", &Attributes::new()).unwrap();
        c.place("n", not, &[a, y]).unwrap();
        project.add_circuit(c).unwrap()
    }

    #[test]
    fn test_circuits() {
        let mut project = Project::new(SimConfig::default());
        let inv = inverter(&mut project);
        assert_eq!(project.circuit("inv").unwrap(), &inv);
        assert!(matches!(
            project.add_circuit(CircuitDefinition::new("inv")),
            Err(SimError::DuplicateName { kind: "circuit", .. })
        ));
        assert_eq!(
            project.circuit("nand").unwrap_err(),
            SimError::UnknownCircuit("nand".into())
        );
        assert_eq!(project.circuits().count(), 1);
        assert_eq!(project.remove_circuit("inv").unwrap(), inv);
        assert!(project.simulation("inv").is_err());
    }

    #[test]
    fn test_nested_instances() {
        let mut project = Project::new(SimConfig::default());
        inverter(&mut project);

        // Two inverters in a row.
        let mut c = CircuitDefinition::new("double");
        let a = c.add_net("a", BitWidth::ONE).unwrap();
        let m = c.add_net("m", BitWidth::ONE).unwrap();
        let y = c.add_net("y", BitWidth::ONE).unwrap();
        c.input_pin("a", a).unwrap();
        c.output_pin("y", y).unwrap();
        let inv = project.instance("inv").unwrap();
        c.place("first", inv.clone(), &[a, m]).unwrap();
        c.place("second", inv, &[m, y]).unwrap();
        project.add_circuit(c).unwrap();

        let mut sim = project.simulation("double").unwrap();
        sim.set_input("a", Value::bool(true)).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.value("m").unwrap(), Value::bool(false));
        assert_eq!(sim.value("first/y").unwrap(), Value::bool(false));
        assert_eq!(sim.output("y").unwrap(), Value::bool(true));

        let vector: TestVector = "a y\n0 0\n1 1\n".parse().unwrap();
        assert!(project.run_test_vector("double", &vector).unwrap().passed());
        // The interactive simulation wasn't touched.
        assert_eq!(sim.value("y").unwrap(), Value::bool(true));
    }
}
