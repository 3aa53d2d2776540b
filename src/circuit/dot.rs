use super::CircuitDefinition;
use std::collections::HashMap;
use std::io::{self, Write};

impl CircuitDefinition {
    /// Returns the label of a component in dot dumps, in format "KIND:NAME".
    fn full_name(kind: &str, name: &str) -> String {
        format!("{}:{}", kind, name)
    }

    /// Dumps the circuit in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language)) format
    /// to `writer`, to be visualized by many supported tools, I recommend [gephi](https://gephi.org/).
    ///
    /// Components are nodes, every net adds an edge from each of its drivers to each of its readers.
    pub fn dump_dot<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        use petgraph::dot::Dot;
        let mut graph = petgraph::Graph::<String, String>::new();
        let mut index = HashMap::new();
        for (id, placed) in self.components() {
            let label = Self::full_name(placed.component().kind(), placed.name());
            index.insert(id, graph.add_node(label));
        }
        for (_, net) in self.nets() {
            for driver in net.drivers() {
                for reader in net.readers() {
                    if let (Some(from), Some(to)) =
                        (index.get(&driver.component), index.get(&reader.component))
                    {
                        graph.add_edge(*from, *to, net.name().to_string());
                    }
                }
            }
        }
        write!(writer, "{}", Dot::new(&graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::BitWidth;

    #[test]
    fn test_dump_dot() {
        let mut c = CircuitDefinition::new("latch");
        let w = BitWidth::ONE;
        let r = c.add_net("r", w).unwrap();
        let s = c.add_net("s", w).unwrap();
        let q = c.add_net("q", w).unwrap();
        let nq = c.add_net("nq", w).unwrap();
        c.nor2("top", r, nq, q).unwrap();
        c.nor2("bottom", s, q, nq).unwrap();

        let mut out = Vec::new();
        c.dump_dot(&mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("nor:top"));
        assert!(dot.contains("nor:bottom"));
        assert_eq!(dot.matches("->").count(), 2);
    }
}
