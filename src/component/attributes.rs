use crate::error::{Result, SimError};
use crate::signal::{BitWidth, Logic, Value};
use indexmap::IndexMap;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Clock edge a clocked component reacts to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Returns true if going from `from` to `to` is this edge.
    pub fn is_triggered(self, from: Logic, to: Logic) -> bool {
        match self {
            Edge::Rising => from == Logic::Zero && to == Logic::One,
            Edge::Falling => from == Logic::One && to == Logic::Zero,
        }
    }
}

/// Value of a single attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttrValue {
    Int(u64),
    Bool(bool),
    Text(String),
    Value(Value),
}

impl From<u64> for AttrValue {
    fn from(i: u64) -> Self {
        AttrValue::Int(i)
    }
}
impl From<usize> for AttrValue {
    fn from(i: usize) -> Self {
        AttrValue::Int(i as u64)
    }
}
impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}
impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.into())
    }
}
impl From<Value> for AttrValue {
    fn from(v: Value) -> Self {
        AttrValue::Value(v)
    }
}

/// Immutable configuration of a component, bit width, number of inputs, gate kind...
///
/// # Example
/// ```
/// # use logicprop::{Attributes, Edge};
/// let attrs = Attributes::new().with("width", 8usize).with("edge", "falling");
///
/// assert_eq!(attrs.width().unwrap().get(), 8);
/// assert_eq!(attrs.edge().unwrap(), Edge::Falling);
/// assert_eq!(attrs.int_or("inputs", 2).unwrap(), 2);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attributes {
    values: IndexMap<String, AttrValue>,
}

fn attr_error(name: &str, reason: &str) -> SimError {
    SimError::Attribute {
        name: name.into(),
        reason: reason.into(),
    }
}

impl Attributes {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns `self` with attribute `name` set to `value`.
    pub fn with<S: Into<String>, V: Into<AttrValue>>(mut self, name: S, value: V) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Returns the integer attribute `name`, or `default` if it isn't set.
    pub fn int_or(&self, name: &str, default: u64) -> Result<u64> {
        match self.get(name) {
            None => Ok(default),
            Some(AttrValue::Int(i)) => Ok(*i),
            Some(_) => Err(attr_error(name, "expected an integer")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(AttrValue::Bool(b)) => Ok(*b),
            Some(_) => Err(attr_error(name, "expected a bool")),
        }
    }

    pub fn text(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(AttrValue::Text(s)) => Ok(Some(s)),
            Some(_) => Err(attr_error(name, "expected text")),
        }
    }

    /// Returns attribute `name` as a [Value], text attributes are parsed.
    pub fn value(&self, name: &str) -> Result<Option<Value>> {
        match self.get(name) {
            None => Ok(None),
            Some(AttrValue::Value(v)) => Ok(Some(v.clone())),
            Some(AttrValue::Text(s)) => s.parse().map(Some),
            Some(_) => Err(attr_error(name, "expected a value")),
        }
    }

    /// The `width` attribute, 1 if it isn't set.
    pub fn width(&self) -> Result<BitWidth> {
        BitWidth::new(self.int_or("width", 1)? as usize)
    }

    /// The `edge` attribute, [Edge::Rising] if it isn't set.
    pub fn edge(&self) -> Result<Edge> {
        match self.text("edge")? {
            None => Ok(Edge::Rising),
            Some(s) => Edge::from_str(s).map_err(|_| attr_error("edge", "expected rising or falling")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let a = Attributes::new();
        assert_eq!(a.width().unwrap(), BitWidth::ONE);
        assert_eq!(a.edge().unwrap(), Edge::Rising);
        assert!(!a.bool_or("enable", false).unwrap());
        assert_eq!(a.value("value").unwrap(), None);
    }

    #[test]
    fn test_type_errors() {
        let a = Attributes::new()
            .with("width", "wide")
            .with("edge", "sideways")
            .with("value", "10");
        assert!(matches!(a.width(), Err(SimError::Attribute { .. })));
        assert!(a.edge().is_err());
        assert_eq!(a.value("value").unwrap().unwrap().to_u64(), Some(2));
        assert!(Attributes::new().with("width", 0usize).width().is_err());
    }

    #[test]
    fn test_edges() {
        assert!(Edge::Rising.is_triggered(Logic::Zero, Logic::One));
        assert!(!Edge::Rising.is_triggered(Logic::X, Logic::One));
        assert!(Edge::Falling.is_triggered(Logic::One, Logic::Zero));
        assert_eq!(Edge::Falling.to_string(), "falling");
    }
}
