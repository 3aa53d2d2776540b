use super::{Attributes, Component};
use crate::components::{Clock, Constant, ControlledBuffer, Gate, GateKind, Pin, Register, Splitter};
use crate::error::{Result, SimError};
use indexmap::IndexMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Builds a component from its attributes.
pub type Factory = Box<dyn Fn(&Attributes) -> Result<Arc<dyn Component>> + Send + Sync>;

/// Maps component kind names to the factories that build them.
///
/// # Example
/// ```
/// # use logicprop::{ComponentRegistry, Attributes};
/// let registry = ComponentRegistry::builtin();
///
/// let and = registry.create("and", &Attributes::new().with("inputs", 3usize)).unwrap();
/// assert_eq!(and.ports().len(), 4);
///
/// assert!(registry.create("flux_capacitor", &Attributes::new()).is_err());
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    factories: IndexMap<String, Factory>,
}

impl ComponentRegistry {
    /// Returns an empty registry.
    pub fn new() -> ComponentRegistry {
        Default::default()
    }

    /// Returns a registry with every built-in kind: the gates, `tristate`, `constant`, `pin`,
    /// `clock`, `register` and `splitter`.
    pub fn builtin() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        for kind in GateKind::iter() {
            registry.register(kind.to_string(), move |attrs: &Attributes| {
                Ok(Arc::new(Gate::from_attributes(kind, attrs)?) as Arc<dyn Component>)
            });
        }
        registry.register("tristate", |attrs: &Attributes| {
            Ok(Arc::new(ControlledBuffer::new(attrs.width()?)) as Arc<dyn Component>)
        });
        registry.register("constant", |attrs: &Attributes| {
            Ok(Arc::new(Constant::from_attributes(attrs)?) as Arc<dyn Component>)
        });
        registry.register("pin", |attrs: &Attributes| {
            Ok(Arc::new(Pin::from_attributes(attrs)?) as Arc<dyn Component>)
        });
        registry.register("clock", |_: &Attributes| {
            Ok(Arc::new(Clock::new()) as Arc<dyn Component>)
        });
        registry.register("register", |attrs: &Attributes| {
            Ok(Arc::new(Register::from_attributes(attrs)?) as Arc<dyn Component>)
        });
        registry.register("splitter", |attrs: &Attributes| {
            Ok(Arc::new(Splitter::from_attributes(attrs)?) as Arc<dyn Component>)
        });
        registry
    }

    /// Registers `factory` for `kind`, replacing the previous factory of that kind.
    pub fn register<S, F>(&mut self, kind: S, factory: F)
    where
        S: Into<String>,
        F: Fn(&Attributes) -> Result<Arc<dyn Component>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Builds a component of `kind`, fails with [SimError::UnknownKind] if nothing is registered for it.
    pub fn create(&self, kind: &str, attributes: &Attributes) -> Result<Arc<dyn Component>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| SimError::UnknownKind(kind.into()))?;
        factory(attributes)
    }

    /// Returns the registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
