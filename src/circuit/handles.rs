use crate::data_structures::SlabIndex;
use std::fmt::{self, Display, Formatter};

/// Identifies a net in a [CircuitDefinition](super::CircuitDefinition).
///
/// Ids of removed nets never match a later net, even if it reuses the same slot.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NetId(pub(crate) SlabIndex);

/// Identifies a component placed in a [CircuitDefinition](super::CircuitDefinition).
///
/// Ids of removed components never match a later component, even if it reuses the same slot.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct ComponentId(pub(crate) SlabIndex);

impl NetId {
    pub fn slot(&self) -> usize {
        self.0.slot()
    }
}

impl ComponentId {
    pub fn slot(&self) -> usize {
        self.0.slot()
    }
}

impl Display for NetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A port of a placed component, by index into [Component::ports](crate::Component::ports).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct PortRef {
    pub component: ComponentId,
    pub port: usize,
}

impl Display for PortRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.port)
    }
}
