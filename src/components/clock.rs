use crate::component::{downcast_data, Component, InstanceData, Outputs, Port};
use crate::error::Result;
use crate::signal::{BitWidth, Logic, Value};
use smallvec::smallvec;

/// Private data of a [Clock].
#[derive(Debug, Clone, PartialEq)]
pub struct ClockData {
    pub level: Logic,
}

/// Single bit clock source, starts low.
///
/// The level only changes when [Simulation::tick](crate::Simulation::tick) toggles it.
#[derive(Debug, Clone)]
pub struct Clock {
    ports: [Port; 1],
}

impl Clock {
    pub fn new() -> Clock {
        Clock {
            ports: [Port::output("clk", BitWidth::ONE)],
        }
    }

    /// Flips the level stored in `data`, returns the new level.
    pub fn toggle(&self, data: Option<&mut InstanceData>) -> Result<Logic> {
        let data = downcast_data::<ClockData>(self.kind(), data)?;
        data.level = data.level.not();
        Ok(data.level)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Clock {
    fn kind(&self) -> &str {
        "clock"
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn init_data(&self) -> Option<InstanceData> {
        Some(Box::new(ClockData { level: Logic::Zero }))
    }

    fn propagate(&self, _inputs: &[Value], data: Option<&mut InstanceData>) -> Result<Outputs> {
        let data = downcast_data::<ClockData>(self.kind(), data)?;
        Ok(smallvec![Value::single(data.level)])
    }

    fn as_clock(&self) -> Option<&Clock> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let clock = Clock::new();
        let mut data = clock.init_data();
        assert_eq!(clock.propagate(&[], data.as_mut()).unwrap()[0], Value::single(Logic::Zero));
        assert_eq!(clock.toggle(data.as_mut()).unwrap(), Logic::One);
        assert_eq!(clock.propagate(&[], data.as_mut()).unwrap()[0], Value::single(Logic::One));
        assert_eq!(clock.toggle(data.as_mut()).unwrap(), Logic::Zero);
        assert!(clock.toggle(None).is_err());
    }
}
