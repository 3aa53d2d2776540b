use super::propagator::{NetDelta, StepStatus};
use std::sync::{Arc, Mutex, PoisonError};

/// Notification sent to every [TickListener] of a [Simulation](crate::Simulation) after a step.
///
/// Sent while the permits of the step are still held, so the values can't have changed since.
#[derive(Debug, Clone, Copy)]
pub struct TickEvent<'a> {
    /// Number of steps completed since the simulation was created or reset, starting at 1.
    pub tick: u64,
    pub status: &'a StepStatus,
    pub deltas: &'a [NetDelta],
}

/// Consumer of [TickEvent]s, for example a waveform display.
pub trait TickListener: Send {
    fn tick_completed(&mut self, event: &TickEvent<'_>);
}

impl<F: FnMut(&TickEvent<'_>) + Send> TickListener for F {
    fn tick_completed(&mut self, event: &TickEvent<'_>) {
        self(event)
    }
}

/// One recorded [TickEvent].
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    pub tick: u64,
    pub status: StepStatus,
    pub deltas: Vec<NetDelta>,
}

/// Records every tick, clones share the same history.
///
/// # Example
/// ```
/// # use logicprop::{LockManager, CircuitDefinition, Simulation, SimConfig, HistoryRecorder, BitWidth};
/// let mut c = CircuitDefinition::new("wire");
/// let a = c.add_net("a", BitWidth::ONE).unwrap();
/// c.input_pin("in", a).unwrap();
/// let circuit = LockManager::new().register(c);
///
/// let history = HistoryRecorder::new();
/// let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();
/// sim.add_listener(history.clone());
/// sim.step().unwrap();
///
/// let records = history.records();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].deltas[0].path, "a");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HistoryRecorder {
    records: Arc<Mutex<Vec<TickRecord>>>,
}

impl HistoryRecorder {
    pub fn new() -> HistoryRecorder {
        Default::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn records(&self) -> Vec<TickRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl TickListener for HistoryRecorder {
    fn tick_completed(&mut self, event: &TickEvent<'_>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TickRecord {
                tick: event.tick,
                status: event.status.clone(),
                deltas: event.deltas.to_vec(),
            });
    }
}

/// Prints the changes of watched nets to the console, in colour.
///
/// An empty watch list watches every net.
#[cfg(feature = "debug_probes")]
#[derive(Debug, Clone, Default)]
pub struct ConsoleProbe {
    watched: Vec<String>,
}

#[cfg(feature = "debug_probes")]
impl ConsoleProbe {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(watched: I) -> ConsoleProbe {
        ConsoleProbe {
            watched: watched.into_iter().map(Into::into).collect(),
        }
    }

    fn is_watched(&self, path: &str) -> bool {
        self.watched.is_empty() || self.watched.iter().any(|w| w == path)
    }
}

#[cfg(feature = "debug_probes")]
impl TickListener for ConsoleProbe {
    fn tick_completed(&mut self, event: &TickEvent<'_>) {
        for delta in event.deltas.iter().filter(|d| self.is_watched(&d.path)) {
            match delta.value.to_u64() {
                Some(n) if delta.value.width().get() > 1 => {
                    colour::green_ln!("{}:{}:{} ({})", event.tick, delta.path, delta.value, n)
                }
                _ => {
                    colour::green_ln!("{}:{}:{}", event.tick, delta.path, delta.value)
                }
            }
        }
        if let StepStatus::Unstable { nets } = event.status {
            colour::red_ln!("{}:unstable:{}", event.tick, nets.join(","));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Value;

    #[test]
    fn test_closure_listener_and_recorder() {
        let mut seen = Vec::new();
        let deltas = vec![NetDelta {
            path: "a".into(),
            value: Value::bool(true),
        }];
        let status = StepStatus::Converged;
        let event = TickEvent {
            tick: 7,
            status: &status,
            deltas: &deltas,
        };
        {
            let mut listener = |e: &TickEvent<'_>| seen.push(e.tick);
            listener.tick_completed(&event);
        }
        assert_eq!(seen, vec![7]);

        let recorder = HistoryRecorder::new();
        let mut shared = recorder.clone();
        shared.tick_completed(&event);
        assert_eq!(recorder.records()[0].deltas, deltas);
        recorder.clear();
        assert!(shared.records().is_empty());
    }

    #[cfg(feature = "debug_probes")]
    #[test]
    fn test_probe_filter() {
        let probe = ConsoleProbe::new(vec!["q"]);
        assert!(probe.is_watched("q"));
        assert!(!probe.is_watched("d"));
        assert!(ConsoleProbe::default().is_watched("d"));
    }
}
