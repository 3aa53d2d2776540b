use super::event::Action;
use super::listener::{TickEvent, TickListener};
use super::lock::{with_hierarchy, Circuit, PermitSet};
use super::propagator::{Phase, Propagator, StepReport};
use crate::components::PinData;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::signal::Value;
use indexmap::IndexMap;
use log::debug;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// How far [Simulation::tick] moves the clocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TickKind {
    /// Toggle every clock once, then step.
    Half,
    /// Toggle and step twice, a full clock period.
    Full,
}

/// Cooperative control of a [Simulation::run] loop from another thread.
///
/// Requests are only looked at between ticks, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct SimControl {
    stop: Arc<AtomicBool>,
    reset: Arc<AtomicBool>,
}

impl SimControl {
    pub fn new() -> SimControl {
        Default::default()
    }

    /// Asks the run loop to return after the current tick.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Asks the run loop to reset the simulation before the next tick.
    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::SeqCst);
    }

    fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::SeqCst)
    }

    fn clear_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }
}

/// A running instance of a circuit: its own state tree, event queue and listeners.
///
/// Several simulations of the same circuit never share state, they only take turns holding its
/// permits for the length of a step.
///
/// # Example
/// ```
/// # use logicprop::{LockManager, CircuitDefinition, Simulation, SimConfig, BitWidth, Value};
/// let mut c = CircuitDefinition::new("and");
/// let w = BitWidth::ONE;
/// let (a, b, y) = (c.add_net("a", w).unwrap(), c.add_net("b", w).unwrap(), c.add_net("y", w).unwrap());
/// c.input_pin("a", a).unwrap();
/// c.input_pin("b", b).unwrap();
/// c.output_pin("y", y).unwrap();
/// c.and2("g", a, b, y).unwrap();
/// let circuit = LockManager::new().register(c);
///
/// let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();
/// sim.set_input("a", Value::bool(true)).unwrap();
/// sim.set_input("b", Value::bool(true)).unwrap();
/// assert!(sim.step().unwrap().status.is_converged());
/// assert_eq!(sim.output("y").unwrap(), Value::bool(true));
///
/// sim.set_input("b", Value::bool(false)).unwrap();
/// sim.step().unwrap();
/// assert_eq!(sim.value("y").unwrap(), Value::bool(false));
/// ```
pub struct Simulation {
    circuit: Circuit,
    engine: Propagator,
    listeners: Vec<Box<dyn TickListener>>,
    control: SimControl,
    ticks: u64,
    config: SimConfig,
}

impl Simulation {
    /// Instantiates `circuit` and every circuit below it.
    pub fn new(circuit: &Circuit, config: SimConfig) -> Result<Simulation> {
        let engine = with_hierarchy(circuit, |permits| {
            Propagator::new(permits, config.clone(), circuit)
        })?;
        debug!(
            "new simulation of `{}` with {} state nodes",
            circuit.name(),
            engine.tree().len()
        );
        Ok(Simulation {
            circuit: circuit.clone(),
            engine,
            listeners: Vec::new(),
            control: SimControl::new(),
            ticks: 0,
            config,
        })
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn engine(&self) -> &Propagator {
        &self.engine
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Steps completed since creation or the last reset.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn time(&self) -> u64 {
        self.engine.time()
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    /// Handle to stop or reset [Simulation::run] from another thread.
    pub fn control(&self) -> SimControl {
        self.control.clone()
    }

    pub fn add_listener<L: TickListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    /// Drains the engine until the circuit settles or is declared unstable.
    ///
    /// Takes the permits of the whole hierarchy for the length of the step, structural edits
    /// wait until it completes.
    pub fn step(&mut self) -> Result<StepReport> {
        let root = self.circuit.clone();
        with_hierarchy(&root, |permits| self.step_locked(permits))
    }

    /// [Simulation::step] with permits the caller already holds, they must cover the hierarchy.
    pub fn step_locked(&mut self, permits: &PermitSet<'_>) -> Result<StepReport> {
        let report = self.engine.step(permits)?;
        self.ticks += 1;
        let event = TickEvent {
            tick: self.ticks,
            status: &report.status,
            deltas: &report.deltas,
        };
        for listener in self.listeners.iter_mut() {
            listener.tick_completed(&event);
        }
        Ok(report)
    }

    /// Toggles every clock and steps, twice for a [TickKind::Full] tick.
    pub fn tick(&mut self, kind: TickKind) -> Result<StepReport> {
        self.engine.toggle_clocks();
        let mut report = self.step()?;
        if kind == TickKind::Full {
            self.engine.toggle_clocks();
            let falling = self.step()?;
            report.absorb(falling);
        }
        Ok(report)
    }

    /// Runs full ticks until stopped through [SimControl] or `max_ticks` is reached, returns the
    /// number of ticks run.
    ///
    /// Pauses [SimConfig::tick_period] between ticks. A reset requested through [SimControl] is
    /// applied before the next tick.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<u64> {
        self.control.clear_stop();
        let mut count = 0;
        while !self.control.is_stopped() && max_ticks.map_or(true, |max| count < max) {
            if self.control.take_reset() {
                self.reset();
            }
            self.tick(TickKind::Full)?;
            count += 1;
            if !self.config.tick_period.is_zero() {
                thread::sleep(self.config.tick_period);
            }
        }
        debug!("`{}` ran {} ticks", self.circuit.name(), count);
        Ok(count)
    }

    /// Discards pending events, forgets every value and puts every component back in its
    /// initial state. Never waits for a permit.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.ticks = 0;
        debug!("reset simulation of `{}`", self.circuit.name());
    }

    /// Sets the value an input pin of the top circuit drives from the next step on.
    pub fn set_input(&mut self, pin: &str, value: Value) -> Result<()> {
        let root = self.engine.root();
        let state = self.engine.tree().node(root)?;
        let id = state
            .component_id(pin)
            .ok_or_else(|| SimError::UnknownPin(pin.into()))?;
        let target = state
            .component(id)
            .and_then(|c| c.as_pin())
            .filter(|p| p.is_input())
            .ok_or_else(|| SimError::UnknownPin(pin.into()))?;
        value.check_width(target.width())?;
        self.engine.schedule(root, id, Action::Input(value));
        Ok(())
    }

    /// Returns true if `pin` names an input pin of the top circuit, false for an output pin.
    pub fn is_input(&self, pin: &str) -> Result<bool> {
        let state = self.engine.tree().node(self.engine.root())?;
        state
            .component_id(pin)
            .and_then(|id| state.component(id))
            .and_then(|c| c.as_pin())
            .map(|p| p.is_input())
            .ok_or_else(|| SimError::UnknownPin(pin.into()))
    }

    /// Forces the value of the net at `path` until its drivers change, then recomputes its readers
    /// on the next step.
    pub fn poke(&mut self, path: &str, value: Value) -> Result<()> {
        let root = self.circuit.clone();
        let engine = &mut self.engine;
        with_hierarchy(&root, |permits| {
            let (node, net) = engine.tree().lookup(engine.root(), path)?;
            engine.poke(permits, node, net, value)
        })
    }

    /// Current value of the net at `path`, see [StateTree::lookup](crate::StateTree::lookup).
    pub fn value(&self, path: &str) -> Result<Value> {
        let tree = self.engine.tree();
        let (node, net) = tree.lookup(self.engine.root(), path)?;
        tree.value(node, net).cloned()
    }

    /// Value of a pin of the top circuit: what an input pin drives, or what an output pin saw.
    pub fn output(&self, pin: &str) -> Result<Value> {
        let state = self.engine.tree().node(self.engine.root())?;
        let id = state
            .component_id(pin)
            .filter(|id| state.component(*id).and_then(|c| c.as_pin()).is_some())
            .ok_or_else(|| SimError::UnknownPin(pin.into()))?;
        state
            .data(id)
            .and_then(|data| data.downcast_ref::<PinData>())
            .map(|data| data.value.clone())
            .ok_or_else(|| SimError::MissingData(pin.into()))
    }

    /// Owned copy of the value of every net of the top circuit, by name.
    pub fn snapshot(&self) -> Result<IndexMap<String, Value>> {
        let state = self.engine.tree().node(self.engine.root())?;
        Ok(state
            .named_values()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect())
    }
}

impl Debug for Simulation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("circuit", &self.circuit)
            .field("ticks", &self.ticks)
            .field("time", &self.engine.time())
            .field("phase", &self.engine.phase())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Steps `sim` and asserts that it settles, then that each net has the expected value.
///
/// # Example
/// ```
/// # use logicprop::{assert_settles, LockManager, CircuitDefinition, Simulation, SimConfig, BitWidth, Value};
/// let mut c = CircuitDefinition::new("inv");
/// let (a, y) = (c.add_net("a", BitWidth::ONE).unwrap(), c.add_net("y", BitWidth::ONE).unwrap());
/// c.input_pin("a", a).unwrap();
/// c.not1("n", a, y).unwrap();
/// let circuit = LockManager::new().register(c);
///
/// let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();
/// assert_settles!(sim, "y" => "1");
/// sim.set_input("a", Value::bool(true)).unwrap();
/// assert_settles!(sim, "a" => "1", "y" => "0");
/// ```
#[macro_export]
macro_rules! assert_settles {
    ($sim:expr) => {
        let report = $sim.step().expect("step failed");
        assert!(
            report.status.is_converged(),
            "Circuit didn't settle after {} time slots: {:?}",
            report.iterations,
            report.status
        );
    };
    ($sim:expr, $($net:expr => $expected:expr),+ $(,)?) => {
        $crate::assert_settles!($sim);
        $(
            let actual = $sim.value($net).expect("no such net").to_string();
            assert!(
                actual == $expected,
                "Net {} settled to {}, expected: {}",
                $net,
                actual,
                $expected
            );
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitDefinition;
    use crate::component::Edge;
    use crate::components::{Clock, Register, Subcircuit};
    use crate::signal::{BitWidth, Logic};
    use crate::sim::{HistoryRecorder, LockManager, StepStatus, TickRecord};
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn w(n: usize) -> BitWidth {
        BitWidth::new(n).unwrap()
    }

    fn v(s: &str) -> Value {
        s.parse().unwrap()
    }

    /// A 4 bit register loading `d` on the rising edge of input `clk`, output `q`.
    fn register_circuit(locks: &LockManager) -> Circuit {
        let mut c = CircuitDefinition::new("reg4");
        let d = c.add_net("d", w(4)).unwrap();
        let clk = c.add_net("clk", w(1)).unwrap();
        let q = c.add_net("q", w(4)).unwrap();
        c.input_pin("d", d).unwrap();
        c.input_pin("clk", clk).unwrap();
        c.output_pin("q", q).unwrap();
        c.place(
            "r",
            Arc::new(Register::new(w(4), Edge::Rising, false, false)),
            &[d, clk, q],
        )
        .unwrap();
        locks.register(c)
    }

    #[test]
    fn test_subcircuit_instances_are_independent() {
        let locks = LockManager::new();
        let reg = register_circuit(&locks);
        let sub = Arc::new(Subcircuit::new(&reg));

        let mut top = CircuitDefinition::new("top");
        let d = top.add_net("d", w(4)).unwrap();
        let clk_a = top.add_net("clk_a", w(1)).unwrap();
        let clk_b = top.add_net("clk_b", w(1)).unwrap();
        let qa = top.add_net("qa", w(4)).unwrap();
        let qb = top.add_net("qb", w(4)).unwrap();
        top.input_pin("d", d).unwrap();
        top.input_pin("clk_a", clk_a).unwrap();
        top.input_pin("clk_b", clk_b).unwrap();
        top.place("a", sub.clone(), &[d, clk_a, qa]).unwrap();
        top.place("b", sub, &[d, clk_b, qb]).unwrap();
        let top = locks.register(top);

        let mut sim = Simulation::new(&top, SimConfig::default()).unwrap();
        assert_settles!(sim, "qa" => "0000", "qb" => "0000", "a/q" => "0000");

        sim.set_input("d", v("1010")).unwrap();
        sim.set_input("clk_a", Value::bool(true)).unwrap();
        assert_settles!(sim, "qa" => "1010", "qb" => "0000", "a/d" => "1010", "b/d" => "1010");
    }

    #[test]
    fn test_deterministic_replay() {
        let locks = LockManager::new();
        let reg = register_circuit(&locks);
        let mut sim = Simulation::new(&reg, SimConfig::default()).unwrap();
        let history = HistoryRecorder::new();
        sim.add_listener(history.clone());

        let replay = |sim: &mut Simulation| -> Vec<TickRecord> {
            history.clear();
            sim.reset();
            for (i, d) in ["0001", "0110", "1111", "1000"].iter().enumerate() {
                sim.set_input("d", v(d)).unwrap();
                sim.set_input("clk", Value::bool(i % 2 == 0)).unwrap();
                sim.step().unwrap();
            }
            history.records()
        };
        let first = replay(&mut sim);
        let second = replay(&mut sim);
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        assert_eq!(sim.value("q").unwrap(), v("1111"));
    }

    #[test]
    fn test_reset_discards_pending_input() {
        let locks = LockManager::new();
        let reg = register_circuit(&locks);
        let mut sim = Simulation::new(&reg, SimConfig::default()).unwrap();
        sim.set_input("d", v("0011")).unwrap();
        assert_settles!(sim, "q" => "0000");
        sim.set_input("clk", Value::bool(true)).unwrap();
        assert_settles!(sim, "q" => "0011");

        sim.set_input("d", v("1100")).unwrap();
        sim.reset();
        assert_eq!(sim.engine().pending(), 0);
        assert_eq!(sim.phase(), Phase::Reset);
        assert_eq!(sim.value("q").unwrap(), Value::unknown(w(4)));
        assert_eq!(sim.ticks(), 0);

        assert_settles!(sim, "d" => "0000", "q" => "0000");
        assert_eq!(sim.output("q").unwrap(), v("0000"));
    }

    #[test]
    fn test_clock_ticks() {
        let mut c = CircuitDefinition::new("toggler");
        let clk = c.add_net("clk", w(1)).unwrap();
        let q = c.add_net("q", w(1)).unwrap();
        let nq = c.add_net("nq", w(1)).unwrap();
        c.place("clock", Arc::new(Clock::new()), &[clk]).unwrap();
        c.place(
            "r",
            Arc::new(Register::new(w(1), Edge::Rising, false, false)),
            &[nq, clk, q],
        )
        .unwrap();
        c.not1("n", q, nq).unwrap();
        let circuit = LockManager::new().register(c);

        let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();
        assert_settles!(sim, "clk" => "0", "q" => "0");
        let mut seen = Vec::new();
        for _ in 0..4 {
            let report = sim.tick(TickKind::Full).unwrap();
            assert!(report.status.is_converged());
            seen.push(sim.value("q").unwrap().to_string());
        }
        assert_eq!(seen, vec!["1", "0", "1", "0"]);
        assert_eq!(sim.value("clk").unwrap(), Value::single(Logic::Zero));

        sim.tick(TickKind::Half).unwrap();
        assert_eq!(sim.value("clk").unwrap(), Value::single(Logic::One));
        assert_eq!(sim.ticks(), 1 + 4 * 2 + 1);
    }

    #[test]
    fn test_run_until_stopped() {
        let mut c = CircuitDefinition::new("clocked");
        let clk = c.add_net("clk", w(1)).unwrap();
        c.place("clock", Arc::new(Clock::new()), &[clk]).unwrap();
        let circuit = LockManager::new().register(c);
        let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();

        assert_eq!(sim.run(Some(3)).unwrap(), 3);

        let control = sim.control();
        sim.add_listener(move |e: &TickEvent<'_>| {
            if e.tick >= 4 {
                control.stop();
            }
        });
        sim.control().request_reset();
        // The reset clears the tick count, the listener stops the loop on the second tick.
        assert_eq!(sim.run(None).unwrap(), 2);
    }

    #[test]
    fn test_inverter_loop_is_unstable() {
        let mut c = CircuitDefinition::new("loop");
        let a = c.add_net("a", w(1)).unwrap();
        c.not1("n", a, a).unwrap();
        let circuit = LockManager::new().register(c);
        let mut sim = Simulation::new(&circuit, SimConfig::default()).unwrap();
        let history = HistoryRecorder::new();
        sim.add_listener(history.clone());

        let report = sim.step().unwrap();
        assert_eq!(report.status, StepStatus::Unstable { nets: vec!["a".into()] });
        assert_eq!(report.iterations, crate::config::DEFAULT_ITERATION_LIMIT);
        assert_eq!(sim.value("a").unwrap(), Value::error(w(1)));
        assert_eq!(sim.phase(), Phase::Unstable);
        assert!(!history.records()[0].status.is_converged());

        sim.poke("a", Value::bool(true)).unwrap();
        assert!(!sim.step().unwrap().status.is_converged());
        assert_eq!(sim.value("a").unwrap(), Value::error(w(1)));
    }

    #[test]
    fn test_usage_errors() {
        let locks = LockManager::new();
        let reg = register_circuit(&locks);
        let mut sim = Simulation::new(&reg, SimConfig::default()).unwrap();
        assert_eq!(sim.set_input("e", v("1")), Err(SimError::UnknownPin("e".into())));
        assert_eq!(sim.set_input("q", v("0000")), Err(SimError::UnknownPin("q".into())));
        assert!(matches!(sim.set_input("d", v("1")), Err(SimError::WidthMismatch { .. })));
        assert!(matches!(sim.poke("nope", v("1")), Err(SimError::UnknownNet(_))));
        assert!(matches!(sim.output("r"), Err(SimError::UnknownPin(_))));
        assert_eq!(sim.engine().pending(), 0);
    }

    #[test]
    fn test_snapshot() {
        let locks = LockManager::new();
        let reg = register_circuit(&locks);
        let mut sim = Simulation::new(&reg, SimConfig::default()).unwrap();
        sim.step().unwrap();
        let snapshot = sim.snapshot().unwrap();
        let names: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["d", "clk", "q"]);
        assert_eq!(snapshot["q"], v("0000"));
    }

    #[test]
    fn test_edit_waits_for_step() {
        let locks = LockManager::new();
        let reg = register_circuit(&locks);
        let mut sim = Simulation::new(&reg, SimConfig::default()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (stepping_tx, stepping_rx) = mpsc::channel();

        {
            // Listeners run with the permits still held.
            let log = log.clone();
            sim.add_listener(move |_: &TickEvent<'_>| {
                // Only the first step has someone waiting for it.
                let _ = stepping_tx.send(());
                thread::sleep(Duration::from_millis(100));
                log.lock().unwrap().push("step");
            });
        }

        let editor = {
            let reg = reg.clone();
            let log = log.clone();
            thread::spawn(move || {
                stepping_rx.recv().unwrap();
                reg.mutate(|c| c.add_net("extra", BitWidth::ONE)).unwrap();
                log.lock().unwrap().push("edit");
            })
        };
        sim.step().unwrap();
        editor.join().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["step", "edit"]);

        // The next step picks the edit up.
        assert!(sim.value("extra").is_err());
        sim.step().unwrap();
        assert_eq!(sim.value("extra").unwrap().to_string(), "z");
    }
}
