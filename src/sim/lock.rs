use crate::circuit::CircuitDefinition;
use crate::config::SimConfig;
use crate::error::{LockViolation, Result, SimError, ThreadInfo};
use log::{debug, error};
use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Issues the serial numbers that identify [Circuit] locks.
///
/// Every circuit of a project is registered with the same manager, serials also define the order
/// in which several circuits are locked, so that two threads never wait for each other.
#[derive(Debug)]
pub struct LockManager {
    next_serial: AtomicU64,
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager {
            next_serial: AtomicU64::new(1),
        }
    }

    /// Wraps `definition` into a lockable [Circuit] with a fresh serial.
    pub fn register(&self, definition: CircuitDefinition) -> Circuit {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        debug!("registered circuit `{}` with serial {}", definition.name(), serial);
        Circuit(Arc::new(Shared {
            name: definition.name().into(),
            serial,
            definition: Mutex::new(definition),
            holder: Mutex::new(None),
        }))
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Shared {
    name: String,
    serial: u64,
    definition: Mutex<CircuitDefinition>,
    holder: Mutex<Option<ThreadInfo>>,
}

/// A [CircuitDefinition] shared between simulations and editors.
///
/// Structural edits and simulation steps both need the circuit's exclusive [CircuitPermit], so a net's
/// drivers never change in the middle of a step. Cloning a [Circuit] clones the handle, not the definition.
///
/// # Example
/// ```
/// # use logicprop::{LockManager, CircuitDefinition, BitWidth};
/// let locks = LockManager::new();
/// let circuit = locks.register(CircuitDefinition::new("top"));
///
/// circuit.mutate(|c| c.add_net("a", BitWidth::ONE)).unwrap();
///
/// let permit = circuit.lock();
/// assert!(permit.net_id("a").is_ok());
/// assert!(circuit.try_lock().is_none());
/// assert!(circuit.holder().is_some());
/// drop(permit);
/// assert!(circuit.holder().is_none());
/// ```
#[derive(Clone)]
pub struct Circuit(Arc<Shared>);

impl Circuit {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn serial(&self) -> u64 {
        self.0.serial
    }

    fn permit<'a>(&'a self, guard: MutexGuard<'a, CircuitDefinition>) -> CircuitPermit<'a> {
        *self.0.holder.lock().unwrap_or_else(PoisonError::into_inner) = Some(ThreadInfo::current());
        CircuitPermit {
            circuit: self,
            guard,
        }
    }

    /// Blocks until the exclusive permit of the circuit is available.
    ///
    /// A panic while holding the permit doesn't poison the circuit, the definition is always left
    /// in a consistent state between edits.
    pub fn lock(&self) -> CircuitPermit<'_> {
        let guard = self
            .0
            .definition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.permit(guard)
    }

    /// Returns the permit if nobody holds it.
    pub fn try_lock(&self) -> Option<CircuitPermit<'_>> {
        let guard = match self.0.definition.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(self.permit(guard))
    }

    /// Returns the thread holding the permit, if any.
    pub fn holder(&self) -> Option<ThreadInfo> {
        self.0
            .holder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs a structural edit with the permit held, blocking until any running step completes.
    pub fn mutate<T, F: FnOnce(&mut CircuitDefinition) -> T>(&self, f: F) -> T {
        let mut permit = self.lock();
        f(&mut permit)
    }

    /// Runs `f` on the definition with the permit held.
    pub fn read<T, F: FnOnce(&CircuitDefinition) -> T>(&self, f: F) -> T {
        let permit = self.lock();
        f(&permit)
    }
}

impl PartialEq for Circuit {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Circuit {}

impl Debug for Circuit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Circuit({}#{})", self.0.name, self.0.serial)
    }
}

/// Exclusive access to the definition of a [Circuit], released on drop.
pub struct CircuitPermit<'a> {
    circuit: &'a Circuit,
    guard: MutexGuard<'a, CircuitDefinition>,
}

impl<'a> CircuitPermit<'a> {
    pub fn circuit(&self) -> &'a Circuit {
        self.circuit
    }
}

impl Deref for CircuitPermit<'_> {
    type Target = CircuitDefinition;
    fn deref(&self) -> &CircuitDefinition {
        &self.guard
    }
}

impl DerefMut for CircuitPermit<'_> {
    fn deref_mut(&mut self) -> &mut CircuitDefinition {
        &mut self.guard
    }
}

impl Drop for CircuitPermit<'_> {
    fn drop(&mut self) {
        // Runs before the guard is released.
        *self
            .circuit
            .0
            .holder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Permits of every circuit a simulation step touches, taken in serial order.
pub struct PermitSet<'a> {
    permits: Vec<CircuitPermit<'a>>,
}

impl<'a> PermitSet<'a> {
    /// Blocks until the permit of every circuit in `circuits` is held.
    pub fn acquire(circuits: &'a [Circuit]) -> PermitSet<'a> {
        let mut order: Vec<&Circuit> = circuits.iter().collect();
        order.sort_by_key(|c| (c.serial(), Arc::as_ptr(&c.0) as usize));
        order.dedup_by(|a, b| a == b);
        PermitSet {
            permits: order.into_iter().map(Circuit::lock).collect(),
        }
    }

    pub fn contains(&self, circuit: &Circuit) -> bool {
        self.permits.iter().any(|p| p.circuit == circuit)
    }

    pub fn circuits(&self) -> impl Iterator<Item = &'a Circuit> + '_ {
        self.permits.iter().map(|p| p.circuit)
    }

    /// Returns the definition of `circuit` if its permit is part of the set.
    ///
    /// Otherwise the [LockViolation] reports the serial of the permit presented in its place:
    /// one for a circuit with the same name or serial, [None] if there is none.
    pub fn definition(&self, circuit: &Circuit) -> std::result::Result<&CircuitDefinition, LockViolation> {
        if let Some(permit) = self.permits.iter().find(|p| p.circuit == circuit) {
            return Ok(&permit.guard);
        }
        let actual_serial = self
            .permits
            .iter()
            .map(|p| p.circuit)
            .find(|c| c.serial() == circuit.serial() || c.name() == circuit.name())
            .map(Circuit::serial);
        Err(LockViolation {
            circuit: circuit.name().into(),
            expected_serial: circuit.serial(),
            actual_serial,
            holder: circuit.holder(),
            requester: ThreadInfo::current(),
        })
    }

    /// Returns true if the subcircuits of every held circuit are held too.
    fn is_closed(&self) -> bool {
        self.permits.iter().all(|permit| {
            permit
                .subcircuits()
                .all(|(_, sub)| self.contains(sub.circuit()))
        })
    }
}

/// Applies the lock violation policy: the violation is always logged, then it either panics or
/// becomes an error depending on [SimConfig::panic_on_lock_violation].
pub(crate) fn enforce<T>(
    config: &SimConfig,
    result: std::result::Result<T, LockViolation>,
) -> Result<T> {
    result.map_err(|violation| {
        error!("{}", violation);
        if config.panic_on_lock_violation {
            panic!("{}", violation);
        }
        SimError::Lock(violation)
    })
}

/// Returns `root` and every circuit instantiated below it, breadth first.
///
/// Circuits are locked one at a time, the calling thread must not hold any of their permits.
pub fn hierarchy(root: &Circuit) -> Vec<Circuit> {
    let mut found = vec![root.clone()];
    let mut queue: VecDeque<Circuit> = VecDeque::new();
    queue.push_back(root.clone());
    while let Some(circuit) = queue.pop_front() {
        let children: Vec<Circuit> = circuit.read(|definition| {
            definition
                .subcircuits()
                .map(|(_, sub)| sub.circuit().clone())
                .collect()
        });
        for child in children {
            if !found.contains(&child) {
                found.push(child.clone());
                queue.push_back(child);
            }
        }
    }
    found
}

/// Runs `f` holding the permits of the whole hierarchy below `root`.
///
/// If the hierarchy changes between discovering and locking it, the permits are released and
/// the hierarchy discovered again.
pub fn with_hierarchy<T, F: FnOnce(&PermitSet<'_>) -> T>(root: &Circuit, f: F) -> T {
    let mut circuits = hierarchy(root);
    loop {
        let permits = PermitSet::acquire(&circuits);
        if permits.is_closed() {
            return f(&permits);
        }
        drop(permits);
        debug!("hierarchy of `{}` changed while locking it, retrying", root.name());
        circuits = hierarchy(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Subcircuit;
    use crate::signal::BitWidth;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_serials() {
        let locks = LockManager::new();
        let a = locks.register(CircuitDefinition::new("a"));
        let b = locks.register(CircuitDefinition::new("b"));
        assert!(a.serial() < b.serial());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_permit_set_order_and_dedup() {
        let locks = LockManager::new();
        let a = locks.register(CircuitDefinition::new("a"));
        let b = locks.register(CircuitDefinition::new("b"));
        let circuits = vec![b.clone(), a.clone(), b.clone()];
        let permits = PermitSet::acquire(&circuits);
        let serials: Vec<u64> = permits.circuits().map(Circuit::serial).collect();
        assert_eq!(serials, vec![a.serial(), b.serial()]);
        assert_eq!(permits.definition(&b).unwrap().name(), "b");
    }

    #[test]
    fn test_missing_permit() {
        let locks = LockManager::new();
        let a = locks.register(CircuitDefinition::new("a"));
        let b = locks.register(CircuitDefinition::new("b"));
        let circuits = vec![a];
        let permits = PermitSet::acquire(&circuits);
        let violation = permits.definition(&b).unwrap_err();
        assert_eq!(violation.expected_serial, b.serial());
        assert_eq!(violation.actual_serial, None);
        assert_eq!(violation.holder, None);
        assert_eq!(violation.requester, ThreadInfo::current());
    }

    #[test]
    fn test_stale_permit() {
        // Same name, different registration: someone replaced the circuit.
        let a = LockManager::new().register(CircuitDefinition::new("top"));
        let b = LockManager::new().register(CircuitDefinition::new("top"));
        let circuits = vec![a.clone()];
        let permits = PermitSet::acquire(&circuits);
        let violation = permits.definition(&b).unwrap_err();
        assert_eq!(violation.actual_serial, Some(a.serial()));

        let config = SimConfig::default().with_panic_on_lock_violation(false);
        let err = enforce(&config, permits.definition(&b)).unwrap_err();
        assert!(matches!(err, SimError::Lock(_)));
    }

    #[test]
    #[should_panic(expected = "lock violation")]
    fn test_violation_panics_when_configured() {
        let a = LockManager::new().register(CircuitDefinition::new("a"));
        let b = LockManager::new().register(CircuitDefinition::new("b"));
        let circuits = vec![a];
        let permits = PermitSet::acquire(&circuits);
        let config = SimConfig::default().with_panic_on_lock_violation(true);
        let _ = enforce(&config, permits.definition(&b));
    }

    #[test]
    fn test_hierarchy() {
        let locks = LockManager::new();
        let leaf = locks.register(CircuitDefinition::new("leaf"));
        let mid = locks.register(CircuitDefinition::new("mid"));
        let top = locks.register(CircuitDefinition::new("top"));

        let leaf_sub = Arc::new(Subcircuit::new(&leaf));
        mid.mutate(|c| c.add_component("l1", leaf_sub.clone())).unwrap();
        mid.mutate(|c| c.add_component("l2", leaf_sub)).unwrap();
        let mid_sub = Arc::new(Subcircuit::new(&mid));
        top.mutate(|c| c.add_component("m", mid_sub)).unwrap();

        let names: Vec<String> = hierarchy(&top).iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["top", "mid", "leaf"]);

        let count = with_hierarchy(&top, |permits| {
            assert!(permits.is_closed());
            permits.circuits().count()
        });
        assert_eq!(count, 3);
    }

    #[test]
    fn test_mutation_waits_for_permit() {
        let circuit = LockManager::new().register(CircuitDefinition::new("c"));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (locked_tx, locked_rx) = mpsc::channel();

        let holder = {
            let circuit = circuit.clone();
            let log = log.clone();
            thread::Builder::new()
                .name("simulation".into())
                .spawn(move || {
                    let permit = circuit.lock();
                    locked_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    log.lock().unwrap().push("step done");
                    drop(permit);
                })
                .unwrap()
        };

        locked_rx.recv().unwrap();
        let holder_info = circuit.holder().unwrap();
        assert_eq!(holder_info.name.as_deref(), Some("simulation"));
        circuit.mutate(|c| c.add_net("a", BitWidth::ONE)).unwrap();
        log.lock().unwrap().push("mutated");
        holder.join().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["step done", "mutated"]);
    }
}
