use std::time::Duration;

/// Default number of time slots a single [step](crate::Simulation::step) drains before the circuit is
/// declared unstable.
pub const DEFAULT_ITERATION_LIMIT: usize = 1000;

/// Default number of final time slots before the iteration limit in which changing nets are
/// blamed for an oscillation.
pub const DEFAULT_OSCILLATION_WINDOW: usize = 32;

/// Settings of a [Simulation](crate::Simulation).
///
/// # Example
/// ```
/// # use logicprop::SimConfig;
/// # use std::time::Duration;
/// let config = SimConfig::default()
///     .with_iteration_limit(100)
///     .with_tick_period(Duration::from_millis(10));
///
/// assert_eq!(config.iteration_limit, 100);
/// assert_eq!(config.oscillation_window, 32);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Time slots drained per step before giving up, it never depends on the size of the circuit.
    pub iteration_limit: usize,
    /// Nets that changed in this many final slots are marked [Logic::Error](crate::Logic::Error)
    /// when a step gives up.
    pub oscillation_window: usize,
    /// Panic on lock violations instead of returning [SimError::Lock](crate::SimError::Lock).
    pub panic_on_lock_violation: bool,
    /// Wall clock pause between ticks in [Simulation::run](crate::Simulation::run).
    pub tick_period: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            oscillation_window: DEFAULT_OSCILLATION_WINDOW,
            panic_on_lock_violation: cfg!(debug_assertions),
            tick_period: Duration::from_secs(0),
        }
    }
}

impl SimConfig {
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit.max(1);
        self
    }

    pub fn with_oscillation_window(mut self, window: usize) -> Self {
        self.oscillation_window = window.max(1);
        self
    }

    pub fn with_panic_on_lock_violation(mut self, panic: bool) -> Self {
        self.panic_on_lock_violation = panic;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }
}
