use super::lock::Circuit;
use super::simulation::Simulation;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::signal::Value;
use log::debug;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One row of a [TestVector], [None] where the row doesn't care.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRow {
    /// Line of the row in the source text, starting at 1.
    pub line: usize,
    pub values: Vec<Option<Value>>,
}

/// Table of input values and expected outputs for the pins of a circuit.
///
/// The first line names a pin per column, every following line is a row of values in the
/// format [Value] parses. For each row the input pins are set, the simulation steps, then every
/// output pin is checked. `x` bits of an expected value match anything, a lone `x` skips the
/// column. Blank lines and lines starting with `#` are ignored.
///
/// # Example
/// ```
/// # use logicprop::{LockManager, CircuitDefinition, TestVector, SimConfig, BitWidth};
/// let mut c = CircuitDefinition::new("xor");
/// let w = BitWidth::ONE;
/// let (a, b, y) = (c.add_net("a", w).unwrap(), c.add_net("b", w).unwrap(), c.add_net("y", w).unwrap());
/// c.input_pin("a", a).unwrap();
/// c.input_pin("b", b).unwrap();
/// c.output_pin("y", y).unwrap();
/// c.xor2("g", a, b, y).unwrap();
/// let circuit = LockManager::new().register(c);
///
/// let vector: TestVector = "
///     a b y
///     0 0 0
///     0 1 1
///     1 1 1
///     1 0 x
/// ".parse().unwrap();
///
/// let report = vector.run(&circuit, SimConfig::default()).unwrap();
/// assert_eq!(report.rows, 4);
/// assert_eq!(report.failures.len(), 1);
/// assert_eq!(report.failures[0].line, 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TestVector {
    pins: Vec<String>,
    rows: Vec<TestRow>,
}

impl TestVector {
    pub fn pins(&self) -> &[String] {
        &self.pins
    }

    pub fn rows(&self) -> &[TestRow] {
        &self.rows
    }

    /// Runs every row on a fresh simulation of `circuit`.
    pub fn run(&self, circuit: &Circuit, config: SimConfig) -> Result<TestReport> {
        let mut sim = Simulation::new(circuit, config)?;
        let inputs = self
            .pins
            .iter()
            .map(|pin| sim.is_input(pin))
            .collect::<Result<Vec<bool>>>()?;

        let mut report = TestReport::default();
        for row in self.rows.iter() {
            for ((pin, value), input) in self.pins.iter().zip(&row.values).zip(&inputs) {
                if let (true, Some(value)) = (*input, value) {
                    sim.set_input(pin, value.clone())?;
                }
            }
            if !sim.step()?.status.is_converged() {
                report.unstable.push(row.line);
            }
            for ((pin, expected), input) in self.pins.iter().zip(&row.values).zip(&inputs) {
                let expected = match (*input, expected) {
                    (false, Some(expected)) => expected,
                    _ => continue,
                };
                let actual = sim.output(pin)?;
                if !actual.matches(expected) {
                    report.failures.push(TestFailure {
                        line: row.line,
                        pin: pin.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
            report.rows += 1;
        }
        debug!(
            "test vector on `{}`: {} rows, {} failures",
            circuit.name(),
            report.rows,
            report.failures.len()
        );
        Ok(report)
    }
}

impl FromStr for TestVector {
    type Err = SimError;

    fn from_str(s: &str) -> Result<TestVector> {
        let mut lines = s
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));
        let pins: Vec<String> = match lines.next() {
            Some((_, header)) => header.split_whitespace().map(String::from).collect(),
            None => {
                return Err(SimError::TestVector {
                    line: 1,
                    reason: "missing header".into(),
                })
            }
        };

        let mut rows = Vec::new();
        for (line, text) in lines {
            let values = text
                .split_whitespace()
                .map(|cell| match cell {
                    "x" | "X" => Ok(None),
                    _ => cell.parse().map(Some),
                })
                .collect::<Result<Vec<Option<Value>>>>()
                .map_err(|e| SimError::TestVector {
                    line,
                    reason: e.to_string(),
                })?;
            if values.len() != pins.len() {
                return Err(SimError::TestVector {
                    line,
                    reason: format!("expected {} values, got {}", pins.len(), values.len()),
                });
            }
            rows.push(TestRow { line, values });
        }
        Ok(TestVector { pins, rows })
    }
}

/// An output pin that didn't have the expected value.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub line: usize,
    pub pin: String,
    pub expected: Value,
    pub actual: Value,
}

impl Display for TestFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: pin `{}` is {}, expected {}",
            self.line, self.pin, self.actual, self.expected
        )
    }
}

/// Outcome of [TestVector::run].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestReport {
    pub rows: usize,
    pub failures: Vec<TestFailure>,
    /// Lines of the rows whose step didn't settle.
    pub unstable: Vec<usize>,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.unstable.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitDefinition;
    use crate::signal::BitWidth;
    use crate::sim::LockManager;

    fn adder() -> Circuit {
        let mut c = CircuitDefinition::new("half_adder");
        let w = BitWidth::ONE;
        let a = c.add_net("a", w).unwrap();
        let b = c.add_net("b", w).unwrap();
        let s = c.add_net("s", w).unwrap();
        let carry = c.add_net("c", w).unwrap();
        c.input_pin("a", a).unwrap();
        c.input_pin("b", b).unwrap();
        c.output_pin("s", s).unwrap();
        c.output_pin("c", carry).unwrap();
        c.xor2("x", a, b, s).unwrap();
        c.and2("g", a, b, carry).unwrap();
        LockManager::new().register(c)
    }

    #[test]
    fn test_parse() {
        let vector: TestVector = "# half adder\na b s c\n\n0 0 0 0\n1 1 0 1\n".parse().unwrap();
        assert_eq!(vector.pins(), &["a", "b", "s", "c"]);
        assert_eq!(vector.rows().len(), 2);
        assert_eq!(vector.rows()[1].line, 5);

        let err = "a b\n0 1 1".parse::<TestVector>().unwrap_err();
        assert!(matches!(err, SimError::TestVector { line: 2, .. }));
        let err = "a\n2".parse::<TestVector>().unwrap_err();
        assert!(matches!(err, SimError::TestVector { line: 2, .. }));
        assert!("# nothing".parse::<TestVector>().is_err());
    }

    #[test]
    fn test_half_adder_passes() {
        let vector: TestVector = "a b s c\n0 0 0 0\n0 1 1 0\n1 0 1 0\n1 1 0 1\n".parse().unwrap();
        let report = vector.run(&adder(), SimConfig::default()).unwrap();
        assert!(report.passed(), "{:?}", report);
        assert_eq!(report.rows, 4);
    }

    #[test]
    fn test_failures_are_reported() {
        let vector: TestVector = "a b s c\n1 1 1 x\n1 1 0 0\n".parse().unwrap();
        let report = vector.run(&adder(), SimConfig::default()).unwrap();
        let failures: Vec<String> = report.failures.iter().map(|f| f.to_string()).collect();
        assert_eq!(
            failures,
            vec![
                "line 2: pin `s` is 0, expected 1",
                "line 3: pin `c` is 1, expected 0"
            ]
        );
        assert!(!report.passed());
    }

    #[test]
    fn test_unknown_pin() {
        let vector: TestVector = "a q\n0 0\n".parse().unwrap();
        assert_eq!(
            vector.run(&adder(), SimConfig::default()),
            Err(SimError::UnknownPin("q".into()))
        );
    }
}
