use std::fmt::{self, Display, Formatter};
use std::thread;
use thiserror::Error;

/// Result type returned by every fallible operation of the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors reported at the boundary of the propagation core.
///
/// Signal conflicts and oscillations are not errors, they are represented with
/// [Logic::Error](crate::Logic::Error) values and [StepStatus::Unstable](crate::StepStatus::Unstable).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid bit width {width}, must be between 1 and {max}")]
    InvalidWidth { width: usize, max: usize },
    #[error("width mismatch: expected {expected} bits, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("bit range {start}..{end} out of bounds for a {width} bit value")]
    BitRange {
        start: usize,
        end: usize,
        width: usize,
    },
    #[error("component `{component}` expects {expected} values, got {actual}")]
    ArityMismatch {
        component: String,
        expected: usize,
        actual: usize,
    },
    #[error("component `{component}` has no port {port}")]
    NoSuchPort { component: String, port: usize },
    #[error("unknown net `{0}`")]
    UnknownNet(String),
    #[error("unknown component `{0}`")]
    UnknownComponent(String),
    #[error("unknown pin `{0}`")]
    UnknownPin(String),
    #[error("unknown circuit `{0}`")]
    UnknownCircuit(String),
    #[error("no component kind named `{0}` is registered")]
    UnknownKind(String),
    #[error("attribute `{name}`: {reason}")]
    Attribute { name: String, reason: String },
    #[error("a {kind} named `{name}` already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("component `{0}` has no instance data of the expected type")]
    MissingData(String),
    #[error("circuit `{0}` is nested more than {1} levels deep, it probably contains itself")]
    Recursion(String, usize),
    #[error("stale {0} handle, it was removed from its circuit")]
    Stale(&'static str),
    #[error("cannot parse `{input}` as a value: {reason}")]
    ParseValue { input: String, reason: String },
    #[error("test vector line {line}: {reason}")]
    TestVector { line: usize, reason: String },
    #[error(transparent)]
    Lock(#[from] LockViolation),
}

/// Identity of a thread taking part in a lock diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: thread::ThreadId,
    pub name: Option<String>,
}

impl ThreadInfo {
    /// Returns the [ThreadInfo] of the calling thread.
    pub fn current() -> Self {
        let current = thread::current();
        ThreadInfo {
            id: current.id(),
            name: current.name().map(String::from),
        }
    }
}

impl Display for ThreadInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({:?})", name, self.id),
            None => write!(f, "{:?}", self.id),
        }
    }
}

/// Broken lock discipline: a state node was about to be touched without the
/// permit of the circuit it reflects, or with a permit for a different circuit.
///
/// This is never a user error, it means two parties believed they had exclusive access.
#[derive(Debug, Clone, PartialEq)]
pub struct LockViolation {
    pub circuit: String,
    pub expected_serial: u64,
    /// Serial of the permit that was presented, [None] if no permit was presented at all.
    pub actual_serial: Option<u64>,
    /// Thread holding the circuit lock at the time of the violation, if any.
    pub holder: Option<ThreadInfo>,
    pub requester: ThreadInfo,
}

impl Display for LockViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lock violation on circuit `{}`: expected permit serial {}, ",
            self.circuit, self.expected_serial
        )?;
        match self.actual_serial {
            Some(actual) => write!(f, "got serial {}", actual)?,
            None => write!(f, "no permit held")?,
        }
        write!(f, "; requested by {}", self.requester)?;
        match &self.holder {
            Some(holder) => write!(f, ", lock held by {}", holder),
            None => write!(f, ", lock not held by anyone"),
        }
    }
}

impl std::error::Error for LockViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_violation_display() {
        let violation = LockViolation {
            circuit: "alu".into(),
            expected_serial: 3,
            actual_serial: Some(7),
            holder: None,
            requester: ThreadInfo::current(),
        };
        let text = violation.to_string();
        assert!(text.contains("circuit `alu`"), "{}", text);
        assert!(text.contains("expected permit serial 3"), "{}", text);
        assert!(text.contains("got serial 7"), "{}", text);
        assert!(text.contains("lock not held by anyone"), "{}", text);
    }

    #[test]
    fn test_lock_violation_converts() {
        let violation = LockViolation {
            circuit: "top".into(),
            expected_serial: 1,
            actual_serial: None,
            holder: Some(ThreadInfo::current()),
            requester: ThreadInfo::current(),
        };
        let err: SimError = violation.clone().into();
        assert_eq!(err, SimError::Lock(violation));
        assert!(err.to_string().contains("no permit held"));
    }
}
