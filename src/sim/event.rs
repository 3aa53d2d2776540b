use super::NodeId;
use crate::circuit::ComponentId;
use crate::signal::Value;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// What happens to the target component of an [Event].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The component asserts `value` on its output `port`.
    Drive { port: usize, value: Value },
    /// The component reads its inputs again.
    Recompute,
    /// An input pin takes a new value.
    Input(Value),
    /// A clock flips its level.
    Toggle,
}

/// Pending action on a component of a state node, at an abstract time.
#[derive(Debug, Clone)]
pub struct Event {
    pub time: u64,
    /// Insertion order, breaks ties between events of the same time.
    pub seq: u64,
    pub node: NodeId,
    pub component: ComponentId,
    pub action: Action,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Events are totally ordered by `(time, seq)`.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// Min queue of [Event]s.
///
/// # Example
/// ```
/// # use logicprop::EventQueue;
/// let mut queue = EventQueue::new();
/// assert_eq!(queue.next_time(), None);
/// assert!(queue.pop_batch().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        Default::default()
    }

    /// Schedules `action` on `component` of `node` at `time`.
    pub fn push(&mut self, time: u64, node: NodeId, component: ComponentId, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Event {
            time,
            seq,
            node,
            component,
            action,
        }));
    }

    /// Returns the time of the earliest pending event.
    pub fn next_time(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Removes and returns every event scheduled at the earliest pending time, in insertion order.
    ///
    /// Events pushed for that same time afterwards form the next batch.
    pub fn pop_batch(&mut self) -> Vec<Event> {
        let mut batch = Vec::new();
        let time = match self.next_time() {
            Some(time) => time,
            None => return batch,
        };
        while self.next_time() == Some(time) {
            if let Some(Reverse(event)) = self.heap.pop() {
                batch.push(event);
            }
        }
        batch
    }

    /// Discards every pending event, returns how many there were.
    pub fn clear(&mut self) -> usize {
        let len = self.heap.len();
        self.heap.clear();
        len
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
