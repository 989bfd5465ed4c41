use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr};

use ordered_float::OrderedFloat;

use crate::process::Cause;
use crate::{ActivityId, EntityId, EventId, ProcessId, ResourceId};

/// State of an event in the environment's event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventState {
    Pending,
    Fired,
    Cancelled,
}

/// Book-keeping for one event.
///
/// `waiters` holds every process suspended on a condition referencing this
/// event; a completion event in particular can be waited on by any number of
/// processes at once. `entry_seq` ties the event to its live heap entry, if
/// any; a popped entry whose sequence number no longer matches is stale and
/// is skipped. This is how rescheduling an interrupted activity invalidates
/// the old timer.
#[derive(Debug)]
pub(crate) struct EventRecord {
    pub state: EventState,
    pub waiters: Vec<ProcessId>,
    pub entry_seq: Option<u64>,
}

impl EventRecord {
    pub fn new() -> Self {
        Self {
            state: EventState::Pending,
            waiters: Vec::new(),
            entry_seq: None,
        }
    }
}

/// What the environment does when a heap entry is dispatched.
#[derive(Debug, Clone)]
pub(crate) enum Action {
    /// Fire a plain timer event.
    Fire(EventId),
    /// Log the end of an activity, then fire its completion event.
    FinishActivity {
        entity: EntityId,
        activity: ActivityId,
        event: EventId,
    },
    /// Re-run a resource's admission scan.
    Scan(ResourceId),
    /// First activation of a freshly spawned process.
    Start(ProcessId),
    /// Resume a suspended process.
    Resume(ProcessId, Cause),
}

/// Entry in the environment's event queue.
///
/// Entries are ordered by `(time, seq)`; the sequence number breaks ties in
/// insertion order, so equal-time events replay deterministically.
#[derive(Debug)]
pub(crate) struct EventEntry {
    pub time: OrderedFloat<f64>,
    pub seq: u64,
    pub action: Action,
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that the std max-heap pops the earliest entry.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A wait condition over one or more events.
///
/// A process suspends on exactly one condition at a time. An `AnyOf`
/// condition resumes the process as soon as any sub-condition is satisfied;
/// the losing events are deliberately *not* cancelled, so a resumed process
/// racing two resource requests must inspect
/// [`Context::is_pending`](crate::Context::is_pending) and cancel the loser
/// itself.
///
/// Conditions compose with `|` and `&`:
///
/// ```
/// # use simpm::Condition;
/// # use simpm::EventId;
/// let a = Condition::Event(EventId::from(0));
/// let b = Condition::Event(EventId::from(1));
/// let either = a.clone() | b.clone();
/// let both = a & b;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// A single event.
    Event(EventId),
    /// Satisfied as soon as any sub-condition is satisfied.
    AnyOf(Vec<Condition>),
    /// Satisfied only once all sub-conditions are satisfied.
    AllOf(Vec<Condition>),
}

impl Condition {
    /// Collects every event referenced by this condition.
    pub(crate) fn leaves(&self, out: &mut Vec<EventId>) {
        match self {
            Condition::Event(id) => out.push(*id),
            Condition::AnyOf(subs) | Condition::AllOf(subs) => {
                for sub in subs {
                    sub.leaves(out);
                }
            }
        }
    }

    /// Evaluates the condition against the given fired-predicate.
    pub(crate) fn satisfied<F: Fn(EventId) -> bool>(&self, fired: &F) -> bool {
        match self {
            Condition::Event(id) => fired(*id),
            Condition::AnyOf(subs) => subs.iter().any(|sub| sub.satisfied(fired)),
            Condition::AllOf(subs) => subs.iter().all(|sub| sub.satisfied(fired)),
        }
    }
}

impl From<EventId> for Condition {
    fn from(id: EventId) -> Self {
        Condition::Event(id)
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::AnyOf(mut lhs), Condition::AnyOf(rhs)) => {
                lhs.extend(rhs);
                Condition::AnyOf(lhs)
            }
            (Condition::AnyOf(mut lhs), rhs) => {
                lhs.push(rhs);
                Condition::AnyOf(lhs)
            }
            (lhs, Condition::AnyOf(mut rhs)) => {
                rhs.insert(0, lhs);
                Condition::AnyOf(rhs)
            }
            (lhs, rhs) => Condition::AnyOf(vec![lhs, rhs]),
        }
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::AllOf(mut lhs), Condition::AllOf(rhs)) => {
                lhs.extend(rhs);
                Condition::AllOf(lhs)
            }
            (Condition::AllOf(mut lhs), rhs) => {
                lhs.push(rhs);
                Condition::AllOf(lhs)
            }
            (lhs, Condition::AllOf(mut rhs)) => {
                rhs.insert(0, lhs);
                Condition::AllOf(rhs)
            }
            (lhs, rhs) => Condition::AllOf(vec![lhs, rhs]),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BinaryHeap;

    fn entry(time: f64, seq: u64) -> EventEntry {
        EventEntry {
            time: OrderedFloat(time),
            seq,
            action: Action::Fire(EventId::from(0)),
        }
    }

    #[test]
    fn test_heap_pops_by_time_then_seq() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(5.0, 2));
        heap.push(entry(1.0, 1));
        heap.push(entry(1.0, 0));
        heap.push(entry(3.0, 3));

        let order: Vec<(f64, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|e| (e.time.into_inner(), e.seq))
            .collect();
        assert_eq!(order, vec![(1.0, 0), (1.0, 1), (3.0, 3), (5.0, 2)]);
    }

    #[test]
    fn test_any_of_and_all_of() {
        let a = Condition::Event(EventId::from(0));
        let b = Condition::Event(EventId::from(1));
        let c = Condition::Event(EventId::from(2));

        let any = a.clone() | b.clone() | c.clone();
        assert_eq!(
            any,
            Condition::AnyOf(vec![a.clone(), b.clone(), c.clone()])
        );

        let all = a.clone() & b.clone() & c.clone();
        assert_eq!(all, Condition::AllOf(vec![a, b, c]));
    }

    #[test]
    fn test_satisfied() {
        let fired = |id: EventId| usize::from(id) == 1;
        let a = Condition::Event(EventId::from(0));
        let b = Condition::Event(EventId::from(1));

        assert!(!a.clone().satisfied(&fired));
        assert!(b.clone().satisfied(&fired));
        assert!((a.clone() | b.clone()).satisfied(&fired));
        assert!(!(a & b).satisfied(&fired));
    }

    #[test]
    fn test_leaves() {
        let cond = (Condition::Event(EventId::from(0)) | Condition::Event(EventId::from(1)))
            & Condition::Event(EventId::from(2));
        let mut leaves = Vec::new();
        cond.leaves(&mut leaves);
        assert_eq!(
            leaves,
            vec![EventId::from(0), EventId::from(1), EventId::from(2)]
        );
    }
}
