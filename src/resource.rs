use delegate::delegate;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::Request;
use crate::stats;
use crate::{EntityId, ResourceId};

/// Admission discipline of a resource, fixed at construction time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::ToString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Strict arrival order with head-of-line blocking.
    Fifo,
    /// Ordered by `(priority, arrival, amount)`, scanning past requests that
    /// do not fit.
    Priority,
    /// Single-unit resource whose holder can be preempted by a
    /// strictly-better-ranked claimant.
    Preemptive,
}

/// One status snapshot of a resource, appended on every capacity change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatusRecord {
    /// When the snapshot was taken.
    pub time: f64,
    /// Units in use.
    pub in_use: u32,
    /// Units idle (available).
    pub idle: u32,
    /// Requests waiting.
    pub queue_length: u32,
}

/// One completed queue episode: an entity waited for the resource from
/// `start_waiting` until its request was granted at `end_waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// The claimant.
    pub entity: EntityId,
    /// When the request arrived.
    pub start_waiting: f64,
    /// When the request was granted.
    pub end_waiting: f64,
    /// Units requested.
    pub amount: u32,
}

/// Shared bookkeeping: the capacity pool and both logs. The admission
/// policies only decide *which* request moves; every unit movement goes
/// through here so `level + in_use` can never drift.
#[derive(Debug)]
struct Core {
    id: ResourceId,
    name: String,
    capacity: u32,
    level: u32,
    in_use: u32,
    queue_length: u32,
    status_log: Vec<ResourceStatusRecord>,
    queue_log: Vec<QueueRecord>,
}

impl Core {
    fn snapshot(&mut self, time: f64) {
        debug_assert!(self.level + self.in_use <= self.capacity);
        self.status_log.push(ResourceStatusRecord {
            time,
            in_use: self.in_use,
            idle: self.level,
            queue_length: self.queue_length,
        });
    }

    fn grant(&mut self, request: &Request, time: f64) {
        self.level -= request.amount();
        self.in_use += request.amount();
        self.queue_length -= 1;
        self.queue_log.push(QueueRecord {
            entity: request.entity(),
            start_waiting: request.arrival(),
            end_waiting: time,
            amount: request.amount(),
        });
        self.snapshot(time);
    }

    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn in_use(&self) -> u32 {
        self.in_use
    }

    fn queue_length(&self) -> u32 {
        self.queue_length
    }

    fn status_log(&self) -> &[ResourceStatusRecord] {
        &self.status_log
    }

    fn queue_log(&self) -> &[QueueRecord] {
        &self.queue_log
    }
}

#[derive(Debug)]
enum Policy {
    Fifo,
    Priority,
    Preemptive { holder: Option<Request> },
}

/// A capacity-limited pool of interchangeable units with a pending-request
/// queue.
///
/// The admission discipline is selected at construction
/// ([`Environment::add_fifo_resource`](crate::Environment::add_fifo_resource)
/// and friends); callers interact with every kind through the same
/// `get`/`put`/`add` contract on [`Context`](crate::Context).
#[derive(Debug)]
pub struct Resource {
    core: Core,
    policy: Policy,
    pending: Vec<Request>,
}

impl Resource {
    pub(crate) fn new(
        id: ResourceId,
        name: &str,
        kind: ResourceKind,
        init: u32,
        capacity: u32,
    ) -> Result<Self> {
        if init > capacity {
            return Err(Error::CapacityViolation {
                resource: id,
                message: format!("initial level {} exceeds capacity {}", init, capacity),
            });
        }
        let policy = match kind {
            ResourceKind::Fifo => Policy::Fifo,
            ResourceKind::Priority => Policy::Priority,
            ResourceKind::Preemptive => Policy::Preemptive { holder: None },
        };
        let mut core = Core {
            id,
            name: format!("{}({})", name, id),
            capacity,
            level: init,
            in_use: 0,
            queue_length: 0,
            status_log: Vec::new(),
            queue_log: Vec::new(),
        };
        core.snapshot(0.0);
        Ok(Self {
            core,
            policy,
            pending: Vec::new(),
        })
    }

    delegate! {
        to self.core {
            /// The resource's ID.
            pub fn id(&self) -> ResourceId;
            /// The resource's display name, including its ID suffix.
            pub fn name(&self) -> &str;
            /// Maximum number of units the resource may ever own.
            pub fn capacity(&self) -> u32;
            /// Units currently available.
            pub fn level(&self) -> u32;
            /// Units currently in use.
            pub fn in_use(&self) -> u32;
            /// Requests currently waiting.
            pub fn queue_length(&self) -> u32;
            /// The status log: one snapshot per capacity change.
            pub fn status_log(&self) -> &[ResourceStatusRecord];
            /// The queue log: one record per granted request.
            pub fn queue_log(&self) -> &[QueueRecord];
        }
    }

    /// The admission discipline.
    pub fn kind(&self) -> ResourceKind {
        match self.policy {
            Policy::Fifo => ResourceKind::Fifo,
            Policy::Priority => ResourceKind::Priority,
            Policy::Preemptive { .. } => ResourceKind::Preemptive,
        }
    }

    /// The entity currently holding a preemptive resource, if any.
    pub fn holder(&self) -> Option<EntityId> {
        match &self.policy {
            Policy::Preemptive { holder } => holder.as_ref().map(Request::entity),
            _ => None,
        }
    }

    /// Appends `request` to the pending queue, in arrival order for FIFO
    /// resources and in priority-key order otherwise. Equal keys keep
    /// arrival order.
    pub(crate) fn enqueue(&mut self, request: Request, now: f64) {
        self.core.queue_length += 1;
        self.core.snapshot(now);
        match self.policy {
            Policy::Fifo => self.pending.push(request),
            Policy::Priority | Policy::Preemptive { .. } => {
                let key = request.key();
                let index = self.pending.partition_point(|queued| queued.key() <= key);
                self.pending.insert(index, request);
            }
        }
    }

    /// Grants as many pending requests as the current level allows, per the
    /// admission discipline, and returns them for claimant-side bookkeeping.
    pub(crate) fn admit(&mut self, now: f64) -> Vec<Request> {
        let mut granted = Vec::new();
        match &mut self.policy {
            Policy::Fifo => {
                // Head-of-line blocking: stop at the first request that does
                // not fit, even if a later one would.
                while let Some(front) = self.pending.first() {
                    if front.amount() > self.core.level {
                        break;
                    }
                    let request = self.pending.remove(0);
                    self.core.grant(&request, now);
                    granted.push(request);
                }
            }
            Policy::Priority => {
                // Scan the whole queue from the best-ranked end; a request
                // that does not fit must not block a later one that does.
                let mut index = 0;
                while index < self.pending.len() {
                    if self.pending[index].amount() <= self.core.level {
                        let request = self.pending.remove(index);
                        self.core.grant(&request, now);
                        granted.push(request);
                    } else {
                        index += 1;
                    }
                }
            }
            Policy::Preemptive { holder } => {
                if holder.is_none() && self.core.level > 0 && !self.pending.is_empty() {
                    let mut request = self.pending.remove(0);
                    self.core.grant(&request, now);
                    request.set_granted_at(now);
                    *holder = Some(request.clone());
                    granted.push(request);
                }
            }
        }
        granted
    }

    /// Force-releases the current holder if the incoming key is strictly
    /// better. The returned victim request has already had its units
    /// returned to the pool.
    pub(crate) fn try_preempt(
        &mut self,
        incoming_key: (i32, ordered_float::OrderedFloat<f64>, u32, bool),
        now: f64,
    ) -> Option<Request> {
        let victim = match &mut self.policy {
            Policy::Preemptive { holder } => {
                if holder.as_ref().map_or(false, |held| incoming_key < held.key()) {
                    holder.take()
                } else {
                    None
                }
            }
            _ => None,
        }?;
        self.release(victim.amount(), now);
        Some(victim)
    }

    /// Returns `amount` units to the available pool.
    pub(crate) fn release(&mut self, amount: u32, now: f64) {
        debug_assert!(self.core.in_use >= amount);
        self.core.in_use -= amount;
        self.core.level += amount;
        self.core.snapshot(now);
    }

    /// Takes the holder record of a preemptive resource if `entity` is the
    /// current holder.
    pub(crate) fn take_holder_if(&mut self, entity: EntityId) -> Option<Request> {
        match &mut self.policy {
            Policy::Preemptive { holder } => {
                if holder.as_ref().map_or(false, |held| held.entity() == entity) {
                    holder.take()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Adds `amount` fresh units to the available pool.
    pub(crate) fn add_units(&mut self, amount: u32, now: f64) -> Result<()> {
        if self.core.level + self.core.in_use + amount > self.core.capacity {
            return Err(Error::CapacityViolation {
                resource: self.core.id,
                message: format!(
                    "adding {} units to {} in use and {} idle exceeds capacity {}",
                    amount, self.core.in_use, self.core.level, self.core.capacity
                ),
            });
        }
        self.core.level += amount;
        self.core.snapshot(now);
        Ok(())
    }

    /// Closes the status log with a snapshot at `now`, so time-weighted
    /// statistics account for the stretch after the last capacity change.
    pub(crate) fn close_log(&mut self, now: f64) {
        if self
            .core
            .status_log
            .last()
            .map_or(true, |record| record.time < now)
        {
            self.core.snapshot(now);
        }
    }

    /// Removes the pending request matching `(entity, amount)`, if any.
    pub(crate) fn cancel_pending(
        &mut self,
        entity: EntityId,
        amount: u32,
        now: f64,
    ) -> Option<Request> {
        let index = self
            .pending
            .iter()
            .position(|request| request.matches(entity, amount))?;
        let request = self.pending.remove(index);
        self.core.queue_length -= 1;
        self.core.snapshot(now);
        Some(request)
    }

    /// Checks whether a request matching `(entity, amount)` is pending.
    pub fn is_pending(&self, entity: EntityId, amount: u32) -> bool {
        self.pending
            .iter()
            .any(|request| request.matches(entity, amount))
    }

    /// Waiting durations of all granted requests.
    pub fn waiting_time(&self) -> Array1<f64> {
        Array1::from(
            self.queue_log()
                .iter()
                .map(|record| record.end_waiting - record.start_waiting)
                .collect::<Vec<_>>(),
        )
    }

    /// Fraction of owned units in use, averaged over the logged window.
    pub fn average_utilization(&self) -> f64 {
        stats::average_utilization(self.status_log())
    }

    /// Complement of [`average_utilization`](Self::average_utilization).
    pub fn average_idleness(&self) -> f64 {
        1.0 - self.average_utilization()
    }

    /// Average number of waiting requests over the logged window.
    pub fn average_queue_length(&self) -> f64 {
        stats::average_queue_length(self.queue_log(), self.status_log())
    }

    /// Total time-weighted units in use.
    pub fn total_time_in_use(&self) -> f64 {
        stats::total_time_in_use(self.status_log())
    }

    /// Total time-weighted units idle.
    pub fn total_time_idle(&self) -> f64 {
        stats::total_time_idle(self.status_log())
    }

    /// Average number of idle units over the logged window.
    pub fn average_level(&self) -> f64 {
        stats::average_level(self.status_log())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::EventId;

    fn request(entity: usize, amount: u32, priority: i32, arrival: f64, preempt: bool) -> Request {
        Request::new(
            EntityId::from(entity),
            amount,
            priority,
            preempt,
            arrival,
            EventId::from(entity),
        )
    }

    fn fifo(init: u32, capacity: u32) -> Resource {
        Resource::new(ResourceId::from(0), "r", ResourceKind::Fifo, init, capacity).unwrap()
    }

    fn priority(init: u32, capacity: u32) -> Resource {
        Resource::new(
            ResourceId::from(0),
            "r",
            ResourceKind::Priority,
            init,
            capacity,
        )
        .unwrap()
    }

    fn preemptive() -> Resource {
        Resource::new(ResourceId::from(0), "r", ResourceKind::Preemptive, 1, 1).unwrap()
    }

    #[test]
    fn test_fifo_head_of_line_blocks() {
        let mut res = fifo(2, 10);
        res.enqueue(request(0, 3, 1, 0.0, false), 0.0);
        res.enqueue(request(1, 1, 1, 1.0, false), 1.0);
        // The 1-unit request would fit, but the head does not.
        assert!(res.admit(1.0).is_empty());
        res.add_units(1, 2.0).unwrap();
        let granted = res.admit(2.0);
        assert_eq!(
            granted.iter().map(Request::entity).collect::<Vec<_>>(),
            vec![EntityId::from(0)]
        );
        assert_eq!(res.level(), 0);
    }

    #[test]
    fn test_priority_scans_past_blocked_requests() {
        let mut res = priority(2, 10);
        res.enqueue(request(0, 3, 0, 0.0, false), 0.0);
        res.enqueue(request(1, 1, 1, 1.0, false), 1.0);
        // The high-priority request does not fit, but the later one does.
        let granted = res.admit(1.0);
        assert_eq!(
            granted.iter().map(Request::entity).collect::<Vec<_>>(),
            vec![EntityId::from(1)]
        );
        assert!(res.is_pending(EntityId::from(0), 3));
    }

    #[test]
    fn test_priority_tie_breaks() {
        let mut res = priority(0, 10);
        res.enqueue(request(0, 2, 1, 0.0, false), 0.0);
        res.enqueue(request(1, 1, 1, 0.0, false), 0.0);
        res.enqueue(request(2, 1, 0, 1.0, false), 1.0);
        res.add_units(4, 2.0).unwrap();
        let granted = res.admit(2.0);
        // Lower priority first, then same-time arrivals by smaller amount.
        assert_eq!(
            granted.iter().map(Request::entity).collect::<Vec<_>>(),
            vec![
                EntityId::from(2),
                EntityId::from(1),
                EntityId::from(0)
            ]
        );
    }

    #[test]
    fn test_preemptive_grants_single_holder() {
        let mut res = preemptive();
        res.enqueue(request(0, 1, 1, 0.0, false), 0.0);
        res.enqueue(request(1, 1, 0, 0.5, false), 0.5);
        let granted = res.admit(0.5);
        // The better-ranked request wins; the resource then stays held.
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].entity(), EntityId::from(1));
        assert_eq!(res.holder(), Some(EntityId::from(1)));
        assert!(res.admit(0.5).is_empty());
    }

    #[test]
    fn test_try_preempt_requires_strictly_better_key() {
        let mut res = preemptive();
        res.enqueue(request(0, 1, 0, 0.0, true), 0.0);
        res.admit(0.0);

        let equal = request(1, 1, 0, 0.0, true);
        assert!(res.try_preempt(equal.key(), 1.0).is_none());

        let better = request(2, 1, -1, 1.0, true);
        let victim = res.try_preempt(better.key(), 1.0).unwrap();
        assert_eq!(victim.entity(), EntityId::from(0));
        assert_eq!(res.level(), 1);
        assert_eq!(res.holder(), None);
    }

    #[test]
    fn test_cancel_pending_matches_identity() {
        let mut res = priority(0, 10);
        res.enqueue(request(0, 2, 5, 0.0, false), 0.0);
        assert!(res.cancel_pending(EntityId::from(0), 1, 1.0).is_none());
        let removed = res.cancel_pending(EntityId::from(0), 2, 1.0).unwrap();
        assert_eq!(removed.amount(), 2);
        assert_eq!(res.queue_length(), 0);
    }

    #[test]
    fn test_add_units_respects_capacity() {
        let mut res = fifo(1, 2);
        res.add_units(1, 0.0).unwrap();
        assert!(matches!(
            res.add_units(1, 0.0),
            Err(Error::CapacityViolation { .. })
        ));
    }

    #[test]
    fn test_conservation_across_grants_and_releases() {
        let mut res = fifo(3, 3);
        res.enqueue(request(0, 2, 1, 0.0, false), 0.0);
        res.enqueue(request(1, 1, 1, 0.0, false), 0.0);
        res.admit(0.0);
        res.release(2, 5.0);
        res.release(1, 6.0);
        for record in res.status_log() {
            assert_eq!(record.in_use + record.idle, 3);
        }
    }
}
