use ordered_float::OrderedFloat;

use crate::{EntityId, EventId};

/// One outstanding claim against a resource.
///
/// A request is created pending, and either granted by an admission scan
/// (its grant event fires and the claimed amount moves into the claimant's
/// held set), cancelled explicitly, or — for a granted claim on a preemptive
/// resource — forcibly released in favor of a better-ranked claimant.
#[derive(Debug, Clone)]
pub struct Request {
    entity: EntityId,
    amount: u32,
    priority: i32,
    preempt: bool,
    arrival: f64,
    grant: EventId,
    granted_at: Option<f64>,
}

impl Request {
    pub(crate) fn new(
        entity: EntityId,
        amount: u32,
        priority: i32,
        preempt: bool,
        arrival: f64,
        grant: EventId,
    ) -> Self {
        Self {
            entity,
            amount,
            priority,
            preempt,
            arrival,
            grant,
            granted_at: None,
        }
    }

    /// The claimant.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Number of units claimed.
    pub fn amount(&self) -> u32 {
        self.amount
    }

    /// Priority of the claim; lower values win. Ignored by FIFO resources.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the claim may preempt a worse-ranked holder.
    pub fn preempt(&self) -> bool {
        self.preempt
    }

    /// Simulation time at which the request was made.
    pub fn arrival(&self) -> f64 {
        self.arrival
    }

    pub(crate) fn grant(&self) -> EventId {
        self.grant
    }

    pub(crate) fn granted_at(&self) -> Option<f64> {
        self.granted_at
    }

    pub(crate) fn set_granted_at(&mut self, time: f64) {
        self.granted_at = Some(time);
    }

    /// Ordering key for priority and preemptive queues: lower priority value
    /// wins, ties broken by earlier arrival, then by smaller amount, then by
    /// preferring preemptive requests.
    pub(crate) fn key(&self) -> (i32, OrderedFloat<f64>, u32, bool) {
        (
            self.priority,
            OrderedFloat(self.arrival),
            self.amount,
            !self.preempt,
        )
    }

    /// Identity used by `cancel` and `is_pending`. The ordering key is not
    /// injective, so lookups match on `(claimant, amount)` instead.
    pub(crate) fn matches(&self, entity: EntityId, amount: u32) -> bool {
        self.entity == entity && self.amount == amount
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn request(priority: i32, arrival: f64, amount: u32, preempt: bool) -> Request {
        Request::new(
            EntityId::from(0),
            amount,
            priority,
            preempt,
            arrival,
            EventId::from(0),
        )
    }

    #[rstest(
        winner,
        loser,
        case(request(0, 1.0, 1, false), request(1, 0.0, 1, false)),
        case(request(2, 1.0, 1, false), request(2, 2.0, 1, false)),
        case(request(2, 1.0, 1, false), request(2, 1.0, 3, false)),
        case(request(2, 1.0, 1, true), request(2, 1.0, 1, false))
    )]
    fn test_key_orders_winner_first(winner: Request, loser: Request) {
        assert!(winner.key() < loser.key());
    }

    #[test]
    fn test_matches_ignores_priority() {
        let req = request(3, 1.0, 2, false);
        assert!(req.matches(EntityId::from(0), 2));
        assert!(!req.matches(EntityId::from(0), 1));
        assert!(!req.matches(EntityId::from(1), 2));
    }
}
