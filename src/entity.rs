use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::{ActivityId, EntityId, EventId, ProcessId, ResourceId};

/// Status codes recorded in an entity's status log.
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
pub enum EntityStatus {
    /// Started waiting for a resource.
    WaitFor,
    /// A pending request was granted.
    Get,
    /// An activity started.
    Start,
    /// An activity finished (or was cut short by a preemption).
    Finish,
    /// Units were released back to a resource.
    Put,
    /// Units were added to a resource's available pool.
    Add,
}

/// What a status record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// A named activity of the owning entity.
    Activity(ActivityId),
    /// A resource the owning entity interacted with.
    Resource(ResourceId),
}

/// One planned activity execution: `(activity, start, planned finish)`.
///
/// The finish time is the one scheduled at the start; a preempted activity
/// keeps its planned finish here, while the actual early finish shows up in
/// the status log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    /// Activity that ran.
    pub activity: ActivityId,
    /// When it started.
    pub start: f64,
    /// When it was scheduled to finish.
    pub finish: f64,
}

/// One entity status transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityStatusRecord {
    /// When the transition happened.
    pub time: f64,
    /// What happened.
    pub status: EntityStatus,
    /// The activity or resource involved.
    pub subject: Subject,
}

/// One completed waiting episode for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitRecord {
    /// The resource waited for.
    pub resource: ResourceId,
    /// When the request was made.
    pub start_waiting: f64,
    /// When it was granted.
    pub end_waiting: f64,
    /// Units requested.
    pub amount: u32,
}

/// The in-flight activity of an entity, tracked so that a preemption or an
/// explicit interrupt can cut it short and compute the remaining duration.
#[derive(Debug)]
pub(crate) struct ActiveActivity {
    pub activity: ActivityId,
    pub process: ProcessId,
    pub event: EventId,
    pub started: f64,
    pub duration: f64,
    pub interruptible: bool,
}

/// A named actor progressing through activities and resource claims.
///
/// Entities own their logs; the logs are append-only and only ever written
/// by the entity's own primitives. Arbitrary model state hangs off the
/// ordered attribute map.
pub struct Entity {
    id: EntityId,
    name: String,
    attributes: BTreeMap<String, Value>,
    held: BTreeMap<ResourceId, u32>,
    activity_ids: BTreeMap<String, ActivityId>,
    activity_names: Vec<String>,
    pub(crate) current: Option<ActiveActivity>,
    schedule_log: Vec<ScheduleRecord>,
    status_log: Vec<EntityStatusRecord>,
    waiting_log: Vec<WaitRecord>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: &str) -> Self {
        Self {
            id,
            name: format!("{}({})", name, id),
            attributes: BTreeMap::new(),
            held: BTreeMap::new(),
            activity_ids: BTreeMap::new(),
            activity_names: Vec::new(),
            current: None,
            schedule_log: Vec::new(),
            status_log: Vec::new(),
            waiting_log: Vec::new(),
        }
    }

    /// The entity's ID.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's display name, including its ID suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets an attribute, overwriting any previous value.
    pub fn set_attr<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownAttribute`] if the attribute has not been set.
    pub fn attr(&self, key: &str) -> Result<&Value> {
        self.attributes.get(key).ok_or_else(|| Error::UnknownAttribute {
            entity: self.id,
            key: key.to_string(),
        })
    }

    /// Removes an attribute, returning its value.
    pub fn remove_attr(&mut self, key: &str) -> Result<Value> {
        self.attributes.remove(key).ok_or_else(|| Error::UnknownAttribute {
            entity: self.id,
            key: key.to_string(),
        })
    }

    /// Checks whether an attribute exists.
    pub fn has_attr(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// All attributes, ordered by key.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Amounts currently held, by resource.
    pub fn held(&self) -> &BTreeMap<ResourceId, u32> {
        &self.held
    }

    /// Units of `resource` currently held.
    pub fn amount_held(&self, resource: ResourceId) -> u32 {
        self.held.get(&resource).copied().unwrap_or(0)
    }

    pub(crate) fn held_add(&mut self, resource: ResourceId, amount: u32) {
        *self.held.entry(resource).or_insert(0) += amount;
    }

    /// Removes `amount` units of `resource` from the held set. Returns
    /// `false` if the entity does not hold that many.
    pub(crate) fn held_remove(&mut self, resource: ResourceId, amount: u32) -> bool {
        match self.held.get_mut(&resource) {
            Some(held) if *held >= amount => {
                *held -= amount;
                if *held == 0 {
                    self.held.remove(&resource);
                }
                true
            }
            _ => false,
        }
    }

    /// Returns the ID for the named activity, assigning a new one on first
    /// use.
    pub(crate) fn activity_id(&mut self, name: &str) -> ActivityId {
        if let Some(id) = self.activity_ids.get(name) {
            return *id;
        }
        let id = ActivityId::from(self.activity_names.len());
        self.activity_ids.insert(name.to_string(), id);
        self.activity_names.push(name.to_string());
        id
    }

    /// Activity names indexed by [`ActivityId`].
    pub fn activity_names(&self) -> &[String] {
        &self.activity_names
    }

    pub(crate) fn record_schedule(&mut self, activity: ActivityId, start: f64, finish: f64) {
        self.schedule_log.push(ScheduleRecord {
            activity,
            start,
            finish,
        });
    }

    pub(crate) fn record_status(&mut self, time: f64, status: EntityStatus, subject: Subject) {
        self.status_log.push(EntityStatusRecord {
            time,
            status,
            subject,
        });
    }

    pub(crate) fn record_wait(
        &mut self,
        resource: ResourceId,
        start_waiting: f64,
        end_waiting: f64,
        amount: u32,
    ) {
        self.waiting_log.push(WaitRecord {
            resource,
            start_waiting,
            end_waiting,
            amount,
        });
    }

    /// The schedule log: one record per activity execution.
    pub fn schedule(&self) -> &[ScheduleRecord] {
        &self.schedule_log
    }

    /// The status log: every observable transition of this entity.
    pub fn status_log(&self) -> &[EntityStatusRecord] {
        &self.status_log
    }

    /// The waiting log: one record per completed waiting episode.
    pub fn waiting_log(&self) -> &[WaitRecord] {
        &self.waiting_log
    }

    /// Waiting durations, one per completed waiting episode.
    pub fn waiting_time(&self) -> Array1<f64> {
        Array1::from(
            self.waiting_log
                .iter()
                .map(|record| record.end_waiting - record.start_waiting)
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_attributes() {
        let mut entity = Entity::new(EntityId::from(1), "truck");
        assert_eq!(entity.name(), "truck(1)");
        entity.set_attr("capacity", 12);
        entity.set_attr("kind", "dumper");
        assert_eq!(entity.attr("capacity").unwrap(), &Value::from(12));
        assert!(entity.has_attr("kind"));
        assert!(matches!(
            entity.attr("missing"),
            Err(Error::UnknownAttribute { .. })
        ));
        entity.remove_attr("kind").unwrap();
        assert!(!entity.has_attr("kind"));
    }

    #[test]
    fn test_activity_ids_are_stable() {
        let mut entity = Entity::new(EntityId::from(0), "crew");
        let dig = entity.activity_id("dig");
        let haul = entity.activity_id("haul");
        assert_ne!(dig, haul);
        assert_eq!(entity.activity_id("dig"), dig);
        assert_eq!(entity.activity_names(), &["dig", "haul"]);
    }

    #[test]
    fn test_held_bookkeeping() {
        let mut entity = Entity::new(EntityId::from(0), "crew");
        let res = ResourceId::from(0);
        entity.held_add(res, 2);
        entity.held_add(res, 1);
        assert_eq!(entity.amount_held(res), 3);
        assert!(entity.held_remove(res, 2));
        assert!(!entity.held_remove(res, 5));
        assert!(entity.held_remove(res, 1));
        assert_eq!(entity.amount_held(res), 0);
        assert!(entity.held().is_empty());
    }

    #[test]
    fn test_waiting_time() {
        let mut entity = Entity::new(EntityId::from(0), "crew");
        let res = ResourceId::from(0);
        entity.record_wait(res, 1.0, 4.0, 1);
        entity.record_wait(res, 6.0, 6.5, 2);
        assert_eq!(entity.waiting_time(), Array1::from(vec![3.0, 0.5]));
    }
}
