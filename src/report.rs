//! Exporting run logs to CSV and JSON.
//!
//! The CSV writers emit one table per log, suitable for loading into a data
//! frame. [`dump_json`] serializes the entire run, entities and resources
//! together with their derived statistics, into a single document.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::entity::{Entity, EntityStatusRecord, ScheduleRecord, Subject, WaitRecord};
use crate::resource::{QueueRecord, Resource, ResourceKind, ResourceStatusRecord};
use crate::Environment;

fn subject_label(entity: &Entity, subject: Subject) -> String {
    match subject {
        Subject::Activity(id) => entity.activity_names()[usize::from(id)].clone(),
        Subject::Resource(id) => format!("resource {}", id),
    }
}

/// Writes the entity's schedule log as CSV with columns
/// `activity,start,finish`.
///
/// # Errors
///
/// Any I/O error from the underlying writer.
pub fn write_entity_schedule<W: Write>(entity: &Entity, writer: W) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&["activity", "start", "finish"])?;
    for record in entity.schedule() {
        csv.write_record(&[
            entity.activity_names()[usize::from(record.activity)].clone(),
            record.start.to_string(),
            record.finish.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the entity's status log as CSV with columns
/// `time,status,subject`.
///
/// # Errors
///
/// Any I/O error from the underlying writer.
pub fn write_entity_status<W: Write>(entity: &Entity, writer: W) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&["time", "status", "subject"])?;
    for record in entity.status_log() {
        csv.write_record(&[
            record.time.to_string(),
            record.status.to_string(),
            subject_label(entity, record.subject),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the resource's queue log as CSV with columns
/// `entity,start_waiting,end_waiting,amount`.
///
/// # Errors
///
/// Any I/O error from the underlying writer.
pub fn write_resource_queue<W: Write>(resource: &Resource, writer: W) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&["entity", "start_waiting", "end_waiting", "amount"])?;
    for record in resource.queue_log() {
        csv.write_record(&[
            record.entity.to_string(),
            record.start_waiting.to_string(),
            record.end_waiting.to_string(),
            record.amount.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the resource's status log as CSV with columns
/// `time,in_use,idle,queue_length`.
///
/// # Errors
///
/// Any I/O error from the underlying writer.
pub fn write_resource_status<W: Write>(resource: &Resource, writer: W) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&["time", "in_use", "idle", "queue_length"])?;
    for record in resource.status_log() {
        csv.write_record(&[
            record.time.to_string(),
            record.in_use.to_string(),
            record.idle.to_string(),
            record.queue_length.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct EntityReport<'a> {
    name: &'a str,
    attributes: &'a BTreeMap<String, Value>,
    activities: &'a [String],
    schedule: &'a [ScheduleRecord],
    status_log: &'a [EntityStatusRecord],
    waiting_log: &'a [WaitRecord],
}

#[derive(Serialize)]
struct ResourceReport<'a> {
    name: &'a str,
    kind: ResourceKind,
    capacity: u32,
    status_log: &'a [ResourceStatusRecord],
    queue_log: &'a [QueueRecord],
    average_utilization: f64,
    average_queue_length: f64,
}

#[derive(Serialize)]
struct RunReport<'a> {
    name: &'a str,
    finished_at: f64,
    entities: Vec<EntityReport<'a>>,
    resources: Vec<ResourceReport<'a>>,
    warnings: &'a [String],
}

fn report(env: &Environment) -> RunReport<'_> {
    RunReport {
        name: env.name(),
        finished_at: env.now(),
        entities: env
            .entities()
            .iter()
            .map(|entity| EntityReport {
                name: entity.name(),
                attributes: entity.attributes(),
                activities: entity.activity_names(),
                schedule: entity.schedule(),
                status_log: entity.status_log(),
                waiting_log: entity.waiting_log(),
            })
            .collect(),
        resources: env
            .resources()
            .iter()
            .map(|resource| ResourceReport {
                name: resource.name(),
                kind: resource.kind(),
                capacity: resource.capacity(),
                status_log: resource.status_log(),
                queue_log: resource.queue_log(),
                average_utilization: resource.average_utilization(),
                average_queue_length: resource.average_queue_length(),
            })
            .collect(),
        warnings: env.warnings(),
    }
}

/// Serializes the whole run, logs and derived statistics, as pretty JSON.
///
/// # Errors
///
/// Any I/O or serialization error.
pub fn dump_json<W: Write>(env: &Environment, writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, &report(env))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Cause, Command, Context, EntityId, Process, ResourceId, Result};

    struct Job {
        entity: EntityId,
        bay: ResourceId,
        step: u8,
    }

    impl Process for Job {
        fn resume(&mut self, ctx: &mut Context<'_>, _cause: Cause) -> Result<Command> {
            self.step += 1;
            match self.step {
                1 => Ok(Command::wait(ctx.get(self.entity, self.bay, 1)?)),
                2 => Ok(Command::wait(ctx.do_activity(self.entity, "load", 4.0)?)),
                _ => {
                    ctx.put(self.entity, self.bay, 1)?;
                    Ok(Command::Done)
                }
            }
        }
    }

    fn run_model() -> Environment {
        let mut env = Environment::new("yard");
        let truck = env.add_entity("truck");
        let bay = env.add_fifo_resource("bay", 1, 1).unwrap();
        env.spawn(Job {
            entity: truck,
            bay,
            step: 0,
        });
        env.run().unwrap();
        env
    }

    #[test]
    fn test_entity_schedule_csv() {
        let env = run_model();
        let mut out = Vec::new();
        write_entity_schedule(&env.entities()[0], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "activity,start,finish\nload,0,4\n");
    }

    #[test]
    fn test_resource_queue_csv() {
        let env = run_model();
        let mut out = Vec::new();
        write_resource_queue(&env.resources()[0], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "entity,start_waiting,end_waiting,amount\n0,0,0,1\n");
    }

    #[test]
    fn test_entity_status_csv_has_full_lifecycle() {
        let env = run_model();
        let mut out = Vec::new();
        write_entity_status(&env.entities()[0], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let statuses: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(statuses, vec!["wait_for", "get", "start", "finish", "put"]);
    }

    #[test]
    fn test_dump_json() {
        let env = run_model();
        let mut out = Vec::new();
        dump_json(&env, &mut out).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["name"], "yard");
        assert_eq!(value["finished_at"], 4.0);
        assert_eq!(value["entities"][0]["name"], "truck(0)");
        assert_eq!(value["resources"][0]["kind"], "fifo");
        assert_eq!(value["resources"][0]["average_utilization"], 1.0);
    }
}
