//! Discrete-event simulation of entities competing for capacity-limited
//! resources on a logical clock.
//!
//! The crate provides a cooperative process scheduler ([`Environment`]),
//! three resource disciplines (FIFO, priority, preemptive), and append-only
//! logs from which utilization and queueing statistics are derived after a
//! run.
//!
//! A model is a set of processes. A process is a resumable state machine:
//! every time it is resumed it performs some work through the [`Context`]
//! handed to it and returns either a [`Command::Wait`] naming the condition
//! that should wake it up next, or [`Command::Done`].
//!
//! ```
//! use simpm::{Cause, Command, Context, Environment, Process, Result};
//!
//! struct Job {
//!     entity: simpm::EntityId,
//!     bay: simpm::ResourceId,
//!     step: u8,
//! }
//!
//! impl Process for Job {
//!     fn resume(&mut self, ctx: &mut Context<'_>, _cause: Cause) -> Result<Command> {
//!         self.step += 1;
//!         match self.step {
//!             1 => Ok(Command::wait(ctx.get(self.entity, self.bay, 1)?)),
//!             2 => Ok(Command::wait(ctx.do_activity(self.entity, "load", 5.0)?)),
//!             _ => {
//!                 ctx.put(self.entity, self.bay, 1)?;
//!                 Ok(Command::Done)
//!             }
//!         }
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let mut env = Environment::new("yard");
//! let truck = env.add_entity("truck");
//! let bay = env.add_fifo_resource("bay", 1, 1)?;
//! env.spawn(Job { entity: truck, bay, step: 0 });
//! env.run()?;
//! assert_eq!(env.now(), 5.0);
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

mod entity;
mod env;
mod error;
mod event;
mod process;
mod request;
mod resource;

pub mod dist;
pub mod logger;
pub mod report;
pub mod stats;

pub use entity::{Entity, EntityStatus, EntityStatusRecord, ScheduleRecord, Subject, WaitRecord};
pub use env::{Context, Environment, ProcessHandle};
pub use error::{Error, Result};
pub use event::Condition;
pub use process::{Cause, Command, Preemption, Process};
pub use request::Request;
pub use resource::{QueueRecord, Resource, ResourceKind, ResourceStatusRecord};

/// Entity ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct EntityId(usize);

/// Resource ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ResourceId(usize);

/// Process ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ProcessId(usize);

/// Event ID, unique throughout one environment.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct EventId(usize);

/// Activity ID, assigned per entity on first use of an activity name.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ActivityId(usize);
