use crate::env::Context;
use crate::error::Result;
use crate::event::Condition;
use crate::{EntityId, ResourceId};

/// Why a process was resumed.
#[derive(Debug, Clone)]
pub enum Cause {
    /// First activation after [`spawn`](crate::Environment::spawn).
    Started,
    /// The wait condition returned from the previous resumption is satisfied.
    Completed,
    /// The process was interrupted because one of its entity's claims on a
    /// preemptive resource was forcibly released.
    Preempted(Preemption),
}

/// Details of a preemption delivered with [`Cause::Preempted`].
#[derive(Debug, Clone)]
pub struct Preemption {
    /// The entity whose request caused the preemption.
    pub by: EntityId,
    /// The preemptive resource that was taken away.
    pub resource: ResourceId,
    /// Simulation time at which the victim acquired the resource.
    pub usage_since: f64,
    /// Duration of the interrupted activity that was left unserved.
    pub remaining: f64,
}

/// What a process asks the scheduler to do next.
#[derive(Debug)]
pub enum Command {
    /// Suspend until the condition is satisfied.
    Wait(Condition),
    /// The process body is complete; fire its completion event.
    Done,
}

impl Command {
    /// Shorthand for `Command::Wait(condition)`.
    pub fn wait(condition: Condition) -> Self {
        Command::Wait(condition)
    }
}

/// A resumable computation driven by the [`Environment`](crate::Environment).
///
/// Between resumptions execution is atomic with respect to other processes;
/// a process may suspend only by returning [`Command::Wait`]. Errors returned
/// from `resume` are fatal to the run and surface from the `run*` methods.
pub trait Process {
    /// Runs the process until its next suspension point.
    fn resume(&mut self, ctx: &mut Context<'_>, cause: Cause) -> Result<Command>;
}

impl<F> Process for F
where
    F: FnMut(&mut Context<'_>, Cause) -> Result<Command>,
{
    fn resume(&mut self, ctx: &mut Context<'_>, cause: Cause) -> Result<Command> {
        self(ctx, cause)
    }
}
