//! Collector lifecycle management.
//!
//! One collector task streams and republishes the stats of exactly one container. The
//! [`Supervisor`] owns the [`TaskRegistry`] that maps container ids to those tasks and is the
//! only component that creates or terminates them. An event listener, itself a tracked task,
//! turns the runtime's lifecycle events into [`Supervisor::add`] and [`Supervisor::remove`]
//! calls.
//!
//! # Key Components
//!
//! - [`CollectorTask`] — streams, enriches and publishes one container's stats.
//! - [`TaskRegistry`] — at most one live task per container id.
//! - [`Supervisor`] — `add`, `remove`, `stop` and `reload`.
//!
//! # Termination
//!
//! Tasks are never asked to stop: they are aborted from the outside and the supervisor polls
//! their handles until every one of them reports finished, bounded by a deadline. A task whose
//! stream ends or fails on its own logs the reason and removes its own registry entry.
mod error;
mod listener;
mod registry;
mod supervisor;
mod task;

pub use error::{Error, Result, TaskError};
pub use registry::{TaskRegistry, TaskStatus};
pub use supervisor::{AddOutcome, Supervisor, SupervisorConfig};
pub use task::CollectorTask;
