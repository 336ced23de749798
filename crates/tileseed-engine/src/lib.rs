//! tileseed engine - drives the seeding tool for queued tasks
//!
//! [`TaskDispatcher`] takes a task off the queue and runs its sub-tasks in
//! order through [`SeedOperationExecutor`], which validates each one against
//! a fresh proxy configuration, writes the tool's working files and runs the
//! tool through a [`CommandRunner`]. Runs rejected with an invalid bbox are
//! repeated with a growing coverage buffer.

pub mod buffer;
pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod materialize;
pub mod process;
pub mod reporter;
pub mod retry;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{classify_failure, classify_line, FailureKind, OutputClass};
pub use dispatcher::{DispatchOutcome, TaskDispatcher};
pub use error::{DispatchError, Disposition, ProcessError, Result, SeedError};
pub use executor::SeedOperationExecutor;
pub use materialize::{ConfigMaterializer, SeedSpec};
pub use process::{Cancellation, CommandRunner, SeedCommand, TokioProcessRunner};
pub use reporter::{CollectingReporter, SeedEvent, SeedReporter, TracingReporter, WorkingFile};
pub use worker::Worker;
