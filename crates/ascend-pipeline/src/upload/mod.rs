//! Snapshot upload saga
//!
//! A snapshot is pushed to an ordered chain of destinations. Destinations do
//! not share a commit protocol, so each one exposes a compensating action and
//! the orchestrator undoes earlier deliveries when a later one fails. Every
//! step is recorded in the Upload Log before and after it happens.

mod destination;
mod log;
mod orchestrator;
mod state;

pub use destination::{Compensation, Destination};
pub use log::{SqliteUploadLog, UploadLog};
pub use orchestrator::{UploadOrchestrator, UploadReport};
pub use state::{EntryStatus, RunState, UploadEntry, UploadRun};
