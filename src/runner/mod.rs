//! Task execution behind a single capability: `execute(descriptor) -> outcome`.
//!
//! Two runners exist:
//! - [`in_process::InProcessRunner`]: dispatches to a Rust implementation
//!   registered under the descriptor's name
//! - [`external::ExternalProcessRunner`]: spawns a subprocess in another
//!   runtime and recovers the result through the file handoff contract
//!
//! Both runners uphold the same guarantee: `execute` never returns an error
//! and never panics outward. Whatever goes wrong inside a task is folded
//! into a `Failed` [`TaskOutcome`]; the scheduler never sees a raw fault.

use async_trait::async_trait;

use crate::models::{TaskDescriptor, TaskOutcome};

pub mod external;
pub mod in_process;

/// The capability the scheduler dispatches through.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn execute(&self, descriptor: &TaskDescriptor) -> TaskOutcome;
}
