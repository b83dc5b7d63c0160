//! Turning inbound messages into command invocations.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use registry::{CommandRegistry, select_command};
