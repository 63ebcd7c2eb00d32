//! Command routing - pattern matching, snapshots and concurrent dispatch

pub mod binding;
pub mod context;
pub mod pattern;
pub mod router;
pub mod table;

pub use binding::{FnHandler, Handler, HandlerBinding, HandlerResult};
pub use context::{Capabilities, HandlerContext};
pub use pattern::{Captures, Pattern};
pub use router::{BindingOutcome, BindingReport, CommandRouter, DispatchReport, DENIED_REPLY};
pub use table::{Match, ModuleRecord, RouterTable, SharedTable};
