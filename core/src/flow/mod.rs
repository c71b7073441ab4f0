//! Pipe assemblies, operators and flow execution.

pub mod assembly;
pub mod breaking;
pub mod executor;
pub mod operation;

pub use assembly::{Assembly, FlowDef, GroupBy, Pipe, PipeId, PipeKind, SetupAction};
pub use breaking::{BreakPolicy, Breaker};
pub use executor::FlowExecutor;
pub use operation::{Aggregator, BufferOp, EachOp, Every, Joiner, WHITESPACE};
