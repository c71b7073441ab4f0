//! Load Core - load harness for a flow/cascade batch engine
//!
//! Command line options and their derivation, the fixed load topologies, and
//! a small in-process engine (planner, scheduler, cascade runner) that runs
//! them on the local platform and reports per-level statistics.

pub mod cascade;
pub mod flow;
pub mod generate;
pub mod load;
pub mod options;
pub mod planner;
pub mod platform;
pub mod properties;
pub mod scheduler;
pub mod stats;
pub mod tap;
pub mod tuple;

pub use cascade::Cascade;
pub use flow::{Assembly, FlowDef, FlowExecutor};
pub use load::{RunSelection, TopologyKind, build_topology};
pub use options::{OptionTable, Options, ParseOutcome, Parsed, derive, parse_args};
pub use planner::FlowPlan;
pub use platform::{CapacityProvider, LocalPlatform, Platform, load_platform};
pub use properties::Properties;
pub use stats::{Stats, StatsKind, StatsPrinter, Status};
pub use tap::Tap;
pub use tuple::{Tuple, Value};
