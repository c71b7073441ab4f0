//! Loads that fail on purpose.
//!
//! Each one trips a crashing operator after `break-after-events` events or
//! `break-after-time` milliseconds, so failures can be watched travelling
//! through the stats and error reporting.

use super::{TopologyKind, break_policy, input_tap, output_tap};
use crate::flow::{Aggregator, Assembly, BufferOp, EachOp, Every, FlowDef, GroupBy};
use crate::options::Options;
use load_common::{LoadError, Result};
use tracing::error;

pub fn crash_load(kind: TopologyKind, options: &Options) -> Result<FlowDef> {
    let name = kind.flow_name();
    error!("creating flow for {}", name);

    let policy = break_policy(options);
    let mut assembly = Assembly::new();
    let head = assembly.head(name);

    let tail = match kind {
        TopologyKind::CrashOnAggregation => {
            let pipe = assembly.each(head, EachOp::split_words("line", "word")?)?;
            let pipe = assembly.group_by(
                pipe,
                GroupBy::new(&["word"]).aggregate(vec![Aggregator::Breaking {
                    output: "count".to_string(),
                    policy,
                }]),
            )?;
            assembly.group_by(pipe, GroupBy::new(&["count"]).sorted_by(&["word"]).reversed())?
        }
        TopologyKind::CrashOnBuffer => {
            let pipe = assembly.each(head, EachOp::split_words("line", "word")?)?;
            assembly.group_by(
                pipe,
                GroupBy::new(&["word"]).every(Every::Buffer(BufferOp::Crashing(policy))),
            )?
        }
        TopologyKind::CrashOnFilter => assembly.each(head, EachOp::CrashingFilter(policy))?,
        TopologyKind::CrashOnFunction => assembly.each(head, EachOp::CrashingFunction(policy))?,
        other => {
            return Err(LoadError::build_error(format!("{other} is not a crash load")));
        }
    };

    FlowDef::connect(
        name,
        assembly,
        vec![(name, input_tap(options))],
        vec![(tail, output_tap(options, name))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::BreakPolicy;
    use crate::flow::PipeKind;

    fn options() -> Options {
        let mut options = Options::default();
        options.input_root = "in/".to_string();
        options.output_root = "out/".to_string();
        options
    }

    #[test]
    fn test_crash_load_names_and_outputs() {
        let flow = crash_load(TopologyKind::CrashOnFilter, &options()).unwrap();
        assert_eq!(flow.name(), "Filter-RunToDestruction");
        assert_eq!(flow.sink_paths(), vec!["out/Filter-RunToDestruction"]);
    }

    #[test]
    fn test_time_threshold_wins() {
        let mut options = options();
        options.break_after_millis = 250;
        let flow = crash_load(TopologyKind::CrashOnFunction, &options).unwrap();
        let tail = flow.assembly().tails()[0];
        assert!(matches!(
            flow.assembly().pipe(tail).kind,
            PipeKind::Each {
                op: EachOp::CrashingFunction(BreakPolicy::AfterMillis(250)),
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_other_kinds() {
        assert!(crash_load(TopologyKind::Copy, &options()).is_err());
    }
}
