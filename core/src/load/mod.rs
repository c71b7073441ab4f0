//! The fixed load topologies.
//!
//! Each [`TopologyKind`] maps to one pure builder from [`Options`] to a
//! connected [`FlowDef`]. Builders never touch the filesystem; work that has
//! to happen before a flow runs is attached as a [`crate::flow::SetupAction`].

pub mod countsort;
pub mod generate;
pub mod join;
pub mod pathological;
pub mod pipeline;

use crate::flow::{BreakPolicy, FlowDef};
use crate::options::Options;
use crate::tap::Tap;
use load_common::Result;
use serde::Serialize;
use std::fmt;

/// Every load shape the harness can run, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TopologyKind {
    GenerateData,
    ConsumeData,
    Copy,
    CountSort,
    MultiJoin,
    SelfMultiJoin,
    Pipeline,
    StaggeredSort,
    FullTupleGroup,
    ChainedAggregate,
    ChainedFunction,
    LeftJoin,
    RightJoin,
    InnerJoin,
    OuterJoin,
    PathologicalInnerJoin,
    CrashOnAggregation,
    CrashOnBuffer,
    CrashOnFilter,
    CrashOnFunction,
}

impl TopologyKind {
    pub const ALL: [TopologyKind; 20] = [
        TopologyKind::GenerateData,
        TopologyKind::ConsumeData,
        TopologyKind::Copy,
        TopologyKind::CountSort,
        TopologyKind::MultiJoin,
        TopologyKind::SelfMultiJoin,
        TopologyKind::Pipeline,
        TopologyKind::StaggeredSort,
        TopologyKind::FullTupleGroup,
        TopologyKind::ChainedAggregate,
        TopologyKind::ChainedFunction,
        TopologyKind::LeftJoin,
        TopologyKind::RightJoin,
        TopologyKind::InnerJoin,
        TopologyKind::OuterJoin,
        TopologyKind::PathologicalInnerJoin,
        TopologyKind::CrashOnAggregation,
        TopologyKind::CrashOnBuffer,
        TopologyKind::CrashOnFilter,
        TopologyKind::CrashOnFunction,
    ];

    /// Name of the flow this kind builds.
    pub fn flow_name(&self) -> &'static str {
        match self {
            TopologyKind::GenerateData => "generate-data",
            TopologyKind::ConsumeData => "consume-data",
            TopologyKind::Copy => "copy",
            TopologyKind::CountSort => "count-sort",
            TopologyKind::MultiJoin => "multi-join",
            TopologyKind::SelfMultiJoin => "3-way-join",
            TopologyKind::Pipeline => "pipeline",
            TopologyKind::StaggeredSort => "staggered-sort",
            TopologyKind::FullTupleGroup => "full-tuple-group",
            TopologyKind::ChainedAggregate => "chainedaggregate",
            TopologyKind::ChainedFunction => "chainedfunction",
            TopologyKind::LeftJoin => "left-join",
            TopologyKind::RightJoin => "right-join",
            TopologyKind::InnerJoin => "inner-join",
            TopologyKind::OuterJoin => "outer-join",
            TopologyKind::PathologicalInnerJoin => "pathological-inner-join",
            TopologyKind::CrashOnAggregation => "Aggregation-RunToDestruction",
            TopologyKind::CrashOnBuffer => "Buffer-RunToDestruction",
            TopologyKind::CrashOnFilter => "Filter-RunToDestruction",
            TopologyKind::CrashOnFunction => "Function-RunToDestruction",
        }
    }

    /// Whether the options select this kind. Meta selectors must already be expanded.
    pub fn is_selected(&self, options: &Options) -> bool {
        match self {
            TopologyKind::GenerateData => options.data_generate,
            TopologyKind::ConsumeData => options.data_consume,
            TopologyKind::Copy => options.copy,
            TopologyKind::CountSort => options.count_sort,
            TopologyKind::MultiJoin => options.multi_join,
            TopologyKind::SelfMultiJoin => options.self_multi_join,
            TopologyKind::Pipeline => options.pipeline,
            TopologyKind::StaggeredSort => options.staggered_sort,
            TopologyKind::FullTupleGroup => options.full_tuple_group,
            TopologyKind::ChainedAggregate => options.chained_aggregate,
            TopologyKind::ChainedFunction => options.chained_function,
            TopologyKind::LeftJoin => options.left_join,
            TopologyKind::RightJoin => options.right_join,
            TopologyKind::InnerJoin => options.inner_join,
            TopologyKind::OuterJoin => options.outer_join,
            TopologyKind::PathologicalInnerJoin => options.pathological_inner_join,
            TopologyKind::CrashOnAggregation => options.crash_on_aggregation,
            TopologyKind::CrashOnBuffer => options.crash_on_buffer,
            TopologyKind::CrashOnFilter => options.crash_on_filter,
            TopologyKind::CrashOnFunction => options.crash_on_function,
        }
    }

    /// True for the loads that are expected to fail.
    pub fn is_breaking(&self) -> bool {
        matches!(
            self,
            TopologyKind::CrashOnAggregation
                | TopologyKind::CrashOnBuffer
                | TopologyKind::CrashOnFilter
                | TopologyKind::CrashOnFunction
        )
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flow_name())
    }
}

/// The topologies one run executes, in run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSelection {
    kinds: Vec<TopologyKind>,
}

impl RunSelection {
    /// Selection from derived options.
    pub fn from_options(options: &Options) -> Self {
        Self {
            kinds: TopologyKind::ALL
                .iter()
                .copied()
                .filter(|kind| kind.is_selected(options))
                .collect(),
        }
    }

    pub fn kinds(&self) -> &[TopologyKind] {
        &self.kinds
    }

    pub fn contains(&self, kind: TopologyKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Build every selected topology; the first build error aborts.
    pub fn build_all(&self, options: &Options) -> Result<Vec<FlowDef>> {
        self.kinds
            .iter()
            .map(|kind| build_topology(*kind, options))
            .collect()
    }
}

/// Build the flow for one topology.
pub fn build_topology(kind: TopologyKind, options: &Options) -> Result<FlowDef> {
    match kind {
        TopologyKind::GenerateData => generate::generate_data(options),
        TopologyKind::ConsumeData => generate::consume_data(options),
        TopologyKind::Copy => pipeline::copy(options),
        TopologyKind::CountSort => countsort::count_sort(options),
        TopologyKind::MultiJoin => join::multi_join(options),
        TopologyKind::SelfMultiJoin => join::self_multi_join(options),
        TopologyKind::Pipeline => pipeline::pipeline(options),
        TopologyKind::StaggeredSort => countsort::staggered_sort(options),
        TopologyKind::FullTupleGroup => countsort::full_tuple_group(options),
        TopologyKind::ChainedAggregate => pipeline::chained_aggregate(options),
        TopologyKind::ChainedFunction => pipeline::chained_function(options),
        TopologyKind::LeftJoin => join::only_join(kind, options),
        TopologyKind::RightJoin => join::only_join(kind, options),
        TopologyKind::InnerJoin => join::only_join(kind, options),
        TopologyKind::OuterJoin => join::only_join(kind, options),
        TopologyKind::PathologicalInnerJoin => join::pathological_inner_join(options),
        TopologyKind::CrashOnAggregation
        | TopologyKind::CrashOnBuffer
        | TopologyKind::CrashOnFilter
        | TopologyKind::CrashOnFunction => pathological::crash_load(kind, options),
    }
}

fn input_tap(options: &Options) -> Tap {
    Tap::new(options.input_root.as_str())
}

fn output_tap(options: &Options, name: &str) -> Tap {
    Tap::new(format!("{}{}", options.output_root, name))
}

fn break_policy(options: &Options) -> BreakPolicy {
    BreakPolicy::from_thresholds(options.break_after_events, options.break_after_millis)
}
