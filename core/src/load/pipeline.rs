//! Long operator chains and the plain copy.

use super::{input_tap, output_tap};
use crate::flow::{Aggregator, Assembly, EachOp, FlowDef, GroupBy, PipeId};
use crate::options::Options;
use load_common::Result;

const CHAIN_LENGTH: usize = 50;

/// Input copied unchanged.
pub fn copy(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("copy");

    FlowDef::connect(
        "copy",
        assembly,
        vec![("copy", input_tap(options))],
        vec![(pipe, output_tap(options, "copy"))],
    )
}

/// Word counts pushed through long function chains on both sides of a grouping.
pub fn pipeline(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("pipeline");
    let mut pipe = assembly.each(pipe, EachOp::word_count("line", "count"))?;

    for _ in 0..CHAIN_LENGTH {
        pipe = assembly.each_all(
            pipe,
            vec![
                EachOp::Identity,
                EachOp::project(&["line", "count"]),
                EachOp::rename("count", "count2"),
                EachOp::rename("count2", "count"),
            ],
        )?;
    }

    let mut pipe = hash_and_sum(&mut assembly, pipe, options)?;

    for _ in 0..CHAIN_LENGTH {
        pipe = assembly.each_all(pipe, vec![EachOp::Identity, EachOp::swap(&["hash", "sum1"])])?;
    }

    FlowDef::connect(
        "pipeline",
        assembly,
        vec![("pipeline", input_tap(options))],
        vec![(pipe, output_tap(options, "pipeline"))],
    )
}

/// One grouping carrying a long chain of aggregators.
pub fn chained_aggregate(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("chainedaggregate");
    let pipe = assembly.each(pipe, EachOp::word_count("line", "count"))?;
    let pipe = hash_and_sum(&mut assembly, pipe, options)?;

    FlowDef::connect(
        "chainedaggregate",
        assembly,
        vec![("chainedaggregate", input_tap(options))],
        vec![(pipe, output_tap(options, "chainedaggregate"))],
    )
}

/// A long map-only chain of functions.
pub fn chained_function(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("chainedfunction");
    let mut pipe = assembly.each(pipe, EachOp::word_count("line", "count"))?;

    for _ in 0..CHAIN_LENGTH {
        pipe = assembly.each_all(
            pipe,
            vec![EachOp::Identity, EachOp::project(&["line", "count"])],
        )?;
    }

    FlowDef::connect(
        "chainedfunction",
        assembly,
        vec![("chainedfunction", input_tap(options))],
        vec![(pipe, output_tap(options, "chainedfunction"))],
    )
}

/// Hash lines into buckets (with collisions) and sum the counts fifty ways.
fn hash_and_sum(assembly: &mut Assembly, pipe: PipeId, options: &Options) -> Result<PipeId> {
    let pipe = assembly.each(
        pipe,
        EachOp::hash_modulo("line", "hash", options.effective_hash_modulo()),
    )?;
    let sums = (1..=CHAIN_LENGTH)
        .map(|i| Aggregator::sum("count", &format!("sum{i}")))
        .collect();
    assembly.group_by(pipe, GroupBy::new(&["hash"]).aggregate(sums))
}
