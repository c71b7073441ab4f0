//! Join loads.
//!
//! The join loads co-group a sampled set of unique words against the input
//! split into fixed-width rows, keyed on the row's first field.

use super::{TopologyKind, input_tap, output_tap};
use crate::flow::{Assembly, EachOp, Every, FlowDef, GroupBy, Joiner, PipeId, WHITESPACE};
use crate::options::Options;
use crate::tap::Tap;
use load_common::{LoadError, Result};

const SAMPLE_FRACTION: f64 = 0.95;

fn sample() -> EachOp {
    EachOp::Sample {
        fraction: SAMPLE_FRACTION,
        seed: 0,
    }
}

fn row_width(options: &Options) -> Result<usize> {
    if options.data_max_words <= 0 {
        return Err(LoadError::build_error(format!(
            "join loads need a positive max words per line, got {}",
            options.data_max_words
        )));
    }
    Ok(options.data_max_words as usize)
}

/// Sampled unique words.
fn uniques(assembly: &mut Assembly, name: &str) -> Result<PipeId> {
    let pipe = assembly.head(name);
    let pipe = assembly.each(pipe, EachOp::split_words("line", "word")?)?;
    let pipe = assembly.group_by(pipe, GroupBy::new(&["word"]).every(Every::Unique))?;
    assembly.each(pipe, sample())
}

/// Sampled fixed-width rows.
fn fielded(assembly: &mut Assembly, name: &str, width: usize) -> Result<PipeId> {
    let pipe = assembly.head(name);
    let pipe = assembly.each(pipe, EachOp::split_fields("line", width, WHITESPACE)?)?;
    assembly.each(pipe, sample())
}

/// All four joins of the copied data in one flow.
pub fn multi_join(options: &Options) -> Result<FlowDef> {
    let width = row_width(options)?;
    let mut assembly = Assembly::new();
    let uniques = uniques(&mut assembly, "unique")?;
    let fielded = fielded(&mut assembly, "fielded", width)?;

    let mut sinks = Vec::new();
    for (name, joiner) in [
        ("inner", Joiner::Inner),
        ("outer", Joiner::Outer),
        ("left", Joiner::Left),
        ("right", Joiner::Right),
    ] {
        let joined = assembly.co_group(name, &[(fielded, "field0"), (uniques, "word")], joiner, None)?;
        sinks.push((joined, output_tap(options, &format!("multijoin/{name}"))));
    }

    let source = Tap::new(format!("{}copy", options.output_root));
    FlowDef::connect(
        "multi-join",
        assembly,
        vec![("unique", source.clone()), ("fielded", source)],
        sinks,
    )
}

/// Rows joined to unique words joined to rows, all from the same input.
pub fn self_multi_join(options: &Options) -> Result<FlowDef> {
    let width = row_width(options)?;
    let mut assembly = Assembly::new();
    let uniques = uniques(&mut assembly, "unique")?;
    let lhs = fielded(&mut assembly, "lhs", width)?;
    let rhs = fielded(&mut assembly, "rhs", width)?;

    let declared = (0..width * 2 + 1).map(|i| format!("field{i}")).collect();
    let inner = assembly.co_group(
        "inner",
        &[(lhs, "field0"), (uniques, "word"), (rhs, "field0")],
        Joiner::Inner,
        Some(declared),
    )?;

    FlowDef::connect(
        "3-way-join",
        assembly,
        vec![
            ("unique", input_tap(options)),
            ("lhs", input_tap(options)),
            ("rhs", input_tap(options)),
        ],
        vec![(inner, output_tap(options, "selfmultijoin"))],
    )
}

/// A single join of one kind.
pub fn only_join(kind: TopologyKind, options: &Options) -> Result<FlowDef> {
    let (joiner, name, output) = match kind {
        TopologyKind::InnerJoin => (Joiner::Inner, "inner", "onlyinner"),
        TopologyKind::OuterJoin => (Joiner::Outer, "outer", "onlyouter"),
        TopologyKind::LeftJoin => (Joiner::Left, "left", "onlyleft"),
        TopologyKind::RightJoin => (Joiner::Right, "right", "onlyright"),
        other => {
            return Err(LoadError::build_error(format!("{other} is not a single join")));
        }
    };

    let width = row_width(options)?;
    let mut assembly = Assembly::new();
    let uniques = uniques(&mut assembly, "unique")?;
    let fielded = fielded(&mut assembly, "fielded", width)?;
    let joined = assembly.co_group(name, &[(fielded, "field0"), (uniques, "word")], joiner, None)?;

    FlowDef::connect(
        kind.flow_name(),
        assembly,
        vec![("unique", input_tap(options)), ("fielded", input_tap(options))],
        vec![(joined, output_tap(options, output))],
    )
}

/// Inner join against every word occurrence instead of unique words, so
/// frequent words multiply.
pub fn pathological_inner_join(options: &Options) -> Result<FlowDef> {
    let width = row_width(options)?;
    let mut assembly = Assembly::new();
    let words = assembly.head("words");
    let words = assembly.each(words, EachOp::split_words("line", "word")?)?;
    let fielded = fielded(&mut assembly, "fielded", width)?;
    let inner = assembly.co_group("inner", &[(fielded, "field0"), (words, "word")], Joiner::Inner, None)?;

    FlowDef::connect(
        "pathological-inner-join",
        assembly,
        vec![("words", input_tap(options)), ("fielded", input_tap(options))],
        vec![(inner, output_tap(options, "pathologicalinner"))],
    )
}
