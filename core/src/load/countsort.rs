//! Grouping and sorting loads.

use super::{input_tap, output_tap};
use crate::flow::{Aggregator, Assembly, EachOp, FlowDef, GroupBy};
use crate::options::Options;
use crate::tuple::Value;
use load_common::Result;

/// Word count, then sort by count descending and word ascending.
pub fn count_sort(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("count-sort");
    let pipe = assembly.each(pipe, EachOp::split_words("line", "word")?)?;
    let pipe = assembly.group_by(
        pipe,
        GroupBy::new(&["word"]).aggregate(vec![Aggregator::count("count")]),
    )?;
    let pipe = assembly.group_by(pipe, GroupBy::new(&["count"]).sorted_by(&["word"]).reversed())?;

    FlowDef::connect(
        "count-sort",
        assembly,
        vec![("count-sort", input_tap(options))],
        vec![(pipe, output_tap(options, "countsort"))],
    )
}

/// Sort words by length descending, then by the word itself.
pub fn staggered_sort(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("staggered-sort");
    let pipe = assembly.each_all(
        pipe,
        vec![
            EachOp::split_words("line", "word")?,
            EachOp::length("word", "length"),
        ],
    )?;
    let pipe = assembly.group_by(pipe, GroupBy::new(&["length"]).sorted_by(&["word"]).reversed())?;

    FlowDef::connect(
        "staggered-sort",
        assembly,
        vec![("staggered-sort", input_tap(options))],
        vec![(pipe, output_tap(options, "staggeredsort"))],
    )
}

/// Group on every field of a wide tuple; exercises comparison, not computation.
pub fn full_tuple_group(options: &Options) -> Result<FlowDef> {
    let constants: Vec<(String, Value)> = (0..10)
        .map(|i| (format!("f{i}"), Value::from(format!("foo_{}", i + 1))))
        .collect();
    let mut key: Vec<String> = vec!["word".to_string()];
    key.extend(constants.iter().map(|(name, _)| name.clone()));
    let key: Vec<&str> = key.iter().map(String::as_str).collect();

    let mut assembly = Assembly::new();
    let pipe = assembly.head("full-tuple-group");
    let pipe = assembly.each_all(
        pipe,
        vec![
            EachOp::split_words("line", "word")?,
            EachOp::Insert { values: constants },
        ],
    )?;
    let pipe = assembly.group_by(pipe, GroupBy::new(&key))?;

    FlowDef::connect(
        "full-tuple-group",
        assembly,
        vec![("full-tuple-group", input_tap(options))],
        vec![(pipe, output_tap(options, "fulltuplegroup"))],
    )
}
