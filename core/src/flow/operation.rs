//! Operators applied by `Each`, `Every` and `CoGroup` pipes.
//!
//! Operators name their argument fields; the assembly resolves those names
//! to positions once, and execution only sees positions.

use super::breaking::{BreakPolicy, Breaker};
use crate::generate::{GeneratorConfig, TupleGenerator};
use crate::tuple::{Tuple, Value, ensure_unique_fields, field_positions, select, string_hash};
use load_common::{LoadError, Result};
use rand::rngs::SmallRng;
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Whitespace splitting pattern used by the word-oriented loads.
pub const WHITESPACE: &str = r"\s";

/// A per-tuple operator.
#[derive(Debug, Clone)]
pub enum EachOp {
    /// One output tuple `[word]` per non-empty piece of the argument.
    SplitWords {
        argument: String,
        output: String,
        pattern: Regex,
    },
    /// One output tuple of exactly `width` fields, `field0..`, padded with nulls.
    SplitFields {
        argument: String,
        width: usize,
        pattern: Regex,
    },
    /// Append the number of whitespace separated words in the argument.
    WordCount { argument: String, output: String },
    /// Append the character count of the argument.
    Length { argument: String, output: String },
    /// Append `string_hash(argument) % modulo`.
    HashModulo {
        argument: String,
        output: String,
        modulo: i64,
    },
    /// Append constant fields.
    Insert { values: Vec<(String, Value)> },
    Identity,
    Rename { from: String, to: String },
    Project { fields: Vec<String> },
    /// Move the named fields to the end, keeping their order.
    Swap { fields: Vec<String> },
    /// Keep roughly `fraction` of the tuples, chosen by tuple hash.
    Sample { fraction: f64, seed: u64 },
    /// Drop everything.
    Discard,
    /// Treat every field as a dictionary word and emit generated lines.
    Generate(GeneratorConfig),
    /// Pass tuples through until the policy trips.
    CrashingFilter(BreakPolicy),
    /// Copy tuples through until the policy trips.
    CrashingFunction(BreakPolicy),
}

impl EachOp {
    pub fn split_words(argument: &str, output: &str) -> Result<Self> {
        Ok(EachOp::SplitWords {
            argument: argument.to_string(),
            output: output.to_string(),
            pattern: compile(WHITESPACE)?,
        })
    }

    pub fn split_fields(argument: &str, width: usize, pattern: &str) -> Result<Self> {
        Ok(EachOp::SplitFields {
            argument: argument.to_string(),
            width,
            pattern: compile(pattern)?,
        })
    }

    pub fn word_count(argument: &str, output: &str) -> Self {
        EachOp::WordCount {
            argument: argument.to_string(),
            output: output.to_string(),
        }
    }

    pub fn length(argument: &str, output: &str) -> Self {
        EachOp::Length {
            argument: argument.to_string(),
            output: output.to_string(),
        }
    }

    pub fn hash_modulo(argument: &str, output: &str, modulo: i64) -> Self {
        EachOp::HashModulo {
            argument: argument.to_string(),
            output: output.to_string(),
            modulo,
        }
    }

    pub fn rename(from: &str, to: &str) -> Self {
        EachOp::Rename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn project(fields: &[&str]) -> Self {
        EachOp::Project {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn swap(fields: &[&str]) -> Self {
        EachOp::Swap {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Short label for plans and DOT output.
    pub fn label(&self) -> String {
        match self {
            EachOp::SplitWords { argument, output, .. } => format!("SplitWords[{argument} -> {output}]"),
            EachOp::SplitFields { argument, width, .. } => format!("SplitFields[{argument} -> {width}]"),
            EachOp::WordCount { output, .. } => format!("WordCount[{output}]"),
            EachOp::Length { output, .. } => format!("Length[{output}]"),
            EachOp::HashModulo { output, modulo, .. } => format!("HashModulo[{output} % {modulo}]"),
            EachOp::Insert { values } => format!("Insert[{}]", values.len()),
            EachOp::Identity => "Identity".to_string(),
            EachOp::Rename { from, to } => format!("Rename[{from} -> {to}]"),
            EachOp::Project { fields } => format!("Project[{}]", fields.join(", ")),
            EachOp::Swap { fields } => format!("Swap[{}]", fields.join(", ")),
            EachOp::Sample { fraction, .. } => format!("Sample[{fraction}]"),
            EachOp::Discard => "Discard".to_string(),
            EachOp::Generate(_) => "TupleGenerator".to_string(),
            EachOp::CrashingFilter(_) => "CrashingFilter".to_string(),
            EachOp::CrashingFunction(_) => "CrashingFunction".to_string(),
        }
    }

    /// Field names this operator reads.
    pub fn arguments(&self) -> Vec<String> {
        match self {
            EachOp::SplitWords { argument, .. }
            | EachOp::SplitFields { argument, .. }
            | EachOp::WordCount { argument, .. }
            | EachOp::Length { argument, .. }
            | EachOp::HashModulo { argument, .. } => vec![argument.clone()],
            EachOp::Rename { from, .. } => vec![from.clone()],
            EachOp::Project { fields } | EachOp::Swap { fields } => fields.clone(),
            _ => Vec::new(),
        }
    }

    /// Output field names for the given incoming fields.
    pub fn outgoing(&self, incoming: &[String]) -> Result<Vec<String>> {
        field_positions(incoming, &self.arguments())?;

        let outgoing = match self {
            EachOp::SplitWords { output, .. } => vec![output.clone()],
            EachOp::SplitFields { width, .. } => {
                if *width == 0 {
                    return Err(LoadError::build_error("split width must be positive"));
                }
                (0..*width).map(|i| format!("field{i}")).collect()
            }
            EachOp::WordCount { output, .. }
            | EachOp::Length { output, .. }
            | EachOp::HashModulo { output, .. } => appended(incoming, [output.clone()]),
            EachOp::Insert { values } => appended(incoming, values.iter().map(|(n, _)| n.clone())),
            EachOp::Rename { from, to } => incoming
                .iter()
                .map(|f| if f == from { to.clone() } else { f.clone() })
                .collect(),
            EachOp::Project { fields } => fields.clone(),
            EachOp::Swap { fields } => {
                let mut rest: Vec<String> =
                    incoming.iter().filter(|f| !fields.contains(f)).cloned().collect();
                rest.extend(fields.iter().cloned());
                rest
            }
            EachOp::Generate(_) => vec!["line".to_string()],
            EachOp::Identity
            | EachOp::Sample { .. }
            | EachOp::Discard
            | EachOp::CrashingFilter(_)
            | EachOp::CrashingFunction(_) => incoming.to_vec(),
        };

        if let EachOp::HashModulo { modulo, .. } = self {
            if *modulo <= 0 {
                return Err(LoadError::build_error("hash modulo must be positive"));
            }
        }

        ensure_unique_fields(&outgoing)?;
        Ok(outgoing)
    }

    /// Fresh per-task state.
    pub(crate) fn new_state(&self, rng: SmallRng) -> OpState {
        match self {
            EachOp::CrashingFilter(policy) | EachOp::CrashingFunction(policy) => {
                OpState::Breaker(Breaker::new(*policy))
            }
            EachOp::Generate(_) => OpState::Random(rng),
            _ => OpState::None,
        }
    }

    /// Apply to one tuple. `args` are the resolved positions of [`EachOp::arguments`].
    pub(crate) fn apply(
        &self,
        tuple: Tuple,
        args: &[usize],
        state: &mut OpState,
        out: &mut Vec<Tuple>,
    ) -> Result<()> {
        match self {
            EachOp::SplitWords { pattern, .. } => {
                let text = argument_text(&tuple, args);
                out.extend(
                    pattern
                        .split(&text)
                        .filter(|piece| !piece.is_empty())
                        .map(|piece| vec![Value::from(piece)]),
                );
            }
            EachOp::SplitFields { width, pattern, .. } => {
                let text = argument_text(&tuple, args);
                let mut fields: Tuple = pattern
                    .splitn(&text, *width)
                    .map(Value::from)
                    .collect();
                fields.resize(*width, Value::Null);
                out.push(fields);
            }
            EachOp::WordCount { .. } => {
                let count = argument_text(&tuple, args).split_whitespace().count() as i64;
                out.push(with(tuple, [Value::Int(count)]));
            }
            EachOp::Length { .. } => {
                let length = argument_text(&tuple, args).chars().count() as i64;
                out.push(with(tuple, [Value::Int(length)]));
            }
            EachOp::HashModulo { modulo, .. } => {
                let hash = string_hash(&argument_text(&tuple, args)) as i64 % modulo;
                out.push(with(tuple, [Value::Int(hash)]));
            }
            EachOp::Insert { values } => {
                out.push(with(tuple, values.iter().map(|(_, v)| v.clone())));
            }
            EachOp::Identity | EachOp::Rename { .. } => out.push(tuple),
            EachOp::Project { .. } => out.push(select(&tuple, args)),
            EachOp::Swap { .. } => {
                let mut rest: Tuple = tuple
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !args.contains(i))
                    .map(|(_, v)| v.clone())
                    .collect();
                rest.extend(select(&tuple, args));
                out.push(rest);
            }
            EachOp::Sample { fraction, seed } => {
                let mut hasher = DefaultHasher::new();
                seed.hash(&mut hasher);
                tuple.hash(&mut hasher);
                let position = (hasher.finish() % 10_000) as f64 / 10_000.0;
                if position < *fraction {
                    out.push(tuple);
                }
            }
            EachOp::Discard => {}
            EachOp::Generate(config) => {
                let OpState::Random(rng) = state else {
                    return Err(LoadError::execution_error("generator has no random source"));
                };
                let words: Vec<String> = tuple
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(ToString::to_string)
                    .collect();
                TupleGenerator::new(config.clone())
                    .generate(&words, rng, |line| out.push(vec![Value::Str(line)]));
            }
            EachOp::CrashingFilter(_) => {
                breaker(state)?.record("filter has reached max count")?;
                out.push(tuple);
            }
            EachOp::CrashingFunction(_) => {
                breaker(state)?.record("function has reached max count")?;
                out.push(tuple);
            }
        }

        Ok(())
    }
}

/// Mutable state an operator keeps for the duration of one task.
#[derive(Debug)]
pub(crate) enum OpState {
    None,
    Breaker(Breaker),
    Random(SmallRng),
}

fn breaker(state: &mut OpState) -> Result<&mut Breaker> {
    match state {
        OpState::Breaker(breaker) => Ok(breaker),
        _ => Err(LoadError::execution_error("crashing operator has no breaker")),
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| LoadError::build_error_with_source(format!("bad pattern '{pattern}'"), e))
}

fn appended(incoming: &[String], extra: impl IntoIterator<Item = String>) -> Vec<String> {
    incoming.iter().cloned().chain(extra).collect()
}

fn with(mut tuple: Tuple, extra: impl IntoIterator<Item = Value>) -> Tuple {
    tuple.extend(extra);
    tuple
}

fn argument_text(tuple: &[Value], args: &[usize]) -> String {
    args.first()
        .and_then(|&p| tuple.get(p))
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// An aggregator run over the tuples of one group.
#[derive(Debug, Clone)]
pub enum Aggregator {
    Count { output: String },
    Sum { argument: String, output: String },
    /// Counts like `Count` but fails once the per-group count crosses the policy.
    Breaking { output: String, policy: BreakPolicy },
}

impl Aggregator {
    pub fn count(output: &str) -> Self {
        Aggregator::Count {
            output: output.to_string(),
        }
    }

    pub fn sum(argument: &str, output: &str) -> Self {
        Aggregator::Sum {
            argument: argument.to_string(),
            output: output.to_string(),
        }
    }

    pub fn output(&self) -> &str {
        match self {
            Aggregator::Count { output }
            | Aggregator::Sum { output, .. }
            | Aggregator::Breaking { output, .. } => output,
        }
    }

    pub fn arguments(&self) -> Vec<String> {
        match self {
            Aggregator::Sum { argument, .. } => vec![argument.clone()],
            _ => Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Aggregator::Count { output } => format!("Count[{output}]"),
            Aggregator::Sum { argument, output } => format!("Sum[{argument} -> {output}]"),
            Aggregator::Breaking { .. } => "BreakingAggregator".to_string(),
        }
    }

    /// Aggregate one group.
    pub(crate) fn aggregate(&self, group: &[Tuple], args: &[usize]) -> Result<Value> {
        match self {
            Aggregator::Count { .. } => Ok(Value::Int(group.len() as i64)),
            Aggregator::Sum { .. } => {
                let position = args.first().copied().unwrap_or(0);
                let sum = group
                    .iter()
                    .filter_map(|t| t.get(position).and_then(Value::as_int))
                    .sum::<i64>();
                Ok(Value::Int(sum))
            }
            Aggregator::Breaking { policy, .. } => {
                let mut breaker = Breaker::new(*policy);
                for (seen, _) in group.iter().enumerate() {
                    breaker.record_count(seen as u64 + 1, "aggregation count exceeded")?;
                }
                Ok(Value::Int(group.len() as i64))
            }
        }
    }
}

/// A buffer sees every tuple of a group and emits whatever it likes.
#[derive(Debug, Clone)]
pub enum BufferOp {
    /// Emit the group's tuples until the policy trips.
    Crashing(BreakPolicy),
}

impl BufferOp {
    pub fn label(&self) -> String {
        match self {
            BufferOp::Crashing(_) => "CrashingBuffer".to_string(),
        }
    }

    pub(crate) fn operate(&self, group: Vec<Tuple>, breaker: &mut Breaker, out: &mut Vec<Tuple>) -> Result<()> {
        match self {
            BufferOp::Crashing(_) => {
                for tuple in group {
                    breaker.record("buffer has reached max count")?;
                    out.push(tuple);
                }
                Ok(())
            }
        }
    }
}

/// What happens to each group after a `GroupBy`.
#[derive(Debug, Clone)]
pub enum Every {
    /// Emit every tuple, in group order.
    Tuples,
    /// Emit the first tuple of each group.
    Unique,
    /// Emit the group key followed by one value per aggregator.
    Aggregate(Vec<Aggregator>),
    /// Hand each group to a buffer.
    Buffer(BufferOp),
}

/// How co-grouped sides are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    Inner,
    Outer,
    Left,
    Right,
}

impl Joiner {
    pub fn label(&self) -> &'static str {
        match self {
            Joiner::Inner => "InnerJoin",
            Joiner::Outer => "OuterJoin",
            Joiner::Left => "LeftJoin",
            Joiner::Right => "RightJoin",
        }
    }

    /// Join the rows gathered so far with the next side's rows for one key.
    pub(crate) fn combine(
        &self,
        accumulated: Vec<Tuple>,
        accumulated_width: usize,
        side: &[Tuple],
        side_width: usize,
    ) -> Vec<Tuple> {
        let left_missing = accumulated.is_empty();
        let right_missing = side.is_empty();

        let keep = match self {
            Joiner::Inner => !left_missing && !right_missing,
            Joiner::Outer => !(left_missing && right_missing),
            Joiner::Left => !left_missing,
            Joiner::Right => !right_missing,
        };
        if !keep {
            return Vec::new();
        }

        let lefts = if left_missing {
            vec![vec![Value::Null; accumulated_width]]
        } else {
            accumulated
        };
        let nulls = [vec![Value::Null; side_width]];
        let rights: &[Tuple] = if right_missing { &nulls } else { side };

        lefts
            .iter()
            .flat_map(|left| {
                rights.iter().map(move |right| {
                    let mut row = left.clone();
                    row.extend(right.iter().cloned());
                    row
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn run(op: &EachOp, incoming: &[&str], tuple: Tuple) -> Vec<Tuple> {
        let args = field_positions(&fields(incoming), &op.arguments()).unwrap();
        let mut state = op.new_state(SmallRng::seed_from_u64(0));
        let mut out = Vec::new();
        op.apply(tuple, &args, &mut state, &mut out).unwrap();
        out
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_split_words() {
        let op = EachOp::split_words("line", "word").unwrap();
        assert_eq!(op.outgoing(&fields(&["line"])).unwrap(), fields(&["word"]));
        let out = run(&op, &["line"], vec![s("a  b c")]);
        assert_eq!(out, vec![vec![s("a")], vec![s("b")], vec![s("c")]]);
    }

    #[test]
    fn test_split_fields_pads() {
        let op = EachOp::split_fields("line", 3, WHITESPACE).unwrap();
        assert_eq!(
            op.outgoing(&fields(&["line"])).unwrap(),
            fields(&["field0", "field1", "field2"])
        );
        let out = run(&op, &["line"], vec![s("a b")]);
        assert_eq!(out, vec![vec![s("a"), s("b"), Value::Null]]);
    }

    #[test]
    fn test_word_count_and_hash() {
        let count = EachOp::word_count("line", "count");
        let out = run(&count, &["line"], vec![s("x y z")]);
        assert_eq!(out, vec![vec![s("x y z"), Value::Int(3)]]);

        let hash = EachOp::hash_modulo("line", "hash", 10);
        let out = run(&hash, &["line"], vec![s("ab")]);
        assert_eq!(out[0][1], Value::Int((97 * 31 + 98) % 10));
    }

    #[test]
    fn test_swap_and_rename() {
        let swap = EachOp::swap(&["hash", "sum1"]);
        assert_eq!(
            swap.outgoing(&fields(&["hash", "sum1", "sum2"])).unwrap(),
            fields(&["sum2", "hash", "sum1"])
        );
        let out = run(
            &swap,
            &["hash", "sum1", "sum2"],
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        );
        assert_eq!(out, vec![vec![Value::Int(3), Value::Int(1), Value::Int(2)]]);

        let rename = EachOp::rename("count", "count2");
        assert_eq!(
            rename.outgoing(&fields(&["line", "count"])).unwrap(),
            fields(&["line", "count2"])
        );
    }

    #[test]
    fn test_outgoing_validation() {
        let op = EachOp::word_count("missing", "count");
        assert!(op.outgoing(&fields(&["line"])).is_err());

        let dup = EachOp::word_count("line", "line");
        assert!(dup.outgoing(&fields(&["line"])).is_err());

        let bad = EachOp::hash_modulo("line", "hash", 0);
        assert!(bad.outgoing(&fields(&["line"])).is_err());
    }

    #[test]
    fn test_sample_is_deterministic() {
        let op = EachOp::Sample {
            fraction: 0.5,
            seed: 0,
        };
        let kept: Vec<_> = (0..200)
            .flat_map(|i| run(&op, &["n"], vec![Value::Int(i)]))
            .collect();
        let again: Vec<_> = (0..200)
            .flat_map(|i| run(&op, &["n"], vec![Value::Int(i)]))
            .collect();
        assert_eq!(kept, again);
        assert!(kept.len() > 50 && kept.len() < 150);
    }

    #[test]
    fn test_crashing_filter_trips() {
        let op = EachOp::CrashingFilter(BreakPolicy::AfterEvents(2));
        let mut state = op.new_state(SmallRng::seed_from_u64(0));
        let mut out = Vec::new();
        for i in 0..2 {
            op.apply(vec![Value::Int(i)], &[], &mut state, &mut out).unwrap();
        }
        let err = op
            .apply(vec![Value::Int(3)], &[], &mut state, &mut out)
            .unwrap_err();
        assert!(err.is_deliberate());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_aggregators() {
        let group = vec![
            vec![s("a"), Value::Int(2)],
            vec![s("a"), Value::Int(5)],
        ];
        assert_eq!(
            Aggregator::count("count").aggregate(&group, &[]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            Aggregator::sum("count", "sum1").aggregate(&group, &[1]).unwrap(),
            Value::Int(7)
        );
        let breaking = Aggregator::Breaking {
            output: "count".to_string(),
            policy: BreakPolicy::AfterEvents(1),
        };
        assert!(breaking.aggregate(&group, &[]).is_err());
    }

    #[test]
    fn test_joiners() {
        let left = vec![vec![s("k"), s("l")]];
        let right = vec![vec![s("k")]];

        assert_eq!(
            Joiner::Inner.combine(left.clone(), 2, &right, 1),
            vec![vec![s("k"), s("l"), s("k")]]
        );
        assert!(Joiner::Inner.combine(left.clone(), 2, &[], 1).is_empty());
        assert_eq!(
            Joiner::Left.combine(left.clone(), 2, &[], 1),
            vec![vec![s("k"), s("l"), Value::Null]]
        );
        assert!(Joiner::Left.combine(Vec::new(), 2, &right, 1).is_empty());
        assert_eq!(
            Joiner::Right.combine(Vec::new(), 2, &right, 1),
            vec![vec![Value::Null, Value::Null, s("k")]]
        );
        assert_eq!(Joiner::Outer.combine(Vec::new(), 2, &right, 1).len(), 1);
        assert!(Joiner::Outer.combine(Vec::new(), 2, &[], 1).is_empty());
    }
}
