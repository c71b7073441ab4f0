//! Pipe assemblies and flow definitions.
//!
//! An [`Assembly`] is an arena of pipes where every pipe refers to its inputs
//! by [`PipeId`]. Inputs always precede their consumers, so arena order is a
//! valid topological order. A [`FlowDef`] binds the assembly's heads to
//! source taps and its tails to sink taps.

use super::operation::{Aggregator, EachOp, Every, Joiner};
use crate::tap::Tap;
use crate::tuple::{ensure_unique_fields, field_position, field_positions};
use load_common::{LoadError, Result};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Index of a pipe inside its [`Assembly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeId(usize);

impl PipeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Grouping settings for [`Assembly::group_by`].
#[derive(Debug, Clone)]
pub struct GroupBy {
    key: Vec<String>,
    sort: Vec<String>,
    reverse: bool,
    every: Every,
}

impl GroupBy {
    pub fn new(key: &[&str]) -> Self {
        Self {
            key: key.iter().map(|k| k.to_string()).collect(),
            sort: Vec::new(),
            reverse: false,
            every: Every::Tuples,
        }
    }

    /// Secondary sort inside each group, ascending.
    pub fn sorted_by(mut self, sort: &[&str]) -> Self {
        self.sort = sort.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Groups arrive in descending key order.
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn every(mut self, every: Every) -> Self {
        self.every = every;
        self
    }

    pub fn aggregate(self, aggregators: Vec<Aggregator>) -> Self {
        self.every(Every::Aggregate(aggregators))
    }
}

/// What a pipe does, with field names already resolved to positions.
#[derive(Debug, Clone)]
pub enum PipeKind {
    Head,
    Each {
        input: PipeId,
        op: EachOp,
        args: Vec<usize>,
    },
    GroupBy {
        input: PipeId,
        key: Vec<usize>,
        sort: Vec<usize>,
        reverse: bool,
        every: Every,
        every_args: Vec<Vec<usize>>,
    },
    CoGroup {
        inputs: Vec<(PipeId, usize)>,
        joiner: Joiner,
    },
}

/// One node of an assembly.
#[derive(Debug, Clone)]
pub struct Pipe {
    pub name: String,
    pub kind: PipeKind,
    pub fields: Vec<String>,
}

impl Pipe {
    pub fn inputs(&self) -> Vec<PipeId> {
        match &self.kind {
            PipeKind::Head => Vec::new(),
            PipeKind::Each { input, .. } | PipeKind::GroupBy { input, .. } => vec![*input],
            PipeKind::CoGroup { inputs, .. } => inputs.iter().map(|(id, _)| *id).collect(),
        }
    }

    pub fn is_grouping(&self) -> bool {
        matches!(self.kind, PipeKind::GroupBy { .. } | PipeKind::CoGroup { .. })
    }

    pub fn label(&self) -> String {
        match &self.kind {
            PipeKind::Head => format!("Head[{}]", self.name),
            PipeKind::Each { op, .. } => format!("Each[{}]", op.label()),
            PipeKind::GroupBy { every, .. } => {
                let every = match every {
                    Every::Tuples => String::new(),
                    Every::Unique => " Unique".to_string(),
                    Every::Aggregate(aggregators) => format!(" Every[{} aggregators]", aggregators.len()),
                    Every::Buffer(buffer) => format!(" Every[{}]", buffer.label()),
                };
                format!("GroupBy[{}]{}", self.name, every)
            }
            PipeKind::CoGroup { joiner, .. } => format!("CoGroup[{}] {}", self.name, joiner.label()),
        }
    }
}

/// Builder for a pipe graph.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pipes: Vec<Pipe>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// A named entry point carrying one `line` field.
    pub fn head(&mut self, name: &str) -> PipeId {
        self.push(Pipe {
            name: name.to_string(),
            kind: PipeKind::Head,
            fields: vec!["line".to_string()],
        })
    }

    pub fn each(&mut self, input: PipeId, op: EachOp) -> Result<PipeId> {
        let incoming = self.fields_of(input)?;
        let args = field_positions(incoming, &op.arguments())?;
        let fields = op.outgoing(incoming)?;
        let name = self.pipes[input.0].name.clone();

        Ok(self.push(Pipe {
            name,
            kind: PipeKind::Each { input, op, args },
            fields,
        }))
    }

    /// Apply several operators in sequence.
    pub fn each_all(&mut self, mut input: PipeId, ops: Vec<EachOp>) -> Result<PipeId> {
        for op in ops {
            input = self.each(input, op)?;
        }
        Ok(input)
    }

    pub fn group_by(&mut self, input: PipeId, spec: GroupBy) -> Result<PipeId> {
        let incoming = self.fields_of(input)?.to_vec();
        if spec.key.is_empty() {
            return Err(LoadError::build_error("group by needs at least one key field"));
        }
        let key = field_positions(&incoming, &spec.key)?;
        let sort = field_positions(&incoming, &spec.sort)?;

        let (fields, every_args) = match &spec.every {
            Every::Aggregate(aggregators) => {
                let mut fields = spec.key.clone();
                fields.extend(aggregators.iter().map(|a| a.output().to_string()));
                let args = aggregators
                    .iter()
                    .map(|a| field_positions(&incoming, &a.arguments()))
                    .collect::<Result<Vec<_>>>()?;
                (fields, args)
            }
            Every::Tuples | Every::Unique | Every::Buffer(_) => (incoming.clone(), Vec::new()),
        };
        ensure_unique_fields(&fields)?;

        let name = self.pipes[input.0].name.clone();
        Ok(self.push(Pipe {
            name,
            kind: PipeKind::GroupBy {
                input,
                key,
                sort,
                reverse: spec.reverse,
                every: spec.every,
                every_args,
            },
            fields,
        }))
    }

    /// Join any number of sides on one key field each.
    ///
    /// Output fields are the sides' fields concatenated, or `declared` when
    /// given (which must have the same width).
    pub fn co_group(
        &mut self,
        name: &str,
        sides: &[(PipeId, &str)],
        joiner: Joiner,
        declared: Option<Vec<String>>,
    ) -> Result<PipeId> {
        if sides.len() < 2 {
            return Err(LoadError::build_error(format!(
                "co-group '{name}' needs at least two sides"
            )));
        }

        let mut inputs = Vec::with_capacity(sides.len());
        let mut fields = Vec::new();
        for (side, key) in sides {
            let incoming = self.fields_of(*side)?;
            inputs.push((*side, field_position(incoming, key)?));
            fields.extend(incoming.iter().cloned());
        }

        if let Some(declared) = declared {
            if declared.len() != fields.len() {
                return Err(LoadError::build_error(format!(
                    "co-group '{name}' declares {} fields but joins {}",
                    declared.len(),
                    fields.len()
                )));
            }
            fields = declared;
        }
        ensure_unique_fields(&fields)?;

        Ok(self.push(Pipe {
            name: name.to_string(),
            kind: PipeKind::CoGroup { inputs, joiner },
            fields,
        }))
    }

    pub fn pipe(&self, id: PipeId) -> &Pipe {
        &self.pipes[id.0]
    }

    pub fn pipes(&self) -> impl Iterator<Item = (PipeId, &Pipe)> {
        self.pipes.iter().enumerate().map(|(i, p)| (PipeId(i), p))
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Pipes that read from `id`, in arena order.
    pub fn consumers(&self, id: PipeId) -> Vec<PipeId> {
        self.pipes()
            .filter(|(_, pipe)| pipe.inputs().contains(&id))
            .map(|(consumer, _)| consumer)
            .collect()
    }

    pub fn heads(&self) -> Vec<PipeId> {
        self.pipes()
            .filter(|(_, pipe)| matches!(pipe.kind, PipeKind::Head))
            .map(|(id, _)| id)
            .collect()
    }

    /// Pipes nothing reads from.
    pub fn tails(&self) -> Vec<PipeId> {
        self.pipes()
            .map(|(id, _)| id)
            .filter(|id| self.consumers(*id).is_empty())
            .collect()
    }

    fn fields_of(&self, id: PipeId) -> Result<&[String]> {
        self.pipes
            .get(id.0)
            .map(|p| p.fields.as_slice())
            .ok_or_else(|| LoadError::build_error(format!("unknown pipe {}", id.0)))
    }

    fn push(&mut self, pipe: Pipe) -> PipeId {
        self.pipes.push(pipe);
        PipeId(self.pipes.len() - 1)
    }
}

/// Work the engine performs before a flow starts.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupAction {
    /// Write `copies` part files, each one line of tab separated dictionary words.
    WriteDictionary { path: String, copies: usize },
}

/// A connected, runnable flow.
#[derive(Debug, Clone)]
pub struct FlowDef {
    name: String,
    assembly: Assembly,
    sources: BTreeMap<PipeId, Tap>,
    sinks: BTreeMap<PipeId, Tap>,
    setup: Vec<SetupAction>,
}

impl FlowDef {
    /// Bind heads (by name) to sources and tails to sinks.
    ///
    /// Every head needs a source and every tail needs a sink.
    pub fn connect(
        name: &str,
        assembly: Assembly,
        sources: Vec<(&str, Tap)>,
        sinks: Vec<(PipeId, Tap)>,
    ) -> Result<Self> {
        let mut bound_sources = BTreeMap::new();
        for (head_name, tap) in sources {
            let head = assembly
                .heads()
                .into_iter()
                .find(|id| assembly.pipe(*id).name == head_name)
                .ok_or_else(|| {
                    LoadError::build_error(format!(
                        "flow '{name}': no head named '{head_name}' for source {}",
                        tap.path()
                    ))
                })?;
            bound_sources.insert(head, tap);
        }

        for head in assembly.heads() {
            if !bound_sources.contains_key(&head) {
                return Err(LoadError::build_error(format!(
                    "flow '{name}': head '{}' has no source",
                    assembly.pipe(head).name
                )));
            }
        }

        let tails = assembly.tails();
        let mut bound_sinks = BTreeMap::new();
        for (pipe, tap) in sinks {
            if !tails.contains(&pipe) {
                return Err(LoadError::build_error(format!(
                    "flow '{name}': sink {} is not bound to a tail",
                    tap.path()
                )));
            }
            bound_sinks.insert(pipe, tap);
        }

        for tail in &tails {
            if !bound_sinks.contains_key(tail) {
                return Err(LoadError::build_error(format!(
                    "flow '{name}': tail '{}' has no sink",
                    assembly.pipe(*tail).name
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            assembly,
            sources: bound_sources,
            sinks: bound_sinks,
            setup: Vec::new(),
        })
    }

    pub fn with_setup(mut self, action: SetupAction) -> Self {
        self.setup.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    pub fn source(&self, head: PipeId) -> Option<&Tap> {
        self.sources.get(&head)
    }

    pub fn sink(&self, tail: PipeId) -> Option<&Tap> {
        self.sinks.get(&tail)
    }

    pub fn setup(&self) -> &[SetupAction] {
        &self.setup
    }

    pub fn source_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.sources.values().map(Tap::path).collect();
        paths.sort();
        paths.dedup();
        paths
    }

    pub fn sink_paths(&self) -> Vec<&str> {
        self.sinks.values().map(Tap::path).collect()
    }

    /// Graphviz rendering of taps and pipes.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", escape(&self.name));
        let _ = writeln!(dot, "  rankdir=TB;");

        for (id, tap) in &self.sources {
            let _ = writeln!(dot, "  \"source{}\" [shape=box, label=\"{}\"];", id.0, escape(tap.path()));
            let _ = writeln!(dot, "  \"source{}\" -> \"pipe{}\";", id.0, id.0);
        }

        for (id, pipe) in self.assembly.pipes() {
            let _ = writeln!(
                dot,
                "  \"pipe{}\" [label=\"{}\\n[{}]\"];",
                id.0,
                escape(&pipe.label()),
                escape(&pipe.fields.join(", "))
            );
            for input in pipe.inputs() {
                let _ = writeln!(dot, "  \"pipe{}\" -> \"pipe{}\";", input.0, id.0);
            }
        }

        for (id, tap) in &self.sinks {
            let _ = writeln!(dot, "  \"sink{}\" [shape=box, label=\"{}\"];", id.0, escape(tap.path()));
            let _ = writeln!(dot, "  \"pipe{}\" -> \"sink{}\";", id.0, id.0);
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count() -> (Assembly, PipeId) {
        let mut assembly = Assembly::new();
        let head = assembly.head("count");
        let words = assembly
            .each(head, EachOp::split_words("line", "word").unwrap())
            .unwrap();
        let counted = assembly
            .group_by(
                words,
                GroupBy::new(&["word"]).aggregate(vec![Aggregator::count("count")]),
            )
            .unwrap();
        (assembly, counted)
    }

    #[test]
    fn test_fields_flow_through() {
        let (assembly, counted) = word_count();
        assert_eq!(assembly.pipe(counted).fields, vec!["word", "count"]);
        assert_eq!(assembly.pipe(counted).name, "count");
        assert_eq!(assembly.tails(), vec![counted]);
        assert_eq!(assembly.heads().len(), 1);
    }

    #[test]
    fn test_bad_field_is_build_error() {
        let mut assembly = Assembly::new();
        let head = assembly.head("h");
        let err = assembly
            .group_by(head, GroupBy::new(&["word"]))
            .unwrap_err();
        assert!(matches!(err, LoadError::BuildError { .. }));
    }

    #[test]
    fn test_connect_requires_bindings() {
        let (assembly, counted) = word_count();

        let err = FlowDef::connect("wc", assembly.clone(), vec![], vec![(counted, Tap::new("out/"))])
            .unwrap_err();
        assert!(err.to_string().contains("has no source"));

        let err = FlowDef::connect("wc", assembly.clone(), vec![("count", Tap::new("in/"))], vec![])
            .unwrap_err();
        assert!(err.to_string().contains("has no sink"));

        let err = FlowDef::connect(
            "wc",
            assembly.clone(),
            vec![("nope", Tap::new("in/"))],
            vec![(counted, Tap::new("out/"))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("no head named"));

        let flow = FlowDef::connect(
            "wc",
            assembly,
            vec![("count", Tap::new("in/"))],
            vec![(counted, Tap::new("out/wc"))],
        )
        .unwrap();
        assert_eq!(flow.source_paths(), vec!["in/"]);
        assert_eq!(flow.sink_paths(), vec!["out/wc"]);
    }

    #[test]
    fn test_co_group_fields() {
        let mut assembly = Assembly::new();
        let left = assembly.head("left");
        let left = assembly
            .each(left, EachOp::split_fields("line", 2, r"\s").unwrap())
            .unwrap();
        let right = assembly.head("right");
        let right = assembly
            .each(right, EachOp::split_words("line", "word").unwrap())
            .unwrap();

        let joined = assembly
            .co_group("inner", &[(left, "field0"), (right, "word")], Joiner::Inner, None)
            .unwrap();
        assert_eq!(assembly.pipe(joined).fields, vec!["field0", "field1", "word"]);

        let err = assembly
            .co_group("self", &[(left, "field0"), (left, "field0")], Joiner::Inner, None)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field"));

        let declared = assembly
            .co_group(
                "self",
                &[(left, "field0"), (left, "field0")],
                Joiner::Inner,
                Some((0..4).map(|i| format!("f{i}")).collect()),
            )
            .unwrap();
        assert_eq!(assembly.pipe(declared).fields.len(), 4);
    }

    #[test]
    fn test_dot_output() {
        let (assembly, counted) = word_count();
        let flow = FlowDef::connect(
            "wc",
            assembly,
            vec![("count", Tap::new("in/"))],
            vec![(counted, Tap::new("out/wc"))],
        )
        .unwrap();
        let dot = flow.to_dot();
        assert!(dot.starts_with("digraph \"wc\" {"));
        assert!(dot.contains("\"pipe1\" -> \"pipe2\";"));
        assert!(dot.contains("label=\"out/wc\""));
        assert!(dot.trim_end().ends_with('}'));
    }
}
