//! Splits a flow's assembly into steps.
//!
//! Every `GroupBy` and `CoGroup` starts a step: the grouping and the `Each`
//! pipes downstream of it form the step's reduce side. Head segments (heads
//! and the `Each` chains hanging off them) run on the map side of the first
//! step that consumes them. A flow without groupings is one map-only step.

use crate::flow::{FlowDef, PipeId, PipeKind};
use crate::stats::{Stats, StatsKind};
use std::collections::HashMap;
use std::fmt::Write;

/// Which half of a step a pipe runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Map,
    Reduce,
}

/// One planned step.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    /// The grouping this step reduces on, if any.
    pub grouping: Option<PipeId>,
    pub map: Vec<PipeId>,
    pub reduce: Vec<PipeId>,
}

impl Step {
    /// Pipes of this step in execution order.
    pub fn pipes(&self) -> Vec<PipeId> {
        let mut pipes: Vec<PipeId> = self.map.iter().chain(self.reduce.iter()).copied().collect();
        pipes.sort();
        pipes
    }

    pub fn node_names(&self) -> Vec<&'static str> {
        if self.grouping.is_some() {
            vec!["(1/2) map", "(2/2) reduce"]
        } else {
            vec!["(1/1) map"]
        }
    }
}

/// Steps of one flow, in execution order.
#[derive(Debug, Clone)]
pub struct FlowPlan {
    flow: String,
    steps: Vec<Step>,
    placement: HashMap<PipeId, (usize, Side)>,
}

impl FlowPlan {
    pub fn plan(flow: &FlowDef) -> Self {
        let assembly = flow.assembly();
        let groupings: Vec<PipeId> = assembly
            .pipes()
            .filter(|(_, pipe)| pipe.is_grouping())
            .map(|(id, _)| id)
            .collect();

        let total = groupings.len().max(1);
        let mut steps: Vec<Step> = (0..total)
            .map(|index| Step {
                name: format!("({}/{}) {}", index + 1, total, flow.name()),
                grouping: groupings.get(index).copied(),
                map: Vec::new(),
                reduce: Vec::new(),
            })
            .collect();
        let step_of_grouping: HashMap<PipeId, usize> = groupings
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();

        // Pipes are in topological order, so every input is classified first.
        enum Origin {
            Head(PipeId),
            Grouping(usize),
        }
        let mut origin: HashMap<PipeId, Origin> = HashMap::new();
        let mut segments: HashMap<PipeId, Vec<PipeId>> = HashMap::new();

        for (id, pipe) in assembly.pipes() {
            match &pipe.kind {
                PipeKind::Head => {
                    origin.insert(id, Origin::Head(id));
                    segments.entry(id).or_default().push(id);
                }
                PipeKind::Each { input, .. } => match origin.get(input) {
                    Some(Origin::Head(head)) => {
                        let head = *head;
                        origin.insert(id, Origin::Head(head));
                        segments.entry(head).or_default().push(id);
                    }
                    Some(Origin::Grouping(step)) => {
                        let step = *step;
                        origin.insert(id, Origin::Grouping(step));
                        steps[step].reduce.push(id);
                    }
                    None => {}
                },
                PipeKind::GroupBy { .. } | PipeKind::CoGroup { .. } => {
                    let step = step_of_grouping.get(&id).copied().unwrap_or(0);
                    origin.insert(id, Origin::Grouping(step));
                    steps[step].reduce.push(id);
                }
            }
        }

        for head in assembly.heads() {
            let Some(segment) = segments.remove(&head) else {
                continue;
            };
            let step = segment
                .iter()
                .flat_map(|pipe| assembly.consumers(*pipe))
                .filter_map(|consumer| step_of_grouping.get(&consumer).copied())
                .min()
                .unwrap_or(0);
            steps[step].map.extend(segment);
        }
        for step in &mut steps {
            step.map.sort();
        }

        let mut placement = HashMap::new();
        for (index, step) in steps.iter().enumerate() {
            for id in &step.map {
                placement.insert(*id, (index, Side::Map));
            }
            for id in &step.reduce {
                placement.insert(*id, (index, Side::Reduce));
            }
        }

        Self {
            flow: flow.name().to_string(),
            steps,
            placement,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step index and side a pipe was placed on.
    pub fn placement(&self, pipe: PipeId) -> Option<(usize, Side)> {
        self.placement.get(&pipe).copied()
    }

    /// An empty stats tree shaped like this plan.
    pub fn new_stats(&self) -> Stats {
        let mut flow = Stats::new(StatsKind::Flow, self.flow.as_str());
        for step in &self.steps {
            let mut step_stats = Stats::new(StatsKind::Step, step.name.as_str());
            for node in step.node_names() {
                step_stats.push_child(Stats::new(StatsKind::Node, node));
            }
            flow.push_child(step_stats);
        }
        flow
    }

    /// Human readable plan.
    pub fn render_trace(&self, flow: &FlowDef) -> String {
        let assembly = flow.assembly();
        let mut trace = String::new();
        let _ = writeln!(trace, "flow: {}", self.flow);
        for path in flow.source_paths() {
            let _ = writeln!(trace, "  source: {path}");
        }
        for path in flow.sink_paths() {
            let _ = writeln!(trace, "  sink: {path}");
        }

        for step in &self.steps {
            let _ = writeln!(trace, "step: {}", step.name);
            let sides = [(Side::Map, &step.map), (Side::Reduce, &step.reduce)];
            for (side, pipes) in sides {
                if pipes.is_empty() {
                    continue;
                }
                let label = match side {
                    Side::Map => "map",
                    Side::Reduce => "reduce",
                };
                let _ = writeln!(trace, "  {label}:");
                for id in pipes {
                    let pipe = assembly.pipe(*id);
                    let _ = writeln!(
                        trace,
                        "    {} {} [{}]",
                        id.index(),
                        pipe.label(),
                        pipe.fields.join(", ")
                    );
                }
            }
        }
        trace
    }
}
