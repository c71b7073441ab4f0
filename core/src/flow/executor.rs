//! Runs one planned flow in process.

use super::assembly::{FlowDef, PipeId, PipeKind, SetupAction};
use super::breaking::Breaker;
use super::operation::{BufferOp, EachOp, Every, Joiner};
use crate::generate::dictionary;
use crate::planner::{FlowPlan, Side, Step};
use crate::properties::{self, Properties};
use crate::scheduler::{ComputeFn, LocalScheduler, tasks_for};
use crate::stats::{Counter, Stats, Status};
use crate::tap::Tap;
use crate::tuple::{Tuple, Value, select};
use load_common::{LoadError, Result};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

type Partitions = Vec<Vec<Tuple>>;

/// Executes a flow's steps in order against local taps.
pub struct FlowExecutor<'a> {
    flow: &'a FlowDef,
    plan: &'a FlowPlan,
    scheduler: LocalScheduler,
    reducers: usize,
}

impl<'a> FlowExecutor<'a> {
    pub fn new(flow: &'a FlowDef, plan: &'a FlowPlan, properties: &Properties) -> Result<Self> {
        let mappers = properties::get_i64(properties, properties::MAPPERS).unwrap_or(-1);
        let reducers = properties::get_positive(properties, properties::REDUCERS).unwrap_or(1);
        Ok(Self {
            flow,
            plan,
            scheduler: LocalScheduler::for_mappers(mappers)?,
            reducers,
        })
    }

    /// Run the flow, filling `stats` (shaped by [`FlowPlan::new_stats`]).
    ///
    /// On failure the failing step is marked `Failed`, later steps `Skipped`,
    /// and the error is wrapped as an execution error naming the flow.
    pub fn run(&self, stats: &mut Stats) -> Result<()> {
        info!("starting flow: {}", self.flow.name());
        stats.mark_started();

        let result = self.run_steps(stats);
        stats.roll_up();

        match result {
            Ok(()) => {
                stats.mark_finished(Status::Successful);
                info!("completed flow: {}", self.flow.name());
                Ok(())
            }
            Err(e) => {
                stats.mark_finished(Status::Failed);
                Err(LoadError::execution_error_with_source(
                    format!("flow {} failed", self.flow.name()),
                    e,
                ))
            }
        }
    }

    fn run_steps(&self, stats: &mut Stats) -> Result<()> {
        for action in self.flow.setup() {
            run_setup(action)?;
        }

        let mut outputs = Outputs::new(self.flow);
        let steps = self.plan.steps();
        for (index, step) in steps.iter().enumerate() {
            let step_stats = &mut stats.children_mut()[index];
            debug!("starting step: {}", step.name);
            step_stats.mark_started();
            for node in step_stats.children_mut() {
                node.mark_started();
            }

            let result = self.run_step(step, step_stats, &mut outputs);
            let status = if result.is_ok() {
                Status::Successful
            } else {
                Status::Failed
            };
            for node in step_stats.children_mut() {
                node.mark_finished(status);
            }
            step_stats.mark_finished(status);

            if let Err(e) = result {
                for skipped in &mut stats.children_mut()[index + 1..] {
                    skipped.mark_skipped();
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn run_step(&self, step: &Step, stats: &mut Stats, outputs: &mut Outputs) -> Result<()> {
        for id in step.pipes() {
            let side = self.plan.placement(id).map(|(_, side)| side).unwrap_or(Side::Map);
            let node_index = match side {
                Side::Map => 0,
                Side::Reduce => 1,
            };
            let node = &mut stats.children_mut()[node_index];

            let started = Instant::now();
            let partitions = self.run_pipe(id, outputs, node)?;

            if let Some(sink) = self.flow.sink(id) {
                let writing = Instant::now();
                let written = sink.write(&partitions)?;
                node.add_counter(Counter::WriteDuration, elapsed_millis(writing));
                node.add_counter(Counter::TuplesWritten, written);
                debug!("wrote {} tuples to {}", written, sink.path());
            }
            node.add_counter(Counter::ProcessDuration, elapsed_millis(started));

            outputs.store(id, partitions);
        }
        Ok(())
    }

    fn run_pipe(&self, id: PipeId, outputs: &mut Outputs, node: &mut Stats) -> Result<Partitions> {
        let pipe = self.flow.assembly().pipe(id);
        match &pipe.kind {
            PipeKind::Head => {
                let source = self.flow.source(id).ok_or_else(|| {
                    LoadError::build_error(format!("head '{}' has no source", pipe.name))
                })?;
                let reading = Instant::now();
                let partitions = source.read()?;
                node.add_counter(Counter::ReadDuration, elapsed_millis(reading));
                node.add_counter(
                    Counter::TuplesRead,
                    partitions.iter().map(Vec::len).sum::<usize>() as u64,
                );
                Ok(partitions)
            }
            PipeKind::Each { input, op, args } => {
                let partitions = outputs.take(*input)?;
                self.run_each(op, args, partitions)
            }
            PipeKind::GroupBy {
                input,
                key,
                sort,
                reverse,
                every,
                every_args,
            } => {
                let partitions = outputs.take(*input)?;
                self.run_group_by(partitions, key, sort, *reverse, every, every_args)
            }
            PipeKind::CoGroup { inputs, joiner } => {
                let mut distinct: HashMap<PipeId, Partitions> = HashMap::new();
                for (side, _) in inputs {
                    if !distinct.contains_key(side) {
                        distinct.insert(*side, outputs.take(*side)?);
                    }
                }
                let sides = inputs
                    .iter()
                    .map(|(side, key)| {
                        let width = self.flow.assembly().pipe(*side).fields.len();
                        let partitions = distinct.get(side).map(Vec::as_slice).unwrap_or(&[]);
                        (partitions, *key, width)
                    })
                    .collect::<Vec<_>>();
                self.run_co_group(&sides, *joiner)
            }
        }
    }

    fn run_each(&self, op: &EachOp, args: &[usize], partitions: Partitions) -> Result<Partitions> {
        let op = op.clone();
        let args = args.to_vec();
        let compute_fn: ComputeFn<Vec<Tuple>, Tuple> = Arc::new(move |_, partition| {
            let mut state = op.new_state(SmallRng::from_entropy());
            let mut out = Vec::with_capacity(partition.len());
            for tuple in partition {
                op.apply(tuple, &args, &mut state, &mut out)?;
            }
            Ok(out)
        });
        self.scheduler.execute_tasks(tasks_for(partitions, compute_fn))
    }

    fn run_group_by(
        &self,
        partitions: Partitions,
        key: &[usize],
        sort: &[usize],
        reverse: bool,
        every: &Every,
        every_args: &[Vec<usize>],
    ) -> Result<Partitions> {
        let buckets = shuffle(
            partitions.into_iter().flatten(),
            self.reducers,
            |tuple| select(tuple, key),
        );

        let key = key.to_vec();
        let sort = sort.to_vec();
        let every = every.clone();
        let every_args = every_args.to_vec();
        let compute_fn: ComputeFn<Vec<Tuple>, Tuple> = Arc::new(move |_, mut bucket| {
            bucket.sort_by(|a, b| {
                let by_key = compare_at(a, b, &key);
                let by_key = if reverse { by_key.reverse() } else { by_key };
                by_key.then_with(|| compare_at(a, b, &sort))
            });

            let mut out = Vec::new();
            let mut breaker = match &every {
                Every::Buffer(BufferOp::Crashing(policy)) => Some(Breaker::new(*policy)),
                _ => None,
            };
            for group in split_groups(bucket, &key) {
                match &every {
                    Every::Tuples => out.extend(group),
                    Every::Unique => out.extend(group.into_iter().take(1)),
                    Every::Aggregate(aggregators) => {
                        let Some(first) = group.first() else {
                            continue;
                        };
                        let mut row = select(first, &key);
                        for (aggregator, args) in aggregators.iter().zip(&every_args) {
                            row.push(aggregator.aggregate(&group, args)?);
                        }
                        out.push(row);
                    }
                    Every::Buffer(buffer) => {
                        if let Some(breaker) = breaker.as_mut() {
                            buffer.operate(group, breaker, &mut out)?;
                        }
                    }
                }
            }
            Ok(out)
        });
        self.scheduler.execute_tasks(tasks_for(buckets, compute_fn))
    }

    /// Each side is its partitions, key position and width.
    fn run_co_group(&self, sides: &[(&[Vec<Tuple>], usize, usize)], joiner: Joiner) -> Result<Partitions> {
        let mut per_reducer: Vec<Vec<Vec<Tuple>>> = vec![Vec::with_capacity(sides.len()); self.reducers];
        for (partitions, key, _) in sides {
            let key = *key;
            let buckets = shuffle(
                partitions.iter().flatten().cloned(),
                self.reducers,
                |tuple| select(tuple, &[key]),
            );
            for (reducer, bucket) in buckets.into_iter().enumerate() {
                per_reducer[reducer].push(bucket);
            }
        }

        let keys: Vec<usize> = sides.iter().map(|(_, key, _)| *key).collect();
        let widths: Vec<usize> = sides.iter().map(|(_, _, width)| *width).collect();
        let compute_fn: ComputeFn<Vec<Vec<Tuple>>, Tuple> = Arc::new(move |_, sides| {
            let mut keyed: BTreeMap<Value, Vec<Vec<Tuple>>> = BTreeMap::new();
            for (index, rows) in sides.into_iter().enumerate() {
                for row in rows {
                    let key = row.get(keys[index]).cloned().unwrap_or(Value::Null);
                    keyed
                        .entry(key)
                        .or_insert_with(|| vec![Vec::new(); widths.len()])[index]
                        .push(row);
                }
            }

            let mut out = Vec::new();
            for (_, groups) in keyed {
                let mut groups = groups.into_iter();
                let mut joined = groups.next().unwrap_or_default();
                let mut width = widths[0];
                for (index, side) in groups.enumerate() {
                    let side_width = widths[index + 1];
                    joined = joiner.combine(joined, width, &side, side_width);
                    width += side_width;
                }
                out.extend(joined);
            }
            Ok(out)
        });
        self.scheduler.execute_tasks(tasks_for(per_reducer, compute_fn))
    }
}

fn run_setup(action: &SetupAction) -> Result<()> {
    match action {
        SetupAction::WriteDictionary { path, copies } => {
            let line = dictionary().join("\t");
            let partitions: Partitions = (0..*copies)
                .map(|_| vec![vec![Value::Str(line.clone())]])
                .collect();
            Tap::new(path.as_str()).write(&partitions)?;
            debug!("wrote {} dictionary files to {}", copies, path);
            Ok(())
        }
    }
}

/// Intermediate pipe outputs, dropped once their last consumer has read them.
struct Outputs {
    data: HashMap<PipeId, Partitions>,
    pending: HashMap<PipeId, usize>,
}

impl Outputs {
    fn new(flow: &FlowDef) -> Self {
        let mut pending: HashMap<PipeId, usize> = HashMap::new();
        for (_, pipe) in flow.assembly().pipes() {
            let mut inputs = pipe.inputs();
            inputs.sort();
            inputs.dedup();
            for input in inputs {
                *pending.entry(input).or_insert(0) += 1;
            }
        }
        Self {
            data: HashMap::new(),
            pending,
        }
    }

    fn store(&mut self, id: PipeId, partitions: Partitions) {
        if self.pending.get(&id).copied().unwrap_or(0) > 0 {
            self.data.insert(id, partitions);
        }
    }

    fn take(&mut self, id: PipeId) -> Result<Partitions> {
        let remaining = self.pending.get_mut(&id).ok_or_else(|| {
            LoadError::execution_error(format!("pipe {} has no pending consumers", id.index()))
        })?;
        *remaining = remaining.saturating_sub(1);

        let missing = || LoadError::execution_error(format!("pipe {} has not run", id.index()));
        if *remaining == 0 {
            self.data.remove(&id).ok_or_else(missing)
        } else {
            self.data.get(&id).cloned().ok_or_else(missing)
        }
    }
}

fn shuffle<I, K>(tuples: I, reducers: usize, key_of: K) -> Partitions
where
    I: IntoIterator<Item = Tuple>,
    K: Fn(&Tuple) -> Tuple,
{
    let reducers = reducers.max(1);
    let mut buckets: Partitions = vec![Vec::new(); reducers];
    for tuple in tuples {
        let mut hasher = DefaultHasher::new();
        key_of(&tuple).hash(&mut hasher);
        let bucket = (hasher.finish() % reducers as u64) as usize;
        buckets[bucket].push(tuple);
    }
    buckets
}

fn compare_at(a: &[Value], b: &[Value], positions: &[usize]) -> Ordering {
    for &position in positions {
        match a.get(position).cmp(&b.get(position)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Split sorted tuples into runs of equal key.
fn split_groups(sorted: Vec<Tuple>, key: &[usize]) -> Vec<Vec<Tuple>> {
    let mut groups: Vec<Vec<Tuple>> = Vec::new();
    for tuple in sorted {
        let same = groups
            .last()
            .and_then(|group| group.first())
            .map(|first| compare_at(first, &tuple, key) == Ordering::Equal)
            .unwrap_or(false);
        if same {
            if let Some(group) = groups.last_mut() {
                group.push(tuple);
            }
        } else {
            groups.push(vec![tuple]);
        }
    }
    groups
}

fn elapsed_millis(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
