//! Cascades: sets of flows run together.
//!
//! A flow that reads a path another flow writes (the same path, or a path
//! beneath it) runs after that flow. Independent flows are grouped into waves
//! and each wave runs on a pool bounded by `load.max.concurrent.flows`.

use crate::flow::{FlowDef, FlowExecutor};
use crate::planner::FlowPlan;
use crate::properties::{self, Properties};
use crate::stats::{Stats, StatsKind, Status};
use load_common::{LoadError, Result};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{error, info};

pub struct Cascade {
    name: String,
    flows: Vec<FlowDef>,
    plans: Vec<FlowPlan>,
    waves: Vec<Vec<usize>>,
    properties: Properties,
    stats: Stats,
}

impl Cascade {
    /// Plan every flow and order them by their tap dependencies.
    pub fn connect(name: &str, flows: Vec<FlowDef>, properties: Properties) -> Result<Self> {
        let waves = order_flows(name, &flows)?;
        let plans: Vec<FlowPlan> = flows.iter().map(FlowPlan::plan).collect();

        let mut stats = Stats::new(StatsKind::Cascade, name);
        for plan in &plans {
            stats.push_child(plan.new_stats());
        }

        Ok(Self {
            name: name.to_string(),
            flows,
            plans,
            waves,
            properties,
            stats,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flows(&self) -> &[FlowDef] {
        &self.flows
    }

    pub fn plans(&self) -> &[FlowPlan] {
        &self.plans
    }

    /// Flow indices grouped by the wave they run in.
    pub fn waves(&self) -> &[Vec<usize>] {
        &self.waves
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Run every flow to completion.
    ///
    /// The first failing wave stops the cascade: its failed flows are
    /// `Failed`, flows of later waves are `Skipped`, and the first failure
    /// (in flow order) is returned.
    pub fn complete(&mut self) -> Result<()> {
        let max_concurrent =
            properties::get_i64(&self.properties, properties::MAX_CONCURRENT_FLOWS).unwrap_or(-1);
        let widest = self.waves.iter().map(Vec::len).max().unwrap_or(1);
        let threads = flow_threads(max_concurrent, widest);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("load-flow-{index}"))
            .build()
            .map_err(|e| LoadError::execution_error_with_source("failed to start flow pool", e))?;

        info!(
            "starting cascade: {}, {} flows in {} waves, {} at a time",
            self.name,
            self.flows.len(),
            self.waves.len(),
            threads
        );
        self.stats.mark_started();

        let Cascade {
            flows,
            plans,
            waves,
            properties,
            stats,
            ..
        } = self;

        let mut failure: Option<LoadError> = None;
        for (wave_index, wave) in waves.iter().enumerate() {
            let members: Vec<(usize, &mut Stats)> = stats
                .children_mut()
                .iter_mut()
                .enumerate()
                .filter(|(index, _)| wave.contains(index))
                .collect();

            let results: Vec<(usize, Result<()>)> = pool.install(|| {
                members
                    .into_par_iter()
                    .map(|(index, flow_stats)| {
                        let result = FlowExecutor::new(&flows[index], &plans[index], properties)
                            .and_then(|executor| executor.run(flow_stats));
                        (index, result)
                    })
                    .collect()
            });

            for (index, result) in results {
                if let Err(e) = result {
                    error!("flow {} failed: {}", flows[index].name(), e);
                    let flow_stats = &mut stats.children_mut()[index];
                    if !flow_stats.status().is_finished() {
                        flow_stats.mark_finished(Status::Failed);
                    }
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }

            if failure.is_some() {
                for later in &waves[wave_index + 1..] {
                    for index in later {
                        stats.children_mut()[*index].mark_skipped();
                    }
                }
                break;
            }
        }

        stats.roll_up();
        match failure {
            Some(e) => {
                stats.mark_finished(Status::Failed);
                Err(e)
            }
            None => {
                stats.mark_finished(Status::Successful);
                info!("completed cascade: {}", self.name);
                Ok(())
            }
        }
    }
}

/// Pool size for `load.max.concurrent.flows`, never wider than the widest wave.
fn flow_threads(max_concurrent: i64, widest: usize) -> usize {
    let widest = widest.max(1);
    match max_concurrent {
        n if n < 0 => widest,
        0 | 1 => 1,
        n => usize::try_from(n).unwrap_or(usize::MAX).min(widest),
    }
}

/// Group flows into waves; a flow runs in the wave after the last flow it reads from.
fn order_flows(name: &str, flows: &[FlowDef]) -> Result<Vec<Vec<usize>>> {
    let depends_on: Vec<Vec<usize>> = flows
        .iter()
        .enumerate()
        .map(|(index, flow)| {
            flows
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .filter(|(_, writer)| reads_output_of(flow, writer))
                .map(|(other, _)| other)
                .collect()
        })
        .collect();

    let mut wave_of: Vec<Option<usize>> = vec![None; flows.len()];
    let mut waves: Vec<Vec<usize>> = Vec::new();
    let mut placed = 0;
    while placed < flows.len() {
        let ready: Vec<usize> = (0..flows.len())
            .filter(|index| wave_of[*index].is_none())
            .filter(|index| {
                depends_on[*index]
                    .iter()
                    .all(|dep| wave_of[*dep].is_some_and(|wave| wave < waves.len()))
            })
            .collect();

        if ready.is_empty() {
            let stuck: Vec<&str> = (0..flows.len())
                .filter(|index| wave_of[*index].is_none())
                .map(|index| flows[index].name())
                .collect();
            return Err(LoadError::build_error(format!(
                "cascade {name} has a dependency cycle between flows: {}",
                stuck.join(", ")
            )));
        }

        for index in &ready {
            wave_of[*index] = Some(waves.len());
        }
        placed += ready.len();
        waves.push(ready);
    }
    Ok(waves)
}

fn reads_output_of(reader: &FlowDef, writer: &FlowDef) -> bool {
    reader.source_paths().iter().any(|source| {
        writer
            .sink_paths()
            .iter()
            .any(|sink| is_within(source, sink))
    })
}

/// True when `path` is `root` or lies beneath it.
fn is_within(path: &str, root: &str) -> bool {
    let path = path.trim_end_matches('/');
    let root = root.trim_end_matches('/');
    path == root || path.starts_with(&format!("{root}/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Assembly;
    use crate::tap::Tap;

    fn copy_flow(name: &str, from: &str, to: &str) -> FlowDef {
        let mut assembly = Assembly::new();
        let head = assembly.head(name);
        FlowDef::connect(name, assembly, vec![(name, Tap::new(from))], vec![(head, Tap::new(to))])
            .unwrap()
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("out/copy/", "out/copy"));
        assert!(is_within("out/copy/part-00000", "out/copy/"));
        assert!(!is_within("out/copy2", "out/copy"));
        assert!(!is_within("out/", "out/copy"));
    }

    #[test]
    fn test_flow_threads_bounded_by_widest_wave() {
        assert_eq!(flow_threads(-1, 3), 3);
        assert_eq!(flow_threads(0, 3), 1);
        assert_eq!(flow_threads(1, 3), 1);
        assert_eq!(flow_threads(2, 3), 2);
        assert_eq!(flow_threads(10_000, 3), 3);
        assert_eq!(flow_threads(-1, 0), 1);
    }

    #[test]
    fn test_waves_follow_taps() {
        let flows = vec![
            copy_flow("second", "b/", "c/"),
            copy_flow("first", "a/", "b/"),
            copy_flow("side", "a/", "d/"),
        ];
        let cascade = Cascade::connect("load", flows, Properties::new()).unwrap();
        assert_eq!(cascade.waves(), &[vec![1, 2], vec![0]]);
        assert_eq!(cascade.stats().children().len(), 3);
        assert_eq!(cascade.stats().children()[0].name(), "second");
    }

    #[test]
    fn test_cycle_is_build_error() {
        let flows = vec![copy_flow("x", "a/", "b/"), copy_flow("y", "b/", "a/")];
        let err = Cascade::connect("load", flows, Properties::new()).err().unwrap();
        assert!(matches!(err, LoadError::BuildError { .. }));
        assert!(err.to_string().contains("x, y"));
    }
}
