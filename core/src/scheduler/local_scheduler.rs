//! Local Task Scheduler
//!
//! Runs per-partition tasks in parallel on a dedicated rayon thread pool.

use load_common::{LoadError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt::Debug;
use std::sync::Arc;

/// Type alias for the per-partition compute function
pub type ComputeFn<I, O> = Arc<dyn Fn(usize, I) -> Result<Vec<O>> + Send + Sync>;

/// Task represents one partition's worth of work
pub struct Task<I, O> {
    pub partition: usize,
    pub input: I,
    pub compute_fn: ComputeFn<I, O>,
}

impl<I, O> Debug for Task<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("partition", &self.partition)
            .field("compute_fn", &"<function>")
            .finish()
    }
}

impl<I, O> Task<I, O> {
    pub fn new(partition: usize, input: I, compute_fn: ComputeFn<I, O>) -> Self {
        Self {
            partition,
            input,
            compute_fn,
        }
    }

    pub fn execute(self) -> Result<Vec<O>> {
        (self.compute_fn)(self.partition, self.input)
    }
}

/// Build one task per input partition, all sharing `compute_fn`.
pub fn tasks_for<I, O>(inputs: Vec<I>, compute_fn: ComputeFn<I, O>) -> Vec<Task<I, O>> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(partition, input)| Task::new(partition, input, compute_fn.clone()))
        .collect()
}

/// LocalScheduler manages parallel execution of tasks using Rayon
pub struct LocalScheduler {
    num_threads: usize,
    pool: ThreadPool,
}

impl Debug for LocalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalScheduler")
            .field("num_threads", &self.num_threads)
            .finish()
    }
}

impl LocalScheduler {
    /// Create a scheduler with `num_threads` workers; 0 means one per CPU.
    pub fn new(num_threads: usize) -> Result<Self> {
        let num_threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("load-task-{index}"))
            .build()
            .map_err(|e| {
                LoadError::execution_error_with_source("failed to start task pool", e)
            })?;
        Ok(Self { num_threads, pool })
    }

    /// Scheduler sized from the `load.mappers` property value; -1 or 0 use every CPU.
    pub fn for_mappers(mappers: i64) -> Result<Self> {
        Self::new(mappers.max(0) as usize)
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Execute tasks in parallel, returning each partition's output in
    /// partition order. The first failure wins.
    pub fn execute_tasks<I, O>(&self, tasks: Vec<Task<I, O>>) -> Result<Vec<Vec<O>>>
    where
        I: Send,
        O: Send,
    {
        self.pool
            .install(|| tasks.into_par_iter().map(Task::execute).collect())
    }

    /// Execute tasks and flatten their outputs.
    pub fn execute_and_collect<I, O>(&self, tasks: Vec<Task<I, O>>) -> Result<Vec<O>>
    where
        I: Send,
        O: Send,
    {
        let partition_results = self.execute_tasks(tasks)?;
        Ok(partition_results.into_iter().flatten().collect())
    }

    /// Execute tasks and count the total number of outputs.
    pub fn execute_and_count<I, O>(&self, tasks: Vec<Task<I, O>>) -> Result<usize>
    where
        I: Send,
        O: Send,
    {
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| task.execute().map(|out| out.len()))
                .sum()
        })
    }
}
