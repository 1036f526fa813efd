//! Bounded worker pool
//!
//! Tasks are independent of each other. Each worker builds its own context
//! (ledger session, pipeline) once and reuses it for every task it pulls
//! from the shared queue. `run_all` returns only after every task has
//! finished, with results in task order.

use std::thread;

use crossbeam_channel as channel;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool of `workers` threads; `0` is treated as `1`.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` over every task.
    ///
    /// With one worker the tasks run in the calling thread, in order.
    /// Otherwise up to `workers` named threads drain a shared queue. A
    /// context that fails to build aborts that worker only; its error is
    /// returned once all threads have joined.
    pub fn run_all<T, C, R, M, W>(&self, tasks: Vec<T>, make_context: M, work: W) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        M: Fn(usize) -> Result<C> + Sync,
        W: Fn(&mut C, T) -> R + Sync,
    {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        if self.workers == 1 {
            let span = tracing::info_span!("worker", index = 0);
            let _guard = span.enter();
            let mut context = make_context(0)?;
            return Ok(tasks.into_iter().map(|task| work(&mut context, task)).collect());
        }

        let total = tasks.len();
        let workers = self.workers.min(total);
        tracing::debug!(tasks = total, workers, "dispatching");

        let (task_tx, task_rx) = channel::bounded(total);
        for item in tasks.into_iter().enumerate() {
            // Capacity equals the task count, so this never blocks
            let _ = task_tx.send(item);
        }
        drop(task_tx);

        let (result_tx, result_rx) = channel::unbounded();
        let make_context = &make_context;
        let work = &work;

        let errors = thread::scope(|scope| -> Result<Vec<Error>> {
            let mut handles = Vec::with_capacity(workers);
            for index in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let handle = thread::Builder::new()
                    .name(format!("osprey-worker-{index}"))
                    .spawn_scoped(scope, move || -> Result<()> {
                        let span = tracing::info_span!("worker", index);
                        let _guard = span.enter();
                        let mut context = make_context(index)?;
                        for (position, task) in task_rx.iter() {
                            let result = work(&mut context, task);
                            let _ = result_tx.send((position, result));
                        }
                        Ok(())
                    })?;
                handles.push(handle);
            }

            let mut errors = Vec::new();
            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::error!(worker = index, error = %err, "worker failed to start");
                        errors.push(err);
                    }
                    Err(_) => errors.push(Error::WorkerPanicked { worker: index }),
                }
            }
            Ok(errors)
        })?;
        drop(result_tx);

        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }

        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        for (position, result) in result_rx.iter() {
            slots[position] = Some(result);
        }
        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            return Err(Error::TasksIncomplete { missing });
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(1)
    }
}
