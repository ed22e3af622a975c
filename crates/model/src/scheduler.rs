// Heapscope
// Copyright (C) 2025 Heapscope Contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Background expansion scheduler.
//!
//! Producing a node's children can require scanning large index
//! structures, so child production never runs on the calling thread
//! unaccounted: the caller submits a job, then waits at most the
//! configured latency budget for the reply. On timeout the caller shows
//! a progress placeholder and the worker keeps going; whenever the
//! worker finishes it routes the result through the job's late-delivery
//! path, where a staleness check decides between attaching and
//! discarding. Provider errors and panics are absorbed here and degrade
//! to an empty child list.

use crate::error::{ModelError, ModelResult};
use crate::node::content::NodeContent;
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Result of one expansion: the produced child contents.
pub type ExpansionResult = ModelResult<Vec<Arc<dyn NodeContent>>>;

/// Lifecycle of one expansion request, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    /// Submitted, not yet picked up by a worker.
    Pending,
    /// A worker is producing children.
    Running,
    /// Finished within the caller's budget.
    Completed,
    /// Budget exceeded; a placeholder is showing, the worker continues.
    TimedOut,
    /// Provider error or panic; degraded to an empty child list.
    Failed,
    /// The result arrived after the requesting node was reset,
    /// collapsed, or torn down, and was discarded.
    Cancelled,
}

/// Scheduler sizing and latency budget.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Worker thread count.
    pub workers: usize,
    /// How long a `children()` caller blocks before receiving the
    /// progress placeholder instead.
    pub latency_budget: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            latency_budget: Duration::from_millis(100),
        }
    }
}

impl SchedulerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_latency_budget(mut self, budget: Duration) -> Self {
        self.latency_budget = budget;
        self
    }
}

struct ExpansionJob {
    ticket: u64,
    work: Box<dyn FnOnce() -> ExpansionResult + Send>,
    /// Fast path: the caller blocks on this for up to the budget.
    reply: SyncSender<ExpansionResult>,
    /// Always invoked after the reply attempt; carries the result to
    /// the control thread where the staleness check runs.
    late: Box<dyn FnOnce(ExpansionResult) + Send>,
}

/// Fixed pool of expansion workers fed through a single queue.
pub struct ExpansionScheduler {
    sender: Mutex<Option<SyncSender<ExpansionJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    latency_budget: Duration,
}

impl ExpansionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (sender, receiver) = sync_channel::<ExpansionJob>(1024);
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.workers.max(1));
        for worker_id in 0..config.workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let shutdown = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("heapscope-expand-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &receiver, &shutdown));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => warn!(worker_id, error = %err, "failed to spawn expansion worker"),
            }
        }

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shutdown,
            latency_budget: config.latency_budget,
        }
    }

    /// The caller's maximum blocking time per expansion.
    pub fn latency_budget(&self) -> Duration {
        self.latency_budget
    }

    /// Submits an expansion. The returned receiver yields the result if
    /// a worker finishes within whatever time the caller is willing to
    /// wait; `late` always receives the result afterwards.
    pub fn submit<W, L>(&self, ticket: u64, work: W, late: L) -> ModelResult<Receiver<ExpansionResult>>
    where
        W: FnOnce() -> ExpansionResult + Send + 'static,
        L: FnOnce(ExpansionResult) + Send + 'static,
    {
        let (reply, receiver) = sync_channel(1);
        let job = ExpansionJob {
            ticket,
            work: Box::new(work),
            reply,
            late: Box::new(late),
        };
        debug!(ticket, state = ?ExpansionState::Pending, "expansion submitted");
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender
                .send(job)
                .map(|_| receiver)
                .map_err(|_| ModelError::SchedulerShutdown),
            None => Err(ModelError::SchedulerShutdown),
        }
    }

    /// Stops accepting jobs, lets queued work drain, and joins the
    /// workers. In-flight results still route through their late path,
    /// where the staleness check discards them if the owner is gone.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.workers.lock().drain(..) {
            if handle.join().is_err() {
                warn!("expansion worker panicked during shutdown");
            }
        }
    }
}

impl Drop for ExpansionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(worker_id: usize, receiver: &Arc<Mutex<Receiver<ExpansionJob>>>, shutdown: &Arc<AtomicBool>) {
    loop {
        let polled = receiver.lock().try_recv();
        match polled {
            Ok(job) => run_job(worker_id, job),
            Err(TryRecvError::Empty) => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
            Err(TryRecvError::Disconnected) => break,
        }
    }
}

fn run_job(worker_id: usize, job: ExpansionJob) {
    let ticket = job.ticket;
    debug!(worker_id, ticket, state = ?ExpansionState::Running, "expansion started");

    let result = match catch_unwind(AssertUnwindSafe(job.work)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(ModelError::ProviderPanicked(detail))
        }
    };

    match &result {
        Ok(children) => debug!(worker_id, ticket, children = children.len(), state = ?ExpansionState::Completed, "expansion finished"),
        Err(err) => warn!(worker_id, ticket, error = %err, state = ?ExpansionState::Failed, "expansion failed"),
    }

    // Fast path for a caller still inside its budget; a caller that
    // timed out dropped the receiver and relies on the late path.
    let _ = job.reply.try_send(result.clone());
    (job.late)(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::content::TextContent;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::RecvTimeoutError;

    fn children(names: &[&str]) -> Vec<Arc<dyn NodeContent>> {
        names.iter().map(|n| Arc::new(TextContent::new(*n)) as Arc<dyn NodeContent>).collect()
    }

    #[test]
    fn fast_result_arrives_within_budget() {
        let scheduler = ExpansionScheduler::new(SchedulerConfig::default().with_workers(2));
        let receiver = scheduler
            .submit(1, || Ok(children(&["a", "b"])), |_| {})
            .expect("submit");

        let result = receiver.recv_timeout(Duration::from_secs(2)).expect("reply").expect("ok");
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn slow_result_times_out_then_reaches_the_late_path() {
        let scheduler = ExpansionScheduler::new(SchedulerConfig::default().with_workers(1).with_latency_budget(Duration::from_millis(20)));
        let late_hits = Arc::new(AtomicUsize::new(0));
        let late = {
            let late_hits = Arc::clone(&late_hits);
            move |result: ExpansionResult| {
                assert_eq!(result.expect("ok").len(), 1);
                late_hits.fetch_add(1, Ordering::SeqCst);
            }
        };

        let receiver = scheduler
            .submit(
                2,
                || {
                    thread::sleep(Duration::from_millis(120));
                    Ok(children(&["slow"]))
                },
                late,
            )
            .expect("submit");

        let waited = receiver.recv_timeout(scheduler.latency_budget());
        assert!(matches!(waited, Err(RecvTimeoutError::Timeout)));
        drop(receiver);

        // The worker finishes regardless and the late path fires once.
        for _ in 0..200 {
            if late_hits.load(Ordering::SeqCst) == 1 {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("late delivery never happened");
    }

    #[test]
    fn provider_panic_degrades_to_an_error_result() {
        let scheduler = ExpansionScheduler::new(SchedulerConfig::default().with_workers(1));
        let receiver = scheduler
            .submit(3, || panic!("index out of range"), |_| {})
            .expect("submit");

        let result = receiver.recv_timeout(Duration::from_secs(2)).expect("reply");
        assert!(matches!(result, Err(ModelError::ProviderPanicked(_))));
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let scheduler = ExpansionScheduler::new(SchedulerConfig::default().with_workers(1));
        scheduler.shutdown();
        let rejected = scheduler.submit(4, || Ok(Vec::new()), |_| {});
        assert!(matches!(rejected, Err(ModelError::SchedulerShutdown)));
    }
}
