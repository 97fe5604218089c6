//! A worker-thread task queue for batch comparisons.
//!
//! Comparing many binary pairs is embarrassingly parallel as long as each task
//! owns its own environment and diff context; the [`Queue`] hands scheduled
//! [`Task`]s to a fixed pool of worker threads over a channel and collects them
//! into a completed list once performed. Delivery is exactly once: the channel
//! hands each task to a single worker, and a task appears in the completed
//! list exactly one time, in completion order (which is not schedule order).
//!
//! A queue is one-shot: after [`Queue::wait_for_workers_to_complete`] the
//! workers are gone and further scheduling is refused.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

/// A unit of work performed on a worker thread.
///
/// Tasks carry their own inputs and record their own results; the queue never
/// looks inside them.
pub trait Task: Send {
    /// Perform the work. Called exactly once, on one worker thread.
    fn perform(&mut self);
}

/// Callback fired on the worker thread right after a task is performed.
pub type TaskDoneNotify = Arc<dyn Fn(&dyn Task) + Send + Sync>;

/// The number of workers a default queue gets.
#[must_use]
pub fn default_number_of_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// A fixed pool of worker threads consuming scheduled tasks.
pub struct Queue {
    /// Task submission side of the channel; dropped to signal shutdown
    sender: Option<Sender<Box<dyn Task>>>,
    /// The worker threads, joined on shutdown
    workers: Vec<JoinHandle<()>>,
    /// Tasks that have been performed, in completion order
    completed: Arc<Mutex<Vec<Box<dyn Task>>>>,
    /// Callback fired per performed task, settable after construction
    notify: Arc<Mutex<Option<TaskDoneNotify>>>,
}

impl Queue {
    /// A queue with one worker per available hardware thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(default_number_of_threads())
    }

    /// A queue with the given number of workers. Zero workers is legal and
    /// yields a queue that refuses every task.
    #[must_use]
    pub fn with_workers(count: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Box<dyn Task>>();
        let completed: Arc<Mutex<Vec<Box<dyn Task>>>> = Arc::new(Mutex::new(Vec::new()));
        let notify: Arc<Mutex<Option<TaskDoneNotify>>> = Arc::new(Mutex::new(None));

        let workers = (0..count)
            .map(|index| {
                let receiver = receiver.clone();
                let completed = Arc::clone(&completed);
                let notify = Arc::clone(&notify);
                std::thread::Builder::new()
                    .name(format!("abiscope-worker-{index}"))
                    .spawn(move || {
                        while let Ok(mut task) = receiver.recv() {
                            task.perform();
                            let callback = notify
                                .lock()
                                .ok()
                                .and_then(|guard| guard.clone());
                            if let Some(callback) = callback {
                                callback(task.as_ref());
                            }
                            if let Ok(mut done) = completed.lock() {
                                done.push(task);
                            }
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Queue {
            sender: Some(sender),
            workers,
            completed,
            notify,
        }
    }

    /// The number of worker threads.
    #[must_use]
    pub fn number_of_workers(&self) -> usize {
        self.workers.len()
    }

    /// Install a callback fired on the worker thread after each task is
    /// performed. Applies to tasks performed from this point on.
    pub fn set_tasks_done_notify(&self, notify: TaskDoneNotify) {
        if let Ok(mut slot) = self.notify.lock() {
            *slot = Some(notify);
        }
    }

    /// Hand a task to the pool.
    ///
    /// Returns `false` when the task cannot be performed: the queue has zero
    /// workers or has already been shut down.
    pub fn schedule_task(&self, task: Box<dyn Task>) -> bool {
        if self.workers.is_empty() {
            return false;
        }
        match &self.sender {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        }
    }

    /// Hand a batch of tasks to the pool. Returns `false` (scheduling nothing)
    /// when the queue cannot perform tasks.
    pub fn schedule_tasks(&self, tasks: Vec<Box<dyn Task>>) -> bool {
        if self.workers.is_empty() || self.sender.is_none() {
            return false;
        }
        tasks.into_iter().all(|task| self.schedule_task(task))
    }

    /// Close the queue and block until every scheduled task has been performed.
    pub fn wait_for_workers_to_complete(&mut self) {
        // Dropping the sender makes the workers' recv loop end once the
        // channel drains.
        self.sender = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("a worker thread panicked while performing a task");
            }
        }
    }

    /// Take the tasks performed so far, in completion order.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] when a worker panicked while holding
    /// the completed list, leaving it in an unknown state.
    pub fn get_completed_tasks(&self) -> crate::Result<Vec<Box<dyn Task>>> {
        self.completed
            .lock()
            .map(|mut done| std::mem::take(&mut *done))
            .map_err(|_| crate::Error::LockError)
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        self.wait_for_workers_to_complete();
    }
}
