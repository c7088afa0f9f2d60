//! Next-tick schedulers used by deferred dispatch

use crate::error::ScheduleError;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tokio::task::LocalSet;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Runs tasks on a later tick of a cooperative, single-threaded loop.
///
/// Implementations must run tasks in the order they were scheduled.
pub trait Scheduler {
    /// Queue `task` for a later tick
    fn schedule(&self, task: Task) -> Result<(), ScheduleError>;
}

thread_local! {
    static CURRENT: LocalSpawner = LocalSpawner::new();
}

/// Spawns tasks onto a tokio [`LocalSet`].
///
/// Scheduling only queues the task on the set, so it works from anywhere on
/// the owning thread, inside a runtime or not. Tasks run once the set is
/// driven, e.g. through [`run_until`](LocalSpawner::run_until).
///
/// Hubs built without an explicit scheduler share the thread's spawner,
/// returned by [`LocalSpawner::current`].
#[derive(Clone, Default)]
pub struct LocalSpawner {
    set: Rc<LocalSet>,
}

impl LocalSpawner {
    /// Create a spawner with its own `LocalSet`
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner backed by an existing `LocalSet`
    pub fn with_local_set(set: Rc<LocalSet>) -> Self {
        Self { set }
    }

    /// The spawner shared by hubs on this thread
    pub fn current() -> Self {
        CURRENT.with(LocalSpawner::clone)
    }

    pub fn local_set(&self) -> &Rc<LocalSet> {
        &self.set
    }

    /// Drive the underlying set until `future` completes
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.set.run_until(future).await
    }
}

impl fmt::Debug for LocalSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSpawner").finish_non_exhaustive()
    }
}

impl Scheduler for LocalSpawner {
    fn schedule(&self, task: Task) -> Result<(), ScheduleError> {
        self.set.spawn_local(async move { task() });
        Ok(())
    }
}

/// A manually driven task queue.
///
/// Each call to [`run_pending`](TickQueue::run_pending) is one tick: it runs
/// the tasks that were queued before the call. Tasks queued while the tick
/// runs wait for the next one.
#[derive(Default)]
pub struct TickQueue {
    tasks: RefCell<VecDeque<Task>>,
    closed: Cell<bool>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick, returning how many tasks ran
    pub fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.borrow_mut());
        let ran = batch.len();
        for task in batch {
            task();
        }
        ran
    }

    /// Run ticks until nothing is queued, returning how many tasks ran
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while !self.is_empty() {
            ran += self.run_pending();
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Drop queued tasks and refuse new ones
    pub fn close(&self) {
        self.closed.set(true);
        self.tasks.borrow_mut().clear();
    }
}

impl Scheduler for TickQueue {
    fn schedule(&self, task: Task) -> Result<(), ScheduleError> {
        if self.closed.get() {
            return Err(ScheduleError::Closed);
        }
        self.tasks.borrow_mut().push_back(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_queue_fifo() {
        let queue = TickQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            queue.schedule(Box::new(move || order.borrow_mut().push(i))).unwrap();
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tasks_queued_during_tick_wait() {
        let queue = Rc::new(TickQueue::new());
        let hits = Rc::new(Cell::new(0));

        let inner_queue = queue.clone();
        let inner_hits = hits.clone();
        queue
            .schedule(Box::new(move || {
                inner_hits.set(inner_hits.get() + 1);
                let hits = inner_hits.clone();
                inner_queue
                    .schedule(Box::new(move || hits.set(hits.get() + 10)))
                    .unwrap();
            }))
            .unwrap();

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(hits.get(), 11);
    }

    #[test]
    fn test_closed_queue_refuses() {
        let queue = TickQueue::new();
        queue.schedule(Box::new(|| {})).unwrap();

        queue.close();

        assert!(queue.is_empty());
        assert_eq!(queue.schedule(Box::new(|| {})), Err(ScheduleError::Closed));
    }

    #[test]
    fn test_local_spawner_queues_without_runtime() {
        let spawner = LocalSpawner::new();
        let hits = Rc::new(Cell::new(0));

        let task_hits = hits.clone();
        assert!(spawner.schedule(Box::new(move || task_hits.set(task_hits.get() + 1))).is_ok());
        assert_eq!(hits.get(), 0);

        tokio_test::block_on(spawner.run_until(tokio::task::yield_now()));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_local_spawner_inside_runtime_without_local_set() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let spawner = LocalSpawner::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        runtime.block_on(async {
            spawner
                .schedule(Box::new(move || {
                    let _ = tx.send(7);
                }))
                .unwrap();
        });

        assert_eq!(runtime.block_on(spawner.run_until(rx)), Ok(7));
    }

    #[test]
    fn test_local_spawner_runs_in_order() {
        let spawner = LocalSpawner::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (tx, rx) = tokio::sync::oneshot::channel();

        for i in 0..3 {
            let order = order.clone();
            spawner.schedule(Box::new(move || order.borrow_mut().push(i))).unwrap();
        }
        spawner.schedule(Box::new(move || {
            let _ = tx.send(());
        })).unwrap();

        tokio_test::block_on(spawner.run_until(rx)).unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_current_spawner_is_shared() {
        let a = LocalSpawner::current();
        let b = LocalSpawner::current();

        assert!(Rc::ptr_eq(a.local_set(), b.local_set()));
        assert!(!Rc::ptr_eq(a.local_set(), LocalSpawner::new().local_set()));
    }
}
