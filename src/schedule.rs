use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    due: Duration,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled {
            handle,
            due: self.now + delay,
            task,
        });
        handle
    }

    /// Drops a pending task. Returns `false` if it already ran or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|entry| entry.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|entry| entry.handle == handle)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|entry| entry.due).min()
    }

    /// Moves the clock forward and returns the tasks that came due, earliest
    /// first (ties in scheduling order).
    pub fn advance(&mut self, elapsed: Duration) -> Vec<T> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|entry| entry.due <= now);
        self.pending = waiting;
        due.sort_by_key(|entry| (entry.due, entry.handle));
        due.into_iter().map(|entry| entry.task).collect()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps at most one pending task: each trigger cancels the previous one and
/// reschedules, so only the last trigger of a burst runs.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TaskHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn trigger<T>(&mut self, scheduler: &mut Scheduler<T>, task: T) -> TaskHandle {
        self.cancel(scheduler);
        let handle = scheduler.schedule(self.delay, task);
        self.pending = Some(handle);
        handle
    }

    pub fn cancel<T>(&mut self, scheduler: &mut Scheduler<T>) -> bool {
        match self.pending.take() {
            Some(handle) => scheduler.cancel(handle),
            None => false,
        }
    }

    pub fn is_pending<T>(&self, scheduler: &Scheduler<T>) -> bool {
        self.pending
            .is_some_and(|handle| scheduler.is_pending(handle))
    }
}
