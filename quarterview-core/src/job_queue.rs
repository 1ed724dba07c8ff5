use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub type Job<T> = Box<dyn FnOnce() -> T>;

/// Cooperative FIFO of deferred work with a single logical worker.
///
/// Jobs never run on submission. They run in order, to completion, only when
/// the owner calls one of the drain methods, and hand their result back to the
/// drain caller instead of touching shared state themselves.
pub struct JobQueue<T> {
    jobs: VecDeque<Job<T>>,
}

/// What a single drain call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub executed: usize,
    pub remaining: usize,
    pub elapsed: Duration,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(capacity),
        }
    }

    pub fn submit<F>(&mut self, job: F)
    where
        F: FnOnce() -> T + 'static,
    {
        self.jobs.push_back(Box::new(job));
    }

    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs every queued job.
    pub fn drain_all(&mut self, on_complete: impl FnMut(T)) -> DrainReport {
        self.drain(None, on_complete)
    }

    /// Runs queued jobs in order. `None` or a zero budget drains the queue
    /// completely; otherwise wall-clock time is checked after each job and the
    /// drain stops once it meets or exceeds the budget.
    pub fn drain(&mut self, budget: Option<Duration>, on_complete: impl FnMut(T)) -> DrainReport {
        let start = Instant::now();
        self.drain_with_clock(budget, move || start.elapsed(), on_complete)
    }

    /// [`JobQueue::drain`] with the elapsed-time source supplied by the caller.
    pub fn drain_with_clock(
        &mut self,
        budget: Option<Duration>,
        mut elapsed: impl FnMut() -> Duration,
        mut on_complete: impl FnMut(T),
    ) -> DrainReport {
        let budget = budget.filter(|b| !b.is_zero());
        let mut executed = 0usize;
        let mut spent = Duration::ZERO;

        while let Some(job) = self.jobs.pop_front() {
            on_complete(job());
            executed += 1;
            spent = elapsed();

            if let Some(budget) = budget {
                if spent >= budget {
                    if !self.jobs.is_empty() {
                        log::trace!(
                            "job drain stopped after {} jobs ({:?} of {:?}), {} left",
                            executed,
                            spent,
                            budget,
                            self.jobs.len()
                        );
                    }
                    break;
                }
            }
        }

        DrainReport {
            executed,
            remaining: self.jobs.len(),
            elapsed: spent,
        }
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JobQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.jobs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const STEP: Duration = Duration::from_millis(5);

    /// Queue of `count` jobs that each advance the fake clock by `STEP` and return their index.
    fn timed_queue(count: usize, clock: &Rc<Cell<Duration>>) -> JobQueue<usize> {
        let mut queue = JobQueue::new();
        for i in 0..count {
            let clock = Rc::clone(clock);
            queue.submit(move || {
                clock.set(clock.get() + STEP);
                i
            });
        }
        queue
    }

    #[test]
    fn submit_does_not_run_jobs() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let mut queue = JobQueue::new();
        queue.submit(move || flag.set(true));

        assert!(!ran.get());
        assert_eq!(queue.pending(), 1);

        queue.drain_all(|_| {});
        assert!(ran.get());
        assert!(queue.is_empty());
    }

    #[test]
    fn unbounded_drain_runs_everything_in_order() {
        let mut queue = JobQueue::new();
        for i in 0..10 {
            queue.submit(move || i);
        }

        let mut seen = Vec::new();
        let report = queue.drain(None, |i| seen.push(i));

        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(report.executed, 10);
        assert_eq!(report.remaining, 0);
    }

    #[test]
    fn zero_budget_means_unbounded() {
        let clock = Rc::new(Cell::new(Duration::ZERO));
        let mut queue = timed_queue(6, &clock);

        let report = queue.drain_with_clock(Some(Duration::ZERO), || clock.get(), |_| {});
        assert_eq!(report.executed, 6);
    }

    #[test]
    fn budget_leaves_remainder_in_order() {
        let clock = Rc::new(Cell::new(Duration::ZERO));
        let mut queue = timed_queue(10, &clock);
        let budget = Duration::from_millis(22);

        let mut first = Vec::new();
        let report = queue.drain_with_clock(Some(budget), || clock.get(), |i| first.push(i));

        // floor(22 / 5) = 4, plus at most the job that crossed the budget
        assert!((4..=5).contains(&report.executed), "{report:?}");
        assert_eq!(first, (0..report.executed).collect::<Vec<_>>());
        assert_eq!(report.remaining, 10 - report.executed);

        let mut rest = Vec::new();
        queue.drain_all(|i| rest.push(i));
        assert_eq!(rest, (report.executed..10).collect::<Vec<_>>());
    }

    #[test]
    fn budget_is_checked_only_between_jobs() {
        let clock = Rc::new(Cell::new(Duration::ZERO));
        let mut queue = JobQueue::new();
        let slow_clock = Rc::clone(&clock);
        queue.submit(move || slow_clock.set(Duration::from_secs(1)));
        queue.submit(|| ());

        let report = queue.drain_with_clock(Some(STEP), || clock.get(), |_| {});

        assert_eq!(report.executed, 1);
        assert_eq!(report.remaining, 1);
        assert_eq!(report.elapsed, Duration::from_secs(1));
    }

    #[test]
    fn wall_clock_budget_stops_early() {
        let mut queue = JobQueue::new();
        for _ in 0..20 {
            queue.submit(|| std::thread::sleep(Duration::from_millis(2)));
        }

        let report = queue.drain(Some(Duration::from_millis(5)), |_| {});

        assert!(report.executed >= 1);
        assert!(report.executed < 20);
        assert_eq!(report.remaining + report.executed, 20);
    }

    #[test]
    fn results_flow_back_through_the_drain_callback() {
        let results = RefCell::new(Vec::new());
        let mut queue = JobQueue::new();
        queue.submit(|| "a".to_string());
        queue.submit(|| "b".to_string());

        queue.drain_all(|s| results.borrow_mut().push(s));
        assert_eq!(results.into_inner(), vec!["a", "b"]);
    }
}
