use quanta::Clock;

/// The measurement state handed to a benchmark proc.
///
/// One `State` stands for a single execution instance: one benchmark, at one
/// iteration count ("dimension"), for one sample. The usual way to use it is
/// the iteration protocol:
///
/// ```rust
/// use mantou::State;
///
/// fn bench_me(state: &mut State) {
///     for _ in state.iter() {
///         // the code under measurement
///     }
/// }
/// ```
///
/// Creating the iterator starts the timer, exhausting it stops the timer.
/// Alternatively a benchmark can bracket a sub-region itself with
/// [`State::start_timer`]/[`State::stop_timer`] (or a [`Scope`]) exactly
/// once. Mixing both protocols in one proc is not supported.
pub struct State {
    iterations: u64,
    user_data: u64,
    elapsed_ns: i64,
    result: Option<i64>,
    clock: Clock,
    start: Option<u64>,
}

impl State {
    /// Panics if `iterations` is zero. That is a programmer error in the
    /// caller, not a recoverable condition.
    pub(crate) fn new(iterations: u64, user_data: u64, clock: Clock) -> Self {
        assert!(iterations > 0, "a state requires at least one iteration");
        State {
            iterations,
            user_data,
            elapsed_ns: 0,
            result: None,
            clock,
            start: None,
        }
    }

    /// The number of iterations this state expects the benchmark to perform.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// The opaque per-benchmark value set at registration time.
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Accumulated measured time in nanoseconds.
    pub fn elapsed_ns(&self) -> i64 {
        self.elapsed_ns
    }

    /// The result recorded via [`State::set_result`], if any.
    pub fn result(&self) -> Option<i64> {
        self.result
    }

    /// Start the timer manually. Used together with [`State::stop_timer`]
    /// when only a part of the benchmark body should be measured.
    pub fn start_timer(&mut self) {
        self.start = Some(self.clock.raw());
    }

    /// Stop the timer and add the elapsed wall-clock delta to the measured
    /// time. Does nothing if the timer is not running.
    pub fn stop_timer(&mut self) {
        if let Some(start) = self.start.take() {
            let end = self.clock.raw();
            self.elapsed_ns += self.clock.delta_as_nanos(start, end) as i64;
        }
    }

    /// Add a manually measured duration. Composes by addition with the timer
    /// based measurement. Negative values are allowed so a known fixed
    /// overhead can be subtracted.
    pub fn add_custom_duration(&mut self, ns: i64) {
        self.elapsed_ns += ns;
    }

    /// Record the benchmark's declared outcome. Optional. Benchmarks that
    /// never call this are skipped by the result comparison checks.
    pub fn set_result(&mut self, result: i64) {
        self.result = Some(result);
    }

    /// The iteration protocol: a single-pass iterator yielding exactly
    /// [`State::iterations`] markers. Creating it starts the timer,
    /// consuming the final marker stops it. Traversing it a second time is
    /// not supported since the timer has already stopped.
    pub fn iter(&mut self) -> Iter<'_> {
        self.start_timer();
        Iter {
            remaining: self.iterations,
            next: 0,
            state: self,
        }
    }

    /// RAII variant of the manual timer: starts on creation, stops on drop.
    pub fn scope(&mut self) -> Scope<'_> {
        Scope::new(self)
    }
}

/// Iterator produced by [`State::iter`]. Yields the iteration index.
pub struct Iter<'a> {
    remaining: u64,
    next: u64,
    state: &'a mut State,
}

impl Iterator for Iter<'_> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            self.state.stop_timer();
            return None;
        }
        self.remaining -= 1;
        let idx = self.next;
        self.next += 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

/// Starts the state's timer on creation and stops it when dropped.
///
/// This is the manual-measurement counterpart to the iteration protocol:
///
/// ```rust
/// use mantou::State;
///
/// fn bench_me(state: &mut State) {
///     let setup = vec![0u8; 1024]; // not measured
///     let _scope = state.scope();
///     drop(setup); // measured
/// }
/// ```
pub struct Scope<'a> {
    state: &'a mut State,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(state: &'a mut State) -> Self {
        state.start_timer();
        Scope { state }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.state.stop_timer();
    }
}
