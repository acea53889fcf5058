use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Mutex;

use quanta::Clock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bench::BenchProc;
use crate::compare;
use crate::config::RunnerConfig;
use crate::error::Error;
use crate::registry::Registry;
use crate::report::{build_report, Report};
use crate::state::State;

/// One benchmark expanded into its randomized execution plan.
pub(crate) struct BenchRun {
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) is_baseline: bool,
    pub(crate) user_data: u64,
    pub(crate) proc: BenchProc,
    /// Effective iteration counts, in list order.
    pub(crate) dims: Vec<u64>,
    /// Effective samples per dimension.
    pub(crate) samples: usize,
    /// Not yet executed states, in randomized order.
    pub(crate) pending: VecDeque<State>,
    /// Executed states, in completion order.
    pub(crate) states: Vec<State>,
}

pub(crate) struct SuiteRun {
    pub(crate) name: Option<String>,
    pub(crate) benches: Vec<BenchRun>,
}

/// Executes a frozen [`Registry`] and turns the measurements into a
/// [`Report`].
///
/// The runner owns the registry, so benchmark configuration cannot change
/// under it. Execution order is randomized twice: the (dimension, sample)
/// matrix of each benchmark becomes a uniformly random permutation, and the
/// benchmarks themselves are interleaved by random draws from the pending
/// set. Both are driven by one seed, so a fixed seed reproduces the exact
/// execution order (not the timings).
///
/// ```rust
/// use mantou::{Registry, Runner, RunnerConfig, State};
///
/// let mut registry = Registry::new();
/// registry.add_benchmark("noop", |state: &mut State| {
///     for _ in state.iter() {}
/// });
///
/// let mut runner = Runner::with_config(registry, RunnerConfig::default());
/// let report = runner.run().unwrap();
/// report.to_text(&mut std::io::stdout()).unwrap();
/// ```
pub struct Runner {
    registry: Registry,
    config: RunnerConfig,
    clock: Clock,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    runs: Vec<SuiteRun>,
    error: Option<Error>,
}

impl Runner {
    /// Create a runner with defaults parsed from the command line.
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, RunnerConfig::new())
    }

    /// Create a runner with the given defaults.
    pub fn with_config(registry: Registry, config: RunnerConfig) -> Self {
        use yansi::Condition;
        yansi::whenever(Condition::TTY_AND_COLOR);

        Runner {
            registry,
            config,
            clock: Clock::new(),
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            runs: Vec::new(),
            error: None,
        }
    }

    /// Access the runner defaults for further configuration.
    pub fn config(&mut self) -> &mut RunnerConfig {
        &mut self.config
    }

    /// Redirect the two diagnostics channels: informational warnings and
    /// comparison/configuration errors. Defaults are stdout and stderr.
    pub fn set_output_streams<O, E>(&mut self, out: O, err: E)
    where
        O: Write + 'static,
        E: Write + 'static,
    {
        self.out = Box::new(out);
        self.err = Box::new(err);
    }

    /// Replace the clock used for measurements. Mainly useful with
    /// [`quanta::Clock::mock`] to drive time from a test.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// The terminal error state of the run, recorded by the comparison
    /// checks. Persists across reruns until cleared.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Reset the recorded error state.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Execute all benchmarks. Re-running expands a fresh plan from the
    /// benchmark definitions; previously executed states are discarded.
    ///
    /// Fails fast on configuration errors, in which case nothing executes.
    pub fn run_benchmarks(&mut self) -> Result<(), Error> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        self.runs = self.expand_plan(&mut rng)?;

        if self.config.no_run {
            self.runs.clear();
            return Ok(());
        }

        if self.config.threads > 1 {
            let threads = self.config.threads;
            run_pool(&mut self.runs, rng, threads);
        } else {
            run_interleaved(&mut self.runs, &mut rng);
        }
        Ok(())
    }

    /// Aggregate the executed states, run the enabled comparison checks and
    /// emit their diagnostics. Comparison failures are recorded in
    /// [`Runner::error`], they do not abort.
    pub fn generate_report(&mut self) -> Report {
        let report = build_report(&self.runs);
        if let Some(error) = compare::run_checks(
            &self.runs,
            self.config.compare_across_samples,
            self.config.compare_across_benchmarks,
            &mut self.out,
            &mut self.err,
        ) {
            self.error = Some(error);
        }
        report
    }

    /// [`Runner::run_benchmarks`] and [`Runner::generate_report`] in one
    /// call. The returned error covers configuration problems only; check
    /// [`Runner::error`] for comparison failures.
    pub fn run(&mut self) -> Result<Report, Error> {
        self.run_benchmarks()?;
        Ok(self.generate_report())
    }

    /// Resolve effective iteration counts and samples for every benchmark,
    /// validate them, and expand each benchmark into a uniformly random
    /// permutation of its (dimension, sample) matrix.
    fn expand_plan(&self, rng: &mut ChaCha8Rng) -> Result<Vec<SuiteRun>, Error> {
        let mut runs = Vec::with_capacity(self.registry.suites.len());
        for suite in &self.registry.suites {
            if suite.benches.iter().filter(|b| b.is_baseline).count() > 1 {
                return Err(Error::MultipleBaselines {
                    suite: suite.name.clone().unwrap_or_default(),
                });
            }
            let mut benches = Vec::with_capacity(suite.benches.len());
            for bench in &suite.benches {
                let dims = if bench.iterations.is_empty() {
                    self.config.default_iterations.clone()
                } else {
                    bench.iterations.clone()
                };
                if dims.is_empty() || dims.contains(&0) {
                    return Err(Error::InvalidIterationCount {
                        benchmark: bench.name.clone(),
                    });
                }
                let samples = if bench.samples == 0 {
                    self.config.default_samples
                } else {
                    bench.samples
                };
                if samples == 0 {
                    return Err(Error::ZeroSamples {
                        benchmark: bench.name.clone(),
                    });
                }

                // Incremental construction of a uniform random permutation:
                // the k-th state picks uniformly among the k possible
                // insertion positions.
                let matrix_size = dims.len() * samples;
                let mut pending = VecDeque::with_capacity(matrix_size);
                for &dim in &dims {
                    for _ in 0..samples {
                        let pos = rng.gen_range(0..=pending.len());
                        pending.insert(pos, State::new(dim, bench.user_data, self.clock.clone()));
                    }
                }

                benches.push(BenchRun {
                    name: bench.name.clone(),
                    label: bench.display_name().to_string(),
                    is_baseline: bench.is_baseline,
                    user_data: bench.user_data,
                    proc: bench.proc.clone(),
                    dims,
                    samples,
                    pending,
                    states: Vec::with_capacity(matrix_size),
                });
            }
            runs.push(SuiteRun {
                name: suite.name.clone(),
                benches,
            });
        }
        Ok(runs)
    }
}

/// Single logical execution stream: repeatedly pick a uniformly random
/// pending benchmark, run its next state, retire it when drained.
fn run_interleaved(runs: &mut [SuiteRun], rng: &mut ChaCha8Rng) {
    let mut pending: Vec<(usize, usize)> = runs
        .iter()
        .enumerate()
        .flat_map(|(si, suite)| (0..suite.benches.len()).map(move |bi| (si, bi)))
        .filter(|&(si, bi)| !runs[si].benches[bi].pending.is_empty())
        .collect();

    while !pending.is_empty() {
        let pick = rng.gen_range(0..pending.len());
        let (si, bi) = pending[pick];
        let bench = &mut runs[si].benches[bi];
        let mut state = bench.pending.pop_front().expect("pending bench is drained");
        bench.proc.call(&mut state);
        bench.states.push(state);
        if bench.pending.is_empty() {
            pending.swap_remove(pick);
        }
    }
}

/// Fixed worker pool. Workers claim the next state of a random pending
/// benchmark under one mutex and execute the proc unlocked, so benchmark
/// bodies run in true parallel. Each state is executed exactly once.
fn run_pool(runs: &mut [SuiteRun], rng: ChaCha8Rng, threads: usize) {
    struct Shared<'a> {
        rng: ChaCha8Rng,
        pending: Vec<(usize, usize)>,
        runs: &'a mut [SuiteRun],
    }

    let pending: Vec<(usize, usize)> = runs
        .iter()
        .enumerate()
        .flat_map(|(si, suite)| (0..suite.benches.len()).map(move |bi| (si, bi)))
        .filter(|&(si, bi)| !runs[si].benches[bi].pending.is_empty())
        .collect();

    let shared = Mutex::new(Shared { rng, pending, runs });

    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| loop {
                // short critical section: random pick + cursor advance
                let (proc, mut state, si, bi) = {
                    let mut guard = shared.lock().expect("pending set poisoned");
                    let shared = &mut *guard;
                    if shared.pending.is_empty() {
                        break;
                    }
                    let pick = shared.rng.gen_range(0..shared.pending.len());
                    let (si, bi) = shared.pending[pick];
                    let bench = &mut shared.runs[si].benches[bi];
                    let state = bench.pending.pop_front().expect("pending bench is drained");
                    if bench.pending.is_empty() {
                        shared.pending.swap_remove(pick);
                    }
                    (bench.proc.clone(), state, si, bi)
                };
                proc.call(&mut state);
                shared
                    .lock()
                    .expect("pending set poisoned")
                    .runs[si]
                    .benches[bi]
                    .states
                    .push(state);
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// A clonable sink so tests can read back what the runner wrote.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    type CallLog = Arc<Mutex<Vec<(String, u64)>>>;

    fn logging_proc(log: &CallLog, name: &str) -> BenchProc {
        let log = Arc::clone(log);
        let name = name.to_string();
        BenchProc::new(move |state: &mut State| {
            log.lock().unwrap().push((name.clone(), state.iterations()));
        })
    }

    fn test_config() -> RunnerConfig {
        let mut config = RunnerConfig::default();
        config.set_seed(42);
        config
    }

    #[test]
    fn every_state_runs_exactly_once() {
        let log: CallLog = Default::default();
        let mut registry = Registry::new();
        registry
            .add_benchmark("a", logging_proc(&log, "a"))
            .iterations(vec![1, 2])
            .samples(3);
        registry
            .add_benchmark("b", logging_proc(&log, "b"))
            .iterations(vec![4])
            .samples(2);

        let mut runner = Runner::with_config(registry, test_config());
        runner.run_benchmarks().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 8);
        for (name, dim, expected) in [("a", 1, 3), ("a", 2, 3), ("b", 4, 2)] {
            let count = log
                .iter()
                .filter(|(n, d)| n == name && *d == dim)
                .count();
            assert_eq!(count, expected, "{} @{}", name, dim);
        }
    }

    #[test]
    fn same_seed_reproduces_the_execution_order() {
        let mut orders = Vec::new();
        for _ in 0..2 {
            let log: CallLog = Default::default();
            let mut registry = Registry::new();
            registry
                .add_benchmark("a", logging_proc(&log, "a"))
                .iterations(vec![1, 2, 3])
                .samples(4);
            registry
                .add_benchmark("b", logging_proc(&log, "b"))
                .iterations(vec![4, 5])
                .samples(2);
            let mut runner = Runner::with_config(registry, test_config());
            runner.run_benchmarks().unwrap();
            orders.push(log.lock().unwrap().clone());
        }
        assert_eq!(orders[0], orders[1]);
        assert_eq!(orders[0].len(), 16);
    }

    #[test]
    fn rerunning_expands_a_fresh_plan() {
        let log: CallLog = Default::default();
        let mut registry = Registry::new();
        registry
            .add_benchmark("a", logging_proc(&log, "a"))
            .iterations(vec![1])
            .samples(2);
        let mut runner = Runner::with_config(registry, test_config());
        runner.run_benchmarks().unwrap();
        runner.run_benchmarks().unwrap();
        assert_eq!(log.lock().unwrap().len(), 4);

        // the report covers only the latest run
        let report = runner.generate_report();
        assert_eq!(report.suites[0].benchmarks[0].data[0].samples, 2);
    }

    #[test]
    fn dimension_order_within_a_benchmark_is_uniform() {
        // With dimensions [1, 2] and one sample each, either dimension
        // should come first in about half of the runs.
        let mut dim_one_first = 0;
        const RUNS: usize = 200;
        for seed in 0..RUNS {
            let log: CallLog = Default::default();
            let mut registry = Registry::new();
            registry
                .add_benchmark("a", logging_proc(&log, "a"))
                .iterations(vec![1, 2])
                .samples(1);
            let mut config = RunnerConfig::default();
            config.set_seed(seed as u64);
            let mut runner = Runner::with_config(registry, config);
            runner.run_benchmarks().unwrap();
            if log.lock().unwrap()[0].1 == 1 {
                dim_one_first += 1;
            }
        }
        // mean 100, sigma ~7; this band is far outside noise
        assert!(
            (60..=140).contains(&dim_one_first),
            "dimension 1 came first {} times out of {}",
            dim_one_first,
            RUNS
        );
    }

    #[test]
    fn benchmarks_are_interleaved() {
        // Two benchmarks with many states each: under random interleaving
        // it is vanishingly unlikely that one runs all its states first.
        let log: CallLog = Default::default();
        let mut registry = Registry::new();
        for name in ["a", "b"] {
            registry
                .add_benchmark(name, logging_proc(&log, name))
                .iterations(vec![1])
                .samples(32);
        }
        let mut runner = Runner::with_config(registry, test_config());
        runner.run_benchmarks().unwrap();

        let log = log.lock().unwrap();
        let first_32: Vec<_> = log[..32].iter().map(|(n, _)| n.as_str()).collect();
        assert!(first_32.contains(&"a") && first_32.contains(&"b"));
    }

    #[test]
    fn worker_pool_executes_every_state_exactly_once() {
        let log: CallLog = Default::default();
        let mut registry = Registry::new();
        for name in ["a", "b", "c"] {
            registry
                .add_benchmark(name, logging_proc(&log, name))
                .iterations(vec![1, 2])
                .samples(5);
        }
        let mut config = test_config();
        config.set_threads(4);
        let mut runner = Runner::with_config(registry, config);
        runner.run_benchmarks().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 30);
        for name in ["a", "b", "c"] {
            for dim in [1, 2] {
                let count = log
                    .iter()
                    .filter(|(n, d)| n == name && *d == dim)
                    .count();
                assert_eq!(count, 5);
            }
        }

        let report = runner.generate_report();
        let bench = &report.suites[0].benchmarks[0];
        assert_eq!(bench.data.len(), 2);
        assert_eq!(bench.data[0].samples, 5);
    }

    #[test]
    fn no_run_validates_but_executes_nothing() {
        let log: CallLog = Default::default();
        let mut registry = Registry::new();
        registry.add_benchmark("a", logging_proc(&log, "a"));
        let mut config = test_config();
        config.set_no_run(true);
        let mut runner = Runner::with_config(registry, config);
        runner.run_benchmarks().unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert!(runner.generate_report().suites.is_empty());
    }

    #[test]
    fn no_run_still_rejects_bad_configuration() {
        let mut registry = Registry::new();
        registry
            .add_benchmark("a", |_: &mut State| {})
            .iterations(vec![0]);
        let mut config = test_config();
        config.set_no_run(true);
        let mut runner = Runner::with_config(registry, config);
        assert!(runner.run_benchmarks().is_err());
    }

    #[test]
    fn zero_effective_samples_is_a_config_error() {
        let mut registry = Registry::new();
        registry.add_benchmark("a", |_: &mut State| {});
        let mut config = test_config();
        config.set_default_samples(0);
        let mut runner = Runner::with_config(registry, config);
        assert_eq!(
            runner.run_benchmarks(),
            Err(Error::ZeroSamples {
                benchmark: "a".to_string()
            })
        );
    }

    #[test]
    fn zero_iteration_count_is_a_config_error() {
        let mut registry = Registry::new();
        registry
            .add_benchmark("a", |_: &mut State| {})
            .iterations(vec![8, 0]);
        let mut runner = Runner::with_config(registry, test_config());
        assert_eq!(
            runner.run_benchmarks(),
            Err(Error::InvalidIterationCount {
                benchmark: "a".to_string()
            })
        );
    }

    #[test]
    fn two_baselines_in_a_suite_is_a_config_error() {
        let mut registry = Registry::new();
        registry
            .add_benchmark_to_suite("s", "a", |_: &mut State| {})
            .baseline();
        registry
            .add_benchmark_to_suite("s", "b", |_: &mut State| {})
            .baseline();
        let mut runner = Runner::with_config(registry, test_config());
        assert_eq!(
            runner.run_benchmarks(),
            Err(Error::MultipleBaselines {
                suite: "s".to_string()
            })
        );
    }

    #[test]
    fn config_error_aborts_before_anything_runs() {
        let log: CallLog = Default::default();
        let mut registry = Registry::new();
        registry
            .add_benchmark("good", logging_proc(&log, "good"))
            .iterations(vec![1]);
        registry
            .add_benchmark("bad", logging_proc(&log, "bad"))
            .iterations(vec![0]);
        let mut runner = Runner::with_config(registry, test_config());
        assert!(runner.run_benchmarks().is_err());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn mock_clock_drives_the_whole_pipeline() {
        yansi::disable();
        let (clock, mock) = Clock::mock();

        let mut registry = Registry::new();
        let tick = Arc::clone(&mock);
        registry
            .add_benchmark_to_suite("suite", "fast", move |state: &mut State| {
                for _ in state.iter() {
                    tick.increment(10);
                }
                state.set_result(state.iterations() as i64 * 2);
            })
            .iterations(vec![8, 64]);
        let tick = Arc::clone(&mock);
        registry
            .add_benchmark_to_suite("suite", "slow", move |state: &mut State| {
                for _ in state.iter() {
                    tick.increment(11);
                }
                state.set_result(state.iterations() as i64 * 2);
            })
            .iterations(vec![8, 64]);

        let mut config = test_config();
        config
            .set_compare_across_samples(true)
            .set_compare_across_benchmarks(true);
        let mut runner = Runner::with_config(registry, config);
        let out = SharedSink::default();
        let err = SharedSink::default();
        runner.set_output_streams(out.clone(), err.clone());
        runner.set_clock(clock);

        let report = runner.run().unwrap();
        assert_eq!(runner.error(), None);
        assert!(out.contents().is_empty());
        assert!(err.contents().is_empty());

        let suite = report.find_suite("suite").unwrap();
        let fast = suite.find_benchmark("fast").unwrap();
        assert!(fast.is_baseline);
        for (row, dim) in fast.data.iter().zip([8u64, 64]) {
            assert_eq!(row.dimension, dim);
            assert_eq!(row.samples, 2);
            assert_eq!(row.total_time_ns, dim as i64 * 10 * 2);
            assert_eq!(row.result, Some(dim as i64 * 2));
        }
        let slow = suite.find_benchmark("slow").unwrap();
        let ratio = slow.baseline_ratio(fast, 8).unwrap();
        assert!((ratio - 1.1).abs() < 1e-9);

        let mut csv = Vec::new();
        report.to_csv(&mut csv).unwrap();
        let csv = String::from_utf8(csv).unwrap();
        assert!(csv.starts_with("Suite,Benchmark,b,D,S,\"Total ns\",Result,\"ns/op\",Baseline\n"));
        assert!(csv.contains("\"suite\",\"fast\",*,8,2,160,16,10,1.000\n"));
        assert!(csv.contains("\"suite\",\"slow\",,8,2,176,16,11,1.100\n"));
    }

    #[test]
    fn sample_mismatch_sets_the_error_state() {
        yansi::disable();
        let mut registry = Registry::new();
        let counter = Arc::new(Mutex::new(10i64));
        registry
            .add_benchmark("flaky", move |state: &mut State| {
                let mut counter = counter.lock().unwrap();
                state.set_result(*counter);
                *counter += 1;
            })
            .iterations(vec![8])
            .samples(2);

        let mut config = test_config();
        config.set_compare_across_samples(true);
        let mut runner = Runner::with_config(registry, config);
        let out = SharedSink::default();
        let err = SharedSink::default();
        runner.set_output_streams(out.clone(), err.clone());

        runner.run().unwrap();
        assert_eq!(runner.error(), Some(&Error::SampleCompare));
        assert!(out.contents().is_empty());
        assert_eq!(
            err.contents(),
            "Error: Two samples of flaky @8 produced different results: 10 and 11\n"
        );

        // the error state persists until cleared
        runner.clear_error();
        assert_eq!(runner.error(), None);
    }
}
