use thiserror::Error;

/// Everything that can go wrong in a benchmark run.
///
/// Configuration errors abort the run before any benchmark executes.
/// Comparison errors are recorded as the terminal error state of the run
/// after all benchmarks have executed, so every mismatch is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A benchmark carries an iteration count of zero, either in its own
    /// list or via the runner default.
    #[error("benchmark {benchmark} has an invalid iteration count of 0")]
    InvalidIterationCount {
        /// Name of the offending benchmark.
        benchmark: String,
    },
    /// The effective sample count of a benchmark resolved to zero, so it
    /// would never run.
    #[error("benchmark {benchmark} has an effective sample count of 0")]
    ZeroSamples {
        /// Name of the offending benchmark.
        benchmark: String,
    },
    /// More than one benchmark in a suite is marked as baseline.
    #[error("suite {suite} has more than one baseline benchmark")]
    MultipleBaselines {
        /// Name of the offending suite.
        suite: String,
    },
    /// Two samples of the same benchmark at the same dimension produced
    /// different results.
    #[error("two samples of the same benchmark produced different results")]
    SampleCompare,
    /// A benchmark and the baseline of its suite produced different results
    /// at the same dimension.
    #[error("two benchmarks produced different results")]
    BenchmarkCompare,
}
