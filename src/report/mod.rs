//!
//! Aggregated benchmark results and their renderers.
//!
//! A [`Report`] is produced once by the runner after all states have been
//! executed. It is an immutable snapshot: the renderers ([`Report::to_text`],
//! [`Report::to_text_concise`], [`Report::to_csv`]) are pure functions of it
//! and can be called any number of times without re-running benchmarks.

mod csv;
mod text;

use std::io;

use crate::config::OutputFormat;
use crate::runner::SuiteRun;

/// The aggregated outcome of a benchmark run.
pub struct Report {
    /// Suites in registration order.
    pub suites: Vec<SuiteReport>,
}

/// The aggregated results of one suite.
pub struct SuiteReport {
    /// The suite name. `None` is the default suite.
    pub name: Option<String>,
    /// Benchmark summaries in registration order.
    pub benchmarks: Vec<BenchmarkReport>,
}

/// The per-dimension summary rows of one benchmark.
pub struct BenchmarkReport {
    /// The registered name.
    pub name: String,
    /// The display name (label override or name).
    pub label: String,
    /// Whether this benchmark is the comparison anchor of its suite.
    pub is_baseline: bool,
    /// One row per dimension, in dimension-list order.
    pub data: Vec<ProblemSpace>,
}

/// One aggregated (benchmark, dimension) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemSpace {
    /// The iteration count the benchmark was measured at.
    pub dimension: u64,
    /// How many independent samples were taken.
    pub samples: usize,
    /// Sum of the measured time over all samples.
    pub total_time_ns: i64,
    /// The recorded result, if any sample recorded one.
    pub result: Option<i64>,
}

impl ProblemSpace {
    /// Mean nanoseconds per logical iteration.
    pub fn ns_per_op(&self) -> f64 {
        self.total_time_ns as f64 / (self.samples as u64 * self.dimension) as f64
    }

    /// Iterations per second, derived from [`ProblemSpace::ns_per_op`].
    pub fn ops_per_second(&self) -> f64 {
        let ns_per_op = self.ns_per_op();
        if ns_per_op > 0.0 {
            1e9 / ns_per_op
        } else {
            0.0
        }
    }
}

impl Report {
    /// Find a named suite.
    pub fn find_suite(&self, name: &str) -> Option<&SuiteReport> {
        self.suites.iter().find(|s| s.name.as_deref() == Some(name))
    }

    /// Render the full per-dimension table.
    pub fn to_text<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        text::write_text(self, out)
    }

    /// Render the concise table with one row per benchmark.
    pub fn to_text_concise<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        text::write_text_concise(self, out)
    }

    /// Render CSV with the stable header
    /// `Suite,Benchmark,b,D,S,"Total ns",Result,"ns/op",Baseline`.
    pub fn to_csv<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        csv::write_csv(self, out)
    }

    /// Render with the given format, typically the one picked on the
    /// command line via [`RunnerConfig`](crate::RunnerConfig).
    pub fn write_as<W: io::Write>(&self, format: OutputFormat, out: &mut W) -> io::Result<()> {
        match format {
            OutputFormat::Table => self.to_text(out),
            OutputFormat::Concise => self.to_text_concise(out),
            OutputFormat::Csv => self.to_csv(out),
        }
    }
}

impl SuiteReport {
    /// Find the first benchmark with the given display name.
    pub fn find_benchmark(&self, label: &str) -> Option<&BenchmarkReport> {
        self.benchmarks.iter().find(|b| b.label == label)
    }

    /// The comparison anchor: the explicitly marked baseline, else the
    /// first registered benchmark.
    pub fn find_baseline(&self) -> Option<&BenchmarkReport> {
        self.benchmarks
            .iter()
            .find(|b| b.is_baseline)
            .or_else(|| self.benchmarks.first())
    }
}

impl BenchmarkReport {
    /// The row measured at the given dimension.
    pub fn find_dimension(&self, dimension: u64) -> Option<&ProblemSpace> {
        self.data.iter().find(|d| d.dimension == dimension)
    }

    /// The ratio of this benchmark's ns/op to the baseline's at the same
    /// dimension. `None` when the baseline has no row at that dimension.
    pub fn baseline_ratio(&self, baseline: &BenchmarkReport, dimension: u64) -> Option<f64> {
        let own = self.find_dimension(dimension)?;
        let base = baseline.find_dimension(dimension)?;
        Some(own.ns_per_op() / base.ns_per_op())
    }

    /// ns/op combined over all dimensions, weighted by the amount of work:
    /// total measured time divided by the total number of iterations. Equal
    /// to the per-dimension value whenever ns/op is constant across
    /// dimensions.
    pub fn combined_ns_per_op(&self) -> f64 {
        let total_time: i64 = self.data.iter().map(|d| d.total_time_ns).sum();
        let total_ops: u64 = self
            .data
            .iter()
            .map(|d| d.samples as u64 * d.dimension)
            .sum();
        if total_ops == 0 {
            return 0.0;
        }
        total_time as f64 / total_ops as f64
    }
}

/// Reduce executed states into the report: states are grouped by
/// (suite, benchmark, dimension), rows follow benchmark registration order
/// and then the benchmark's dimension-list order.
pub(crate) fn build_report(runs: &[SuiteRun]) -> Report {
    let suites = runs
        .iter()
        .map(|suite| {
            let mut benchmarks: Vec<BenchmarkReport> = suite
                .benches
                .iter()
                .map(|bench| {
                    let data = bench
                        .dims
                        .iter()
                        .map(|&dimension| {
                            let group = bench
                                .states
                                .iter()
                                .filter(|s| s.iterations() == dimension);
                            let mut samples = 0;
                            let mut total_time_ns = 0;
                            let mut result = None;
                            for state in group {
                                samples += 1;
                                total_time_ns += state.elapsed_ns();
                                if result.is_none() {
                                    result = state.result();
                                }
                            }
                            ProblemSpace {
                                dimension,
                                samples,
                                total_time_ns,
                                result,
                            }
                        })
                        .collect();
                    BenchmarkReport {
                        name: bench.name.clone(),
                        label: bench.label.clone(),
                        is_baseline: bench.is_baseline,
                        data,
                    }
                })
                .collect();
            // without an explicit baseline the first registered benchmark
            // is the comparison anchor
            if !benchmarks.iter().any(|b| b.is_baseline) {
                if let Some(first) = benchmarks.first_mut() {
                    first.is_baseline = true;
                }
            }
            SuiteReport {
                name: suite.name.clone(),
                benchmarks,
            }
        })
        .collect();
    Report { suites }
}


#[cfg(test)]
mod tests {
    use super::test_util::bench_report;
    use super::*;

    #[test]
    fn derived_metrics() {
        let row = ProblemSpace {
            dimension: 8,
            samples: 2,
            total_time_ns: 160,
            result: None,
        };
        assert_eq!(row.ns_per_op(), 10.0);
        assert_eq!(row.ops_per_second(), 1e8);
    }

    #[test]
    fn baseline_ratio_at_matching_dimension() {
        let a = bench_report("a", true, &[(8, 2, 160, None)]);
        let b = bench_report("b", false, &[(8, 2, 176, None), (16, 2, 352, None)]);

        let ratio = b.baseline_ratio(&a, 8).unwrap();
        assert!((ratio - 1.1).abs() < 1e-9);
        // no baseline row at dimension 16
        assert_eq!(b.baseline_ratio(&a, 16), None);
    }

    #[test]
    fn implicit_baseline_is_the_first_benchmark() {
        let suite = SuiteReport {
            name: Some("s".to_string()),
            benchmarks: vec![
                bench_report("first", false, &[]),
                bench_report("second", false, &[]),
            ],
        };
        assert_eq!(suite.find_baseline().unwrap().label, "first");
    }

    #[test]
    fn explicit_baseline_wins_over_registration_order() {
        let suite = SuiteReport {
            name: None,
            benchmarks: vec![
                bench_report("first", false, &[]),
                bench_report("anchor", true, &[]),
            ],
        };
        assert_eq!(suite.find_baseline().unwrap().label, "anchor");
    }

    #[test]
    fn combined_ns_per_op_is_work_weighted() {
        // 10 ns/op at dim 8, 20 ns/op at dim 16
        let b = bench_report("b", false, &[(8, 2, 160, None), (16, 2, 640, None)]);
        // (160 + 640) / (16 + 32)
        assert!((b.combined_ns_per_op() - 800.0 / 48.0).abs() < 1e-9);

        // constant ns/op collapses to the per-dimension value
        let c = bench_report("c", false, &[(8, 2, 160, None), (16, 2, 320, None)]);
        assert_eq!(c.combined_ns_per_op(), 10.0);
    }

    #[test]
    fn write_as_dispatches_to_the_renderers() {
        let report = Report {
            suites: vec![SuiteReport {
                name: Some("s".to_string()),
                benchmarks: vec![bench_report("a", true, &[(8, 2, 160, None)])],
            }],
        };
        for (format, marker) in [
            (OutputFormat::Table, "   Dim   |"),
            (OutputFormat::Concise, " Name (* = baseline)      |  ns/op  |"),
            (OutputFormat::Csv, "Suite,Benchmark,b,D,S"),
        ] {
            let mut out = Vec::new();
            report.write_as(format, &mut out).unwrap();
            assert!(String::from_utf8(out).unwrap().contains(marker));
        }
    }

    #[test]
    fn find_suite_matches_named_suites_only() {
        let report = Report {
            suites: vec![
                SuiteReport {
                    name: None,
                    benchmarks: vec![],
                },
                SuiteReport {
                    name: Some("s".to_string()),
                    benchmarks: vec![],
                },
            ],
        };
        assert!(report.find_suite("s").is_some());
        assert!(report.find_suite("missing").is_none());
    }
}
