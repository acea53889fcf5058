//! Consistency checks over executed states: result comparison across
//! samples and across benchmarks, plus the same-function advisory.
//!
//! Advisories and warnings go to the informational sink, comparison
//! failures to the error sink, so callers (and tests) can assert on each
//! channel independently. Nothing in here aborts a run; failures are
//! reported through the returned error state after all groups have been
//! checked.

use std::io::Write;

use rustc_hash::FxHashSet;
use yansi::Paint;

use crate::error::Error;
use crate::runner::{BenchRun, SuiteRun};
use crate::state::State;

pub(crate) fn run_checks(
    runs: &[SuiteRun],
    compare_samples: bool,
    compare_benchmarks: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Option<Error> {
    let mut error = None;

    if compare_benchmarks {
        for suite in runs {
            report_same_fn_benchmarks(suite, out);
        }
    }

    if compare_samples {
        for suite in runs {
            for bench in &suite.benches {
                if compare_across_samples(bench, err) {
                    error = Some(Error::SampleCompare);
                }
            }
        }
    }

    if compare_benchmarks {
        for suite in runs {
            if compare_against_baseline(suite, out, err) {
                error = Some(Error::BenchmarkCompare);
            }
        }
    }

    error
}

/// Two registrations of the same callable with the same user data are
/// expected to produce near identical timings. Worth pointing out, but not
/// an error.
fn report_same_fn_benchmarks(suite: &SuiteRun, out: &mut dyn Write) {
    for (i, a) in suite.benches.iter().enumerate() {
        for b in &suite.benches[i + 1..] {
            if a.proc.same_fn(&b.proc) && a.user_data == b.user_data {
                let _ = writeln!(
                    out,
                    "{} {} and {} are benchmarks of the same function.",
                    "Warning:".yellow(),
                    a.label,
                    b.label
                );
            }
        }
    }
}

/// All samples of a (benchmark, dimension) group must agree on their
/// result. The first mismatch per group is reported; every group is
/// checked. Returns whether any mismatch was found.
fn compare_across_samples(bench: &BenchRun, err: &mut dyn Write) -> bool {
    let mut found_mismatch = false;
    for &dim in &bench.dims {
        let mut results = bench
            .states
            .iter()
            .filter(|s| s.iterations() == dim)
            .filter_map(State::result);
        let Some(first) = results.next() else { continue };
        if let Some(differing) = results.find(|&r| r != first) {
            let _ = writeln!(
                err,
                "{} Two samples of {} @{} produced different results: {} and {}",
                "Error:".red(),
                bench.label,
                dim,
                first,
                differing
            );
            found_mismatch = true;
        }
    }
    found_mismatch
}

fn representative_result(bench: &BenchRun, dim: u64) -> Option<i64> {
    bench
        .states
        .iter()
        .filter(|s| s.iterations() == dim)
        .find_map(State::result)
}

/// Compare every non-baseline benchmark of a suite against the baseline at
/// shared dimensions. Dimensions present on only one side yield a warning
/// per instance (deduplicated), never an error. Returns whether any
/// mismatch was found.
fn compare_against_baseline(suite: &SuiteRun, out: &mut dyn Write, err: &mut dyn Write) -> bool {
    let Some(baseline) = suite
        .benches
        .iter()
        .find(|b| b.is_baseline)
        .or_else(|| suite.benches.first())
    else {
        return false;
    };

    let mut found_mismatch = false;
    let mut warned: FxHashSet<(&str, u64)> = FxHashSet::default();
    for bench in &suite.benches {
        if std::ptr::eq(bench, baseline) {
            continue;
        }
        let dims = baseline
            .dims
            .iter()
            .chain(bench.dims.iter().filter(|d| !baseline.dims.contains(d)));
        for &dim in dims {
            let in_baseline = baseline.dims.contains(&dim);
            let in_bench = bench.dims.contains(&dim);
            if in_baseline != in_bench {
                let owner = if in_baseline { baseline } else { bench };
                if warned.insert((owner.label.as_str(), dim)) {
                    let _ = writeln!(
                        out,
                        "{} Benchmark {} @{} has a single instance and cannot be compared to others.",
                        "Warning:".yellow(),
                        owner.label,
                        dim
                    );
                }
                continue;
            }
            let (Some(base_result), Some(bench_result)) = (
                representative_result(baseline, dim),
                representative_result(bench, dim),
            ) else {
                // states without a recorded result are excluded
                continue;
            };
            if base_result != bench_result {
                let _ = writeln!(
                    err,
                    "{} Benchmarks {} and {} @{} produce different results: {} and {}",
                    "Error:".red(),
                    baseline.label,
                    bench.label,
                    dim,
                    base_result,
                    bench_result
                );
                found_mismatch = true;
            }
        }
    }
    found_mismatch
}
