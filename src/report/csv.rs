use std::io;

use crate::report::Report;

/// The stable CSV header. `b` marks baseline rows with `*`, `D` is the
/// dimension, `S` the sample count.
const HEADER: &str = "Suite,Benchmark,b,D,S,\"Total ns\",Result,\"ns/op\",Baseline";

pub(crate) fn write_csv<W: io::Write>(report: &Report, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", HEADER)?;
    for suite in &report.suites {
        let suite_name = suite.name.as_deref().unwrap_or("");
        let baseline = suite.find_baseline();
        for bench in &suite.benchmarks {
            for row in &bench.data {
                let ops = row.samples as i64 * row.dimension as i64;
                let ns_per_op = if ops == 0 { 0 } else { row.total_time_ns / ops };
                let ratio = if bench.is_baseline {
                    "1.000".to_string()
                } else {
                    baseline
                        .and_then(|base| bench.baseline_ratio(base, row.dimension))
                        .map(|ratio| format!("{:.3}", ratio))
                        .unwrap_or_default()
                };
                writeln!(
                    out,
                    "\"{}\",\"{}\",{},{},{},{},{},{},{}",
                    suite_name,
                    bench.label,
                    if bench.is_baseline { "*" } else { "" },
                    row.dimension,
                    row.samples,
                    row.total_time_ns,
                    row.result.unwrap_or(0),
                    ns_per_op,
                    ratio,
                )?;
            }
        }
    }
    Ok(())
}
