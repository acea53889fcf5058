use std::io;

use crate::report::{BenchmarkReport, Report, SuiteReport};

fn label_with_marker(bench: &BenchmarkReport) -> String {
    if bench.is_baseline {
        format!("{} *", bench.label)
    } else {
        bench.label.clone()
    }
}

fn ratio_str(ratio: Option<f64>, is_baseline: bool) -> String {
    if is_baseline {
        return "-".to_string();
    }
    match ratio {
        Some(ratio) => format!("{:.3}", ratio),
        None => "???".to_string(),
    }
}

fn ns_per_op_display(total_time_ns: i64, samples: usize, dimension: u64) -> i64 {
    let ops = samples as i64 * dimension as i64;
    if ops == 0 {
        return 0;
    }
    total_time_ns / ops
}

pub(crate) fn write_text<W: io::Write>(report: &Report, out: &mut W) -> io::Result<()> {
    for suite in &report.suites {
        write_suite_header(suite, out)?;
        writeln!(
            out,
            " Name (* = baseline)      |   Dim   |  Total ms |  ns/op  |Baseline| Ops/second"
        )?;
        writeln!(
            out,
            "--------------------------|--------:|----------:|--------:|-------:|----------:"
        )?;
        let baseline = suite.find_baseline();
        for bench in &suite.benchmarks {
            let label = label_with_marker(bench);
            for row in &bench.data {
                let ratio = baseline
                    .and_then(|base| bench.baseline_ratio(base, row.dimension));
                writeln!(
                    out,
                    " {:<25}|{:>8} |{:>10.3} |{:>8} |{:>7} |{:>11}",
                    label,
                    row.dimension,
                    row.total_time_ns as f64 / 1e6,
                    ns_per_op_display(row.total_time_ns, row.samples, row.dimension),
                    ratio_str(ratio, bench.is_baseline),
                    format!("{:.1}", row.ops_per_second()),
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub(crate) fn write_text_concise<W: io::Write>(report: &Report, out: &mut W) -> io::Result<()> {
    for suite in &report.suites {
        write_suite_header(suite, out)?;
        writeln!(
            out,
            " Name (* = baseline)      |  ns/op  | Baseline |  Ops/second"
        )?;
        writeln!(
            out,
            "--------------------------|--------:|---------:|-----------:"
        )?;
        let baseline_ns_per_op = suite.find_baseline().map(|b| b.combined_ns_per_op());
        for bench in &suite.benchmarks {
            let ns_per_op = bench.combined_ns_per_op();
            let ratio = match baseline_ns_per_op {
                Some(base) if base > 0.0 => Some(ns_per_op / base),
                _ => None,
            };
            let ops_per_second = if ns_per_op > 0.0 { 1e9 / ns_per_op } else { 0.0 };
            writeln!(
                out,
                " {:<25}|{:>8} |{:>9} |{:>12}",
                label_with_marker(bench),
                ns_per_op as i64,
                ratio_str(ratio, bench.is_baseline),
                format!("{:.1}", ops_per_second),
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_suite_header<W: io::Write>(suite: &SuiteReport, out: &mut W) -> io::Result<()> {
    if let Some(name) = &suite.name {
        writeln!(out, "## {}:", name)?;
        writeln!(out)?;
    }
    Ok(())
}
