#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_imports,
    unused_qualifications,
    missing_docs
)]

//! Mantou (饅頭, mán tou, steamed bun in Chinese) is a micro-benchmarking
//! harness for stable Rust.
//!
//! Benchmark functions operate on a [`State`]: a start/stop timer plus an
//! iteration protocol that yields exactly `state.iterations()` markers.
//! Benchmarks are registered in a [`Registry`], optionally grouped into
//! suites, and executed by a [`Runner`] across a set of iteration counts
//! ("dimensions") with repeated samples.
//!
//! The runner's job is to neutralize systematic bias: each benchmark's
//! (dimension, sample) matrix is executed as a uniformly random
//! permutation, and execution is randomly interleaved across all pending
//! benchmarks, so no benchmark systematically profits from a warm cache or
//! a cool CPU. A single seed drives all of it; the same seed reproduces the
//! same execution order.
//!
//! # Example
//! ```rust
//! use mantou::{black_box, Registry, Runner, RunnerConfig, State};
//!
//! fn fib(n: u64) -> u64 {
//!     let (mut a, mut b) = (0u64, 1);
//!     for _ in 0..n {
//!         let next = a + b;
//!         a = b;
//!         b = next;
//!     }
//!     a
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_benchmark_to_suite("fib", "iterative", |state: &mut State| {
//!     for _ in state.iter() {
//!         black_box(fib(black_box(24)));
//!     }
//! });
//!
//! let mut runner = Runner::with_config(registry, RunnerConfig::default());
//! let report = runner.run().unwrap();
//! report.to_text(&mut std::io::stdout()).unwrap();
//! ```
//!
//! # Reporting
//! [`Runner::generate_report`] produces an immutable [`report::Report`]
//! which renders as a full per-dimension table, a concise per-benchmark
//! table, or CSV, without re-running anything. Within a suite all
//! benchmarks are ratio-compared against the suite's baseline.
//!
//! # Result comparison
//! A benchmark may record an outcome with [`State::set_result`]. With the
//! comparison checks enabled in [`RunnerConfig`], the runner verifies that
//! repeated samples agree with each other and that benchmarks of a suite
//! agree with their baseline, and reports every mismatch after the run.

pub(crate) mod bench;
pub(crate) mod compare;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod registry;
/// The module to render aggregated benchmark results
pub mod report;
pub(crate) mod runner;
pub(crate) mod state;

pub use bench::{BenchProc, Benchmark};
pub use config::{OutputFormat, RunnerConfig};
pub use error::Error;
pub use registry::Registry;
pub use report::Report;
pub use runner::Runner;
pub use state::{Scope, State};

/// A function that is opaque to the optimizer, used to prevent the compiler
/// from optimizing away computations in a benchmark.
pub use std::hint::black_box;
