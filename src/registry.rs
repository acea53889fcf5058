use std::sync::{Mutex, OnceLock};

use crate::bench::{BenchProc, Benchmark};

/// An ordered collection of benchmarks grouped into suites.
///
/// Suites keep their registration order for reporting; benchmarks keep
/// their registration order within a suite. Duplicate names are permitted,
/// name lookup returns the first registration.
///
/// A registry is a plain value. It is consumed by
/// [`Runner::new`](crate::Runner::new), which freezes the configuration of
/// all contained benchmarks.
#[derive(Default)]
pub struct Registry {
    pub(crate) suites: Vec<Suite>,
}

/// A named group of benchmarks sharing comparison scope. The default suite
/// has no name.
pub struct Suite {
    pub(crate) name: Option<String>,
    pub(crate) benches: Vec<Benchmark>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a benchmark in the default suite. Returns the benchmark for
    /// builder-style configuration.
    pub fn add_benchmark<S: Into<String>, P: Into<BenchProc>>(
        &mut self,
        name: S,
        proc: P,
    ) -> &mut Benchmark {
        self.add_to_suite(None, name.into(), proc.into())
    }

    /// Register a benchmark in the named suite. The suite is created on
    /// first use.
    pub fn add_benchmark_to_suite<S: Into<String>, N: Into<String>, P: Into<BenchProc>>(
        &mut self,
        suite: S,
        name: N,
        proc: P,
    ) -> &mut Benchmark {
        self.add_to_suite(Some(suite.into()), name.into(), proc.into())
    }

    fn add_to_suite(
        &mut self,
        suite: Option<String>,
        name: String,
        proc: BenchProc,
    ) -> &mut Benchmark {
        assert!(!name.is_empty(), "a benchmark requires a non-empty name");
        let idx = match self.suites.iter().position(|s| s.name == suite) {
            Some(idx) => idx,
            None => {
                self.suites.push(Suite {
                    name: suite,
                    benches: Vec::new(),
                });
                self.suites.len() - 1
            }
        };
        let benches = &mut self.suites[idx].benches;
        benches.push(Benchmark::new(name, proc));
        benches.last_mut().expect("just pushed")
    }

    /// Number of registered benchmarks across all suites.
    pub fn len(&self) -> usize {
        self.suites.iter().map(|s| s.benches.len()).sum()
    }

    /// Whether no benchmark is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the first benchmark registered under `name` in the default
    /// suite.
    pub fn find_benchmark(&self, name: &str) -> Option<&Benchmark> {
        self.find_benchmark_in_suite(None, name)
    }

    /// Find the first benchmark registered under `name` in the given suite.
    pub fn find_benchmark_in_suite(&self, suite: Option<&str>, name: &str) -> Option<&Benchmark> {
        self.suites
            .iter()
            .find(|s| s.name.as_deref() == suite)?
            .benches
            .iter()
            .find(|b| b.name == name)
    }

    /// Run `f` with the process-wide default registry. This preserves the
    /// "register anywhere" ergonomics of a global registry while keeping
    /// the registry an explicit object.
    pub fn with_default<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
        let mut guard = default_registry().lock().expect("default registry poisoned");
        f(&mut guard)
    }

    /// Take the accumulated contents of the process-wide default registry,
    /// leaving it empty. Tests use this to reset between cases.
    pub fn take_default() -> Registry {
        let mut guard = default_registry().lock().expect("default registry poisoned");
        std::mem::take(&mut guard)
    }
}

fn default_registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Registry::new()))
}
