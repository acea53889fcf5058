use std::sync::Arc;

use crate::state::State;

/// The callable a benchmark executes, shared and cloneable.
///
/// Any closure or function taking `&mut State` converts into a `BenchProc`.
/// Registering one `BenchProc` clone under several names is allowed; the
/// comparison engine will point it out as an advisory, since two benchmarks
/// of the same function are expected to produce near identical timings.
#[derive(Clone)]
pub struct BenchProc(Arc<dyn Fn(&mut State) + Send + Sync + 'static>);

impl BenchProc {
    /// Wrap a callable.
    pub fn new<F: Fn(&mut State) + Send + Sync + 'static>(fun: F) -> Self {
        BenchProc(Arc::new(fun))
    }

    /// Invoke the callable on a state.
    pub(crate) fn call(&self, state: &mut State) {
        (self.0)(state)
    }

    /// Whether two procs are the same underlying callable.
    pub(crate) fn same_fn(&self, other: &BenchProc) -> bool {
        // Clones of the same Arc share one allocation, separately wrapped
        // closures don't.
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const u8,
            Arc::as_ptr(&other.0) as *const u8,
        )
    }
}

impl<F: Fn(&mut State) + Send + Sync + 'static> From<F> for BenchProc {
    fn from(fun: F) -> Self {
        BenchProc::new(fun)
    }
}

/// A registered benchmark: a named measurement target plus its execution
/// configuration.
///
/// Registration returns `&mut Benchmark`, so the configuration can be
/// chained builder-style until the runner consumes the registry:
///
/// ```rust
/// use mantou::{Registry, State};
///
/// let mut registry = Registry::new();
/// registry
///     .add_benchmark("insert", |state: &mut State| {
///         for _ in state.iter() {}
///     })
///     .iterations(vec![10, 20, 30])
///     .samples(4)
///     .baseline();
/// ```
pub struct Benchmark {
    pub(crate) name: String,
    pub(crate) proc: BenchProc,
    pub(crate) iterations: Vec<u64>,
    pub(crate) samples: usize,
    pub(crate) is_baseline: bool,
    pub(crate) label: Option<String>,
    pub(crate) user_data: u64,
}

impl Benchmark {
    pub(crate) fn new(name: String, proc: BenchProc) -> Self {
        Benchmark {
            name,
            proc,
            iterations: Vec::new(),
            samples: 0,
            is_baseline: false,
            label: None,
            user_data: 0,
        }
    }

    /// The name the benchmark was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name used in reports: the label if one was set, else the name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Set the iteration counts ("dimensions") this benchmark is measured
    /// at. An empty list means the runner default applies.
    pub fn iterations(&mut self, iterations: Vec<u64>) -> &mut Self {
        self.iterations = iterations;
        self
    }

    /// Set the number of independent repetitions per dimension. Zero means
    /// the runner default applies.
    pub fn samples(&mut self, samples: usize) -> &mut Self {
        self.samples = samples;
        self
    }

    /// Mark this benchmark as the comparison anchor of its suite. At most
    /// one benchmark per suite may be marked.
    pub fn baseline(&mut self) -> &mut Self {
        self.is_baseline = true;
        self
    }

    /// Override the display name used in reports.
    pub fn label<S: Into<String>>(&mut self, label: S) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    /// Set an opaque value forwarded into every [`State`] of this benchmark.
    pub fn user_data(&mut self, user_data: u64) -> &mut Self {
        self.user_data = user_data;
        self
    }
}
