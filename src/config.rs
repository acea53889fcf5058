use rustop::opts;

/// Which renderer [`Report::write_as`](crate::Report::write_as) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The full per-dimension table.
    #[default]
    Table,
    /// The concise table with one row per benchmark.
    Concise,
    /// CSV with the stable header.
    Csv,
}

/// Configure the runner defaults.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Iteration counts used by benchmarks without their own list.
    pub default_iterations: Vec<u64>,
    /// Samples per dimension for benchmarks without their own count.
    pub default_samples: usize,
    /// Check that all samples of a (benchmark, dimension) pair produced the
    /// same result.
    pub compare_across_samples: bool,
    /// Check that benchmarks of a suite produce the same result as the
    /// suite baseline at shared dimensions.
    pub compare_across_benchmarks: bool,
    /// Seed for the randomized execution order. `None` draws one from the
    /// system entropy source. Re-running with the same seed reproduces the
    /// same order.
    pub seed: Option<u64>,
    /// Number of worker threads. 1 runs everything on the calling thread.
    pub threads: usize,
    /// Validate the configuration but do not execute any benchmark. The
    /// resulting report is empty.
    pub no_run: bool,
    /// The renderer [`Report::write_as`](crate::Report::write_as) picks.
    pub output_format: OutputFormat,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            default_iterations: vec![8, 64, 512, 4096, 8196],
            default_samples: 2,
            compare_across_samples: false,
            compare_across_benchmarks: false,
            seed: None,
            threads: 1,
            no_run: false,
            output_format: OutputFormat::default(),
        }
    }
}

impl RunnerConfig {
    /// Parses the command line arguments to get the config.
    pub fn new() -> Self {
        parse_args()
    }

    /// Set the default iteration counts.
    pub fn set_default_iterations(&mut self, iterations: Vec<u64>) -> &mut Self {
        self.default_iterations = iterations;
        self
    }

    /// Set the default sample count.
    pub fn set_default_samples(&mut self, samples: usize) -> &mut Self {
        self.default_samples = samples;
        self
    }

    /// Enable or disable the across-samples result check.
    pub fn set_compare_across_samples(&mut self, enable: bool) -> &mut Self {
        self.compare_across_samples = enable;
        self
    }

    /// Enable or disable the across-benchmarks result check.
    pub fn set_compare_across_benchmarks(&mut self, enable: bool) -> &mut Self {
        self.compare_across_benchmarks = enable;
        self
    }

    /// Fix the seed of the randomized execution order.
    pub fn set_seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of worker threads.
    pub fn set_threads(&mut self, threads: usize) -> &mut Self {
        self.threads = threads.max(1);
        self
    }

    /// Validate and expand the benchmarks but skip execution.
    pub fn set_no_run(&mut self, no_run: bool) -> &mut Self {
        self.no_run = no_run;
        self
    }

    /// Pick the renderer used by [`Report::write_as`](crate::Report::write_as).
    pub fn set_output_format(&mut self, format: OutputFormat) -> &mut Self {
        self.output_format = format;
        self
    }
}

pub(crate) fn parse_args() -> RunnerConfig {
    let res = opts! {
        synopsis "";
        opt bench:bool, desc:"bench flag passed by rustc";
        opt iters:Option<String>, desc:"Comma separated default iteration counts, e.g. 8,64,512";
        opt samples:Option<usize>, desc:"Default number of samples per benchmark and dimension";
        opt seed:Option<u64>, desc:"Seed for the randomized execution order";
        opt threads:Option<usize>, desc:"Number of worker threads. Defaults to 1.";
        opt compare_samples:bool, desc:"Compare results across samples of the same benchmark";
        opt compare_benchmarks:bool, desc:"Compare results against the suite baseline";
        opt no_run:bool, desc:"Validate the configuration but do not execute any benchmark";
        opt format:Option<String>, desc:"Report format: txt, con or csv. Defaults to txt.";
    }
    .parse();
    if let Ok((args, _rest)) = res {
        let mut config = RunnerConfig::default();
        if let Some(iters) = args.iters {
            let parsed: Result<Vec<u64>, _> = iters.split(',').map(|el| el.trim().parse()).collect();
            if let Ok(iters) = parsed {
                config.default_iterations = iters;
            } else {
                println!("invalid iteration list: {}", iters);
                std::process::exit(1);
            }
        }
        if let Some(samples) = args.samples {
            config.default_samples = samples;
        }
        config.seed = args.seed;
        if let Some(threads) = args.threads {
            config.threads = threads.max(1);
        }
        config.compare_across_samples = args.compare_samples;
        config.compare_across_benchmarks = args.compare_benchmarks;
        config.no_run = args.no_run;
        if let Some(format) = args.format {
            config.output_format = match format.as_str() {
                "txt" => OutputFormat::Table,
                "con" => OutputFormat::Concise,
                "csv" => OutputFormat::Csv,
                _ => {
                    println!("invalid report format: {}", format);
                    std::process::exit(1);
                }
            };
        }
        config
    } else if let Err(rustop::Error::Help(help)) = res {
        println!("{}", help);
        std::process::exit(0);
    } else if let Err(e) = res {
        println!("{}", e);
        std::process::exit(1);
    } else {
        unreachable!();
    }
}
