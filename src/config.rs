use clap::ValueEnum;

/// Main configuration struct for reqlog
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub report: ReportConfig,
    pub faults: FaultConfig,
    pub performance: PerformanceConfig,
}

/// Input configuration
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    /// Log file to read; stdin when absent
    pub file: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<String>,
    pub stats: bool,
    pub verbose: u8,
}

/// Report derivation settings
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Rank percentile of request durations (0-100)
    pub percentile: u8,
    /// Number of slowest sends to list
    pub top: usize,
    /// Number of never-finished requests to list by id
    pub unfinished_examples: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            percentile: 95,
            top: 10,
            unfinished_examples: 10,
        }
    }
}

/// Data-integrity fault handling
#[derive(Debug, Clone)]
pub struct FaultConfig {
    pub strategy: FaultStrategy,
    /// Fault messages kept for the report
    pub max_examples: usize,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            strategy: FaultStrategy::Collect,
            max_examples: 10,
        }
    }
}

/// Performance configuration
#[derive(Debug, Clone, Default)]
pub struct PerformanceConfig {
    pub parallel: bool,
    pub threads: usize,
    pub batch_size: Option<usize>,
}

/// Report output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// What to do when an event references state that does not exist
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaultStrategy {
    /// Keep going and summarize faults in the report
    #[default]
    Collect,
    /// Print each fault to stderr as it happens, then keep going
    Print,
    /// Stop at the first fault
    Abort,
}

impl AnalyzerConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        Self {
            input: InputConfig {
                file: cli.file.clone(),
            },
            output: OutputConfig {
                format: cli.output_format,
                file: cli.output_file.clone(),
                stats: cli.stats,
                verbose: cli.verbose,
            },
            report: ReportConfig {
                percentile: cli.percentile,
                top: cli.top,
                unfinished_examples: cli.unfinished_examples,
            },
            faults: FaultConfig {
                strategy: cli.on_fault,
                max_examples: cli.fault_examples,
            },
            performance: PerformanceConfig {
                parallel: cli.parallel,
                threads: cli.threads,
                batch_size: cli.batch_size,
            },
        }
    }

    /// Check if sharded processing should be used
    pub fn should_use_parallel(&self) -> bool {
        self.performance.parallel || self.performance.threads > 0
    }

    /// Get effective batch size with defaults
    pub fn effective_batch_size(&self) -> usize {
        self.performance.batch_size.unwrap_or(1000).max(1)
    }

    /// Get effective thread count with defaults
    pub fn effective_threads(&self) -> usize {
        if self.performance.threads == 0 {
            num_cpus::get()
        } else {
            self.performance.threads
        }
    }

    /// Default tracing filter for the configured verbosity
    pub fn log_level(&self) -> &'static str {
        match self.output.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
