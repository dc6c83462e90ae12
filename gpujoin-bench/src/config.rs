//! Validated batch configuration.
//!
//! [`Command::from_args`] turns parsed command-line options into either a
//! batch run or a report-only request. All checks that do not need device
//! access happen here, before any table is opened.

use std::path::{Path, PathBuf};

use gpujoin_runtime::{PlatformSelector, DEFAULT_LOCAL_SIZE};

use crate::catalog::{range_leq, TableSetId};
use crate::cli::CliArgs;

/// Most timed kernel runs allowed per table set.
pub const MAX_RUNS: u32 = 4;

pub const RECORD_FILE: &str = "gpujoin.tms";
pub const LOG_FILE: &str = "gpujoin.log";
pub const ERROR_LOG_FILE: &str = "gpujoin-errors.log";
pub const KERNEL_DUMP_FILE: &str = ".kernel.generated.cl";
pub const BINARY_DUMP_FILE: &str = ".gpu.ptx";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    UnknownSet(String),
    #[error("no table sets given")]
    NoSets,
    #[error("iterations must be between 1 and {MAX_RUNS}, got {0}")]
    InvalidRuns(u32),
    #[error("invalid lookup table '{0}'; expected pt<SET>, e.g. pt832K")]
    InvalidLookupTable(String),
    #[error("no requested table set fits lookup table {0}")]
    NothingFitsLookup(String),
    #[error("tables directory {} does not exist", .0.display())]
    TablesDirMissing(PathBuf),
    #[error("invalid work-group shape {0:?}")]
    InvalidLocalSize(Vec<usize>),
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),
    #[error("--max-mismatched-sets must be at least 1")]
    InvalidThreshold,
    #[error("--use-cache and --make-cache are mutually exclusive")]
    CacheModeConflict,
}

/// Sets named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetSelection {
    /// The whole catalog (`all`).
    All,
    /// Explicit sets, sorted and deduplicated.
    Listed(Vec<TableSetId>),
}

impl SetSelection {
    /// Parse positional set labels. `all` anywhere selects the full catalog.
    pub fn parse(labels: &[String]) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::NoSets);
        }
        if labels.iter().any(|l| l.trim().eq_ignore_ascii_case("all")) {
            return Ok(SetSelection::All);
        }
        let mut sets = labels
            .iter()
            .map(|l| l.parse::<TableSetId>().map_err(ConfigError::UnknownSet))
            .collect::<Result<Vec<_>, _>>()?;
        sets.sort();
        sets.dedup();
        Ok(SetSelection::Listed(sets))
    }

    pub fn sets(&self) -> Vec<TableSetId> {
        match self {
            SetSelection::All => TableSetId::ALL.to_vec(),
            SetSelection::Listed(sets) => sets.clone(),
        }
    }
}

/// Where table rows are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Tab-separated `<key>\t'<text>'` text files (`<name>.csv`).
    Text,
    /// Binary row cache (`<name>.bin`) written by `--make-cache`.
    BinaryCache,
}

/// Timed kernel runs per table set, 1 through [`MAX_RUNS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCount(u32);

impl RunCount {
    pub fn new(n: u32) -> Result<Self, ConfigError> {
        if (1..=MAX_RUNS).contains(&n) {
            Ok(Self(n))
        } else {
            Err(ConfigError::InvalidRuns(n))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Everything a batch run needs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub selection: SetSelection,
    /// Sets to process, in size order, after lookup-table truncation.
    pub sets: Vec<TableSetId>,
    pub tables_dir: PathBuf,
    pub source_format: SourceFormat,
    pub make_cache: bool,
    pub runs: RunCount,
    pub fixed_lookup: Option<TableSetId>,
    pub platform: PlatformSelector,
    pub use_host: bool,
    pub verbose: bool,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
    pub local_size: (usize, usize),
    pub kernel_path: Option<PathBuf>,
    pub baseline_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
    pub max_mismatched_sets: usize,
}

impl BatchConfig {
    /// True when `all` was selected and no lookup table is fixed.
    pub fn is_full_catalog(&self) -> bool {
        self.selection == SetSelection::All && self.fixed_lookup.is_none()
    }

    pub fn record_path(&self) -> PathBuf {
        self.output_dir.join(RECORD_FILE)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.output_dir.join(ERROR_LOG_FILE)
    }

    pub fn kernel_dump_path(&self) -> PathBuf {
        self.output_dir.join(KERNEL_DUMP_FILE)
    }

    pub fn binary_dump_path(&self) -> PathBuf {
        self.output_dir.join(BINARY_DUMP_FILE)
    }

    /// Baseline file: the explicit path, else the conventional one for the
    /// lookup-table mode.
    pub fn resolved_baseline(&self) -> PathBuf {
        self.baseline_path
            .clone()
            .unwrap_or_else(|| default_baseline(&self.output_dir, self.fixed_lookup))
    }
}

/// Options for report-only mode.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub record_path: PathBuf,
    pub output_dir: PathBuf,
    pub baseline_path: Option<PathBuf>,
    pub verbose: bool,
    pub log_path: PathBuf,
}

/// What the binary was asked to do.
#[derive(Debug, Clone)]
pub enum Command {
    Run(BatchConfig),
    Report(ReportConfig),
}

impl Command {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let log_path = args
            .log
            .clone()
            .unwrap_or_else(|| args.output_dir.join(LOG_FILE));

        if let Some(report) = args.report_from_file {
            let record_path = report.unwrap_or_else(|| args.output_dir.join(RECORD_FILE));
            return Ok(Command::Report(ReportConfig {
                record_path,
                output_dir: args.output_dir,
                baseline_path: args.baseline,
                verbose: args.verbose,
                log_path,
            }));
        }

        let selection = SetSelection::parse(&args.sets)?;
        let runs = RunCount::new(args.iterations)?;

        if args.use_cache && args.make_cache {
            return Err(ConfigError::CacheModeConflict);
        }
        if args.max_mismatched_sets == 0 {
            return Err(ConfigError::InvalidThreshold);
        }

        let fixed_lookup = match args.lookup_table.as_deref() {
            Some(name) => Some(
                TableSetId::from_lookup_table(name.trim())
                    .ok_or_else(|| ConfigError::InvalidLookupTable(name.to_string()))?,
            ),
            None => None,
        };
        let sets = effective_sets(&selection, fixed_lookup)?;

        let local_size = match args.dim {
            Some(dim) => parse_local_size(&dim)?,
            None => DEFAULT_LOCAL_SIZE,
        };

        let platform = args
            .platform
            .parse::<PlatformSelector>()
            .map_err(ConfigError::InvalidPlatform)?;

        if !args.tables_dir.is_dir() {
            return Err(ConfigError::TablesDirMissing(args.tables_dir));
        }

        Ok(Command::Run(BatchConfig {
            selection,
            sets,
            tables_dir: args.tables_dir,
            source_format: if args.use_cache {
                SourceFormat::BinaryCache
            } else {
                SourceFormat::Text
            },
            make_cache: args.make_cache,
            runs,
            fixed_lookup,
            platform,
            use_host: args.no_gpu,
            verbose: args.verbose,
            output_dir: args.output_dir,
            log_path,
            local_size,
            kernel_path: args.kernel,
            baseline_path: args.baseline,
            json_path: args.json_file,
            max_mismatched_sets: args.max_mismatched_sets,
        }))
    }
}

/// Sets in size order, truncated to those whose own lookup table is not
/// larger than the fixed one.
pub fn effective_sets(
    selection: &SetSelection,
    fixed_lookup: Option<TableSetId>,
) -> Result<Vec<TableSetId>, ConfigError> {
    let sets = selection.sets();
    let sets = match fixed_lookup {
        Some(bound) => range_leq(&sets, bound),
        None => sets,
    };
    if sets.is_empty() {
        return Err(match fixed_lookup {
            Some(bound) => ConfigError::NothingFitsLookup(bound.lookup_table()),
            None => ConfigError::NoSets,
        });
    }
    Ok(sets)
}

fn parse_local_size(dim: &[usize]) -> Result<(usize, usize), ConfigError> {
    match dim {
        [x, y] if *x > 0 && *y > 0 => Ok((*x, *y)),
        _ => Err(ConfigError::InvalidLocalSize(dim.to_vec())),
    }
}

/// `sqljoin.tms`, or `sqljoin-pt<SET>.tms` when a lookup table is fixed.
pub fn default_baseline(output_dir: &Path, fixed_lookup: Option<TableSetId>) -> PathBuf {
    match fixed_lookup {
        Some(pt) => output_dir.join(format!("sqljoin-{}.tms", pt.lookup_table())),
        None => output_dir.join("sqljoin.tms"),
    }
}
