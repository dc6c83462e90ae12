use std::path::PathBuf;

use clap::Parser;

/// Perform relational table join on the GPU.
///
/// Each TBLSET names a (left, lookup, reference) table triple, e.g. 416K
/// joins lpt416K against pt416K and verifies against rt416K.
#[derive(Parser, Debug, Clone)]
#[command(name = "gpujoin", version, about)]
pub struct CliArgs {
    /// Table sets to join: "all" or one or more of 208K 416K 832K 2M 3M 7M 10M 13M 16M.
    #[arg(
        value_name = "TBLSET",
        required_unless_present = "report_from_file"
    )]
    pub sets: Vec<String>,

    /// Tables directory.
    #[arg(short = 'd', long, value_name = "DIR", env = "GPUJOIN_TABLES", default_value = "tables")]
    pub tables_dir: PathBuf,

    /// Write a binary cache file next to each text table after loading it.
    #[arg(short = 'm', long)]
    pub make_cache: bool,

    /// Load tables from binary cache files (see --make-cache).
    #[arg(short = 'n', long)]
    pub use_cache: bool,

    /// Kernel runs per table set (1-4); reported times are averages.
    #[arg(
        short = 'i',
        long,
        value_name = "ITER",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=4)
    )]
    pub iterations: u32,

    /// Use this lookup table (e.g. pt832K) for every join. Sets that need a
    /// larger lookup table are skipped.
    #[arg(short = 'p', long, value_name = "PGTBL")]
    pub lookup_table: Option<String>,

    /// OpenCL platform name, or "any" for the first platform with a GPU.
    #[arg(short = 't', long, value_name = "PLATNAME", env = "GPUJOIN_PLATFORM", default_value = "NVIDIA CUDA")]
    pub platform: String,

    /// Verbose console output.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Directory for the record, log, and error files.
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Log file (default: <output-dir>/gpujoin.log).
    #[arg(long, value_name = "FNAME")]
    pub log: Option<PathBuf>,

    /// Kernel source file (default: built-in join.cl).
    #[arg(long, value_name = "FNAME", hide = true)]
    pub kernel: Option<PathBuf>,

    /// Work-group shape XD YD.
    #[arg(long, num_args = 2, value_names = ["XD", "YD"], hide = true)]
    pub dim: Option<Vec<usize>>,

    /// Print the summary table from a record file and exit
    /// (default: <output-dir>/gpujoin.tms).
    #[arg(long, value_name = "FNAME", num_args = 0..=1)]
    pub report_from_file: Option<Option<PathBuf>>,

    /// Baseline timing file (default: <output-dir>/sqljoin[-pt<SET>].tms).
    #[arg(long, value_name = "FNAME")]
    pub baseline: Option<PathBuf>,

    /// Also write the batch results as JSON.
    #[arg(long, value_name = "FNAME")]
    pub json_file: Option<PathBuf>,

    /// Run the join on the host reference device instead of OpenCL.
    #[arg(long)]
    pub no_gpu: bool,

    /// Stop the batch once this many table sets have mismatched.
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub max_mismatched_sets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["gpujoin", "208K"]).unwrap();
        assert_eq!(args.sets, vec!["208K"]);
        assert_eq!(args.iterations, 1);
        assert_eq!(args.platform, "NVIDIA CUDA");
        assert_eq!(args.max_mismatched_sets, 2);
        assert!(args.report_from_file.is_none());
    }

    #[test]
    fn test_iterations_range() {
        assert!(CliArgs::try_parse_from(["gpujoin", "-i", "4", "all"]).is_ok());
        assert!(CliArgs::try_parse_from(["gpujoin", "-i", "5", "all"]).is_err());
        assert!(CliArgs::try_parse_from(["gpujoin", "-i", "0", "all"]).is_err());
    }

    #[test]
    fn test_sets_required_unless_report() {
        assert!(CliArgs::try_parse_from(["gpujoin"]).is_err());
        let args = CliArgs::try_parse_from(["gpujoin", "--report-from-file"]).unwrap();
        assert_eq!(args.report_from_file, Some(None));
        let args =
            CliArgs::try_parse_from(["gpujoin", "--report-from-file", "old.tms"]).unwrap();
        assert_eq!(args.report_from_file, Some(Some(PathBuf::from("old.tms"))));
    }

    #[test]
    fn test_dim_takes_two_values() {
        let args = CliArgs::try_parse_from(["gpujoin", "--dim", "8", "2", "all"]).unwrap();
        assert_eq!(args.dim, Some(vec![8, 2]));
    }
}
