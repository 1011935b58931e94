use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stimflip",
    version,
    about = "Stimulus flip-time reconstruction command-line tool",
    long_about = "Reconstruct monitor-refresh-rate stimulus timestamps for two-photon scans.\n\
                  Reads JSON experiment fixtures and writes one conversion record per scan."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconstruct stimulus timestamps for one scan
    Convert(ConvertArgs),
    /// Convert every scan of one or more fixture files
    Batch(BatchArgs),
    /// Check a fixture file and dry-run the reconstruction of each scan
    Validate(ValidateArgs),
}

/// Reconstruction parameters shared by every subcommand
#[derive(Args, Clone, Default)]
pub struct EngineArgs {
    /// JSON file with a full reconstruction config
    #[arg(long)]
    pub config: Option<String>,

    /// Timing tolerance in seconds (overrides --config)
    #[arg(long, env = "STIMFLIP_TOLERANCE")]
    pub tolerance: Option<f64>,

    /// Estimated monitor refresh rate in Hz (overrides --config)
    #[arg(long, env = "STIMFLIP_REFRESH_RATE")]
    pub refresh_rate: Option<f64>,

    /// Frame rate assumed for clip stimuli in Hz (overrides --config)
    #[arg(long)]
    pub clip_frame_rate: Option<f64>,
}

/// Timestamp caching is off unless one of these is given
#[derive(Args, Clone, Default)]
pub struct CacheArgs {
    /// Cache timestamp columns under this directory
    #[arg(long, env = "STIMFLIP_CACHE_DIR")]
    pub cache_dir: Option<String>,

    /// Cache timestamp columns under the per-user cache directory
    #[arg(long, default_value_t = false)]
    pub cache: bool,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// JSON fixture file with scans and trials
    #[arg(long)]
    pub source: String,

    /// Session of the scan
    #[arg(long)]
    pub session: u32,

    /// Scan index within the session
    #[arg(long)]
    pub scan_idx: u32,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for fixture files (e.g., "data/*.json")
    #[arg(long, conflicts_with = "files")]
    pub glob: Option<String>,

    /// Explicit list of fixture files
    #[arg(long, num_args = 1..)]
    pub files: Option<Vec<String>>,

    /// Only convert these scans, given as "session/scan_idx"
    #[arg(long, num_args = 1..)]
    pub scans: Option<Vec<String>>,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Write one JSON file per scan here (default: JSONL on stdout)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Worker threads for parallel scans (default: one per core)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Keep going after a fixture file with failed scans
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List matched files and exit
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON fixture file with scans and trials
    #[arg(long)]
    pub source: String,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Parse a scan key string "session/scan_idx".
pub fn parse_scan_key(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid scan key '{}': expected 'session/scan_idx'",
            s
        ));
    }
    let session = parts[0]
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid scan key '{}': '{}' is not a valid integer", s, parts[0]))?;
    let scan_idx = parts[1]
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid scan key '{}': '{}' is not a valid integer", s, parts[1]))?;
    Ok((session, scan_idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_args() {
        let cli = Cli::try_parse_from([
            "stimflip",
            "convert",
            "--source",
            "fixture.json",
            "--session",
            "4",
            "--scan-idx",
            "9",
            "--tolerance",
            "0.001",
            "--cache",
        ])
        .unwrap();
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.source, "fixture.json");
                assert_eq!((args.session, args.scan_idx), (4, 9));
                assert_eq!(args.engine.tolerance, Some(0.001));
                assert!(args.cache.cache);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_batch_glob_conflicts_with_files() {
        let result = Cli::try_parse_from([
            "stimflip", "batch", "--glob", "*.json", "--files", "a.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_scan_key_valid() {
        assert_eq!(parse_scan_key("4/9").unwrap(), (4, 9));
        assert_eq!(parse_scan_key("1 / 2").unwrap(), (1, 2));
    }

    #[test]
    fn test_parse_scan_key_invalid() {
        assert!(parse_scan_key("4").is_err());
        assert!(parse_scan_key("4/9/1").is_err());
        assert!(parse_scan_key("a/b").is_err());
    }
}
