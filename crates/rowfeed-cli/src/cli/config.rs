use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use rowfeed::{DEFAULT_ARRAY_SIZE, DEFAULT_INTERVAL_MS, DisplayConfig};

/// Runtime configuration for the `rowfeed` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults matching the library's
/// `DisplayConfig`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rowfeed",
    version,
    about = "Stream synthetic record batches and show the trailing window"
)]
pub struct CliArgs {
    /// Milliseconds between batches. Must be greater than zero.
    ///
    /// Environment variable: `ROWFEED_INTERVAL`
    #[arg(long, env = "ROWFEED_INTERVAL", default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Number of records generated per batch.
    ///
    /// Environment variable: `ROWFEED_ARRAY_SIZE`
    #[arg(long, env = "ROWFEED_ARRAY_SIZE", default_value_t = DEFAULT_ARRAY_SIZE)]
    pub array_size: usize,

    /// Comma-separated ids that replace the displayed ids, position by
    /// position. Tokens that are not numbers are ignored.
    ///
    /// Environment variable: `ROWFEED_ADDITIONAL_IDS`
    #[arg(long, env = "ROWFEED_ADDITIONAL_IDS", default_value_t = String::new())]
    pub additional_ids: String,

    /// Quiet period before an interval or size edit reaches the generator.
    ///
    /// Environment variable: `ROWFEED_DEBOUNCE_MS`
    #[arg(long, env = "ROWFEED_DEBOUNCE_MS", default_value_t = 500)]
    pub debounce_ms: u64,

    /// Seed for reproducible batches. Uses the thread-local RNG when unset.
    ///
    /// Environment variable: `ROWFEED_SEED`
    #[arg(long, env = "ROWFEED_SEED")]
    pub seed: Option<u64>,

    /// How display views are printed.
    ///
    /// Environment variable: `ROWFEED_FORMAT`
    #[arg(long, env = "ROWFEED_FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Stop after this many milliseconds instead of waiting for Ctrl+C.
    ///
    /// Environment variable: `ROWFEED_RUN_FOR_MS`
    #[arg(long, env = "ROWFEED_RUN_FOR_MS")]
    pub run_for_ms: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One aligned line per record.
    Table,
    /// One JSON object per view.
    Json,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub display: DisplayConfig,
    pub quiet: Duration,
    pub seed: Option<u64>,
    pub format: OutputFormat,
    pub run_for: Option<Duration>,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.interval == 0 {
            bail!("ROWFEED_INTERVAL must be greater than 0");
        }

        if args.array_size > rowfeed::MAX_ARRAY_SIZE {
            bail!(
                "ROWFEED_ARRAY_SIZE must be at most {}",
                rowfeed::MAX_ARRAY_SIZE
            );
        }

        if args.run_for_ms == Some(0) {
            bail!("ROWFEED_RUN_FOR_MS must be greater than 0 when set");
        }

        Ok(Self {
            display: DisplayConfig {
                interval: args.interval,
                array_size: args.array_size,
                additional_ids: args.additional_ids,
            },
            quiet: Duration::from_millis(args.debounce_ms),
            seed: args.seed,
            format: args.format,
            run_for: args.run_for_ms.map(Duration::from_millis),
        })
    }
}
