//! moexdash CLI: sync, watermark status and source listing.
//!
//! Commands:
//! - `sync`: run every updater (or a named subset) against the configured storage
//! - `status`: print each source's watermark
//! - `sources`: list updaters in run order
//!
//! Storage credentials come from `SUPABASE_URL` and `SUPABASE_SERVICE_ROLE_KEY`,
//! optionally via a `.env` file in the working directory.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use moexdash_core::sources;
use moexdash_core::{
    run_all, HttpTransport, PostgrestStore, Settings, StorageCredentials, SyncContext, SystemClock,
    Watermarks,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "moexdash",
    about = "Incremental market and macro data sync for the MOEX dashboard"
)]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. info, debug, moexdash_core=trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new data from every source and upsert it.
    Sync {
        /// Settings TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run only these sources (names as listed by `sources`).
        #[arg(long, num_args = 1..)]
        only: Vec<String>,
    },
    /// Print the last synced date of every source.
    Status {
        /// Settings TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List sources in run order with their resume policy.
    Sources,
}

fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Sync { config, only } => {
            let code = run_sync(config.as_deref(), &only)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Status { config } => run_status(config.as_deref()),
        Commands::Sources => {
            run_sources();
            Ok(())
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(p) => Settings::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(Settings::default()),
    }
}

fn connect(settings: &Settings) -> Result<PostgrestStore> {
    let credentials = StorageCredentials::from_env()?;
    tracing::debug!(url = %credentials.url, "connecting to storage");
    Ok(PostgrestStore::new(&credentials, settings.request_timeout())?)
}

fn run_sync(config: Option<&Path>, only: &[String]) -> Result<i32> {
    let updaters = if only.is_empty() {
        sources::all()
    } else {
        match sources::select(only) {
            Ok(picked) => picked,
            Err(unknown) => bail!(
                "unknown source(s): {}. Run `moexdash sources` for the list.",
                unknown.join(", ")
            ),
        }
    };

    let settings = load_settings(config)?;
    let store = connect(&settings)?;
    let http = HttpTransport::new()?;
    let clock = SystemClock;
    let ctx = SyncContext::new(&store, &http, &clock, &settings);

    let report = run_all(&ctx, &updaters);

    println!();
    for result in &report.results {
        match &result.outcome {
            Ok(outcome) => println!("  ok    {:<22} {outcome}", result.name),
            Err(e) => println!("  FAIL  {:<22} {e}", result.name),
        }
    }
    let failures = report.failures();
    if failures.is_empty() {
        println!("\n{} source(s) updated.", report.results.len());
    } else {
        println!("\nFailed sources: {}", failures.join(", "));
    }
    Ok(report.exit_code())
}

fn run_status(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let store = connect(&settings)?;
    let watermarks = Watermarks::new(&store);

    println!("{:<22} {:<24} LAST DATE", "SOURCE", "WATERMARK KEY");
    for updater in sources::all() {
        let key = updater.watermark_key();
        let last = watermarks
            .get_last_date(key)
            .with_context(|| format!("reading watermark for {key}"))?;
        let shown = last.map_or_else(|| "never".to_string(), |d| d.to_string());
        println!("{:<22} {:<24} {shown}", updater.name(), key);
    }
    Ok(())
}

fn run_sources() {
    for updater in sources::all() {
        println!("{:<22} {}", updater.name(), updater.category());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_pretty() {
        let cli = Cli::try_parse_from(["moexdash", "sources"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Pretty));
    }

    #[test]
    fn log_format_flag_selects_compact() {
        let cli = Cli::try_parse_from(["moexdash", "--log-format", "compact", "sources"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Compact));
    }

    #[test]
    fn only_takes_several_sources() {
        let cli = Cli::try_parse_from(["moexdash", "sync", "--only", "brent_history", "world_bank"])
            .unwrap();
        match cli.command {
            Commands::Sync { only, config } => {
                assert_eq!(only, vec!["brent_history", "world_bank"]);
                assert!(config.is_none());
            }
            _ => panic!("expected sync"),
        }
    }
}
