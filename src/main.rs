//! ccstore CLI
//!
//! Entry point for the `ccstore` command-line tool.

use clap::{Parser, Subcommand};
use ccstore::{CacheKey, CacheStore, StorageConfig, StoreError, StoreResult};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ccstore")]
#[command(about = "Multi-process file cache storage", version)]
struct Cli {
    /// Cache directory
    #[arg(long, short = 'd', env = "CCSTORE_DIR", default_value = ".ccstore")]
    dir: PathBuf,

    /// Path to config file (default: <dir>/ccstore.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file (or stdin with "-") and print its key
    Put {
        /// Hex key to store under (default: SHA-256 of the content)
        #[arg(long, short = 'k')]
        key: Option<String>,

        /// File to store
        file: PathBuf,
    },

    /// Fetch an entry to stdout or a file
    Get {
        /// Hex key of the entry
        #[arg(long, short = 'k')]
        key: String,

        /// Write the entry here instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Hold an entry's lock for a while, printing "locked" once taken
    HoldLock {
        /// Hex key of the entry
        #[arg(long, short = 'k')]
        key: String,

        /// How long to hold the lock
        #[arg(long, default_value_t = 1000)]
        millis: u64,
    },

    /// Remove orphaned temporary files
    Sweep,

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("ccstore=warn,ccstore_io=warn,ccstore_lock=warn"),
        1 => EnvFilter::new("ccstore=info,ccstore_io=info,ccstore_lock=info"),
        _ => EnvFilter::new("ccstore=debug,ccstore_io=debug,ccstore_lock=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_busy() {
                // Distinct code so scripts can retry on contention
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> StoreResult<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.dir.join("ccstore.toml"));
    let config = StorageConfig::load(Some(config_path.as_path()))?;

    match cli.command {
        Commands::Put { key, file } => run_put(&cli.dir, config, key.as_deref(), &file),
        Commands::Get { key, out } => run_get(&cli.dir, config, &key, out.as_deref()),
        Commands::HoldLock { key, millis } => run_hold_lock(&cli.dir, config, &key, millis),
        Commands::Sweep => run_sweep(&cli.dir, config),
        Commands::Config => run_config(&config),
    }
}

fn run_put(dir: &Path, config: StorageConfig, key: Option<&str>, file: &Path) -> StoreResult<()> {
    let data = if file == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .map_err(|source| ccstore_io::FileError::Read {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        buf
    } else {
        ccstore_io::read_file(file, None)?.into_vec()
    };

    let key = match key {
        Some(hex_key) => CacheKey::from_hex(hex_key)?,
        None => CacheKey::from_content(&data),
    };

    let mut store = CacheStore::open(dir, config)?;
    store.put(&key, &data)?;
    info!("Stored {} bytes as {}", data.len(), key);
    println!("{}", key);
    Ok(())
}

fn run_get(dir: &Path, config: StorageConfig, key: &str, out: Option<&Path>) -> StoreResult<()> {
    let key = CacheKey::from_hex(key)?;
    let mut store = CacheStore::open(dir, config)?;

    let Some(data) = store.get(&key)? else {
        return Err(StoreError::File(ccstore_io::FileError::OpenRead {
            path: store.entry_path(&key),
            source: io::Error::from(io::ErrorKind::NotFound),
        }));
    };

    match out {
        Some(path) => ccstore_io::publish(path, &data)?,
        None => {
            let mut stdout = io::stdout().lock();
            ccstore_io::write_all(&mut stdout, &data)
                .and_then(|()| stdout.flush())
                .map_err(|source| ccstore_io::FileError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
    }
    Ok(())
}

fn run_hold_lock(dir: &Path, config: StorageConfig, key: &str, millis: u64) -> StoreResult<()> {
    let key = CacheKey::from_hex(key)?;
    let mut store = CacheStore::open(dir, config)?;
    store.lock(&key)?;

    let stdout_error = |source: io::Error| ccstore_io::FileError::Write {
        path: PathBuf::from("<stdout>"),
        source,
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "locked").map_err(stdout_error)?;
    stdout.flush().map_err(stdout_error)?;
    drop(stdout);

    thread::sleep(Duration::from_millis(millis));
    let released = store.release_locks();
    debug!("Released {} lock(s)", released);
    Ok(())
}

fn run_sweep(dir: &Path, config: StorageConfig) -> StoreResult<()> {
    let store = CacheStore::open(dir, config)?;
    let removed = store.sweep_orphans()?;
    info!("Removed {} orphaned temporary file(s)", removed);
    println!("{}", removed);
    Ok(())
}

fn run_config(config: &StorageConfig) -> StoreResult<()> {
    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => Err(StoreError::Config(ccstore::ConfigError::Invalid(e.to_string()))),
    }
}
