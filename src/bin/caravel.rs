//! Command-line dump/load tool for tracked-content caches.

use caravel::adapter::{CacheAdapter, ColumnStoreAdapter, ReplicatedCacheAdapter};
use caravel::codec::CodecFormat;
use caravel::config::{BackendKind, ToolConfig, TransferConfig};
use caravel::error::Result;
use caravel::transfer::{JsonReportArchiver, TransferEngine, TransferReport};
use caravel::types::{TrackedContent, TrackingKey};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Unusable command line.
const ERR_CANT_PARSE_ARGS: i32 = 2;
/// Startup or pass-level failure.
const ERR_CANT_INIT: i32 = 3;

#[derive(Debug, Parser)]
#[command(name = "caravel", about = "Dump, load, and export tracked-content caches")]
struct Cli {
    /// Name of the cache to operate on.
    #[arg(long)]
    cache: String,

    /// Pass to run.
    #[arg(long, value_enum)]
    operation: Operation,

    /// On-disk format of the data file.
    #[arg(long, value_enum, default_value_t = DataType::Json)]
    data_type: DataType,

    /// Data file to write or read.
    #[arg(long)]
    file: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Operation {
    /// Write the cache contents to the data file.
    Dump,
    /// Read the data file into the cache.
    Load,
    /// Archive the sealed records to the data file.
    Export,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DataType {
    /// Line-delimited JSON, two lines per record.
    Json,
    /// LZ4-compressed binary with a leading record count.
    Object,
}

impl From<DataType> for CodecFormat {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Json => CodecFormat::JsonLines,
            DataType::Object => CodecFormat::Binary,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { ERR_CANT_PARSE_ARGS } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            process::exit(ERR_CANT_INIT);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        error!(error = %e, "operation failed");
        process::exit(ERR_CANT_INIT);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let tool = match &cli.config {
        Some(path) => ToolConfig::from_file(path)?,
        None => ToolConfig::default(),
    };

    let config = TransferConfig::new(&cli.file, cli.data_type.into())
        .with_duplicate_policy(tool.duplicate_policy);

    info!(
        cache = %cli.cache,
        backend = %tool.backend,
        operation = ?cli.operation,
        file = %cli.file.display(),
        "starting pass"
    );

    let report = match tool.backend {
        BackendKind::ReplicatedCache => {
            let adapter = Arc::new(
                ReplicatedCacheAdapter::<TrackingKey, TrackedContent>::new(&cli.cache),
            );
            execute(adapter, cli.operation, config).await?
        }
        BackendKind::ColumnStore => {
            let adapter =
                Arc::new(ColumnStoreAdapter::<TrackingKey, TrackedContent>::new(&cli.cache));
            execute(adapter, cli.operation, config).await?
        }
    };

    // Per-record failures are reported, not fatal.
    if !report.errors.is_empty() {
        warn!(errors = report.errors.len(), "pass finished with record errors");
    }
    info!(
        written = report.written,
        loaded = report.loaded,
        existing = report.existing,
        exported = report.exported,
        "pass complete"
    );
    Ok(())
}

async fn execute<A>(
    adapter: Arc<A>,
    operation: Operation,
    config: TransferConfig,
) -> Result<TransferReport>
where
    A: CacheAdapter<Key = TrackingKey, Value = TrackedContent>,
{
    let engine = TransferEngine::new(adapter, config);
    match operation {
        Operation::Dump => engine.dump().await,
        Operation::Load => engine.load().await,
        Operation::Export => engine.export(&JsonReportArchiver).await,
    }
}
