use affinity_core::{AffinityRun, Backend, EmbeddingCache, ModelConfig, ModelKind};
use affinity_storage::{CsvExporter, DatasetReader, LmdbEmbeddingCache};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CACHE_DIR: &str = "embeddings_cache";

/// Rank reviewers for every submission of a dataset
#[derive(Parser, Debug)]
#[command(name = "affinity")]
#[command(about = "Paper-reviewer affinity scoring", long_about = None)]
struct Args {
    /// Path to the JSON run configuration
    config: PathBuf,

    /// Dataset directory, overrides dataset.directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output CSV, overrides model_params.scores_path
    #[arg(short, long)]
    scores: Option<PathBuf>,

    /// Log level (ignored when RUST_LOG is set)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(builder.with_env_filter(EnvFilter::from_default_env()).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(log_level).finish())?;
    }

    info!("Starting affinity v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ModelConfig::from_path(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if let Some(dir) = args.data_dir {
        config.dataset.directory = Some(dir);
    }
    if let Some(path) = args.scores {
        config.model_params.scores_path = Some(path);
    }
    let engine = config.validate().context("invalid configuration")?;
    info!("Model: {} ({})", config.model, engine.model);

    let dataset_dir = engine
        .dataset_dir
        .clone()
        .context("no dataset directory: set dataset.directory or pass --data-dir")?;
    let scores_path = engine.scores_path.clone().unwrap_or_else(|| {
        let stem = if engine.name.is_empty() { "scores" } else { engine.name.as_str() };
        dataset_dir.join(format!("{}.csv", stem))
    });
    info!("Data directory: {:?}", dataset_dir);
    info!("Scores path: {:?}", scores_path);

    let corpus = DatasetReader::new(&dataset_dir).read()?;

    let cache: Option<Arc<dyn EmbeddingCache>> = if engine.model == ModelKind::Dense {
        let cache_dir = engine
            .cache_dir
            .clone()
            .unwrap_or_else(|| dataset_dir.join(DEFAULT_CACHE_DIR));
        info!("Embedding cache: {:?}", cache_dir);
        Some(Arc::new(LmdbEmbeddingCache::open(&cache_dir)?))
    } else {
        None
    };
    let backend = Backend::from_config(&engine, cache)?;

    let mut run = AffinityRun::new(&corpus);
    run.execute(&backend, &engine)?;
    let mut exporter = CsvExporter::new(&scores_path);
    run.export(&mut exporter)?;

    info!("Done: {} scores written", run.scores().len());
    Ok(())
}
