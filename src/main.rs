//! CLI for building, inspecting, and querying a semantic search index

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use semsearch::persistence::{self, ArtifactPaths};
use semsearch::{
    build_from_corpus, read_corpus, DistanceMetric, EngineCell, EngineHandle, HashingEmbedder,
    Index, IndexLayout, IndexStructure, PartitionParams, SearchEngine, SearchResponse, Settings,
    Vector,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static ENGINE: EngineCell = EngineCell::new();

#[derive(Parser)]
#[command(name = "semsearch")]
#[command(about = "Semantic nearest-neighbor search over a fixed corpus", long_about = None)]
struct Cli {
    /// Config file (defaults to ./semsearch.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index artifact path, overriding the config
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    /// Catalog artifact path, overriding the config
    #[arg(long, global = true)]
    catalog_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum IndexType {
    Flat,
    Partitioned,
}

#[derive(Subcommand)]
enum Commands {
    /// Build index and catalog artifacts from a JSON-lines corpus
    Build {
        /// Corpus file, one {"title", "summary", "vector"?} object per line
        #[arg(long)]
        corpus: PathBuf,
        /// Distance metric (l2, cosine, inner_product)
        #[arg(long)]
        metric: Option<DistanceMetric>,
        /// Index type to build
        #[arg(long, value_enum, default_value = "flat")]
        index: IndexType,
        /// Number of clusters for a partitioned index
        #[arg(long)]
        clusters: Option<usize>,
        /// Default clusters probed per query for a partitioned index
        #[arg(long)]
        nprobe: Option<usize>,
        /// Embedding dimension for items without a precomputed vector
        #[arg(long)]
        dimension: Option<usize>,
    },
    /// Search with a text query
    Search {
        /// Query text
        query: String,
        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
        /// Clusters to probe (partitioned indexes only)
        #[arg(long)]
        nprobe: Option<usize>,
    },
    /// Search with a raw query vector
    SearchVector {
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0")
        vector: String,
        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
        /// Clusters to probe (partitioned indexes only)
        #[arg(long)]
        nprobe: Option<usize>,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the header of the index artifact and check both artifacts
    Inspect,
    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "semsearch=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_engine(settings: &Settings) -> Result<EngineHandle> {
    let engine = ENGINE.get_or_load(|| {
        let embedder = Arc::new(HashingEmbedder::new(settings.embedding_dimension)?);
        SearchEngine::open(settings, embedder)
    })?;
    Ok(engine)
}

fn print_results(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("No results found (index is empty)");
        return;
    }
    println!(
        "Top {} results ({:.3} ms):",
        response.results.len(),
        response.elapsed_seconds() * 1000.0
    );
    for result in &response.results {
        println!(
            "{}. [{}] {} (distance: {:.4})",
            result.rank, result.id, result.payload.title, result.distance
        );
        if !result.payload.summary.is_empty() {
            println!("   {}", result.payload.summary);
        }
    }
}

fn run_build(
    settings: &Settings,
    corpus: PathBuf,
    metric: Option<DistanceMetric>,
    index: IndexType,
    clusters: Option<usize>,
    nprobe: Option<usize>,
    dimension: Option<usize>,
) -> Result<()> {
    let metric = metric.or(settings.metric).unwrap_or(DistanceMetric::Cosine);
    let embedder = HashingEmbedder::new(dimension.unwrap_or(settings.embedding_dimension))?;
    let layout = match index {
        IndexType::Flat => IndexLayout::Flat,
        IndexType::Partitioned => IndexLayout::Partitioned(PartitionParams {
            clusters: clusters.or(settings.build.clusters),
            nprobe: nprobe.or(settings.nprobe),
            max_iterations: settings.build.kmeans_iterations,
            seed: settings.build.seed,
        }),
    };

    let records = read_corpus(&corpus)
        .with_context(|| format!("reading corpus {}", corpus.display()))?;
    let (index, catalog) = build_from_corpus(records, &embedder, metric, &layout)?;
    persistence::write_artifacts(&settings.artifacts, &index, &catalog)?;

    println!(
        "Built {} index: {} vectors, dimension {}, metric {}",
        index.kind(),
        index.len(),
        index.dimension(),
        index.metric()
    );
    if let IndexStructure::Partitioned(p) = &index {
        println!("  partitions: {} (nprobe {})", p.num_partitions(), p.nprobe());
    }
    println!("  index:   {}", settings.artifacts.index_path.display());
    println!("  catalog: {}", settings.artifacts.catalog_path.display());
    Ok(())
}

fn run_inspect(paths: &ArtifactPaths) -> Result<()> {
    let header = persistence::read_header(&paths.index_path)
        .with_context(|| format!("reading {}", paths.index_path.display()))?;
    println!("Index artifact: {}", paths.index_path.display());
    println!("  format version: {}", header.version);
    println!("  kind:           {}", header.kind);
    println!("  metric:         {}", header.metric);
    println!("  dimension:      {}", header.dimension);
    println!("  vectors:        {}", header.count);
    println!("  checksum:       {:08x}", header.checksum);

    let (index, catalog) = persistence::read_artifacts(paths)?;
    println!("Catalog artifact: {}", paths.catalog_path.display());
    println!("  entries:        {}", catalog.len());
    if let IndexStructure::Partitioned(p) = &index {
        let sizes = p.partition_sizes();
        let largest = sizes.iter().copied().max().unwrap_or(0);
        let smallest = sizes.iter().copied().min().unwrap_or(0);
        println!(
            "  partitions:     {} (sizes {}..={}, nprobe {})",
            p.num_partitions(),
            smallest,
            largest,
            p.nprobe()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = cli.index_path {
        settings.artifacts.index_path = path;
    }
    if let Some(path) = cli.catalog_path {
        settings.artifacts.catalog_path = path;
    }

    match cli.command {
        Commands::Build {
            corpus,
            metric,
            index,
            clusters,
            nprobe,
            dimension,
        } => run_build(&settings, corpus, metric, index, clusters, nprobe, dimension)?,
        Commands::Search { query, k, nprobe } => {
            if nprobe.is_some() {
                settings.nprobe = nprobe;
            }
            let engine = load_engine(&settings)?;
            let response = match k {
                Some(k) => engine.search(&query, k)?,
                None => engine.search_default(&query)?,
            };
            print_results(&response);
        }
        Commands::SearchVector { vector, k, nprobe } => {
            if nprobe.is_some() {
                settings.nprobe = nprobe;
            }
            let query: Vector = vector.parse()?;
            let engine = load_engine(&settings)?;
            let response = engine.search_vector(&query, k.unwrap_or(engine.default_k()))?;
            print_results(&response);
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.server.addr.clone());
            let engine = load_engine(&settings)?;
            semsearch::server::serve(&addr, engine).await?;
        }
        Commands::Inspect => run_inspect(&settings.artifacts)?,
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&settings).context("rendering configuration")?;
            print!("{rendered}");
        }
    }
    Ok(())
}
