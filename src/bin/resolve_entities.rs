//! CLI for resolving entities
//!
//! Usage:
//!   resolve_entities fetch "book a table for 2 tomorrow" -r 1641018600000
//!   resolve_entities fetch "cancel it" "cancel eat" -i _cancel_ -r 1641018600000
//!   resolve_entities replay recorded.json -r 1641018600000

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entity_engine::{
    annotation::AnnotationClient, AnnotationRequest, ConfigLoader, DucklingClient, EntityEngine,
    StaticClient,
};

#[derive(Parser)]
#[command(name = "resolve_entities")]
#[command(about = "Resolve typed entities from annotation records across transcription alternatives")]
struct Args {
    /// Config file (defaults to $ENTITY_ENGINE_CONFIG, then config/entity_engine.yaml)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Reference time as unix milliseconds
    #[arg(short = 'r', long, env = "ENTITY_ENGINE_REFERENCE_TIME")]
    reference_time: Option<i64>,

    /// Detected intent name, used to pick the cast direction
    #[arg(short = 'i', long)]
    intent: Option<String>,

    /// Print rejected records and timed out alternatives as well
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate texts with the configured annotation service, then resolve
    Fetch {
        /// One text per transcription alternative
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Resolve a recorded payload: a JSON list of `{text, records}` objects
    Replay { path: PathBuf },
}

#[derive(serde::Deserialize)]
struct RecordedAlternative {
    text: String,
    records: Vec<serde_json::Value>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entity_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new(path),
        None => ConfigLoader::from_env(),
    };
    let config = loader.load()?;
    let ctx = config.context(args.reference_time, args.intent.as_deref());

    let engine = EntityEngine::new();
    let resolution = match args.command {
        Command::Fetch { texts } => {
            let client = DucklingClient::new(
                &config.annotation_url,
                Duration::from_millis(config.timeout_ms),
            )?;
            let request = AnnotationRequest::new(texts, &ctx);
            engine.extract(&client, &request, &ctx).await?
        }
        Command::Replay { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let recorded: Vec<RecordedAlternative> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;

            let (texts, responses): (Vec<_>, Vec<_>) = recorded
                .into_iter()
                .map(|alternative| (alternative.text, alternative.records))
                .unzip();
            let client = StaticClient::new(responses);
            let request = AnnotationRequest::new(texts, &ctx);
            engine
                .extract(&client as &dyn AnnotationClient, &request, &ctx)
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&resolution.entities)?);

    if args.verbose {
        for index in &resolution.timed_out {
            eprintln!("alternative {index} timed out");
        }
        for rejected in &resolution.rejected {
            eprintln!(
                "rejected alternative {} record {}: {}",
                rejected.alternative_index, rejected.record_index, rejected.error
            );
        }
    }
    Ok(())
}
