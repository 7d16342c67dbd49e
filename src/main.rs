use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slovo_rs::config::Config;
use slovo_rs::pipeline::Pipeline;
use slovo_rs::server;
use slovo_rs::types::AnalysisRequest;

#[derive(Debug, Parser)]
#[command(name = "slovo", version, about = "Resolve a Russian word in context")]
struct Cli {
    /// Configuration file (defaults to ./slovo.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a single word and print the result as JSON
    Analyze {
        #[arg(long)]
        sentence: String,
        #[arg(long)]
        word: String,
    },
    /// Answer JSON-lines requests from stdin on stdout
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries results
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default(),
    };
    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    match cli.command {
        Command::Analyze { sentence, word } => {
            let outcome = pipeline.resolve(&AnalysisRequest::new(sentence, word)).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Serve => {
            tracing::info!("Serving requests on stdin...");
            server::serve(pipeline, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
