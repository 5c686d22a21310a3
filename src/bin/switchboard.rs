// Switchboard CLI - route, ask or chat against the expert catalog

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use switchboard::{A2aGateway, Catalog, Orchestrator, OutputItem, Request, ValidationMode};

#[derive(Parser)]
#[command(name = "switchboard", about = "Routes requests to expert agent services")]
struct Cli {
    /// Path to the expert catalog
    #[arg(long, default_value = "config/experts.toml")]
    catalog: PathBuf,

    /// Override the catalog's fallback expert
    #[arg(long)]
    fallback: Option<String>,

    /// Skip invalid catalog entries instead of rejecting the whole file
    #[arg(long)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the routing decision for a query without delegating
    Route {
        query: String,

        /// Route to this expert explicitly, bypassing the rules
        #[arg(long)]
        target: Option<String>,
    },

    /// Delegate a query single-shot and print the final answer
    Ask {
        query: String,

        #[arg(long)]
        target: Option<String>,
    },

    /// Delegate a query with streaming output (status on stderr)
    Chat {
        query: String,

        #[arg(long)]
        target: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mode = if cli.lenient {
        ValidationMode::Lenient
    } else {
        ValidationMode::Strict
    };

    let catalog = Arc::new(Catalog::load(&cli.catalog, mode)?);
    if let Some(fallback) = &cli.fallback {
        catalog.override_fallback(fallback.clone());
    }
    let orchestrator = Orchestrator::new(catalog, Arc::new(A2aGateway::new()));

    match cli.command {
        Command::Route { query, target } => {
            let decision = orchestrator.route(&query, target.as_deref());
            println!("🎯 Selected: {} ({:.2})", decision.selected, decision.confidence);
            println!("📋 Reason: {}", decision.reason);
            if !decision.fallbacks.is_empty() {
                println!("🔁 Fallbacks: {}", decision.fallbacks.join(", "));
            }
        }

        Command::Ask { query, target } => {
            let mut request = Request::new(query);
            if let Some(target) = target {
                request = request.with_target(target);
            }
            let answer = orchestrator.ask(request).await?;
            println!("{answer}");
        }

        Command::Chat { query, target } => {
            let mut request = Request::new(query);
            if let Some(target) = target {
                request = request.with_target(target);
            }

            let mut stream = orchestrator.stream(request).await?;
            while let Some(item) = stream.next().await {
                match item {
                    OutputItem::Status(text) => eprintln!("⏳ {text}"),
                    OutputItem::Trajectory(block) => println!("{block}"),
                    OutputItem::Text(chunk) => {
                        print!("{chunk}");
                        std::io::stdout().flush()?;
                    }
                    OutputItem::Error(message) => {
                        eprintln!("{message}");
                        break;
                    }
                }
            }
            println!();
        }
    }

    Ok(())
}
