use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{seed_demo_corpus, serve};
use common::config::get_config;
use common::model::{ContextRequest, PrivacyLevel};
use orchestrator::Orchestrator;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragctx", about = "RAG context orchestrator demo CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs a single query against an in-memory demo corpus and prints the response.
    Query {
        query: String,
        #[arg(long, default_value_t = 10)]
        max_chunks: usize,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long, value_enum, default_value = "public")]
        privacy_level: CliPrivacyLevel,
    },
    /// Runs an HTTP server exposing liveness/readiness probes.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliPrivacyLevel {
    Public,
    Private,
    Enterprise,
    Restricted,
}

impl From<CliPrivacyLevel> for PrivacyLevel {
    fn from(level: CliPrivacyLevel) -> Self {
        match level {
            CliPrivacyLevel::Public => PrivacyLevel::Public,
            CliPrivacyLevel::Private => PrivacyLevel::Private,
            CliPrivacyLevel::Enterprise => PrivacyLevel::Enterprise,
            CliPrivacyLevel::Restricted => PrivacyLevel::Restricted,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = get_config()?;

    match cli.command {
        Command::Query {
            query,
            max_chunks,
            max_tokens,
            privacy_level,
        } => {
            let orchestrator = Orchestrator::new(config);
            seed_demo_corpus(&orchestrator).await;

            let mut request = ContextRequest::new(query)
                .with_max_chunks(max_chunks)
                .with_privacy_level(privacy_level.into());
            if let Some(max_tokens) = max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            match orchestrator.get_context(request).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(err) => {
                    eprintln!("get_context failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Command::Serve { port } => {
            let orchestrator = Arc::new(Orchestrator::new(config));
            seed_demo_corpus(&orchestrator).await;
            serve::run(orchestrator, port).await?;
        }
    }

    Ok(())
}
