use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkthrough_finder::server::handlers::AnalyzeResponse;
use walkthrough_finder::server::{self, AppState};
use walkthrough_finder::{log_progress, FinderConfig, MediaType, ResponseSchema};

#[derive(Parser)]
#[command(name = "walkthrough-finder", version, about = "Find walkthrough videos for a game screenshot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        #[arg(long, env = "HOST")]
        host: Option<String>,
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Analyze one screenshot from disk and print the JSON result
    Analyze {
        path: PathBuf,
        /// mission, flat or auto
        #[arg(long)]
        schema: Option<ResponseSchema>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walkthrough_finder=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = FinderConfig::from_env()?;

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Analyze { path, schema } => {
            if let Some(schema) = schema {
                config.vision.schema = schema;
            }
            analyze_file(config, path).await
        }
    }
}

async fn serve(config: FinderConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let mut app = server::router(state);
    if let Some(cors) = server::cors_layer(&config.server.cors_origins) {
        app = app.layer(cors);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting server on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn analyze_file(config: FinderConfig, path: PathBuf) -> anyhow::Result<()> {
    let media_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaType::from_extension)
        .with_context(|| format!("{} is not a PNG, JPG, GIF or WebP file", path.display()))?;
    let image = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let state = AppState::from_config(&config)?;
    let request = server::handlers::validate_upload(
        image,
        media_type.as_str(),
        state.max_image_bytes,
    )?;

    let outcome = state.controller().submit(request, &log_progress).await?;
    let response = AnalyzeResponse::from(outcome);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
