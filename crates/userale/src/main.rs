mod session;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use userale_core::api::Userale;
use userale_core::config::{Config, ConfigLoader, ConfigPatch};
use userale_core::context::Context;
use userale_core::handlers::Dispatcher;
use userale_core::sender::{HttpTransport, UnloadFlush};
use userale_ws::SocketTransport;

#[derive(Parser)]
#[command(name = "userale", version, about = "UserALE interaction log collector")]
struct Args {
    /// YAML configuration file (defaults to ./userale.yaml or ~/.userale/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded session file through the collector
    Replay {
        /// Session file, one JSON step per line
        file: PathBuf,
        /// Collector endpoint
        #[arg(long)]
        url: Option<String>,
        /// Minimum buffered logs for an interval flush
        #[arg(long)]
        threshold: Option<usize>,
        /// Milliseconds between interval flushes
        #[arg(long)]
        interval: Option<u64>,
        /// Emit batches over a WebSocket instead of HTTP
        #[arg(long)]
        sockets: bool,
        /// Socket channel name
        #[arg(long)]
        channel: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

async fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries the replay summary.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_ref()).await?;

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Replay {
            file,
            url,
            threshold,
            interval,
            sockets,
            channel,
        } => {
            config.apply(
                ConfigPatch {
                    url,
                    log_count_threshold: threshold,
                    transmit_interval: interval,
                    use_sockets: sockets.then_some(true),
                    socket_channel: channel,
                    ..Default::default()
                },
                None,
            );

            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read session {}", file.display()))?;
            let steps = session::parse_session(&text)?;
            info!("Replaying {} steps from {}", steps.len(), file.display());

            let ctx = Context::new(config);
            let socket = ctx
                .config
                .read(|c| c.use_sockets)
                .then(|| Arc::new(SocketTransport::new(ctx.config.clone())));
            let userale = match &socket {
                Some(socket) => Userale::from_context(ctx.clone(), socket.clone()),
                // The process exits after shutdown, so the last batch is sent
                // inline rather than beaconed.
                None => Userale::from_context(
                    ctx.clone(),
                    Arc::new(HttpTransport::new(ctx.config.clone()).without_beacon()),
                ),
            };

            let dispatcher = Dispatcher::new();
            let stats = session::replay(&userale, &dispatcher, &steps).await;
            let flush = userale.shutdown().await;
            if let Some(socket) = socket {
                socket.close().await;
            }

            println!(
                "Replayed {} events ({} handled), {} custom logs ({} rejected)",
                stats.events, stats.listeners, stats.logs_accepted, stats.logs_rejected
            );
            match flush {
                UnloadFlush::Empty => println!("Nothing left to flush"),
                UnloadFlush::Beaconed { logs } => println!("Beaconed {} remaining logs", logs),
                UnloadFlush::Sent(delivery) => println!("Final flush: {:?}", delivery),
            }
        }
    }

    Ok(())
}
