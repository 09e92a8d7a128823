//! ai-relay-server: serve the relay on a single POST route
//!
//! Usage:
//!   ai-relay-server [--config <path>] [--bind <addr>] [--path <route>]
//!
//! Without `--config`, everything comes from the environment.

use ai_relay::{Dispatcher, RelayConfig};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    bind: Option<String>,
    path: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut out = Args::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} expects a value"))
        };
        match arg.as_str() {
            "--config" | "-c" => out.config = Some(value("--config")?),
            "--bind" | "-b" => out.bind = Some(value("--bind")?),
            "--path" => out.path = Some(value("--path")?),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(out)
}

fn print_usage() {
    println!(
        r#"ai-relay-server: single-endpoint AI relay

USAGE:
    ai-relay-server [--config <path>] [--bind <addr>] [--path <route>]

OPTIONS:
    -c, --config <path>     YAML configuration file
    -b, --bind <addr>       Listen address (default 127.0.0.1:3000)
        --path <route>      Route path (default /api/ai)
    -h, --help              Show this help message
    -V, --version           Show version information

ENVIRONMENT:
    OPENAI_API_KEY, ELEVENLABS_API_KEY, AI_RELAY_ALLOWED_ACTIONS,
    AI_RELAY_MALFORMED_FRAMES, AI_RELAY_BIND, AI_RELAY_PATH, RUST_LOG"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    if argv.iter().any(|a| a == "--version" || a == "-V") {
        println!("ai-relay-server {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::from_env()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(path) = args.path {
        config.server.path = path;
    }
    info!(config = ?config, "starting ai-relay-server");

    let server_config = config.server.clone();
    let dispatcher = Dispatcher::builder().config(config).build()?;
    let app = ai_relay::server::router(dispatcher, &server_config.path);

    let listener = tokio::net::TcpListener::bind(&server_config.bind).await?;
    info!(
        "Listening on http://{}{}",
        server_config.bind, server_config.path
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
