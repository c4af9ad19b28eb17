use std::net::SocketAddr;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use anyhow::anyhow;

use waav_relay::{ServerConfig, build_router, state::AppState};

/// WaaV Relay - Telephony to realtime speech AI bridge
#[derive(Parser, Debug)]
#[command(name = "waav-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate configuration, then exit
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(config_path) => {
            println!("Loading configuration from {}", config_path.display());
            ServerConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))
        }
        None => ServerConfig::from_env().map_err(|e| anyhow!(e.to_string())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    if let Some(Commands::CheckConfig) = cli.command {
        println!(
            "Configuration OK: listening on {} (TLS {}), model {}, voice {}",
            config.address(),
            if config.is_tls_enabled() { "on" } else { "off" },
            config.realtime_model,
            config.realtime_voice
        );
        return Ok(());
    }

    let address = config.address();
    let tls_config = config.tls.clone();
    info!(
        model = %config.realtime_model,
        voice = %config.realtime_voice,
        greet_first = config.greet_first,
        max_pending_marks = config.max_pending_marks,
        mark_overflow_policy = %config.mark_overflow_policy,
        "Relay configured"
    );
    println!("Starting server on {address}");

    let app_state = AppState::new(config);
    let app = build_router(app_state);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    // Start server with or without TLS
    if let Some(tls) = tls_config {
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to load TLS certificates from {} and {}: {}",
                    tls.cert_path.display(),
                    tls.key_path.display(),
                    e
                )
            })?;

        println!("Server listening on https://{} (TLS enabled)", socket_addr);

        axum_server::bind_rustls(socket_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| anyhow!("TLS server error: {}", e))?;
    } else {
        println!("Server listening on http://{}", socket_addr);

        let listener = TcpListener::bind(&socket_addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
