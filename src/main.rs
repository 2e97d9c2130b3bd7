//! # Chat Stream Gateway
//!
//! Streaming chat gateway in front of OpenAI, Google Gemini, Anthropic and
//! Perplexity. Callers post one message and get the answer back as a stream
//! of `data: {"content": "..."}` records, whatever the provider's own
//! streaming format.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! chat-stream-gateway
//!
//! # Start with custom config file
//! chat-stream-gateway --config /path/to/config.yaml
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 OPENAI_API_KEY=sk-... chat-stream-gateway
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gateway_config::{ConfigLoader, GatewayConfig, LogFormat, ProviderSettings};
use gateway_core::ProviderKind;
use gateway_providers::{AdapterConfig, AdapterRegistry};
use gateway_server::{AppState, Server};
use gateway_telemetry::{init_logging, LoggingConfig, Telemetry};
use tracing::{error, info, warn};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "chat-stream-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (YAML or TOML)
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

/// Application entry point
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Gateway failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().await.context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);

    let logging = LoggingConfig::new(env!("CARGO_PKG_NAME"))
        .with_log_level(config.logging.level.clone())
        .with_json(matches!(config.logging.format, LogFormat::Json));
    init_logging(&logging).context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting chat stream gateway"
    );

    let telemetry = Telemetry::new().context("Failed to initialize metrics")?;
    let registry = create_adapter_registry(&config)?;
    let resolver = config.credential_resolver();

    let configured = resolver.configured_providers();
    for kind in ProviderKind::ALL {
        if !configured.contains(&kind) {
            warn!(
                provider = kind.as_str(),
                "No default API key configured, callers must supply their own"
            );
        }
    }
    info!(providers = registry.len(), "Provider adapters initialized");

    let settings = config.server.clone();
    let state = AppState::builder()
        .config(config)
        .registry(registry)
        .resolver(resolver)
        .telemetry(telemetry)
        .build()?;

    Server::new(settings, state)
        .run()
        .await
        .context("Server error")?;

    Ok(())
}

/// Command line flags win over file and environment
fn apply_cli_overrides(config: &mut GatewayConfig, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
}

/// Create one adapter per provider from configuration
fn create_adapter_registry(config: &GatewayConfig) -> Result<AdapterRegistry> {
    let configs = ProviderKind::ALL.map(|kind| adapter_config(kind, config.providers.get(kind)));
    AdapterRegistry::from_configs(configs).context("Failed to build provider adapters")
}

/// Overlay configured settings on the provider's built-in defaults
fn adapter_config(kind: ProviderKind, settings: &ProviderSettings) -> AdapterConfig {
    let mut adapter = AdapterConfig::for_provider(kind);

    if let Some(base_url) = &settings.base_url {
        adapter = adapter.with_base_url(base_url.as_str());
    }
    if let Some(model) = &settings.model {
        adapter = adapter.with_model(model.as_str());
    }
    if let Some(max_tokens) = settings.max_tokens {
        adapter = adapter.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = settings.temperature {
        adapter = adapter.with_temperature(temperature);
    }
    if let Some(timeout) = settings.connect_timeout {
        adapter = adapter.with_connect_timeout(timeout);
    }
    if let Some(timeout) = settings.timeout {
        adapter = adapter.with_timeout(timeout);
    }

    adapter
}
