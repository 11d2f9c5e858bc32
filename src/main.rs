//! registry-mirror webhook server

use clap::Parser;

use mirror_common::telemetry::{init_telemetry, TelemetryConfig};
use registry_mirror::config::WebhookServerConfig;
use registry_mirror::server::start_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let config = WebhookServerConfig::parse();

    init_telemetry(TelemetryConfig::default())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        namespace = %config.webhook_config_namespace,
        source_cluster = config.source_cluster,
        "Starting registry-mirror webhook server"
    );

    start_server(config)
        .await
        .map_err(|e| anyhow::anyhow!("Webhook server failed: {}", e))
}
