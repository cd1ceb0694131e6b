use anyhow::Result;
use identity_operator::sync;
use identity_operator::ControllerConfig;
use kube::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "/config/config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting identity operator");

    let config = ControllerConfig::from_mounted_file(CONFIG_PATH);
    config.validate()?;

    let client = Client::try_default().await?;
    sync::run(client, config).await?;

    Ok(())
}
