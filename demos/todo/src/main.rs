//! Todo HTTP server.

use todo_app::{ApplicationBuilder, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,todo_app=debug,tidy_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        environment = %config.environment,
        address = %config.bind_address(),
        metrics = config.metrics_enabled,
        "Configuration loaded"
    );

    ApplicationBuilder::new(config).build().await?.run().await?;
    Ok(())
}
