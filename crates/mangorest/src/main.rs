use anyhow::Context;
use mangorest::{config::Settings, database::Database, run_server};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let settings = Settings::from_env()?;

    tracing::info!("Connecting to database {}", settings.database);

    let db = Database::connect(&settings.mongodb_uri, &settings.database)
        .await
        .context("Connecting to MongoDB failed")?;

    if settings.resources.is_empty() {
        tracing::warn!("COLLECTION is empty, no collection is exposed");
    } else {
        tracing::info!("Exposing collections {:?}", settings.resources.collections());
    }

    run_server(db, settings.resources, settings.port).await
}
