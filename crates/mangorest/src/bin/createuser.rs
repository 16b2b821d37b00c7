//! Creates a MangoREST user.
//!
//! Run with:
//! ```
//! MANGOREST_PASSWORD=... cargo run -p mangorest --bin createuser -- neeban
//! ```

use anyhow::Context;
use clap::Parser;
use mangorest::{auth, database::Database, models::CreateUserRequest};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "createuser", about = "Create a MangoREST user.")]
struct Args {
    username: String,

    #[arg(long, env = "MANGOREST_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, env = "MONGODB_URI")]
    uri: String,

    #[arg(long, env = "DB_SCHEMA")]
    database: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let db = Database::connect(&args.uri, &args.database)
        .await
        .context("Connecting to MongoDB failed")?;

    auth::create_user(
        &db,
        CreateUserRequest {
            username: args.username.clone(),
            password: args.password,
        },
    )
    .await?;

    println!("MangoREST user created: {}", args.username);
    Ok(())
}
