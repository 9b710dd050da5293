//! # Storefront Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Browser ───► HTTP (5000) ───► Handlers ───► SQLite                     │
//! │                    │               │                                    │
//! │                    ▼               ▼                                    │
//! │                /uploads         Stripe                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use jewel_db::{Database, DbConfig};
use jewel_storefront::{bootstrap_admin, init_tracing, serve, AppState, StorefrontConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Jewel Storefront server...");

    let config = StorefrontConfig::load().context("Invalid configuration")?;
    info!(
        port = config.port,
        database = %config.database_path.display(),
        uploads = %config.uploads_dir.display(),
        payments = config.stripe_secret_key.is_some(),
        "Configuration loaded"
    );

    if let Some(parent) = config.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .with_context(|| format!("Cannot create {}", config.uploads_dir.display()))?;

    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    if config.stripe_secret_key.is_none() {
        warn!("STRIPE_SECRET_KEY not set, card payments disabled");
    }

    let bind = config.bind_address();
    let state = AppState::new(db.clone(), config);

    if bootstrap_admin(&state)
        .await
        .context("Admin bootstrap failed")?
        .is_none()
    {
        info!("No ADMIN_EMAIL configured, skipping admin bootstrap");
    }

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Cannot bind {}", bind))?;

    serve(listener, state).await?;

    db.close().await;
    Ok(())
}
