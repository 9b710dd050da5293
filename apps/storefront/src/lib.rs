//! # Jewel Storefront
//!
//! HTTP JSON API behind a jewelry retailer's web shop and counter.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Storefront Server                              │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Accounts      │  │  Catalog       │  │  Checkout                  ││
//! │  │                │  │                │  │                            ││
//! │  │ • login        │  │ • list / get   │  │ • cart quote               ││
//! │  │ • register     │  │ • create (img) │  │ • payment intent (Stripe)  ││
//! │  │ • me           │  │ • update / del │  │ • orders (ORD/...)         ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌──────────────────────────────────────────────┐  │
//! │  │  Counter bills │  │                Infrastructure                 │  │
//! │  │                │  │                                               │  │
//! │  │ • create (PJ/) │  │  SQLite (jewel-db)   JWT (admin/guest)        │  │
//! │  │ • list/search  │  │  /uploads (static)   printpdf invoices        │  │
//! │  │ • PDF invoice  │  │                                               │  │
//! │  └────────────────┘  └──────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config`]):
//! - `PORT` - listen port (default: 5000)
//! - `DATABASE_PATH` - SQLite file (default: ./data/storefront.db)
//! - `JWT_SECRET` - token signing secret
//! - `UPLOADS_DIR` - product images (default: ./uploads)
//! - `STRIPE_SECRET_KEY` - enables card payments
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD` - bootstrap admin account
//! - `RUST_LOG` - log filter

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod invoice;
pub mod payments;
pub mod routes;
pub mod state;
pub mod uploads;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use jewel_core::User;

// Re-exports
pub use config::StorefrontConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

const ADMIN_DISPLAY_NAME: &str = "Admin";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jewel_storefront=debug,tower_http=info,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Creates or refreshes the configured admin account.
///
/// Returns `None` when no bootstrap credentials are configured.
pub async fn bootstrap_admin(state: &AppState) -> ApiResult<Option<User>> {
    let Some(admin) = state.config.admin.as_ref() else {
        return Ok(None);
    };

    handlers::auth::validate_admin_bootstrap(&admin.email, &admin.password)?;
    let hash = handlers::auth::hash_in_background(admin.password.clone()).await?;

    let user = state
        .db
        .users()
        .upsert_admin(ADMIN_DISPLAY_NAME, &admin.email, &hash)
        .await?;

    info!(user_id = %user.id, email = %user.email, "Admin account ready");
    Ok(Some(user))
}

/// Serves the API on `listener` until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let router = create_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Storefront listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
