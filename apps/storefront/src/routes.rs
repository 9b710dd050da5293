//! Routing table and middleware.
//!
//! ## Routes
//! | Method | Path                            | Auth  |
//! |--------|---------------------------------|-------|
//! | GET    | /api/health                     | -     |
//! | POST   | /api/auth/login                 | -     |
//! | POST   | /api/auth/register              | -     |
//! | GET    | /api/auth/me                    | token |
//! | GET    | /api/products                   | -     |
//! | POST   | /api/products                   | admin |
//! | GET    | /api/products/{id}              | -     |
//! | PUT    | /api/products/{id}              | admin |
//! | DELETE | /api/products/{id}              | admin |
//! | POST   | /api/cart/quote                 | -     |
//! | GET    | /api/bills                      | admin |
//! | POST   | /api/bills                      | admin |
//! | GET    | /api/bills/{id}                 | admin |
//! | GET    | /api/bills/{id}/pdf             | admin |
//! | POST   | /api/create-payment-intent      | -     |
//! | POST   | /api/orders                     | -     |
//! | GET    | /uploads/*                      | -     |

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::uploads::UPLOADS_URL_PREFIX;

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.upload_body_limit());

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        // Accounts
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/auth/me", get(handlers::me))
        // Catalog
        .route(
            "/products",
            get(handlers::list_products)
                .post(handlers::create_product)
                .layer(upload_limit.clone()),
        )
        .route(
            "/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product)
                .layer(upload_limit),
        )
        // Checkout
        .route("/cart/quote", post(handlers::quote_cart))
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/orders", post(handlers::create_order))
        // Counter billing
        .route("/bills", get(handlers::list_bills).post(handlers::create_bill))
        .route("/bills/{id}", get(handlers::get_bill))
        .route("/bills/{id}/pdf", get(handlers::get_bill_pdf));

    // Images are embedded by other origins, so every response carries the header
    let uploads = Router::new()
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(&state.config.uploads_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ));

    Router::new()
        .nest("/api", api)
        .merge(uploads)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state)
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
