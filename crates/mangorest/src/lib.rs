pub mod auth;
pub mod config;
pub mod database;
pub mod documents;
pub mod errors;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    auth::login,
    config::ResourceMap,
    database::Database,
    handlers::{
        create_document, delete_document, get_collection, get_document, health_check,
        update_document,
    },
};

pub fn create_router(db: Database, resources: ResourceMap) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    let api = Router::new()
        .route("/{resource}", get(get_collection).post(create_document))
        .route(
            "/{resource}/{oid}",
            get(get_document)
                .put(update_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .layer(cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .nest("/api", api)
        .layer(Extension(db))
        .layer(Extension(Arc::new(resources)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

pub async fn run_server(db: Database, resources: ResourceMap, port: u16) -> anyhow::Result<()> {
    let app = create_router(db, resources);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!("Server running on http://0.0.0.0:{port}");

    axum::serve(listener, app).await?;

    Ok(())
}
