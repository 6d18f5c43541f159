//! Route configuration for the API endpoints
//!
//! This module configures all the HTTP routes and their corresponding handlers.

use super::handlers;
use actix_web::{web, HttpResponse};

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Prediction endpoints
        .route(
            "/v1/models/{name}/predict",
            web::post().to(handlers::predict),
        )
        .route(
            "/predict_eligibility",
            web::post().to(handlers::predict_eligibility),
        )
        .route("/recommend_job", web::post().to(handlers::recommend_job))
        .route("/v1/models", web::get().to(handlers::list_models))

        // Health and monitoring endpoints
        .route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health_check))
        .route("/ping", web::get().to(ping))
        .route("/metrics", web::get().to(handlers::metrics))

        // Catch-all for unmatched routes
        .default_service(web::route().to(handlers::not_found));
}

/// Simple ping endpoint for basic connectivity testing
async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "pong",
        "timestamp": chrono::Utc::now().timestamp(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
