//! REST API layer
//!
//! This module provides the HTTP surface of the server: the generic predict
//! endpoint, the screening and recommendation endpoints, and the health and
//! metrics endpoints. Shutdown is coordinated here so the listener drains
//! in-flight requests before the process exits.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::inference::{InferenceEngine, RequestId};
use crate::lifecycle::Lifecycle;
use crate::metrics::MetricsCollector;
use crate::models::ModelStore;
use actix_cors::Cors;
use actix_web::{web, App, HttpMessage, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{info, warn};

/// API server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: InferenceEngine,
    pub store: Arc<ModelStore>,
    pub lifecycle: Arc<Lifecycle>,
    pub metrics: Arc<MetricsCollector>,
    pub config: Config,
}

/// JSON extractor configuration mapping malformed bodies to the error format,
/// keeping the correlation id the logging middleware already assigned
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        let mut body = EngineError::validation(format!("Invalid JSON body: {}", err))
            .to_error_response();
        if let Some(id) = req.extensions().get::<RequestId>() {
            body = body.with_request_id(id.to_string());
        }
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(body),
        )
        .into()
    })
}

/// Start the API server and block until shutdown completes
pub async fn start_server(
    config: Config,
    engine: InferenceEngine,
    store: Arc<ModelStore>,
    lifecycle: Arc<Lifecycle>,
    metrics: Arc<MetricsCollector>,
) -> Result<()> {
    let bind_address = config.server_address();
    let grace = config.grace_period();
    info!("Starting API server on {}", bind_address);

    let app_state = AppState {
        engine: engine.clone(),
        store: Arc::clone(&store),
        lifecycle: Arc::clone(&lifecycle),
        metrics: Arc::clone(&metrics),
        config: config.clone(),
    };

    let server = HttpServer::new(move || {
        let cors = if app_state.config.server.enable_cors {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        } else {
            Cors::default()
        };
        let logging =
            middleware::logging::RequestLogging::new(app_state.config.logging.log_requests);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(json_config())
            .wrap(cors)
            .wrap(logging)
            .configure(routes::configure_routes)
    })
    .bind(&bind_address)?
    .run();

    // The listener is bound, so requests can be accepted now
    lifecycle.set_ready();
    info!("Server listening on {}", bind_address);

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal, draining...");
        lifecycle.begin_drain();

        if !engine.drain(grace).await {
            warn!("Grace period expired with requests still in flight");
        }
        lifecycle.wait_idle(grace).await;

        handle.stop(true).await;
    });

    server.await?;

    Ok(())
}

pub use handlers::*;
pub use types::*;
