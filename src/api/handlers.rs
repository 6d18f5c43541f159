//! HTTP request handlers for API endpoints
//!
//! This module contains the actual handler functions that process HTTP requests
//! and return appropriate responses for each endpoint.

use super::types::*;
use super::AppState;
use crate::error::EngineError;
use crate::inference::{InferenceRequest, RequestId};
use crate::lifecycle::LifecycleState;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Result as ActixResult};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{error, info, warn};

/// Model served by POST /predict_eligibility
pub const ELIGIBILITY_MODEL: &str = "eligibility_classifier";

/// Model served by POST /recommend_job
pub const RECOMMENDER_MODEL: &str = "job_recommender";

/// Correlation id assigned by the logging middleware
fn request_id_of(req: &HttpRequest) -> RequestId {
    req.extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_default()
}

/// Outcome label recorded for a failed request
fn outcome_of(error: &EngineError) -> &'static str {
    match error {
        EngineError::Validation { .. } | EngineError::SchemaMismatch { .. } => "invalid",
        EngineError::ModelNotFound { .. } => "not_found",
        EngineError::Busy { .. } | EngineError::NotReady { .. } => "rejected",
        EngineError::Timeout { .. } => "timeout",
        _ => "error",
    }
}

/// Error body with the correlation id attached, at the error's status code
fn error_response(
    data: &AppState,
    model: &str,
    started: Instant,
    request_id: &RequestId,
    error: EngineError,
) -> HttpResponse {
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    data.metrics
        .observe_request(model, outcome_of(&error), latency_ms);

    let body = error
        .to_error_response()
        .with_request_id(request_id.to_string());
    HttpResponse::build(error.status_code()).json(body)
}

/// Shared submit path: lifecycle gate, schema check, engine round trip
async fn submit(
    data: &AppState,
    request_id: RequestId,
    model_name: &str,
    payload: Map<String, Value>,
) -> crate::error::Result<crate::inference::InferenceResponse> {
    data.lifecycle.check_accepting()?;
    let _guard = data.lifecycle.track();

    let model = data.store.get(model_name)?;
    model.check_input(&payload)?;

    let request = InferenceRequest::new(model_name, payload).with_id(request_id);
    data.engine.infer(request).await
}

/// Handler for POST /v1/models/{name}/predict
pub async fn predict(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<PredictRequest>,
) -> ActixResult<HttpResponse> {
    let model_name = path.into_inner();
    let request_id = request_id_of(&req);
    let started = Instant::now();

    info!("Processing predict request for model: {}", model_name);

    if let Err(e) = crate::utils::validate_model_name(&model_name) {
        warn!("Invalid model name in request {}: {}", request_id, e);
        return Ok(error_response(&data, &model_name, started, &request_id, e));
    }

    match submit(&data, request_id.clone(), &model_name, request.into_inner().inputs).await {
        Ok(response) => {
            data.metrics
                .observe_request(&model_name, "success", response.latency_ms as f64);
            Ok(HttpResponse::Ok().json(PredictResponse::from(response)))
        }
        Err(e) => {
            error!("Predict failed for request {}: {}", request_id, e);
            Ok(error_response(&data, &model_name, started, &request_id, e))
        }
    }
}

/// Handler for POST /predict_eligibility
pub async fn predict_eligibility(
    req: HttpRequest,
    data: web::Data<AppState>,
    request: web::Json<EligibilityRequest>,
) -> ActixResult<HttpResponse> {
    let request_id = request_id_of(&req);
    let started = Instant::now();

    info!("Processing eligibility screening request");

    if let Err(e) = request.validate() {
        warn!("Invalid eligibility request {}: {}", request_id, e);
        return Ok(error_response(
            &data,
            ELIGIBILITY_MODEL,
            started,
            &request_id,
            e,
        ));
    }

    let result = submit(&data, request_id.clone(), ELIGIBILITY_MODEL, request.to_payload())
        .await
        .and_then(|response| {
            let verdict = EligibilityResponse::from_inference(&response)?;
            Ok((verdict, response.latency_ms))
        });

    match result {
        Ok((verdict, latency_ms)) => {
            data.metrics
                .observe_request(ELIGIBILITY_MODEL, "success", latency_ms as f64);
            Ok(HttpResponse::Ok().json(verdict))
        }
        Err(e) => {
            error!("Eligibility screening failed for request {}: {}", request_id, e);
            Ok(error_response(
                &data,
                ELIGIBILITY_MODEL,
                started,
                &request_id,
                e,
            ))
        }
    }
}

/// Handler for POST /recommend_job
pub async fn recommend_job(
    req: HttpRequest,
    data: web::Data<AppState>,
    request: web::Json<RecommendJobRequest>,
) -> ActixResult<HttpResponse> {
    let request_id = request_id_of(&req);
    let started = Instant::now();

    info!("Processing job recommendation request");

    if let Err(e) = request.validate() {
        warn!("Invalid recommendation request {}: {}", request_id, e);
        return Ok(error_response(
            &data,
            RECOMMENDER_MODEL,
            started,
            &request_id,
            e,
        ));
    }

    let result = submit(&data, request_id.clone(), RECOMMENDER_MODEL, request.to_payload())
        .await
        .and_then(|response| {
            let suggestion = RecommendJobResponse::from_inference(&response)?;
            Ok((suggestion, response.latency_ms))
        });

    match result {
        Ok((suggestion, latency_ms)) => {
            data.metrics
                .observe_request(RECOMMENDER_MODEL, "success", latency_ms as f64);
            Ok(HttpResponse::Ok().json(suggestion))
        }
        Err(e) => {
            error!("Job recommendation failed for request {}: {}", request_id, e);
            Ok(error_response(
                &data,
                RECOMMENDER_MODEL,
                started,
                &request_id,
                e,
            ))
        }
    }
}

/// Handler for GET /v1/models
pub async fn list_models(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    info!("Listing available models");

    let models: Vec<ModelEntry> = data
        .store
        .list()
        .into_iter()
        .map(|info| info.into())
        .collect();
    let count = models.len();

    Ok(HttpResponse::Ok().json(ModelsResponse { models, count }))
}

/// Handler for GET /
pub async fn index() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "online",
        "message": "Recruiter inference server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/v1/models",
            "/v1/models/{name}/predict",
            "/predict_eligibility",
            "/recommend_job",
            "/health",
            "/metrics"
        ]
    })))
}

/// Handler for GET /health
pub async fn health_check(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let state = data.lifecycle.state();
    let stats = data.engine.get_stats();

    let response = HealthResponse {
        status: if state == LifecycleState::Ready {
            "ok".to_string()
        } else {
            "unavailable".to_string()
        },
        state: state.as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models: data.store.len(),
        in_flight: data.lifecycle.in_flight(),
        uptime_seconds: stats.uptime_seconds,
    };

    if state == LifecycleState::Ready {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(response))
    }
}

/// Handler for GET /metrics (Prometheus metrics)
pub async fn metrics(req: HttpRequest, data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    if !data.config.metrics.enabled {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Metrics endpoint is disabled",
            "request_id": request_id_of(&req).to_string()
        })));
    }

    let stats = data.engine.get_stats();
    let snapshot = data.metrics.snapshot();

    let mut output = format!(
        "# HELP recruiter_infer_requests_total Total number of requests submitted to the engine\n\
         # TYPE recruiter_infer_requests_total counter\n\
         recruiter_infer_requests_total {}\n\
         \n\
         # HELP recruiter_infer_successful_requests_total Requests that produced an output\n\
         # TYPE recruiter_infer_successful_requests_total counter\n\
         recruiter_infer_successful_requests_total {}\n\
         \n\
         # HELP recruiter_infer_failed_requests_total Requests that failed during execution\n\
         # TYPE recruiter_infer_failed_requests_total counter\n\
         recruiter_infer_failed_requests_total {}\n\
         \n\
         # HELP recruiter_infer_timed_out_requests_total Requests that hit their deadline\n\
         # TYPE recruiter_infer_timed_out_requests_total counter\n\
         recruiter_infer_timed_out_requests_total {}\n\
         \n\
         # HELP recruiter_infer_rejected_requests_total Requests rejected before queueing\n\
         # TYPE recruiter_infer_rejected_requests_total counter\n\
         recruiter_infer_rejected_requests_total {}\n\
         \n\
         # HELP recruiter_infer_batches_executed_total Batches handed to worker tasks\n\
         # TYPE recruiter_infer_batches_executed_total counter\n\
         recruiter_infer_batches_executed_total {}\n\
         \n\
         # HELP recruiter_infer_avg_batch_size Average requests per executed batch\n\
         # TYPE recruiter_infer_avg_batch_size gauge\n\
         recruiter_infer_avg_batch_size {}\n\
         \n\
         # HELP recruiter_infer_avg_latency_ms Average completion latency in milliseconds\n\
         # TYPE recruiter_infer_avg_latency_ms gauge\n\
         recruiter_infer_avg_latency_ms {}\n\
         \n\
         # HELP recruiter_infer_queue_available Remaining submission queue capacity\n\
         # TYPE recruiter_infer_queue_available gauge\n\
         recruiter_infer_queue_available {}\n\
         \n\
         # HELP recruiter_infer_in_flight Requests currently inside the engine\n\
         # TYPE recruiter_infer_in_flight gauge\n\
         recruiter_infer_in_flight {}\n\
         \n\
         # HELP recruiter_infer_uptime_seconds Seconds since the engine started\n\
         # TYPE recruiter_infer_uptime_seconds gauge\n\
         recruiter_infer_uptime_seconds {}\n",
        stats.total_requests,
        stats.successful_requests,
        stats.failed_requests,
        stats.timed_out_requests,
        stats.rejected_requests,
        stats.batches_executed,
        stats.avg_batch_size,
        stats.avg_latency_ms,
        data.engine.queue_available(),
        data.engine.in_flight(),
        stats.uptime_seconds,
    );

    let mut counters: Vec<_> = snapshot.counters.iter().collect();
    counters.sort_by(|a, b| a.0.cmp(b.0));
    if !counters.is_empty() {
        output.push_str(
            "\n# HELP recruiter_infer_http_requests_total Finished requests by model and outcome\n\
             # TYPE recruiter_infer_http_requests_total counter\n",
        );
        for (series, value) in counters {
            output.push_str(&format!("recruiter_infer_http_{} {}\n", series, value));
        }
    }

    let mut histograms: Vec<_> = snapshot.histograms.iter().collect();
    histograms.sort_by(|a, b| a.0.cmp(b.0));
    if !histograms.is_empty() {
        output.push_str(
            "\n# HELP recruiter_infer_request_latency_ms Request latency quantiles by model\n\
             # TYPE recruiter_infer_request_latency_ms summary\n",
        );
        for (series, hist) in histograms {
            for (quantile, value) in [("0.5", hist.p50), ("0.95", hist.p95), ("0.99", hist.p99)] {
                output.push_str(&format!(
                    "recruiter_infer_{} {}\n",
                    quantile_series(series, quantile),
                    value
                ));
            }
            output.push_str(&format!(
                "recruiter_infer_{} {}\n",
                suffixed_series(series, "_count"),
                hist.count
            ));
        }
    }

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(output))
}

/// Insert a quantile label into a series that may already carry labels
fn quantile_series(series: &str, quantile: &str) -> String {
    match series.strip_suffix('}') {
        Some(prefix) => format!("{},quantile=\"{}\"}}", prefix, quantile),
        None => format!("{}{{quantile=\"{}\"}}", series, quantile),
    }
}

/// Append a suffix to the metric family name, keeping its labels
fn suffixed_series(series: &str, suffix: &str) -> String {
    match series.split_once('{') {
        Some((name, rest)) => format!("{}{}{{{}", name, suffix, rest),
        None => format!("{}{}", series, suffix),
    }
}

/// Default 404 handler
pub async fn not_found(req: HttpRequest) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::NotFound().json(json!({
        "error": {
            "message": "The requested endpoint was not found",
            "type": "not_found_error",
            "code": "NOT_FOUND"
        },
        "request_id": request_id_of(&req).to_string()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes;
    use crate::config::Config;
    use crate::inference::InferenceEngine;
    use crate::lifecycle::Lifecycle;
    use crate::metrics::MetricsCollector;
    use crate::models::ModelStore;
    use crate::test_utils::init_test_env;
    use actix_web::{test, App};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_artifact(dir: &TempDir, file: &str, artifact: serde_json::Value) {
        std::fs::write(dir.path().join(file), artifact.to_string()).unwrap();
    }

    fn classifier_artifact() -> serde_json::Value {
        json!({
            "id": "eligibility_classifier",
            "version": "1.0.0",
            "input_schema": { "resume_text": "text", "job_description": "text" },
            "output_schema": { "prediction": "text", "confidence": "float" },
            "flavor": {
                "type": "text_classifier",
                "inputs": ["resume_text", "job_description"],
                "hash_dims": 8,
                "classes": [
                    { "label": "LABEL_0", "weights": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], "bias": 0.0 },
                    { "label": "LABEL_1", "weights": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], "bias": 0.5 }
                ],
                "label_output": "prediction",
                "confidence_output": "confidence"
            }
        })
    }

    fn recommender_artifact() -> serde_json::Value {
        json!({
            "id": "job_recommender",
            "version": "1.0.0",
            "input_schema": { "resume_text": "text" },
            "output_schema": { "suggested_job": "text" },
            "flavor": {
                "type": "nearest_title",
                "input": "resume_text",
                "hash_dims": 8,
                "titles": [
                    { "title": "Software Engineer", "centroid": [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0] },
                    { "title": "Data Scientist", "centroid": [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0] }
                ],
                "output": "suggested_job"
            }
        })
    }

    fn linear_artifact() -> serde_json::Value {
        json!({
            "id": "score_model",
            "version": "1.0.0",
            "input_schema": { "x": "float" },
            "output_schema": { "score": "float" },
            "flavor": {
                "type": "linear",
                "inputs": ["x"],
                "weights": [1.5],
                "bias": 1.5,
                "output": "score"
            }
        })
    }

    fn full_fixture_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_artifact(&dir, "eligibility_classifier.json", classifier_artifact());
        write_artifact(&dir, "job_recommender.json", recommender_artifact());
        write_artifact(&dir, "score_model.json", linear_artifact());
        dir
    }

    fn test_state(dir: &TempDir) -> AppState {
        init_test_env();

        let mut config = Config::default();
        config.models.dir = Some(dir.path().to_path_buf());

        let store = Arc::new(ModelStore::load(&config.models).unwrap());
        let engine = InferenceEngine::start(&config, Arc::clone(&store));
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.set_ready();

        AppState {
            engine,
            store,
            lifecycle,
            metrics: Arc::new(MetricsCollector::new()),
            config,
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(crate::api::json_config())
                    .configure(routes::configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_predict_roundtrip() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/v1/models/score_model/predict")
            .set_json(json!({ "inputs": { "x": 2.0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["model"], "score_model");
        assert_eq!(body["outputs"]["score"], json!(4.5));
        assert_eq!(body["request_id"].as_str().unwrap().len(), 36);
    }

    #[actix_web::test]
    async fn test_predict_unknown_model() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/v1/models/missing/predict")
            .set_json(json!({ "inputs": { "x": 1.0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "MODEL_NOT_FOUND");
        assert!(body["request_id"].is_string());
    }

    #[actix_web::test]
    async fn test_predict_schema_mismatch() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/v1/models/score_model/predict")
            .set_json(json!({ "inputs": { "x": "not a number" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "SCHEMA_MISMATCH");
    }

    #[actix_web::test]
    async fn test_predict_eligibility_success() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/predict_eligibility")
            .set_json(json!({
                "resume_text": "Rust backend engineer with systems experience",
                "job_description": "Backend engineer role"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["prediction"], "LABEL_1");
        let confidence = body["confidence"].as_f64().unwrap();
        assert!(confidence > 0.5 && confidence < 1.0);
    }

    #[actix_web::test]
    async fn test_predict_eligibility_empty_resume() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/predict_eligibility")
            .set_json(json!({ "resume_text": "", "job_description": "Backend role" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["error_type"], "validation_error");
    }

    #[actix_web::test]
    async fn test_recommend_job_success() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/recommend_job")
            .set_json(json!({ "resume_text": "Statistics and machine learning background" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        let suggested = body["suggested_job"].as_str().unwrap();
        assert!(suggested == "Software Engineer" || suggested == "Data Scientist");
    }

    #[actix_web::test]
    async fn test_list_models() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::get().uri("/v1/models").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["models"][0]["name"], "eligibility_classifier");
        assert_eq!(body["models"][2]["flavor"], "linear");
    }

    #[actix_web::test]
    async fn test_index_banner() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "online");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[actix_web::test]
    async fn test_health_ready_and_draining() {
        let dir = full_fixture_dir();
        let state = test_state(&dir);
        let lifecycle = Arc::clone(&state.lifecycle);
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["state"], "ready");
        assert_eq!(body["models"], 3);

        lifecycle.begin_drain();
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 503);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["state"], "draining");
    }

    #[actix_web::test]
    async fn test_predict_rejected_while_draining() {
        let dir = full_fixture_dir();
        let state = test_state(&dir);
        state.lifecycle.begin_drain();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/v1/models/score_model/predict")
            .set_json(json!({ "inputs": { "x": 1.0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 503);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "NOT_READY");
    }

    #[actix_web::test]
    async fn test_metrics_exposition() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/v1/models/score_model/predict")
            .set_json(json!({ "inputs": { "x": 2.0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("recruiter_infer_requests_total 1"));
        assert!(body.contains(
            "recruiter_infer_http_requests_total{model=\"score_model\",outcome=\"success\"} 1"
        ));
        assert!(body.contains("quantile=\"0.95\""));
    }

    #[actix_web::test]
    async fn test_metrics_disabled() {
        let dir = full_fixture_dir();
        let mut state = test_state(&dir);
        state.config.metrics.enabled = false;
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["request_id"].is_string());
    }

    #[actix_web::test]
    async fn test_malformed_json_body() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::post()
            .uri("/predict_eligibility")
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["error_type"], "validation_error");
    }

    #[actix_web::test]
    async fn test_not_found() {
        let dir = full_fixture_dir();
        let app = test_app!(test_state(&dir));

        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "not_found_error");
        assert!(body["request_id"].is_string());
    }

    #[actix_web::test]
    async fn test_series_label_helpers() {
        assert_eq!(
            quantile_series("request_latency_ms{model=\"m\"}", "0.5"),
            "request_latency_ms{model=\"m\",quantile=\"0.5\"}"
        );
        assert_eq!(
            quantile_series("request_latency_ms", "0.99"),
            "request_latency_ms{quantile=\"0.99\"}"
        );
        assert_eq!(
            suffixed_series("request_latency_ms{model=\"m\"}", "_count"),
            "request_latency_ms_count{model=\"m\"}"
        );
        assert_eq!(
            suffixed_series("request_latency_ms", "_count"),
            "request_latency_ms_count"
        );
    }

    #[actix_web::test]
    async fn test_outcome_labels() {
        assert_eq!(outcome_of(&EngineError::validation("x")), "invalid");
        assert_eq!(outcome_of(&EngineError::model_not_found("m")), "not_found");
        assert_eq!(outcome_of(&EngineError::busy("full")), "rejected");
        assert_eq!(outcome_of(&EngineError::not_ready("draining")), "rejected");
        assert_eq!(outcome_of(&EngineError::timeout(5)), "timeout");
        assert_eq!(outcome_of(&EngineError::internal("boom")), "error");
    }
}
