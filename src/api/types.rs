//! API request and response types
//!
//! This module defines the JSON structures exchanged with clients: the generic
//! predict endpoint plus the fixed-contract screening and recommendation
//! endpoints that front specific models.

use crate::error::{EngineError, Result};
use crate::inference::InferenceResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Generic predict request for any registered model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Input payload, checked against the model's input schema
    pub inputs: Map<String, Value>,
}

/// Generic predict response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Model that produced the output
    pub model: String,
    /// Correlation id of the request
    pub request_id: String,
    /// Output payload matching the model's output schema
    pub outputs: Map<String, Value>,
    /// Wall time from submission to completion in milliseconds
    pub latency_ms: u64,
    /// Unix timestamp of creation
    pub created: i64,
}

/// Screening request pairing a resume with a job description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityRequest {
    /// Candidate resume text
    pub resume_text: String,
    /// Job description text
    pub job_description: String,
}

/// Screening verdict for a resume and job description pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    /// Always "success" for a completed prediction
    pub status: String,
    /// Predicted label for the pair
    pub prediction: String,
    /// Model confidence in the predicted label
    pub confidence: f64,
    /// Correlation id of the request
    pub request_id: String,
}

/// Recommendation request carrying a resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendJobRequest {
    /// Candidate resume text
    pub resume_text: String,
}

/// Suggested job title for a resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendJobResponse {
    /// Always "success" for a completed prediction
    pub status: String,
    /// Job title closest to the resume
    pub suggested_job: String,
    /// Correlation id of the request
    pub request_id: String,
}

/// Model entry in the listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model identifier
    pub name: String,
    /// Artifact version string
    pub version: String,
    /// Execution flavor of the artifact
    pub flavor: String,
    /// Field names and types the model accepts
    pub input_schema: crate::artifact::Schema,
    /// Field names and types the model produces
    pub output_schema: crate::artifact::Schema,
}

/// List of models response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Available models sorted by name
    pub models: Vec<ModelEntry>,
    /// Number of available models
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" while the server accepts work
    pub status: String,
    /// Current lifecycle state
    pub state: String,
    /// Crate version
    pub version: String,
    /// Number of loaded models
    pub models: usize,
    /// Requests currently being processed
    pub in_flight: usize,
    /// Seconds since the engine started
    pub uptime_seconds: u64,
}

impl EligibilityRequest {
    /// Reject empty screening input before it reaches the engine
    pub fn validate(&self) -> Result<()> {
        if self.resume_text.trim().is_empty() {
            return Err(EngineError::validation("Field 'resume_text' must not be empty"));
        }
        if self.job_description.trim().is_empty() {
            return Err(EngineError::validation(
                "Field 'job_description' must not be empty",
            ));
        }
        Ok(())
    }

    /// Convert to an engine payload
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "resume_text".to_string(),
            Value::String(self.resume_text.clone()),
        );
        payload.insert(
            "job_description".to_string(),
            Value::String(self.job_description.clone()),
        );
        payload
    }
}

impl RecommendJobRequest {
    /// Reject empty recommendation input before it reaches the engine
    pub fn validate(&self) -> Result<()> {
        if self.resume_text.trim().is_empty() {
            return Err(EngineError::validation("Field 'resume_text' must not be empty"));
        }
        Ok(())
    }

    /// Convert to an engine payload
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "resume_text".to_string(),
            Value::String(self.resume_text.clone()),
        );
        payload
    }
}

impl From<InferenceResponse> for PredictResponse {
    fn from(response: InferenceResponse) -> Self {
        Self {
            model: response.model,
            request_id: response.id.to_string(),
            outputs: response.output,
            latency_ms: response.latency_ms,
            created: response.created,
        }
    }
}

impl EligibilityResponse {
    /// Build the screening verdict from a model output
    ///
    /// The backing model must produce "prediction" and "confidence" fields.
    pub fn from_inference(response: &InferenceResponse) -> Result<Self> {
        let prediction = response
            .output
            .get("prediction")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::execution("Model output is missing the 'prediction' field")
            })?;
        let confidence = response
            .output
            .get("confidence")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                EngineError::execution("Model output is missing the 'confidence' field")
            })?;

        Ok(Self {
            status: "success".to_string(),
            prediction: prediction.to_string(),
            confidence,
            request_id: response.id.to_string(),
        })
    }
}

impl RecommendJobResponse {
    /// Build the recommendation from a model output
    ///
    /// The backing model must produce a "suggested_job" field.
    pub fn from_inference(response: &InferenceResponse) -> Result<Self> {
        let suggested_job = response
            .output
            .get("suggested_job")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::execution("Model output is missing the 'suggested_job' field")
            })?;

        Ok(Self {
            status: "success".to_string(),
            suggested_job: suggested_job.to_string(),
            request_id: response.id.to_string(),
        })
    }
}

impl From<crate::models::ModelInfo> for ModelEntry {
    fn from(info: crate::models::ModelInfo) -> Self {
        Self {
            name: info.name,
            version: info.version,
            flavor: info.flavor,
            input_schema: info.input_schema,
            output_schema: info.output_schema,
        }
    }
}
