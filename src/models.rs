//! Model handles and the model store
//!
//! This module executes loaded artifacts and keeps the immutable registry
//! the rest of the server reads from. The store is populated once at
//! startup; a load failure is fatal and the server never starts serving.

use crate::artifact::{
    featurize, Artifact, Flavor, LinearFlavor, NearestTitleFlavor, Schema, TextClassifierFlavor,
};
use crate::config::ModelsConfig;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Model information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub flavor: String,
    pub input_schema: Schema,
    pub output_schema: Schema,
    pub loaded_at: i64,
}

/// A loaded, ready-to-execute model
#[derive(Debug)]
pub struct ModelHandle {
    name: String,
    artifact: Artifact,
    loaded_at: i64,
}

impl ModelHandle {
    pub fn new(name: String, artifact: Artifact) -> Self {
        Self {
            name,
            artifact,
            loaded_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Check a request payload against the model's input schema
    pub fn check_input(&self, payload: &Map<String, Value>) -> Result<()> {
        self.artifact.check_input(payload)
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            version: self.artifact.version.clone(),
            flavor: self.artifact.flavor.kind().to_string(),
            input_schema: self.artifact.input_schema.clone(),
            output_schema: self.artifact.output_schema.clone(),
            loaded_at: self.loaded_at,
        }
    }

    /// Execute the model on a validated payload
    pub fn predict(&self, payload: &Map<String, Value>) -> Result<Map<String, Value>> {
        match &self.artifact.flavor {
            Flavor::Linear(flavor) => self.predict_linear(flavor, payload),
            Flavor::TextClassifier(flavor) => self.predict_classifier(flavor, payload),
            Flavor::NearestTitle(flavor) => self.predict_nearest_title(flavor, payload),
        }
    }

    /// Execute the model on a batch of validated payloads
    pub fn predict_batch(&self, payloads: &[Map<String, Value>]) -> Vec<Result<Map<String, Value>>> {
        payloads.iter().map(|payload| self.predict(payload)).collect()
    }

    fn predict_linear(
        &self,
        flavor: &LinearFlavor,
        payload: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut sum = flavor.bias;
        for (input, weight) in flavor.inputs.iter().zip(&flavor.weights) {
            let value = payload
                .get(input)
                .and_then(Value::as_f64)
                .ok_or_else(|| EngineError::execution(format!("Input '{}' is not numeric", input)))?;
            sum += weight * value;
        }

        let mut output = Map::new();
        output.insert(flavor.output.clone(), float_value(sum)?);
        Ok(output)
    }

    fn predict_classifier(
        &self,
        flavor: &TextClassifierFlavor,
        payload: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut parts = Vec::with_capacity(flavor.inputs.len());
        for input in &flavor.inputs {
            let text = payload
                .get(input)
                .and_then(Value::as_str)
                .ok_or_else(|| EngineError::execution(format!("Input '{}' is not text", input)))?;
            parts.push(text);
        }
        let joined = parts.join(&flavor.separator);
        let features = featurize(&joined, flavor.hash_dims, flavor.max_tokens);

        let scores: Vec<f64> = flavor
            .classes
            .iter()
            .map(|class| dot(&class.weights, &features) + class.bias)
            .collect();
        let probs = softmax(&scores);
        let best = argmax(&probs)
            .ok_or_else(|| EngineError::execution("Classifier produced no scores"))?;

        let mut output = Map::new();
        output.insert(
            flavor.label_output.clone(),
            Value::String(flavor.classes[best].label.clone()),
        );
        output.insert(flavor.confidence_output.clone(), float_value(probs[best])?);
        Ok(output)
    }

    fn predict_nearest_title(
        &self,
        flavor: &NearestTitleFlavor,
        payload: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let text = payload
            .get(&flavor.input)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::execution(format!("Input '{}' is not text", flavor.input))
            })?;
        let features = featurize(text, flavor.hash_dims, flavor.max_tokens);

        let scores: Vec<f64> = flavor
            .titles
            .iter()
            .map(|title| dot(&title.centroid, &features))
            .collect();
        let best =
            argmax(&scores).ok_or_else(|| EngineError::execution("No candidate titles"))?;

        let mut output = Map::new();
        output.insert(
            flavor.output.clone(),
            Value::String(flavor.titles[best].title.clone()),
        );
        Ok(output)
    }
}

fn float_value(value: f64) -> Result<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| EngineError::execution("Prediction is not a finite number"))
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Index of the largest value, first wins on ties
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= *v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Immutable registry of loaded models
#[derive(Debug)]
pub struct ModelStore {
    models: HashMap<String, Arc<ModelHandle>>,
}

impl ModelStore {
    /// Load every configured artifact, failing on the first bad one
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let started = std::time::Instant::now();
        let mut models = HashMap::new();

        for source in &config.sources {
            let artifact = Artifact::from_file(&source.path)?;
            let name = source
                .name
                .clone()
                .unwrap_or_else(|| artifact.id.clone());
            Self::register(&mut models, name, artifact)?;
        }

        if let Some(dir) = &config.dir {
            let entries = std::fs::read_dir(dir).map_err(|e| {
                EngineError::artifact_load(format!(
                    "Failed to read model directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
                .collect();
            paths.sort();

            for path in paths {
                let artifact = Artifact::from_file(&path)?;
                let name = artifact.id.clone();
                Self::register(&mut models, name, artifact)?;
            }
        }

        if models.is_empty() {
            return Err(EngineError::artifact_load("No model artifacts were loaded"));
        }

        info!(
            models = models.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Model store ready"
        );
        Ok(Self { models })
    }

    fn register(
        models: &mut HashMap<String, Arc<ModelHandle>>,
        name: String,
        artifact: Artifact,
    ) -> Result<()> {
        if models.contains_key(&name) {
            return Err(EngineError::artifact_load(format!(
                "Duplicate model name '{}'",
                name
            )));
        }
        info!(
            model = %name,
            version = %artifact.version,
            flavor = artifact.flavor.kind(),
            "Loaded model artifact"
        );
        models.insert(name.clone(), Arc::new(ModelHandle::new(name, artifact)));
        Ok(())
    }

    /// Look up a model by registration name
    pub fn get(&self, name: &str) -> Result<Arc<ModelHandle>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::model_not_found(name))
    }

    /// List loaded models, sorted by name
    pub fn list(&self) -> Vec<ModelInfo> {
        let mut infos: Vec<ModelInfo> = self.models.values().map(|m| m.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
