//! Model artifact format
//!
//! Artifacts are self-describing JSON documents that declare a model's
//! identity, its input/output schemas, and the flavor data needed to
//! execute it. Loading validates internal consistency so a malformed
//! artifact is rejected at startup rather than at request time.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Value types a schema field can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Float,
    Int,
    Text,
    Bool,
}

impl FieldType {
    /// Check a JSON value against this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::Float => value.is_number(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Text => value.is_string(),
            FieldType::Bool => value.is_boolean(),
        }
    }

    /// Name used in schema mismatch messages
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Float => "float",
            FieldType::Int => "int",
            FieldType::Text => "text",
            FieldType::Bool => "bool",
        }
    }
}

/// Named, typed fields of a request or response payload
pub type Schema = BTreeMap<String, FieldType>;

/// A loaded model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable model identifier, used as the default registration name
    pub id: String,
    /// Artifact version string
    pub version: String,
    /// Fields a request payload must carry
    pub input_schema: Schema,
    /// Fields the response payload will carry
    pub output_schema: Schema,
    /// Execution strategy and its parameters
    pub flavor: Flavor,
}

/// Execution strategies an artifact can declare
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Flavor {
    /// Weighted sum over numeric inputs
    Linear(LinearFlavor),
    /// Hashed bag-of-words classifier with per-class weights
    TextClassifier(TextClassifierFlavor),
    /// Nearest-centroid lookup producing a title string
    NearestTitle(NearestTitleFlavor),
}

impl Flavor {
    /// Short name for logs and model listings
    pub fn kind(&self) -> &'static str {
        match self {
            Flavor::Linear(_) => "linear",
            Flavor::TextClassifier(_) => "text_classifier",
            Flavor::NearestTitle(_) => "nearest_title",
        }
    }
}

/// Weighted sum: y = w . x + b
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearFlavor {
    /// Input field names, in weight order
    pub inputs: Vec<String>,
    /// One weight per input field
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Name of the float output field
    pub output: String,
}

/// Hashed bag-of-words classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextClassifierFlavor {
    /// Text fields joined with `separator` before featurizing
    pub inputs: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Dimension of the hashed feature space
    pub hash_dims: usize,
    /// Tokens kept after truncation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// One score row per class; softmax over rows picks the label
    pub classes: Vec<ClassWeights>,
    /// Output field carrying the winning label
    pub label_output: String,
    /// Output field carrying the winning probability
    pub confidence_output: String,
}

/// Score row for one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassWeights {
    pub label: String,
    /// Length must equal `hash_dims`
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// Nearest-centroid title lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestTitleFlavor {
    /// Text field to featurize
    pub input: String,
    /// Dimension of the hashed feature space
    pub hash_dims: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Candidate titles with their centroids
    pub titles: Vec<TitleCentroid>,
    /// Output field carrying the chosen title
    pub output: String,
}

/// Candidate title with its feature centroid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleCentroid {
    pub title: String,
    /// Length must equal `hash_dims`
    pub centroid: Vec<f64>,
}

fn default_separator() -> String {
    " [SEP] ".to_string()
}

fn default_max_tokens() -> usize {
    512
}

impl Artifact {
    /// Load and validate an artifact from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::artifact_load(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| {
            EngineError::artifact_load(format!("{}: {}", path.display(), load_message(&e)))
        })
    }

    /// Parse and validate an artifact from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(content)
            .map_err(|e| EngineError::artifact_load(format!("Failed to parse artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Validate internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(EngineError::artifact_load("Artifact id cannot be empty"));
        }
        if self.version.is_empty() {
            return Err(EngineError::artifact_load(
                "Artifact version cannot be empty",
            ));
        }
        if self.input_schema.is_empty() {
            return Err(EngineError::artifact_load("Input schema cannot be empty"));
        }
        if self.output_schema.is_empty() {
            return Err(EngineError::artifact_load("Output schema cannot be empty"));
        }

        match &self.flavor {
            Flavor::Linear(flavor) => self.validate_linear(flavor),
            Flavor::TextClassifier(flavor) => self.validate_text_classifier(flavor),
            Flavor::NearestTitle(flavor) => self.validate_nearest_title(flavor),
        }
    }

    fn validate_linear(&self, flavor: &LinearFlavor) -> Result<()> {
        if flavor.inputs.is_empty() {
            return Err(EngineError::artifact_load(
                "Linear flavor needs at least one input",
            ));
        }
        if flavor.weights.len() != flavor.inputs.len() {
            return Err(EngineError::artifact_load(format!(
                "Linear flavor has {} weights for {} inputs",
                flavor.weights.len(),
                flavor.inputs.len()
            )));
        }
        for input in &flavor.inputs {
            match self.input_schema.get(input) {
                Some(FieldType::Float) | Some(FieldType::Int) => {}
                Some(other) => {
                    return Err(EngineError::artifact_load(format!(
                        "Linear input '{}' must be numeric, schema says {}",
                        input,
                        other.name()
                    )));
                }
                None => {
                    return Err(EngineError::artifact_load(format!(
                        "Linear input '{}' missing from input schema",
                        input
                    )));
                }
            }
        }
        self.expect_output(&flavor.output, FieldType::Float)
    }

    fn validate_text_classifier(&self, flavor: &TextClassifierFlavor) -> Result<()> {
        if flavor.inputs.is_empty() {
            return Err(EngineError::artifact_load(
                "Classifier flavor needs at least one input",
            ));
        }
        if flavor.hash_dims == 0 {
            return Err(EngineError::artifact_load("hash_dims must be greater than 0"));
        }
        if flavor.classes.is_empty() {
            return Err(EngineError::artifact_load(
                "Classifier flavor needs at least one class",
            ));
        }
        for input in &flavor.inputs {
            self.expect_input(input, FieldType::Text)?;
        }
        for class in &flavor.classes {
            if class.weights.len() != flavor.hash_dims {
                return Err(EngineError::artifact_load(format!(
                    "Class '{}' has {} weights, expected {}",
                    class.label,
                    class.weights.len(),
                    flavor.hash_dims
                )));
            }
        }
        self.expect_output(&flavor.label_output, FieldType::Text)?;
        self.expect_output(&flavor.confidence_output, FieldType::Float)
    }

    fn validate_nearest_title(&self, flavor: &NearestTitleFlavor) -> Result<()> {
        if flavor.hash_dims == 0 {
            return Err(EngineError::artifact_load("hash_dims must be greater than 0"));
        }
        if flavor.titles.is_empty() {
            return Err(EngineError::artifact_load(
                "NearestTitle flavor needs at least one title",
            ));
        }
        self.expect_input(&flavor.input, FieldType::Text)?;
        for title in &flavor.titles {
            if title.centroid.len() != flavor.hash_dims {
                return Err(EngineError::artifact_load(format!(
                    "Title '{}' has a {}-dim centroid, expected {}",
                    title.title,
                    title.centroid.len(),
                    flavor.hash_dims
                )));
            }
        }
        self.expect_output(&flavor.output, FieldType::Text)
    }

    fn expect_input(&self, field: &str, expected: FieldType) -> Result<()> {
        match self.input_schema.get(field) {
            Some(actual) if *actual == expected => Ok(()),
            Some(actual) => Err(EngineError::artifact_load(format!(
                "Input '{}' must be {}, schema says {}",
                field,
                expected.name(),
                actual.name()
            ))),
            None => Err(EngineError::artifact_load(format!(
                "Input '{}' missing from input schema",
                field
            ))),
        }
    }

    fn expect_output(&self, field: &str, expected: FieldType) -> Result<()> {
        match self.output_schema.get(field) {
            Some(actual) if *actual == expected => Ok(()),
            Some(actual) => Err(EngineError::artifact_load(format!(
                "Output '{}' must be {}, schema says {}",
                field,
                expected.name(),
                actual.name()
            ))),
            None => Err(EngineError::artifact_load(format!(
                "Output '{}' missing from output schema",
                field
            ))),
        }
    }

    /// Check a request payload against the input schema
    pub fn check_input(&self, payload: &Map<String, Value>) -> Result<()> {
        for (field, field_type) in &self.input_schema {
            match payload.get(field) {
                Some(value) if field_type.matches(value) => {}
                Some(_) => {
                    return Err(EngineError::schema_mismatch(format!(
                        "Field '{}' must be {}",
                        field,
                        field_type.name()
                    )));
                }
                None => {
                    return Err(EngineError::schema_mismatch(format!(
                        "Missing required field '{}'",
                        field
                    )));
                }
            }
        }
        for field in payload.keys() {
            if !self.input_schema.contains_key(field) {
                return Err(EngineError::schema_mismatch(format!(
                    "Unknown field '{}'",
                    field
                )));
            }
        }
        Ok(())
    }
}

fn load_message(error: &EngineError) -> String {
    match error {
        EngineError::ArtifactLoad { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Lowercase a text into alphanumeric tokens, truncated to `max_tokens`
pub fn tokenize(text: &str, max_tokens: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .take(max_tokens)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Hash tokens into a fixed-dimension count vector
pub fn hash_features(tokens: &[String], dims: usize) -> Vec<f64> {
    let mut features = vec![0.0; dims];
    for token in tokens {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let index = (hasher.finish() % dims as u64) as usize;
        features[index] += 1.0;
    }
    features
}

/// Tokenize and hash a text in one step
pub fn featurize(text: &str, dims: usize, max_tokens: usize) -> Vec<f64> {
    let tokens = tokenize(text, max_tokens);
    hash_features(&tokens, dims)
}
