//! Fixed, read-only model registry.

use serde::{Deserialize, Serialize};

/// Model identifiers accepted by the chat endpoint.
pub const SUPPORTED_MODELS: [&str; 5] = [
    "gpt-3.5-turbo",
    "gpt-4",
    "gpt-4-turbo-preview",
    "text-davinci-003",
    "text-curie-001",
];

/// Creation timestamp reported for every registry entry.
pub const MODEL_CREATED: u64 = 1_677_610_602;

pub const MODEL_OWNER: &str = "Owned by the mock user";

/// Model listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

impl ModelInfo {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            object: "model".to_string(),
            created: MODEL_CREATED,
            owned_by: MODEL_OWNER.to_string(),
        }
    }
}

/// Whether `name` is one of the supported model identifiers (exact match).
pub fn validate_model(name: &str) -> bool {
    SUPPORTED_MODELS.contains(&name)
}

/// The whole registry as a `list` object.
pub fn list_models() -> ModelList {
    ModelList {
        object: "list".to_string(),
        data: SUPPORTED_MODELS.iter().map(|id| ModelInfo::new(id)).collect(),
    }
}

/// Look up a single registry entry.
pub fn find_model(id: &str) -> Option<ModelInfo> {
    SUPPORTED_MODELS
        .iter()
        .find(|m| **m == id)
        .map(|id| ModelInfo::new(id))
}
