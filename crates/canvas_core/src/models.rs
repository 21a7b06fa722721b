//! Catalog of language models a node can be bound to.

use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Groq,
    OpenAi,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub provider: ModelProvider,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "llama-3.3-70b-versatile",
        name: "Llama 3.3 70B",
        description: "Most capable Llama model",
        provider: ModelProvider::Groq,
    },
    ModelInfo {
        id: "llama-3.1-8b-instant",
        name: "Llama 3.1 8B",
        description: "Fast and efficient",
        provider: ModelProvider::Groq,
    },
    ModelInfo {
        id: "mixtral-8x7b-32768",
        name: "Mixtral 8x7B",
        description: "Expert mixture model",
        provider: ModelProvider::Groq,
    },
    ModelInfo {
        id: "gemma-7b-it",
        name: "Gemma 7B",
        description: "Lightweight and efficient",
        provider: ModelProvider::Groq,
    },
    ModelInfo {
        id: "openai/gpt-oss-120b",
        name: "openai/gpt-oss-120b",
        description: "OpenAI large model",
        provider: ModelProvider::OpenAi,
    },
    ModelInfo {
        id: "openai/gpt-oss-20b",
        name: "openai/gpt-oss-20b",
        description: "OpenAI compact model",
        provider: ModelProvider::OpenAi,
    },
];

/// Model assigned to freshly created nodes.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Look a model up, falling back to the first catalog entry.
pub fn model_info(id: &str) -> &'static ModelInfo {
    MODELS.iter().find(|m| m.id == id).unwrap_or(&MODELS[0])
}

pub fn is_known_model(id: &str) -> bool {
    MODELS.iter().any(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_falls_back_to_first_entry() {
        assert_eq!(model_info("llama-3-8b").id, MODELS[0].id);
        assert!(!is_known_model("llama-3-8b"));
    }

    #[test]
    fn default_model_is_in_catalog() {
        assert!(is_known_model(DEFAULT_MODEL));
        assert_eq!(model_info("mixtral-8x7b-32768").name, "Mixtral 8x7B");
    }
}
