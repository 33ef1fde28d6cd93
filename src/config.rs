use std::env;

use crate::model::{Credential, ModelCatalog};

const DEFAULT_MODEL_BASE_URL: &str = "https://api.mistral.ai";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TEXT_MODELS: &[&str] = &["mistral-large-latest", "mistral-small-latest"];
const DEFAULT_IMAGE_MODELS: &[&str] = &["pixtral-12b-2409"];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Credential,
    pub model_base_url: String,
    pub model_timeout_secs: u64,
    pub catalog: ModelCatalog,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        let model_base_url =
            get_var("MODEL_BASE_URL").unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string());
        let model_timeout_secs = parse_model_timeout_secs(get_var("MODEL_TIMEOUT_SECS").as_deref());
        let text_models = parse_model_list(get_var("TEXT_MODELS").as_deref(), DEFAULT_TEXT_MODELS);
        let image_models =
            parse_model_list(get_var("IMAGE_MODELS").as_deref(), DEFAULT_IMAGE_MODELS);

        Self {
            api_key: Credential::new(get_var("MISTRAL_API_KEY").unwrap_or_default()),
            model_base_url,
            model_timeout_secs,
            catalog: ModelCatalog::new(text_models, image_models),
        }
    }
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_model_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MODEL_TIMEOUT_SECS)
}

fn parse_model_list(raw: Option<&str>, default: &[&str]) -> Vec<String> {
    let models: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    if models.is_empty() {
        default.iter().map(|name| (*name).to_string()).collect()
    } else {
        models
    }
}
