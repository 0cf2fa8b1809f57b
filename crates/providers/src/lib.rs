//! LLM provider implementations for innkeep.
//!
//! All providers implement the `innkeep_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use innkeep_config::LlmConfig;
use innkeep_core::error::ProviderError;
use innkeep_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider.
///
/// `llm.api_url` overrides the preset's base URL; every preset except
/// `ollama` needs an API key.
pub fn build_from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let key = || {
        config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no API key for provider '{}' (set INNKEEP_LLM_API_KEY)",
                config.provider
            ))
        })
    };

    let provider = match (config.provider.as_str(), config.api_url.as_deref()) {
        ("ollama", url) => OpenAiCompatProvider::ollama(url)?,
        (name, Some(url)) => OpenAiCompatProvider::new(name, url, key()?)?,
        ("gemini", None) => OpenAiCompatProvider::gemini(key()?)?,
        ("openai", None) => OpenAiCompatProvider::openai(key()?)?,
        ("openrouter", None) => OpenAiCompatProvider::openrouter(key()?)?,
        (other, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}' and no llm.api_url given"
            )));
        }
    };

    tracing::debug!(provider = provider.name(), "Provider configured");
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_needs_a_key() {
        let err = build_from_config(&LlmConfig::default()).err().expect("expected an error");
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn gemini_preset() {
        let config = LlmConfig {
            api_key: Some("k".into()),
            ..LlmConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "gemini");
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn custom_endpoint_by_url() {
        let config = LlmConfig {
            provider: "vllm".into(),
            api_key: Some("k".into()),
            api_url: Some("http://gpu-box:8000/v1".into()),
            ..LlmConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "vllm");

        let config = LlmConfig {
            api_url: None,
            ..config
        };
        assert!(build_from_config(&config).is_err());
    }
}
