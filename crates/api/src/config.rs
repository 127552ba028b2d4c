use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use query::QuestionConfig;
use summarize::SummaryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: OperationMode,
    pub server: ServerConfig,
    pub ollama: OllamaConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub ingest: IngestConfig,
    pub summary: SummaryConfig,
    pub questions: QuestionConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,      // Wide fan-out, short timeouts
    Accurate,  // Narrow fan-out, long timeouts, retries enabled
    Balanced,  // Default
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub max_concurrent_llm_calls: usize,
    pub max_concurrent_extractions: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub min_paragraph_len: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
            },
            ollama: OllamaConfig {
                base_url: extract::llm::DEFAULT_BASE_URL.to_string(),
                model: extract::llm::DEFAULT_MODEL.to_string(),
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_llm_calls: 3,
                max_concurrent_extractions: 5,
                request_timeout_secs: 120,
            },
            retry: RetryConfig {
                max_retries: 0,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            ingest: IngestConfig {
                min_paragraph_len: 300,
            },
            summary: SummaryConfig::default(),
            questions: QuestionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn fast_mode() -> Self {
        Self {
            mode: OperationMode::Fast,
            concurrency: ConcurrencyConfig {
                max_concurrent_llm_calls: 10,
                max_concurrent_extractions: 20,
                request_timeout_secs: 60,
            },
            summary: SummaryConfig {
                min_words: 20,
                max_words: 60,
            },
            ..Self::default()
        }
    }

    pub fn accurate_mode() -> Self {
        Self {
            mode: OperationMode::Accurate,
            concurrency: ConcurrencyConfig {
                max_concurrent_llm_calls: 2,
                max_concurrent_extractions: 3,
                request_timeout_secs: 300,
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 2000,
                max_backoff_ms: 20000,
            },
            questions: QuestionConfig {
                expected_count: Some(5),
                max_attempts: 3,
            },
            ..Self::default()
        }
    }

    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Fast => Self::fast_mode(),
            OperationMode::Accurate => Self::accurate_mode(),
            OperationMode::Balanced => Self::default(),
        }
    }

    /// Defaults (or a mode preset), then an optional JSON file named by
    /// `PIPELINE_CONFIG`, then individual environment variables.
    pub fn load() -> Result<Self> {
        // Try the current directory first, then the parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }

        let lookup = |key: &str| std::env::var(key).ok();

        let mut config = match lookup("PIPELINE_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .context(format!("Failed to parse config file: {:?}", path))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("PIPELINE_MODE") {
            let mode: OperationMode = serde_json::from_value(serde_json::Value::String(mode.to_lowercase()))
                .context(format!("Invalid PIPELINE_MODE: {}", mode))?;
            let preset = Self::for_mode(mode);
            self.mode = preset.mode;
            self.concurrency = preset.concurrency;
            self.retry = preset.retry;
            self.summary = preset.summary;
            self.questions = preset.questions;
        }

        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.ollama.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        override_number(&lookup, "MAX_CONCURRENT_LLM_CALLS", &mut self.concurrency.max_concurrent_llm_calls)?;
        override_number(&lookup, "MAX_CONCURRENT_EXTRACTIONS", &mut self.concurrency.max_concurrent_extractions)?;
        override_number(&lookup, "REQUEST_TIMEOUT_SECS", &mut self.concurrency.request_timeout_secs)?;
        override_number(&lookup, "MAX_RETRIES", &mut self.retry.max_retries)?;
        override_number(&lookup, "MIN_PARAGRAPH_LEN", &mut self.ingest.min_paragraph_len)?;

        Ok(())
    }
}

fn override_number<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .context(format!("Invalid value for {}: {}", key, raw))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_do_not_retry() {
        let config = AppConfig::default();
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.ingest.min_paragraph_len, 300);
        assert_eq!(config.ollama.model, "llama3");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("OLLAMA_BASE_URL", "http://gpu-box:11434/"),
                ("OLLAMA_MODEL", "mistral"),
                ("MAX_CONCURRENT_EXTRACTIONS", "8"),
            ]))
            .unwrap();

        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.concurrency.max_concurrent_extractions, 8);
    }

    #[test]
    fn test_mode_preset_then_specific_override() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("PIPELINE_MODE", "Accurate"), ("MAX_RETRIES", "1")]))
            .unwrap();

        assert_eq!(config.mode, OperationMode::Accurate);
        assert_eq!(config.concurrency.max_concurrent_extractions, 3);
        assert_eq!(config.retry.max_retries, 1);
    }

    #[test]
    fn test_bad_values_are_errors() {
        let mut config = AppConfig::default();
        assert!(config.apply_overrides(env(&[("MAX_RETRIES", "many")])).is_err());
        assert!(config.apply_overrides(env(&[("PIPELINE_MODE", "turbo")])).is_err());
    }

    #[test]
    fn test_partial_json_file_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"mode": "fast", "ollama": {"base_url": "http://localhost:11434", "model": "phi3"}}"#,
        )
        .unwrap();

        assert_eq!(config.mode, OperationMode::Fast);
        assert_eq!(config.ollama.model, "phi3");
        assert_eq!(config.concurrency.max_concurrent_extractions, 5);
    }
}
