//! HTTP code oracle
//!
//! Speaks the completion endpoint protocol: a bearer-authenticated JSON POST
//! of `{"query": <prompt>, "inputs": {"__system__": ""}}` answered by a JSON
//! object whose `answer` field holds the completion text.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use synthdb_core::augment::CodeOracle;
use synthdb_core::OracleConfig;
use tracing::{debug, warn};

use crate::error::{OracleError, OracleResult};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    query: &'a str,
    inputs: CompletionInputs<'a>,
}

#[derive(Debug, Serialize)]
struct CompletionInputs<'a> {
    #[serde(rename = "__system__")]
    system: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    answer: Option<Value>,
}

/// [`CodeOracle`] backed by a remote completion endpoint.
pub struct HttpOracle {
    config: OracleConfig,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for HttpOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOracle")
            .field("url", &self.config.url)
            .field("max_retries", &self.config.max_retries)
            .finish_non_exhaustive()
    }
}

impl HttpOracle {
    /// Create a client; the per-request timeout comes from the config.
    pub fn new(config: OracleConfig) -> OracleResult<Self> {
        if config.url.trim().is_empty() {
            return Err(OracleError::InvalidConfig("url must not be empty".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("synthdb-oracle/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(HttpOracle {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// One request, no retry.
    pub async fn request(&self, prompt: &str) -> OracleResult<String> {
        let body = CompletionRequest {
            query: prompt,
            inputs: CompletionInputs { system: "" },
        };
        let response = self
            .http_client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&bytes)?;
        Ok(match parsed.answer {
            Some(Value::String(answer)) => answer,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }

    fn attempts(&self) -> u32 {
        self.config.max_retries.max(1)
    }
}

#[async_trait]
impl CodeOracle for HttpOracle {
    /// Retries transport and status failures; an exhausted budget yields an
    /// empty completion, which the loop treats as "no code".
    async fn complete(&self, prompt: &str) -> String {
        let attempts = self.attempts();
        for attempt in 1..=attempts {
            match self.request(prompt).await {
                Ok(answer) => {
                    debug!(attempt, chars = answer.len(), "oracle answered");
                    return answer;
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "oracle request failed");
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }
        String::new()
    }
}
