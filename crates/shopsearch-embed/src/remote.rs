//! Remote embedding client.
//!
//! Calls a prediction endpoint accepting `{content, task_type}`-shaped
//! instances and returning `{predictions: [{embeddings: {values: [...]}}]}`.
//! Owns auth, timeout, and error translation. No retries: retry policy,
//! if any, belongs to the caller.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use shopsearch_core::{Embedder, EmbeddingConfig, Result, SearchError};

/// Embedder backed by a remote prediction endpoint.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
    dimension: usize,
    task_type: String,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
}

#[derive(Serialize)]
struct PredictInstance {
    content: String,
    task_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    #[serde(default)]
    embeddings: PredictionEmbeddings,
}

#[derive(Deserialize, Default)]
struct PredictionEmbeddings {
    #[serde(default)]
    values: Vec<f32>,
}

impl RemoteEmbedder {
    /// Create a client from configuration. The bearer token is read from
    /// the environment variable named in the config, if set.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(SearchError::config("embedding endpoint is not configured"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SearchError::config(format!("Failed to build HTTP client: {}", e)))?;

        let auth_token = std::env::var(&config.auth_token_env).ok();

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            auth_token,
            dimension: config.dimension,
            task_type: config.task_type.clone(),
        })
    }

    /// Extract the single query vector from a response envelope,
    /// enforcing the configured dimension.
    fn extract_vector(response: PredictResponse, expected: usize) -> Result<Vec<f32>> {
        let values = response
            .predictions
            .into_iter()
            .next()
            .map(|p| p.embeddings.values)
            .unwrap_or_default();

        // A short or absent vector is an error, never a zero-vector
        // fallback: a degenerate vector would corrupt ANN ranking
        // without signaling failure.
        if values.len() != expected {
            return Err(SearchError::EmbeddingEmpty {
                got: values.len(),
                expected,
            });
        }

        Ok(values)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();

        let body = PredictRequest {
            instances: vec![PredictInstance {
                content: text.to_string(),
                task_type: self.task_type.clone(),
            }],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            warn!("Embedding call failed after {}ms: {}", elapsed_ms, e);
            if e.is_timeout() {
                SearchError::EmbeddingTimeout { elapsed_ms }
            } else {
                SearchError::EmbeddingResponse {
                    message: format!("transport error: {}", e),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            warn!(
                "Embedding call rejected with {} after {}ms",
                status,
                start.elapsed().as_millis()
            );
            return Err(SearchError::EmbeddingAuth {
                message: format!("endpoint returned {}", status),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                "Embedding call returned {} after {}ms",
                status,
                start.elapsed().as_millis()
            );
            return Err(SearchError::EmbeddingStatus {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: PredictResponse = response.json().await.map_err(|e| {
            warn!(
                "Malformed embedding response after {}ms: {}",
                start.elapsed().as_millis(),
                e
            );
            SearchError::EmbeddingResponse {
                message: e.to_string(),
            }
        })?;

        let vector = Self::extract_vector(envelope, self.dimension)?;

        debug!(
            "Embedded query ({} chars) in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(values: Vec<f32>) -> PredictResponse {
        PredictResponse {
            predictions: vec![Prediction {
                embeddings: PredictionEmbeddings { values },
            }],
        }
    }

    #[test]
    fn test_extract_vector_ok() {
        let vector = RemoteEmbedder::extract_vector(envelope(vec![0.1, 0.2, 0.3]), 3).unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_extract_vector_short_is_error() {
        let err = RemoteEmbedder::extract_vector(envelope(vec![0.1]), 3).unwrap_err();
        assert!(matches!(
            err,
            SearchError::EmbeddingEmpty { got: 1, expected: 3 }
        ));
    }

    #[test]
    fn test_extract_vector_no_predictions_is_error() {
        let response = PredictResponse { predictions: vec![] };
        let err = RemoteEmbedder::extract_vector(response, 3).unwrap_err();
        assert!(matches!(
            err,
            SearchError::EmbeddingEmpty { got: 0, expected: 3 }
        ));
    }

    #[test]
    fn test_envelope_parses_wire_shape() {
        let json = r#"{"predictions":[{"embeddings":{"values":[0.5,-0.5]}}]}"#;
        let response: PredictResponse = serde_json::from_str(json).unwrap();
        let vector = RemoteEmbedder::extract_vector(response, 2).unwrap();
        assert_eq!(vector, vec![0.5, -0.5]);
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        let config = EmbeddingConfig::default();
        assert!(RemoteEmbedder::from_config(&config).is_err());
    }
}
