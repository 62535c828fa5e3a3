//! OpenAI-compatible embeddings over HTTP

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;

use crate::core::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::{BoxFuture, EmbeddingProvider};

pub struct OpenAiEmbeddings {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddings {
    /// Fails with [`Error::Config`] when no API key is configured
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let api_key = cfg.require_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .default_headers(auth_headers(api_key, cfg)?)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path),
            model: cfg.model.clone(),
            dimensions: cfg.dimensions,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dimensions,
        });
        let res = self.client.post(&self.url).json(&body).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::provider(format!(
                "Embedding request failed with status {}",
                status
            )));
        }

        let json: Value = res.json().await?;
        let vectors = parse_embedding_response(json)?;
        if vectors.len() != texts.len() {
            return Err(Error::provider(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

impl EmbeddingProvider for OpenAiEmbeddings {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(self.request(texts))
    }
}

fn auth_headers(api_key: &str, cfg: &EmbeddingConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        format!("Bearer {}", api_key)
            .parse()
            .map_err(|_| Error::config("embedding.api_key is not a valid header value"))?,
    );
    for (key, value) in &cfg.default_headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| Error::config(format!("Invalid header name in default_headers: {}", key)))?;
        let value = value
            .parse()
            .map_err(|_| Error::config(format!("Invalid value for default header {}", key)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::provider("Embedding response is missing data array"))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (fallback_index, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(fallback_index);
        let embedding = item
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::provider("Embedding item missing embedding array"))?;
        let vector = embedding
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .map(|n| n as f32)
                    .ok_or_else(|| Error::provider("Embedding value must be numeric"))
            })
            .collect::<Result<Vec<f32>>>()?;
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
