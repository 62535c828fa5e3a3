//! Embedding providers
//!
//! A provider turns text into fixed-length vectors. The query side and the
//! note side must use the same provider so that vectors are comparable: the
//! store only ranks vectors recorded under the provider's model, and
//! `embed_one` rejects any vector whose length differs from
//! [`EmbeddingProvider::dimensions`].

use std::f64::consts::PI;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::config::{EmbeddingConfig, ProviderKind};
use crate::error::{Error, Result};

use super::openai::OpenAiEmbeddings;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
    Self: Send + Sync,
{
    /// Model identifier recorded next to every stored vector
    fn model(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embed `texts`, returning one vector per input in input order
    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

    /// Embed a single text and check its dimensionality
    fn embed_one<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async move {
            let texts = [text.to_string()];
            let mut vectors = self.embed(&texts).await?;
            if vectors.len() != 1 {
                return Err(Error::provider(format!(
                    "Expected 1 embedding, provider returned {}",
                    vectors.len()
                )));
            }
            let vector = vectors.remove(0);
            if vector.len() != self.dimensions() {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions(),
                    actual: vector.len(),
                });
            }
            Ok(vector)
        })
    }
}

/// Build the provider named in the config
pub fn build_provider(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match cfg.provider {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiEmbeddings::new(cfg)?)),
        ProviderKind::Local => Ok(Arc::new(HarmonicEmbeddings::new(cfg.dimensions)?)),
    }
}

/// Model identifier the configured provider records, without building it
pub fn model_id(cfg: &EmbeddingConfig) -> String {
    match cfg.provider {
        ProviderKind::OpenAi => cfg.model.clone(),
        ProviderKind::Local => harmonic_model(cfg.dimensions),
    }
}

fn harmonic_model(dimensions: usize) -> String {
    format!("harmonic-token-projection-{}", dimensions)
}

/// Cosine similarity in [-1, 1]. Zero vectors and length mismatches score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Maximum token length (Unicode code points) considered by the projection
const MAX_TOKEN_CHARS: usize = 64;

/// Harmonic Token Projection
///
/// Deterministic, training-free embeddings: each token is read as a
/// base-2^16 integer `N`, reduced modulo the first `dimensions / 2` primes,
/// and each residue `r` mod `m` is projected onto the unit circle as
/// `[sin(2πr/m), cos(2πr/m)]`. Token vectors are mean-pooled and L2
/// normalized. See <https://arxiv.org/html/2511.20665>.
///
/// Shared tokens drive similarity; there is no semantic understanding, which
/// makes it a good offline fallback and a predictable test double.
pub struct HarmonicEmbeddings {
    moduli: Vec<u64>,
    model: String,
}

impl HarmonicEmbeddings {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 || dimensions % 2 != 0 {
            return Err(Error::config(format!(
                "Harmonic embeddings need a positive even dimension, got {}",
                dimensions
            )));
        }
        Ok(Self {
            moduli: first_primes(dimensions / 2),
            model: harmonic_model(dimensions),
        })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let dims = self.moduli.len() * 2;
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![0.0; dims];
        }

        let mut pooled = vec![0.0f64; dims];
        for token in &tokens {
            let n = token_to_integer(token);
            for (i, &m) in self.moduli.iter().enumerate() {
                let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
                pooled[2 * i] += theta.sin();
                pooled[2 * i + 1] += theta.cos();
            }
        }

        let count = tokens.len() as f64;
        for val in &mut pooled {
            *val /= count;
        }

        let norm = pooled.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            pooled.iter().map(|x| (x / norm) as f32).collect()
        } else {
            pooled.iter().map(|x| *x as f32).collect()
        }
    }
}

impl EmbeddingProvider for HarmonicEmbeddings {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.moduli.len() * 2
    }

    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        let vectors = texts.iter().map(|t| self.embed_text(t)).collect();
        Box::pin(async move { Ok(vectors) })
    }
}

/// Lowercased words split on whitespace and ASCII punctuation
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_CHARS)
        .fold(0u64, |n, c| n.wrapping_mul(65_536).wrapping_add(c as u64))
}

fn first_primes(count: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_matches_built_provider() -> Result<()> {
        let cfg = EmbeddingConfig::local(8);
        assert_eq!(model_id(&cfg), build_provider(&cfg)?.model());

        let remote = EmbeddingConfig {
            model: "text-embedding-3-large".to_string(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(model_id(&remote), "text-embedding-3-large");
        assert!(matches!(build_provider(&remote), Err(Error::Config { .. })));
        Ok(())
    }

    #[test]
    fn test_first_primes() {
        assert_eq!(first_primes(8), vec![2, 3, 5, 7, 11, 13, 17, 19]);
        assert_eq!(first_primes(192).last(), Some(&1163));
    }

    #[test]
    fn test_harmonic_is_deterministic_and_normalized() -> Result<()> {
        let a = HarmonicEmbeddings::new(384)?;
        let b = HarmonicEmbeddings::new(384)?;

        let emb1 = a.embed_text("project status update");
        let emb2 = b.embed_text("project status update");
        assert_eq!(emb1, emb2);
        assert_eq!(emb1.len(), 384);

        let norm: f32 = emb1.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);

        assert_ne!(emb1, a.embed_text("cooking recipes"));
        Ok(())
    }

    #[test]
    fn test_harmonic_shared_tokens_score_higher() -> Result<()> {
        let model = HarmonicEmbeddings::new(384)?;
        let query = model.embed_text("quarterly budget review");
        let related = model.embed_text("Budget review for the quarter");
        let unrelated = model.embed_text("sourdough starter feeding schedule");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
        Ok(())
    }

    #[test]
    fn test_harmonic_empty_text_is_zero_vector() -> Result<()> {
        let model = HarmonicEmbeddings::new(16)?;
        assert_eq!(model.embed_text("  ... "), vec![0.0; 16]);
        Ok(())
    }

    #[test]
    fn test_harmonic_rejects_odd_dimensions() {
        assert!(HarmonicEmbeddings::new(7).is_err());
        assert!(HarmonicEmbeddings::new(0).is_err());
    }

    #[tokio::test]
    async fn test_embed_one_checks_dimensions() -> Result<()> {
        let model = HarmonicEmbeddings::new(32)?;
        let vector = model.embed_one("hello world").await?;
        assert_eq!(vector.len(), 32);
        Ok(())
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }
}
