//! Hybrid ranking: fuse vector similarity with full-text rank
//!
//! Candidates are ordered by `(signals desc, score desc, note id asc)`, where
//! `signals` counts how many of the two retrievers matched the note. A note
//! matched by both therefore never ranks below a note matched by one, and
//! within a tier the score grows with either component.
//!
//! The reported score is `(signals - 1) + fused / max_fused`: the fused value
//! is normalized to [0, 1] and lifted by its tier, so scores read in list
//! order are non-increasing.

use std::collections::HashMap;

use crate::core::config::{FusionStrategy, SearchConfig};

#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    pub strategy: FusionStrategy,
    pub rrf_k: f32,
    pub semantic_weight: f32,
    pub lexical_weight: f32,
    /// Semantic candidates below this similarity do not count as a match
    pub min_similarity: f32,
}

impl From<&SearchConfig> for FusionConfig {
    fn from(cfg: &SearchConfig) -> Self {
        Self {
            strategy: cfg.fusion,
            rrf_k: cfg.rrf_k,
            semantic_weight: cfg.semantic_weight,
            lexical_weight: cfg.lexical_weight,
            min_similarity: cfg.min_similarity,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fused {
    pub note_id: String,
    /// Cosine similarity when the note was a semantic candidate
    pub similarity: Option<f32>,
    /// `-bm25`, when the note matched lexically
    pub lexical_rank: Option<f32>,
    /// Tiered score in [0, 2]
    pub score: f32,
    pub signals: u8,
}

/// Fuse best-first candidate lists.
///
/// `semantic` holds `(note_id, similarity)` sorted by descending similarity,
/// `lexical` holds `(note_id, rank)` sorted by descending rank.
pub fn fuse(semantic: &[(String, f32)], lexical: &[(String, f32)], cfg: &FusionConfig) -> Vec<Fused> {
    let mut fused: HashMap<&str, Fused> = HashMap::new();
    let max_lexical = lexical
        .iter()
        .map(|(_, rank)| *rank)
        .fold(0.0f32, f32::max);

    let mut semantic_position = 0usize;
    for (note_id, similarity) in semantic {
        let entry = fused.entry(note_id.as_str()).or_insert_with(|| empty(note_id));
        entry.similarity = Some(*similarity);
        if *similarity < cfg.min_similarity {
            continue;
        }
        semantic_position += 1;
        entry.signals += 1;
        entry.score += match cfg.strategy {
            FusionStrategy::Rrf => cfg.semantic_weight / (cfg.rrf_k + semantic_position as f32),
            FusionStrategy::Weighted => cfg.semantic_weight * (similarity.clamp(-1.0, 1.0) + 1.0) / 2.0,
        };
    }

    for (position, (note_id, rank)) in lexical.iter().enumerate() {
        let entry = fused.entry(note_id.as_str()).or_insert_with(|| empty(note_id));
        entry.lexical_rank = Some(*rank);
        entry.signals += 1;
        entry.score += match cfg.strategy {
            FusionStrategy::Rrf => cfg.lexical_weight / (cfg.rrf_k + (position + 1) as f32),
            FusionStrategy::Weighted => {
                let normalized = if max_lexical > 0.0 { rank / max_lexical } else { 1.0 };
                cfg.lexical_weight * normalized.max(0.0)
            }
        };
    }

    let max_fused = match cfg.strategy {
        FusionStrategy::Rrf => (cfg.semantic_weight + cfg.lexical_weight) / (cfg.rrf_k + 1.0),
        FusionStrategy::Weighted => cfg.semantic_weight + cfg.lexical_weight,
    };
    let max_fused = if max_fused > 0.0 { max_fused } else { 1.0 };

    let mut results: Vec<Fused> = fused
        .into_values()
        .filter(|f| f.signals > 0)
        .map(|mut f| {
            f.score = f32::from(f.signals - 1) + (f.score / max_fused).clamp(0.0, 1.0);
            f
        })
        .collect();
    results.sort_by(|a, b| {
        b.signals
            .cmp(&a.signals)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.note_id.cmp(&b.note_id))
    });
    results
}

fn empty(note_id: &str) -> Fused {
    Fused {
        note_id: note_id.to_string(),
        similarity: None,
        lexical_rank: None,
        score: 0.0,
        signals: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[(&str, f32)]) -> Vec<(String, f32)> {
        items.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    fn ids(results: &[Fused]) -> Vec<&str> {
        results.iter().map(|f| f.note_id.as_str()).collect()
    }

    fn weighted() -> FusionConfig {
        FusionConfig {
            strategy: FusionStrategy::Weighted,
            ..FusionConfig::default()
        }
    }

    #[test]
    fn test_both_signals_rank_first() {
        let semantic = list(&[("sem-only", 0.95), ("both", 0.90), ("x", 0.5)]);
        let lexical = list(&[("lex-only", 12.0), ("both", 3.0)]);

        for cfg in [FusionConfig::default(), weighted()] {
            let fused = fuse(&semantic, &lexical, &cfg);
            assert_eq!(fused[0].note_id, "both");
            assert_eq!(fused[0].signals, 2);
            assert_eq!(fused[0].similarity, Some(0.90));
            assert_eq!(fused[0].lexical_rank, Some(3.0));
        }
    }

    #[test]
    fn test_scores_descend_in_list_order() {
        // "both" sits deep in each list but still outranks the single-signal leaders
        let mut semantic = list(&[("sem-only", 0.99)]);
        let mut lexical = list(&[("lex-only", 50.0)]);
        for i in 0..100 {
            semantic.push((format!("s{}", i), 0.9 - i as f32 * 0.001));
            lexical.push((format!("l{}", i), 40.0 - i as f32 * 0.1));
        }
        semantic.push(("both".to_string(), 0.3));
        lexical.push(("both".to_string(), 0.5));

        for cfg in [FusionConfig::default(), weighted()] {
            let fused = fuse(&semantic, &lexical, &cfg);
            assert_eq!(fused[0].note_id, "both");
            assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
            assert!(fused.iter().all(|f| (0.0..=2.0).contains(&f.score)));
        }
    }

    #[test]
    fn test_empty_lexical_keeps_semantic_order() {
        let semantic = list(&[("a", 0.9), ("b", 0.7), ("c", 0.1)]);
        for cfg in [FusionConfig::default(), weighted()] {
            let fused = fuse(&semantic, &[], &cfg);
            assert_eq!(ids(&fused), vec!["a", "b", "c"]);
            assert!(fused.iter().all(|f| f.lexical_rank.is_none()));
        }
    }

    #[test]
    fn test_semantic_threshold_drops_weak_matches() {
        let cfg = FusionConfig {
            min_similarity: 0.5,
            ..FusionConfig::default()
        };
        let semantic = list(&[("strong", 0.8), ("weak", 0.2)]);
        let lexical = list(&[("weak", 1.0)]);
        let fused = fuse(&semantic, &lexical, &cfg);

        assert_eq!(fused.len(), 2);
        let weak = fused.iter().find(|f| f.note_id == "weak").expect("weak kept via lexical");
        assert_eq!(weak.signals, 1);
        assert_eq!(weak.similarity, Some(0.2));

        let semantic_only = fuse(&list(&[("weak", 0.2)]), &[], &cfg);
        assert!(semantic_only.is_empty());
    }

    #[test]
    fn test_weighted_is_monotonic_in_similarity() {
        let lexical = list(&[("n", 2.0), ("other", 4.0)]);
        let low = fuse(&list(&[("n", 0.2)]), &lexical, &weighted());
        let high = fuse(&list(&[("n", 0.6)]), &lexical, &weighted());
        let score = |r: &[Fused]| r.iter().find(|f| f.note_id == "n").map(|f| f.score);
        assert!(score(&high) > score(&low));
    }

    #[test]
    fn test_rrf_is_monotonic_in_lexical_position() {
        let semantic = list(&[("n", 0.5), ("m", 0.4)]);
        let first = fuse(&semantic, &list(&[("n", 5.0), ("m", 4.0)]), &FusionConfig::default());
        let second = fuse(&semantic, &list(&[("m", 5.0), ("n", 4.0)]), &FusionConfig::default());
        let score = |r: &[Fused]| r.iter().find(|f| f.note_id == "n").map(|f| f.score);
        assert!(score(&first) > score(&second));
    }

    #[test]
    fn test_ties_break_by_note_id() {
        let fused = fuse(&[], &list(&[("b", 1.0)]), &weighted());
        let fused_two = fuse(&[], &list(&[("b", 1.0), ("a", 1.0)]), &weighted());
        assert_eq!(ids(&fused), vec!["b"]);
        assert_eq!(ids(&fused_two), vec!["a", "b"]);
    }
}
