use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::SemanticConfig;

pub(crate) fn stub_dimension(tier: &str) -> usize {
    match tier {
        "fast" => 384,
        "accurate" => 1024,
        _ => 768,
    }
}

/// Offline embedding: a signed feature-hashed bag of lowercase words.
///
/// Texts that share words share coordinates, so the stub is good enough to
/// exercise clustering end to end without a model. Output depends only on
/// the text and the tier.
pub(crate) fn make_stub_embedding(text: &str, cfg: &SemanticConfig) -> Vec<f32> {
    let dim = stub_dimension(&cfg.tier);
    let mut v = vec![0f32; dim];

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let h = hash64(token.to_lowercase().as_bytes());
        let slot = (h % dim as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[slot] += sign;
    }

    if cfg.normalize {
        l2_normalize_in_place(&mut v);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(tier: &str, normalize: bool) -> SemanticConfig {
        SemanticConfig {
            tier: tier.into(),
            normalize,
            ..SemanticConfig::fast()
        }
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn dimension_follows_tier() {
        assert_eq!(make_stub_embedding("hello", &cfg("fast", false)).len(), 384);
        assert_eq!(make_stub_embedding("hello", &cfg("balanced", false)).len(), 768);
        assert_eq!(make_stub_embedding("hello", &cfg("accurate", false)).len(), 1024);
    }

    #[test]
    fn deterministic_and_case_insensitive() {
        let c = cfg("fast", false);
        assert_eq!(
            make_stub_embedding("Rust async runtime", &c),
            make_stub_embedding("rust ASYNC runtime", &c)
        );
    }

    #[test]
    fn shared_words_mean_closer_vectors() {
        let c = cfg("balanced", true);
        let a = make_stub_embedding("new language model released", &c);
        let b = make_stub_embedding("language model benchmark released", &c);
        let z = make_stub_embedding("stock market closes higher", &c);
        assert!(cosine(&a, &b) > cosine(&a, &z));
    }

    #[test]
    fn normalized_output_has_unit_length() {
        let v = make_stub_embedding("one two three", &cfg("fast", true));
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let v = make_stub_embedding("  ", &cfg("fast", true));
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
