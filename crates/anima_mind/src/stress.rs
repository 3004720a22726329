//! Two-stage user stress detection.
//!
//! Stage 1 is a fixed set of case-insensitive regex patterns covering English
//! and Spanish idioms of correction, frustration, and "I already told you".
//! Stage 2, when an embedding provider is available, compares the utterance
//! against five reference phrases by cosine similarity. Embedding failures
//! degrade to "not detected"; stress is only logged on a confident signal.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use tokio::sync::Mutex;

/// Similarity threshold for the semantic pass.
pub const SEMANTIC_THRESHOLD: f32 = 0.75;

const STRESS_PATTERNS: &[&str] = &[
    // English: correction
    r"(?i)\bno[,.!]?\s+(that('|’)?s|that is|this is)\s+(wrong|incorrect|not right|not it)",
    r"(?i)\bthat('|’)?s not what i (asked|meant|said|wanted)",
    r"(?i)\bnot what i (asked|meant|said|wanted)\b",
    r"(?i)\byou('|’)?re (wrong|still wrong|not listening)",
    // English: "I already told you"
    r"(?i)\bi (already|just) (told|said|asked|explained)",
    r"(?i)\b(again|still)\s*[?!]+\s*$",
    r"(?i)\bhow many times\b",
    // English: frustration
    r"(?i)\b(this is|so|really) (frustrating|annoying)\b",
    r"(?i)\bstop (doing|saying|repeating) that\b",
    r"(?i)\bwhy (do|did|are) you keep\b",
    r"(?i)\bforget it\b",
    // Spanish: correction
    r"(?i)no es (lo que|eso lo que) (ped[ií]|quer[ií]a|dije)",
    r"(?i)\best[áa]s? (mal|equivocad[oa])\b",
    r"(?i)\bno era eso\b",
    // Spanish: "ya te lo dije"
    r"(?i)\bya te (lo )?(dije|expliqu[ée]|ped[ií])",
    r"(?i)\bcu[áa]ntas veces\b",
    // Spanish: frustration
    r"(?i)\botra vez (no|mal)\b",
    r"(?i)\bqu[ée] (frustrante|molesto)\b",
];

/// Reference phrases for the semantic pass, embedded once per provider.
const REFERENCE_PHRASES: [&str; 5] = [
    "No, that's wrong, I already told you.",
    "This is not what I asked for.",
    "You keep making the same mistake over and over.",
    "Eso no es lo que pedí, hazlo de nuevo.",
    "Ya te lo dije varias veces y sigues igual.",
];

fn stress_regexes() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| {
        STRESS_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("stress pattern must compile"))
            .collect()
    })
}

/// How a stress verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    Regex,
    Semantic,
    None,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Semantic => "semantic",
            Self::None => "none",
        }
    }
}

/// Outcome of stress classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressSignal {
    pub detected: bool,
    /// 0..=5; regex hits are 3, semantic hits 2.
    pub intensity: u8,
    pub method: DetectionMethod,
}

impl StressSignal {
    fn none() -> Self {
        Self { detected: false, intensity: 0, method: DetectionMethod::None }
    }
}

/// Opaque embedding provider injected by the host runtime.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Stage 1 alone: does any fixed pattern match?
pub fn detect_stress_regex(utterance: &str) -> bool {
    stress_regexes().iter().any(|re| re.is_match(utterance))
}

/// Cosine similarity with a denominator floor of 1 and 0 on length mismatch.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum();
    let norm_b: f32 = b.iter().map(|x| x * x).sum();
    dot / (norm_a * norm_b).sqrt().max(1.0)
}

struct PhraseCache {
    provider_key: String,
    vectors: Vec<Vec<f32>>,
}

/// The two-stage detector. Holds a single-slot cache of reference-phrase
/// embeddings, keyed by provider; a provider change rebuilds it.
pub struct StressDetector {
    cache: Mutex<Option<PhraseCache>>,
    threshold: f32,
}

impl Default for StressDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl StressDetector {
    pub fn new() -> Self {
        Self { cache: Mutex::new(None), threshold: SEMANTIC_THRESHOLD }
    }

    pub fn from_config(config: &anima_core::MindConfig) -> Self {
        Self { cache: Mutex::new(None), threshold: config.semantic_threshold }
    }

    /// Classify an utterance. The semantic stage only runs when the regex
    /// stage found nothing and an embedder is supplied.
    pub async fn detect(
        &self,
        utterance: &str,
        embedder: Option<&dyn Embedder>,
        provider_key: &str,
    ) -> StressSignal {
        if detect_stress_regex(utterance) {
            return StressSignal { detected: true, intensity: 3, method: DetectionMethod::Regex };
        }

        let embedder = match embedder {
            Some(e) => e,
            None => return StressSignal::none(),
        };

        match self.semantic_pass(utterance, embedder, provider_key).await {
            Ok(Some(signal)) => signal,
            Ok(None) => StressSignal::none(),
            Err(e) => {
                tracing::debug!("Semantic stress pass failed, falling back: {}", e);
                StressSignal::none()
            }
        }
    }

    async fn semantic_pass(
        &self,
        utterance: &str,
        embedder: &dyn Embedder,
        provider_key: &str,
    ) -> Result<Option<StressSignal>> {
        let mut cache = self.cache.lock().await;

        let stale = match cache.as_ref() {
            Some(c) => c.provider_key != provider_key,
            None => true,
        };
        if stale {
            let mut vectors = Vec::with_capacity(REFERENCE_PHRASES.len());
            for phrase in REFERENCE_PHRASES {
                vectors.push(embedder.embed(phrase).await?);
            }
            *cache = Some(PhraseCache { provider_key: provider_key.to_string(), vectors });
            tracing::debug!("Rebuilt stress reference cache for provider '{}'", provider_key);
        }

        let input = embedder.embed(utterance).await?;
        let best = cache
            .as_ref()
            .map(|c| {
                c.vectors
                    .iter()
                    .map(|v| cosine_similarity(&input, v))
                    .fold(f32::MIN, f32::max)
            })
            .unwrap_or(0.0);

        if best > self.threshold {
            Ok(Some(StressSignal {
                detected: true,
                intensity: 2,
                method: DetectionMethod::Semantic,
            }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_regex_detects_english_correction() {
        assert!(detect_stress_regex("no, that's wrong"));
        assert!(detect_stress_regex("No, that is wrong."));
        assert!(detect_stress_regex("that's not what I asked"));
        assert!(detect_stress_regex("I already told you to use tabs"));
    }

    #[test]
    fn test_regex_detects_spanish() {
        assert!(detect_stress_regex("no es lo que pedí"));
        assert!(detect_stress_regex("ya te lo dije"));
        assert!(detect_stress_regex("estás mal"));
    }

    #[test]
    fn test_regex_ignores_calm_text() {
        assert!(!detect_stress_regex("great, thanks!"));
        assert!(!detect_stress_regex("please read the next file"));
        assert!(!detect_stress_regex("muchas gracias, perfecto"));
    }

    #[test]
    fn test_cosine_mismatch_and_floor() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        // Tiny vectors: denominator floored at 1, similarity stays small
        // instead of blowing up toward 1.
        let sim = cosine_similarity(&[0.1, 0.0], &[0.1, 0.0]);
        assert!((sim - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_identical_unit_scale() {
        // Vectors with squared-norm product >= 1 behave like plain cosine.
        let a = vec![3.0, 4.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    /// Embedder returning a fixed vector per text prefix, counting calls.
    struct MockEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockEmbedder {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail }
        }
    }

    #[async_trait::async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("provider unavailable");
            }
            // Reference phrases land on one axis, everything else on another,
            // so similarity is 1.0 for "stressed" inputs and 0.0 otherwise.
            if REFERENCE_PHRASES.contains(&text) || text.starts_with("upset:") {
                Ok(vec![2.0, 0.0])
            } else {
                Ok(vec![0.0, 2.0])
            }
        }
    }

    #[tokio::test]
    async fn test_semantic_detection() {
        let detector = StressDetector::new();
        let embedder = MockEmbedder::new(false);

        let signal = detector.detect("upset: everything is subtly off", Some(&embedder), "p1").await;
        assert!(signal.detected);
        assert_eq!(signal.intensity, 2);
        assert_eq!(signal.method, DetectionMethod::Semantic);

        let signal = detector.detect("a pleasant unrelated remark", Some(&embedder), "p1").await;
        assert!(!signal.detected);
        assert_eq!(signal.method, DetectionMethod::None);
    }

    #[tokio::test]
    async fn test_regex_takes_priority_over_semantic() {
        let detector = StressDetector::new();
        let embedder = MockEmbedder::new(false);
        let signal = detector.detect("no, that's wrong", Some(&embedder), "p1").await;
        assert_eq!(signal.method, DetectionMethod::Regex);
        assert_eq!(signal.intensity, 3);
        // Regex short-circuits: no embedding calls at all.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_change_invalidates_cache() {
        let detector = StressDetector::new();
        let embedder = MockEmbedder::new(false);

        detector.detect("hello there", Some(&embedder), "p1").await;
        let after_first = embedder.calls.load(Ordering::SeqCst);
        assert_eq!(after_first, REFERENCE_PHRASES.len() + 1);

        // Same provider: only the input is embedded.
        detector.detect("hello again", Some(&embedder), "p1").await;
        assert_eq!(embedder.calls.load(Ordering::SeqCst), after_first + 1);

        // New provider: references are re-embedded.
        detector.detect("hello once more", Some(&embedder), "p2").await;
        assert_eq!(
            embedder.calls.load(Ordering::SeqCst),
            after_first + 1 + REFERENCE_PHRASES.len() + 1
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_falls_back_to_not_detected() {
        let detector = StressDetector::new();
        let embedder = MockEmbedder::new(true);
        let signal = detector.detect("a neutral sentence", Some(&embedder), "p1").await;
        assert!(!signal.detected);
        assert_eq!(signal.method, DetectionMethod::None);
    }

    #[tokio::test]
    async fn test_configured_threshold_is_honored() {
        let mut config = anima_core::MindConfig::default();
        config.semantic_threshold = 1.5; // unreachable: even identical vectors score 1.0
        let detector = StressDetector::from_config(&config);
        let embedder = MockEmbedder::new(false);
        let signal = detector.detect("upset: subtle trouble", Some(&embedder), "p1").await;
        assert!(!signal.detected);
    }

    #[tokio::test]
    async fn test_no_embedder_means_regex_only() {
        let detector = StressDetector::new();
        let signal = detector.detect("a neutral sentence", None, "p1").await;
        assert!(!signal.detected);
        assert_eq!(signal.intensity, 0);
    }
}
