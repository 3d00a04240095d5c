//! Tag extraction with remote-first, keyword-fallback behaviour

use super::cache::{content_key, TagCache};
use super::client::{CompletionClient, CompletionError, CompletionRequest};
use crate::config::TaggingConfig;
use crate::metrics;
use regex_lite::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Instruction sent as the system message
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts relevant academic tags \
from research paper descriptions. Return only a comma-separated list of tags, no explanations.";

/// Characters stripped from both ends of every tag
const TAG_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '"', '\'', '(', ')', '[', ']', '{', '}',
];

/// Where a tag list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    /// Blank input, nothing attempted
    Empty,
    Remote,
    Cache,
    Fallback,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::Empty => "empty",
            TagSource::Remote => "remote",
            TagSource::Cache => "cache",
            TagSource::Fallback => "fallback",
        }
    }
}

/// Why keyword extraction was used instead of the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingCredential,
    QuotaExceeded,
    RateLimited,
    AuthenticationFailed,
    UpstreamStatus(u16),
    Transport,
    MalformedResponse,
}

impl FallbackReason {
    /// Metrics label
    pub fn as_label(&self) -> &'static str {
        match self {
            FallbackReason::MissingCredential => "missing_credential",
            FallbackReason::QuotaExceeded => "quota_exceeded",
            FallbackReason::RateLimited => "rate_limited",
            FallbackReason::AuthenticationFailed => "authentication_failed",
            FallbackReason::UpstreamStatus(_) => "upstream_status",
            FallbackReason::Transport => "transport",
            FallbackReason::MalformedResponse => "malformed_response",
        }
    }
}

impl From<&CompletionError> for FallbackReason {
    fn from(err: &CompletionError) -> Self {
        match err {
            CompletionError::Status { error_type: Some(kind), .. }
                if kind == "insufficient_quota" || kind == "quota_exceeded" =>
            {
                FallbackReason::QuotaExceeded
            }
            CompletionError::Status { status: 429, .. } => FallbackReason::RateLimited,
            CompletionError::Status { status: 401, .. } => FallbackReason::AuthenticationFailed,
            CompletionError::Status { status, .. } => FallbackReason::UpstreamStatus(*status),
            CompletionError::Transport(_) => FallbackReason::Transport,
            CompletionError::Malformed(_) => FallbackReason::MalformedResponse,
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MissingCredential => {
                f.write_str("No OpenAI API key configured")
            }
            FallbackReason::QuotaExceeded => {
                f.write_str("OpenAI API unavailable (quota exceeded)")
            }
            FallbackReason::RateLimited => {
                f.write_str("OpenAI API unavailable (rate limited)")
            }
            FallbackReason::AuthenticationFailed => {
                f.write_str("OpenAI API unavailable (authentication failed)")
            }
            FallbackReason::UpstreamStatus(status) => {
                write!(f, "OpenAI API unavailable (HTTP {})", status)
            }
            FallbackReason::Transport => {
                f.write_str("OpenAI API unavailable (connection failed)")
            }
            FallbackReason::MalformedResponse => {
                f.write_str("OpenAI API unavailable (unexpected response)")
            }
        }
    }
}

impl Serialize for FallbackReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one extraction call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagExtraction {
    pub tags: Vec<String>,
    pub source: TagSource,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
}

impl TagExtraction {
    fn empty() -> Self {
        Self {
            tags: Vec::new(),
            source: TagSource::Empty,
            fallback_used: false,
            fallback_reason: None,
        }
    }

    fn from_service(tags: Vec<String>, source: TagSource) -> Self {
        Self {
            tags,
            source,
            fallback_used: false,
            fallback_reason: None,
        }
    }

    fn fallback(tags: Vec<String>, reason: FallbackReason) -> Self {
        Self {
            tags,
            source: TagSource::Fallback,
            fallback_used: true,
            fallback_reason: Some(reason),
        }
    }
}

/// Turns free text into a short list of topical tags
pub struct TagExtractor {
    client: Option<Arc<dyn CompletionClient>>,
    cache: Arc<dyn TagCache>,
    config: TaggingConfig,
}

impl TagExtractor {
    /// `client` is `None` when no credential is configured
    pub fn new(
        client: Option<Arc<dyn CompletionClient>>,
        cache: Arc<dyn TagCache>,
        config: TaggingConfig,
    ) -> Self {
        Self { client, cache, config }
    }

    /// Extract tags from `text`. Never fails; every remote problem
    /// degrades to keyword extraction.
    pub async fn extract(&self, text: Option<&str>) -> TagExtraction {
        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return TagExtraction::empty(),
        };

        let outcome = match &self.client {
            None => {
                tracing::warn!("OpenAI API key not configured. Using fallback tag extraction.");
                self.fallback(text, FallbackReason::MissingCredential)
            }
            Some(client) => match self.remote_tags(client.as_ref(), text).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    let reason = FallbackReason::from(&err);
                    log_remote_failure(&err, reason, text.len());
                    self.fallback(text, reason)
                }
            },
        };

        metrics::record_tag_extraction(
            outcome.source.as_str(),
            outcome.fallback_reason.as_ref().map(FallbackReason::as_label),
        );
        outcome
    }

    async fn remote_tags(
        &self,
        client: &dyn CompletionClient,
        text: &str,
    ) -> Result<TagExtraction, CompletionError> {
        let key = content_key(text);

        if let Some(tags) = self.cache.get(&key).await {
            metrics::record_cache(true, "tags");
            return Ok(TagExtraction::from_service(tags, TagSource::Cache));
        }
        metrics::record_cache(false, "tags");

        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_prompt(text),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let content = client.complete(&request).await?;
        tracing::debug!(model = client.model_name(), content = %content, "Tag completion received");

        let tags = parse_tags(&content, &self.config);
        self.cache.put(&key, &tags, self.config.cache_ttl()).await;

        Ok(TagExtraction::from_service(tags, TagSource::Remote))
    }

    fn fallback(&self, text: &str, reason: FallbackReason) -> TagExtraction {
        TagExtraction::fallback(keyword_tags(text, &self.config), reason)
    }
}

fn log_remote_failure(err: &CompletionError, reason: FallbackReason, description_length: usize) {
    tracing::warn!(
        error = %err,
        reason = reason.as_label(),
        description_length,
        "OpenAI API request failed"
    );

    match reason {
        FallbackReason::QuotaExceeded => {
            tracing::warn!("OpenAI API quota exceeded - using fallback tag extraction")
        }
        FallbackReason::RateLimited => {
            tracing::warn!("OpenAI API rate limited - using fallback tag extraction")
        }
        FallbackReason::AuthenticationFailed => {
            tracing::error!("OpenAI API authentication failed - check API key")
        }
        _ => {}
    }
}

/// User message asking for 5-10 tags from `text`
pub fn build_prompt(text: &str) -> String {
    format!(
        "Extract 5-10 relevant academic tags from this research paper description. \
         Focus on key concepts, methodologies, and subject areas. \
         The text may contain HTML tags, ignore them. \
         Return only the tags separated by commas:\n\n{}",
        text
    )
}

/// Parse a comma-separated completion into at most `max_tags` tags
pub fn parse_tags(content: &str, config: &TaggingConfig) -> Vec<String> {
    let candidates = content
        .split(',')
        .map(str::trim)
        .filter(|tag| tag.chars().count() > config.min_tag_len)
        .map(|tag| tag.trim_matches(|c: char| c.is_whitespace() || TAG_PUNCTUATION.contains(&c)));

    dedup_nonempty(candidates, config.max_tags)
}

/// Local keyword extraction used when the remote service is unavailable
pub fn keyword_tags(text: &str, config: &TaggingConfig) -> Vec<String> {
    let stripped = markup_pattern().replace_all(text, " ");
    let lowered = stripped.to_lowercase();

    let stop_words: HashSet<&str> = config.stop_words.iter().map(String::as_str).collect();

    let keywords = lowered
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| TAG_PUNCTUATION.contains(&c)))
        .filter(|word| word.chars().count() > config.min_keyword_len)
        .filter(|word| !stop_words.contains(word));

    dedup_nonempty(keywords, config.fallback_max_tags)
}

fn dedup_nonempty<'a>(tags: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(*tag))
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("static markup pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagging::MemoryTagCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted completion client that counts calls
    struct ScriptedClient {
        reply: std::result::Result<String, CompletionError>,
        calls: AtomicUsize,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn replying(content: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(content.to_string()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn failing(err: CompletionError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.reply.clone()
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const ABSTRACT: &str = "This research paper discusses machine learning algorithms and \
        artificial intelligence applications in modern computing systems.";

    fn extractor_with(client: Option<Arc<ScriptedClient>>) -> TagExtractor {
        TagExtractor::new(
            client.map(|c| c as Arc<dyn CompletionClient>),
            Arc::new(MemoryTagCache::new()),
            TaggingConfig::default(),
        )
    }

    fn status(status: u16, error_type: Option<&str>) -> CompletionError {
        CompletionError::Status {
            status,
            error_type: error_type.map(str::to_string),
            message: None,
        }
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_call() {
        let client = ScriptedClient::replying("a, b");
        let extractor = extractor_with(Some(client.clone()));

        for input in [None, Some(""), Some("   ")] {
            let outcome = extractor.extract(input).await;
            assert!(outcome.tags.is_empty());
            assert!(!outcome.fallback_used);
            assert_eq!(outcome.source, TagSource::Empty);
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_tags_trimmed_and_deduplicated() {
        let client = ScriptedClient::replying("  machine learning  ,  AI  ,  AI  ");
        let extractor = extractor_with(Some(client.clone()));

        let outcome = extractor.extract(Some(ABSTRACT)).await;
        assert_eq!(outcome.tags, vec!["machine learning", "AI"]);
        assert_eq!(outcome.source, TagSource::Remote);
        assert!(!outcome.fallback_used);
        assert_eq!(outcome.fallback_reason, None);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let client = ScriptedClient::replying("a, b");
        let extractor = extractor_with(Some(client.clone()));
        extractor.extract(Some("<p>Graph neural networks</p>")).await;

        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.system, SYSTEM_PROMPT);
        assert!(request.user.contains("<p>Graph neural networks</p>"));
        assert!(request.user.contains("ignore them"));
        assert_eq!(request.max_tokens, 150);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_identical_text_is_served_from_cache() {
        let client = ScriptedClient::replying("ai, robotics");
        let extractor = extractor_with(Some(client.clone()));

        let first = extractor.extract(Some(ABSTRACT)).await;
        let second = extractor.extract(Some(ABSTRACT)).await;

        assert_eq!(client.calls(), 1);
        assert_eq!(first.tags, second.tags);
        assert_eq!(second.source, TagSource::Cache);
        assert!(!second.fallback_used);
    }

    #[tokio::test]
    async fn test_different_text_misses_cache() {
        let client = ScriptedClient::replying("ai, robotics");
        let extractor = extractor_with(Some(client.clone()));

        extractor.extract(Some(ABSTRACT)).await;
        extractor.extract(Some("Quantum error correction codes")).await;
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_falls_back() {
        let client = ScriptedClient::failing(status(429, Some("rate_limit_exceeded")));
        let extractor = extractor_with(Some(client.clone()));

        let outcome = extractor.extract(Some(ABSTRACT)).await;
        assert!(outcome.fallback_used);
        assert!(!outcome.tags.is_empty());
        assert_eq!(outcome.fallback_reason, Some(FallbackReason::RateLimited));
        assert_eq!(outcome.source, TagSource::Fallback);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let client = ScriptedClient::failing(status(500, None));
        let extractor = extractor_with(Some(client.clone()));

        extractor.extract(Some(ABSTRACT)).await;
        extractor.extract(Some(ABSTRACT)).await;
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_credential_reason() {
        let extractor = extractor_with(None);

        let outcome = extractor.extract(Some(ABSTRACT)).await;
        assert!(outcome.fallback_used);
        assert!(!outcome.tags.is_empty());
        let reason = outcome.fallback_reason.unwrap();
        assert_eq!(reason, FallbackReason::MissingCredential);
        assert!(reason.to_string().contains("No OpenAI API key configured"));
    }

    #[tokio::test]
    async fn test_flag_resets_between_calls() {
        let client = ScriptedClient::replying("ai");
        let extractor = extractor_with(Some(client));

        let ok = extractor.extract(Some(ABSTRACT)).await;
        assert!(!ok.fallback_used);

        let fallback =
            TagExtractor::new(None, Arc::new(MemoryTagCache::new()), TaggingConfig::default())
                .extract(Some(ABSTRACT))
                .await;
        assert!(fallback.fallback_used);

        let again = extractor.extract(Some(ABSTRACT)).await;
        assert!(!again.fallback_used);
        assert_eq!(again.fallback_reason, None);
    }

    #[test]
    fn test_fallback_reason_classification() {
        assert_eq!(
            FallbackReason::from(&status(429, Some("insufficient_quota"))),
            FallbackReason::QuotaExceeded
        );
        assert_eq!(
            FallbackReason::from(&status(403, Some("quota_exceeded"))),
            FallbackReason::QuotaExceeded
        );
        assert_eq!(FallbackReason::from(&status(429, None)), FallbackReason::RateLimited);
        assert_eq!(FallbackReason::from(&status(401, None)), FallbackReason::AuthenticationFailed);
        assert_eq!(FallbackReason::from(&status(503, None)), FallbackReason::UpstreamStatus(503));
        assert_eq!(
            FallbackReason::from(&CompletionError::Transport("timed out".into())),
            FallbackReason::Transport
        );
        assert!(FallbackReason::RateLimited.to_string().contains("unavailable"));
    }

    #[test]
    fn test_parse_truncates_to_ten() {
        let content = (1..=15).map(|i| format!("tag{}", i)).collect::<Vec<_>>().join(", ");
        let tags = parse_tags(&content, &TaggingConfig::default());

        assert_eq!(tags.len(), 10);
        assert_eq!(tags.first().map(String::as_str), Some("tag1"));
        assert_eq!(tags.last().map(String::as_str), Some("tag10"));
    }

    #[test]
    fn test_parse_order_preserving_dedup() {
        let config = TaggingConfig {
            min_tag_len: 0,
            ..TaggingConfig::default()
        };
        let tags = parse_tags("a, b, a, c", &config);
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_strips_punctuation_and_short_tags() {
        let tags = parse_tags(
            "\"Deep Learning\", x, (NLP), ..., Transformers.",
            &TaggingConfig::default(),
        );
        assert_eq!(tags, vec!["Deep Learning", "NLP", "Transformers"]);
    }

    #[test]
    fn test_keyword_fallback() {
        let tags = keyword_tags(
            "<p>The Analysis of Neural Networks, and neural networks between layers.</p>",
            &TaggingConfig::default(),
        );
        assert_eq!(tags, vec!["analysis", "neural", "networks", "layers"]);
    }

    #[test]
    fn test_keyword_fallback_caps_at_eight() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo";
        let tags = keyword_tags(text, &TaggingConfig::default());
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[0], "alpha");
    }
}
