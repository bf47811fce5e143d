/// LLM Client — the single point of entry for all completion calls in AICan.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All LLM interactions MUST go through `LlmClient`.
///
/// The provider handle is built lazily on first use and shared for the process
/// lifetime. A missing credential fails that first use with `LlmError::Configuration`
/// and is never retried; every other provider failure goes through the bounded
/// retry loop in `LlmClient::complete`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

pub mod gemini;
pub mod prompts;

/// The model used for all plan generations.
/// Hardcoded to keep output structure stable across deployments.
pub const MODEL: &str = "gemini-2.0-flash";
/// Low temperature biases the model toward deterministic, well-formed structure.
pub const TEMPERATURE: f32 = 0.3;
/// A multi-day plan with nutrition suggestions easily exceeds 4k tokens.
pub const MAX_OUTPUT_TOKENS: u32 = 8192;
pub const RESPONSE_MIME_TYPE: &str = "application/json";

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM client is not configured: {0}")]
    Configuration(String),

    #[error("Rate limited by LLM provider after {attempts} attempts: {message}")]
    RateLimited { attempts: u32, message: String },

    #[error("LLM provider unavailable after {attempts} attempts: {message}")]
    UpstreamUnavailable { attempts: u32, message: String },

    #[error("LLM communication failed after {attempts} attempts: {message}")]
    Communication { attempts: u32, message: String },
}

impl LlmError {
    fn exhausted(kind: FailureKind, attempts: u32, message: String) -> Self {
        match kind {
            FailureKind::RateLimited => LlmError::RateLimited { attempts, message },
            FailureKind::UpstreamUnavailable => LlmError::UpstreamUnavailable { attempts, message },
            FailureKind::Communication => LlmError::Communication { attempts, message },
        }
    }
}

/// A single failed attempt as reported by a provider.
///
/// `status` carries the HTTP status when the provider exposes one; `message` is the
/// provider's own description and is only ever logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    UpstreamUnavailable,
    Communication,
}

/// Maps a provider failure onto the failure taxonomy.
///
/// The structured status wins when present. Substring matching on the message is a
/// compatibility shim for failures that arrive without one (transport errors that
/// wrap an upstream response, proxies that rewrite bodies).
pub fn classify(err: &ProviderError) -> FailureKind {
    match err.status {
        Some(429) => FailureKind::RateLimited,
        Some(500) | Some(503) => FailureKind::UpstreamUnavailable,
        Some(_) => FailureKind::Communication,
        None if err.message.contains("429") => FailureKind::RateLimited,
        None if err.message.contains("500") || err.message.contains("503") => {
            FailureKind::UpstreamUnavailable
        }
        None => FailureKind::Communication,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider seam
// ────────────────────────────────────────────────────────────────────────────

/// Parameters for one completion attempt.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: &'a str,
}

impl<'a> CompletionRequest<'a> {
    /// The fixed sampling parameters used for plan generation.
    pub fn json(prompt: &'a str) -> Self {
        Self {
            prompt,
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            response_mime_type: RESPONSE_MIME_TYPE,
        }
    }
}

/// A text-completion backend. One call is one attempt; retries live in `LlmClient`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError>;
}

/// Builds the provider handle. Called at most once per successful initialisation.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn CompletionProvider>, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Waits between attempts. Injected so tests can run the retry loop without delays.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_delay: INITIAL_BACKOFF,
            max_delay: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed_attempt`-th attempt (1-based): 2s, 4s, 8s, 10s, 10s...
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

struct Inner {
    connector: Arc<dyn Connector>,
    provider: OnceCell<Arc<dyn CompletionProvider>>,
    backoff: Arc<dyn Backoff>,
    policy: RetryPolicy,
}

/// The single LLM client used by the plan pipeline.
/// Cheap to clone; all clones share one lazily-built provider handle.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<Inner>,
}

impl LlmClient {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_backoff(connector, Arc::new(TokioBackoff), RetryPolicy::default())
    }

    pub fn with_backoff(
        connector: Arc<dyn Connector>,
        backoff: Arc<dyn Backoff>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                provider: OnceCell::new(),
                backoff,
                policy,
            }),
        }
    }

    /// Returns the shared provider, building it on first use.
    /// Concurrent first callers wait on a single initialisation.
    async fn provider(&self) -> Result<&Arc<dyn CompletionProvider>, LlmError> {
        self.inner
            .provider
            .get_or_try_init(|| async {
                let provider = self.inner.connector.connect().map_err(|e| {
                    error!("Failed to initialize LLM client: {e}");
                    e
                })?;
                info!("LLM client initialized (model: {MODEL})");
                Ok::<_, LlmError>(provider)
            })
            .await
    }

    /// Sends the prompt and returns the raw completion text.
    ///
    /// Retries any provider failure up to `RetryPolicy::max_attempts` total attempts
    /// with exponential backoff. The kind of the final failure is what propagates.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let provider = self.provider().await?;
        let policy = self.inner.policy;
        let max_attempts = policy.max_attempts.max(1);
        let request = CompletionRequest::json(prompt);

        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=max_attempts {
            if let Some(err) = &last_error {
                let delay = policy.delay_after(attempt - 1);
                warn!(
                    "LLM call attempt {}/{} failed ({}), retrying after {}ms...",
                    attempt - 1,
                    max_attempts,
                    err,
                    delay.as_millis()
                );
                self.inner.backoff.wait(delay).await;
            }

            match provider.complete(&request).await {
                Ok(text) => {
                    debug!("LLM call succeeded on attempt {attempt}: {} chars", text.len());
                    return Ok(text);
                }
                Err(err) => last_error = Some(err),
            }
        }

        let err = last_error.unwrap_or_else(|| ProviderError::transport("no attempt was made"));
        let kind = classify(&err);
        error!("LLM call failed after {max_attempts} attempts ({kind:?}): {err}");
        Err(LlmError::exhausted(kind, max_attempts, err.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::*;
    use super::*;

    struct MissingKeyConnector;

    impl Connector for MissingKeyConnector {
        fn connect(&self) -> Result<Arc<dyn CompletionProvider>, LlmError> {
            Err(LlmError::Configuration("GEMINI_API_KEY is not set".to_string()))
        }
    }

    #[test]
    fn test_classify_prefers_structured_status() {
        assert_eq!(
            classify(&ProviderError::new(Some(429), "quota")),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify(&ProviderError::new(Some(503), "overloaded")),
            FailureKind::UpstreamUnavailable
        );
        assert_eq!(
            classify(&ProviderError::new(Some(500), "internal")),
            FailureKind::UpstreamUnavailable
        );
        // A 400 whose body mentions 429 is still a plain communication failure
        assert_eq!(
            classify(&ProviderError::new(Some(400), "field 429 invalid")),
            FailureKind::Communication
        );
    }

    #[test]
    fn test_classify_falls_back_to_message_text() {
        assert_eq!(
            classify(&ProviderError::transport("upstream said 429 Too Many Requests")),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify(&ProviderError::transport("503 Service Unavailable")),
            FailureKind::UpstreamUnavailable
        );
        assert_eq!(
            classify(&ProviderError::transport("connection reset by peer")),
            FailureKind::Communication
        );
    }

    #[test]
    fn test_backoff_starts_at_two_seconds_and_caps_at_ten() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(policy.delay_after(4), Duration::from_secs(10));
        assert_eq!(policy.delay_after(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_complete_returns_first_success() {
        let provider = ScriptedProvider::new(vec![Ok("{}".to_string())]);
        let (client, _, backoff) = scripted_client(provider.clone());

        let text = client.complete("prompt").await.unwrap();

        assert_eq!(text, "{}");
        assert_eq!(provider.calls(), 1);
        assert!(backoff.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_recovers_after_transient_failure() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::new(Some(503), "overloaded")),
            Ok("{\"ok\": true}".to_string()),
        ]);
        let (client, _, backoff) = scripted_client(provider.clone());

        let text = client.complete("prompt").await.unwrap();

        assert_eq!(text, "{\"ok\": true}");
        assert_eq!(provider.calls(), 2);
        assert_eq!(*backoff.delays.lock().unwrap(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_complete_makes_exactly_three_attempts_then_fails() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::transport("connection refused")),
            Err(ProviderError::transport("connection refused")),
            Err(ProviderError::transport("connection refused")),
            Ok("never reached".to_string()),
        ]);
        let (client, _, backoff) = scripted_client(provider.clone());

        let err = client.complete("prompt").await.unwrap_err();

        assert_eq!(provider.calls(), 3);
        assert!(matches!(err, LlmError::Communication { attempts: 3, .. }));
        assert_eq!(
            *backoff.delays.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_final_failure_kind_is_preserved() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::transport("timeout")),
            Err(ProviderError::new(Some(500), "internal")),
            Err(ProviderError::new(Some(429), "quota exceeded")),
        ]);
        let (client, _, _) = scripted_client(provider);

        let err = client.complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_missing_credential_is_not_retried() {
        let backoff = Arc::new(RecordingBackoff::default());
        let client = LlmClient::with_backoff(
            Arc::new(MissingKeyConnector),
            backoff.clone(),
            RetryPolicy::default(),
        );

        let err = client.complete("prompt").await.unwrap_err();

        assert!(matches!(err, LlmError::Configuration(_)));
        assert!(backoff.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_is_initialized_once_under_concurrency() {
        let script = (0..8).map(|_| Ok("{}".to_string())).collect();
        let provider = ScriptedProvider::new(script);
        let (client, connector, _) = scripted_client(provider);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.complete("prompt").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }
}
