use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use docent_core::config::{LlmConfig, LlmProvider};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Sampling and transport settings shared by every provider.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl CompletionSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        }
    }
}

/// Builds the client for the configured provider.
///
/// Returns `None` for the extractive provider, which never calls a model.
pub fn client_from_config(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>> {
    let settings = CompletionSettings::from_config(config);
    let base_url = config.effective_base_url();

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Extractive => return Ok(None),
        LlmProvider::Ollama => {
            let base_url = base_url.ok_or_else(|| anyhow!("ollama requires llm.base_url"))?;
            Arc::new(OllamaClient::new(base_url, settings)?)
        }
        LlmProvider::OpenAi => {
            let base_url = base_url.ok_or_else(|| anyhow!("openai requires llm.base_url"))?;
            let api_key =
                config.api_key.clone().ok_or_else(|| anyhow!("openai requires llm.api_key"))?;
            Arc::new(OpenAiClient::new(base_url, api_key, settings)?)
        }
    };

    Ok(Some(client))
}

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder().timeout(timeout).build().context("failed to build http client")
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Doubling backoff for the `attempt`-th retry, counted from one.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Sends the request built by `build`, retrying transport failures, 429 and
/// 5xx responses up to `max_retries` times with doubling delay.
async fn send_with_retries<T, F>(provider: &'static str, max_retries: u32, build: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0_u32;
    loop {
        let error = match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<T>()
                        .await
                        .with_context(|| format!("{provider} returned an unreadable body"));
                }
                let body = response.text().await.unwrap_or_default();
                let error = anyhow!("{provider} api error ({status}): {}", body.trim());
                if !is_retryable_status(status) {
                    return Err(error);
                }
                error
            }
            Err(error) if error.is_timeout() || error.is_connect() => {
                anyhow::Error::new(error).context(format!("{provider} request failed"))
            }
            Err(error) => {
                return Err(anyhow::Error::new(error).context(format!("{provider} request failed")))
            }
        };

        if attempt >= max_retries {
            return Err(error);
        }
        attempt += 1;
        let delay = retry_delay(attempt);
        warn!(
            event_name = "llm.retry",
            provider,
            attempt,
            max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying llm request"
        );
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Local Ollama daemon, non-streaming `/api/generate`.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    settings: CompletionSettings,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, settings: CompletionSettings) -> Result<Self> {
        Ok(Self { http: http_client(settings.timeout)?, base_url: base_url.into(), settings })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = endpoint(&self.base_url, "/api/generate");
        let body = OllamaGenerateRequest {
            model: &self.settings.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };
        debug!(event_name = "llm.request", provider = "ollama", model = %self.settings.model);

        let response: OllamaGenerateResponse =
            send_with_retries("ollama", self.settings.max_retries, || {
                self.http.post(&url).json(&body)
            })
            .await?;
        Ok(response.response)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible `/v1/chat/completions`.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    settings: CompletionSettings,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        settings: CompletionSettings,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            base_url: base_url.into(),
            api_key,
            settings,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = endpoint(&self.base_url, "/v1/chat/completions");
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(event_name = "llm.request", provider = "openai", model = %self.settings.model);

        let response: ChatCompletionResponse =
            send_with_retries("openai", self.settings.max_retries, || {
                self.http.post(&url).bearer_auth(self.api_key.expose_secret()).json(&body)
            })
            .await?;

        let Some(choice) = response.choices.into_iter().next() else {
            bail!("openai returned no choices");
        };
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docent_core::config::{AppConfig, LlmProvider};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        client_from_config, retry_delay, CompletionSettings, LlmClient, OllamaClient, OpenAiClient,
    };

    #[test]
    fn retry_delay_doubles_and_saturates() {
        assert_eq!(retry_delay(1), Duration::from_millis(250));
        assert_eq!(retry_delay(3), Duration::from_millis(1000));
        assert_eq!(retry_delay(64), Duration::from_millis(250 * u64::from(u32::MAX)));
    }

    fn settings(max_retries: u32) -> CompletionSettings {
        CompletionSettings {
            model: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: 64,
            timeout: Duration::from_secs(5),
            max_retries,
        }
    }

    #[tokio::test]
    async fn ollama_posts_non_streaming_generate_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "prompt": "hello",
                "stream": false,
                "options": {"num_predict": 64}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": "hi there"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), settings(0)).expect("client");
        let text = client.complete("hello").await.expect("completion");

        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn openai_sends_bearer_token_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Refunds take 30 days."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "sk-test".to_string().into(), settings(0))
            .expect("client");
        let text = client.complete("When are refunds issued?").await.expect("completion");

        assert_eq!(text, "Refunds take 30 days.");
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), settings(2)).expect("client");

        assert_eq!(client.complete("ping").await.expect("retried completion"), "ok");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "sk-wrong".to_string().into(), settings(3))
            .expect("client");
        let error = client.complete("hello").await.expect_err("401 should fail");

        assert!(error.to_string().contains("401"));
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), settings(1)).expect("client");

        assert!(client.complete("ping").await.is_err());
    }

    #[test]
    fn extractive_provider_has_no_client() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Extractive;

        let client = client_from_config(&config.llm).expect("factory");

        assert!(client.is_none());
    }

    #[test]
    fn openai_provider_without_key_is_rejected() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::OpenAi;

        assert!(client_from_config(&config.llm).is_err());
    }
}
