//! OpenAI-compatible LLM clients.
//!
//! One [`OpenAiCompatClient`] serves every provider speaking the OpenAI
//! chat completions protocol. DeepSeek and local Ollama are wired up via
//! configurable base URLs; [`LlmClientFactory`] maps model names to
//! clients and is the `ModelResolver` used by `/sl` and the engine
//! factories.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use secrecy::{ExposeSecret, SecretString};

use colloquy_core::llm::{BoxLlmClient, LlmClient, ModelResolver};
use colloquy_types::error::{LlmError, SessionError};
use colloquy_types::turn::{ChatTurn, TurnRole};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Chat client for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the API key lives inside the `async_openai`
/// client and must not leak through debug formatting.
pub struct OpenAiCompatClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.to_string(),
        }
    }

    fn build_request(&self, messages: &[ChatTurn]) -> CreateChatCompletionRequest {
        let oai_messages: Vec<ChatCompletionRequestMessage> = messages
            .iter()
            .map(|turn| match turn.role {
                TurnRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            turn.content.clone(),
                        ),
                        name: None,
                    })
                }
                TurnRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(
                            turn.content.clone(),
                        ),
                        name: None,
                    })
                }
                TurnRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            turn.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            })
            .collect();

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: oai_messages,
            ..Default::default()
        }
    }
}

impl LlmClient for OpenAiCompatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatTurn]) -> Result<String, LlmError> {
        let request = self.build_request(messages);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::Deserialization("response carried no content".to_string()))
    }
}

fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited
            } else {
                LlmError::Provider(err.to_string())
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if reqwest_err.is_timeout() {
                return LlmError::Timeout;
            }
            match reqwest_err.status().map(|s| s.as_u16()) {
                Some(401) => LlmError::AuthenticationFailed,
                Some(429) => LlmError::RateLimited,
                _ => LlmError::Provider(err.to_string()),
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        _ => LlmError::Provider(err.to_string()),
    }
}

/// Maps model names to clients.
///
/// - `deepseek-*` routes to the DeepSeek API and requires an API key.
/// - `ollama/<model>` routes to the local Ollama server's
///   OpenAI-compatible endpoint.
pub struct LlmClientFactory {
    deepseek_api_key: Option<SecretString>,
    ollama_base_url: String,
    timeout: Duration,
}

impl LlmClientFactory {
    pub fn new(
        deepseek_api_key: Option<String>,
        ollama_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            deepseek_api_key: deepseek_api_key.map(SecretString::from),
            ollama_base_url: ollama_base_url.into(),
            timeout,
        }
    }
}

impl ModelResolver for LlmClientFactory {
    fn resolve(&self, name: &str) -> Result<BoxLlmClient, SessionError> {
        if name.starts_with("deepseek") {
            let key = self.deepseek_api_key.as_ref().ok_or_else(|| {
                SessionError::InvalidArgument("deepseek api key is not configured".to_string())
            })?;
            return Ok(BoxLlmClient::new(OpenAiCompatClient::new(
                DEEPSEEK_BASE_URL,
                key.expose_secret(),
                name,
                self.timeout,
            )));
        }
        if let Some(model) = name.strip_prefix("ollama/") {
            if model.is_empty() {
                return Err(SessionError::UnknownModel(name.to_string()));
            }
            let base = format!("{}/v1", self.ollama_base_url.trim_end_matches('/'));
            // Ollama ignores the key but the client requires one.
            return Ok(BoxLlmClient::new(OpenAiCompatClient::new(
                &base,
                "ollama",
                model,
                self.timeout,
            )));
        }
        Err(SessionError::UnknownModel(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(with_key: bool) -> LlmClientFactory {
        LlmClientFactory::new(
            with_key.then(|| "sk-test".to_string()),
            "http://127.0.0.1:11434",
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_resolve_deepseek_requires_key() {
        let client = factory(true).resolve("deepseek-chat").unwrap();
        assert_eq!(client.model(), "deepseek-chat");

        assert!(matches!(
            factory(false).resolve("deepseek-chat").unwrap_err(),
            SessionError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_resolve_ollama_strips_prefix() {
        let client = factory(false).resolve("ollama/qwen3").unwrap();
        assert_eq!(client.model(), "qwen3");
        assert!(matches!(
            factory(false).resolve("ollama/").unwrap_err(),
            SessionError::UnknownModel(_)
        ));
    }

    #[test]
    fn test_resolve_unknown_model() {
        assert!(matches!(
            factory(true).resolve("gpt-4o").unwrap_err(),
            SessionError::UnknownModel(name) if name == "gpt-4o"
        ));
    }

    #[test]
    fn test_request_carries_history_in_order() {
        let client = OpenAiCompatClient::new(
            "https://api.deepseek.com",
            "sk-test",
            "deepseek-chat",
            Duration::from_secs(5),
        );
        let request = client.build_request(&[
            ChatTurn::system("be brief"),
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello"),
            ChatTurn::user("bye"),
        ]);
        assert_eq!(request.model, "deepseek-chat");
        assert_eq!(request.messages.len(), 4);
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            request.messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
    }
}
