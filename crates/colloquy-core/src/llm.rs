//! LlmClient trait and model resolution.
//!
//! `LlmClient` is the narrow boundary to language-model inference: one
//! blocking-style chat call over a full message list. Uses native async fn
//! in traits (RPITIT); `BoxLlmClient` provides the object-safe wrapper for
//! engines that hold a client behind dynamic dispatch.

use std::future::Future;
use std::pin::Pin;

use colloquy_types::error::LlmError;
use colloquy_types::turn::ChatTurn;

/// Trait for LLM inference backends.
///
/// Implementations live in colloquy-infra (e.g., the OpenAI-compatible
/// client serving DeepSeek and Ollama).
pub trait LlmClient: Send + Sync {
    /// Model name this client is bound to.
    fn model(&self) -> &str;

    /// Send the full message list and return the assistant reply text.
    fn chat(
        &self,
        messages: &[ChatTurn],
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Object-safe version of [`LlmClient`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch; a blanket implementation
/// covers every `LlmClient`.
pub trait LlmClientDyn: Send + Sync {
    fn model(&self) -> &str;

    fn chat_boxed<'a>(
        &'a self,
        messages: &'a [ChatTurn],
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

impl<T: LlmClient> LlmClientDyn for T {
    fn model(&self) -> &str {
        LlmClient::model(self)
    }

    fn chat_boxed<'a>(
        &'a self,
        messages: &'a [ChatTurn],
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(self.chat(messages))
    }
}

/// Type-erased LLM client held by live engines.
pub struct BoxLlmClient {
    inner: Box<dyn LlmClientDyn>,
}

impl BoxLlmClient {
    pub fn new<T: LlmClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub fn model(&self) -> &str {
        self.inner.model()
    }

    pub async fn chat(&self, messages: &[ChatTurn]) -> Result<String, LlmError> {
        self.inner.chat_boxed(messages).await
    }
}

impl std::fmt::Debug for BoxLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the model name: inner clients hold API keys and must not
        // leak through debug formatting.
        f.debug_struct("BoxLlmClient")
            .field("model", &self.model())
            .finish_non_exhaustive()
    }
}

/// Resolves a user-supplied model name to a ready client.
///
/// Construction is synchronous: resolvers validate the name and build an
/// HTTP client, they do not call the network. An unresolvable name is the
/// `UnknownModel` condition surfaced by `/sl`.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<BoxLlmClient, colloquy_types::error::SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    impl LlmClient for EchoClient {
        fn model(&self) -> &str {
            "echo"
        }

        async fn chat(&self, messages: &[ChatTurn]) -> Result<String, LlmError> {
            Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_box_client_delegates() {
        let client = BoxLlmClient::new(EchoClient);
        assert_eq!(client.model(), "echo");
        let reply = client.chat(&[ChatTurn::user("hi")]).await.unwrap();
        assert_eq!(reply, "hi");
    }
}
