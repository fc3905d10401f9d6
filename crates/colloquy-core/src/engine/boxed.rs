//! Object-safe dynamic dispatch wrappers for engines and factories.
//!
//! `ChatEngine` and `ChatEngineFactory` use RPITIT and cannot be trait
//! objects directly. The usual blanket-impl pattern applies:
//! 1. Define an object-safe `*Dyn` trait with boxed futures
//! 2. Blanket-impl it for all implementors of the RPITIT trait
//! 3. Wrap `Box<dyn *Dyn>` in a struct that delegates

use std::future::Future;
use std::pin::Pin;

use colloquy_types::error::{EngineError, SessionError};
use colloquy_types::role::RoleDescriptor;
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};

use super::{ChatEngine, ChatEngineFactory};
use crate::llm::BoxLlmClient;

/// Object-safe version of [`ChatEngine`].
pub trait ChatEngineDyn: Send {
    fn turn_boxed<'a>(
        &'a mut self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, EngineError>> + Send + 'a>>;

    fn supports_role_switch(&self) -> bool;

    fn set_bot_role(&mut self, role: RoleDescriptor);

    fn set_user_role(&mut self, name: &str);

    fn set_model(&mut self, client: BoxLlmClient);
}

impl<T: ChatEngine> ChatEngineDyn for T {
    fn turn_boxed<'a>(
        &'a mut self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, EngineError>> + Send + 'a>> {
        Box::pin(self.turn(input))
    }

    fn supports_role_switch(&self) -> bool {
        ChatEngine::supports_role_switch(self)
    }

    fn set_bot_role(&mut self, role: RoleDescriptor) {
        ChatEngine::set_bot_role(self, role)
    }

    fn set_user_role(&mut self, name: &str) {
        ChatEngine::set_user_role(self, name)
    }

    fn set_model(&mut self, client: BoxLlmClient) {
        ChatEngine::set_model(self, client)
    }
}

/// Type-erased chat engine held in the session manager's cache.
pub struct BoxChatEngine {
    inner: Box<dyn ChatEngineDyn>,
}

impl BoxChatEngine {
    pub fn new<T: ChatEngine + 'static>(engine: T) -> Self {
        Self {
            inner: Box::new(engine),
        }
    }

    pub async fn turn(&mut self, input: &str) -> Result<String, EngineError> {
        self.inner.turn_boxed(input).await
    }

    pub fn supports_role_switch(&self) -> bool {
        self.inner.supports_role_switch()
    }

    pub fn set_bot_role(&mut self, role: RoleDescriptor) {
        self.inner.set_bot_role(role)
    }

    pub fn set_user_role(&mut self, name: &str) {
        self.inner.set_user_role(name)
    }

    pub fn set_model(&mut self, client: BoxLlmClient) {
        self.inner.set_model(client)
    }
}

/// Object-safe version of [`ChatEngineFactory`].
pub trait EngineFactoryDyn: Send + Sync {
    fn mode(&self) -> ModeTag;

    fn supports_role_switch(&self) -> bool;

    fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError>;

    fn create_boxed<'a>(
        &'a self,
        meta: &'a SessionMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<BoxChatEngine, SessionError>> + Send + 'a>>;
}

impl<T: ChatEngineFactory> EngineFactoryDyn for T {
    fn mode(&self) -> ModeTag {
        ChatEngineFactory::mode(self)
    }

    fn supports_role_switch(&self) -> bool {
        ChatEngineFactory::supports_role_switch(self)
    }

    fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError> {
        ChatEngineFactory::validate_args(self, args)
    }

    fn create_boxed<'a>(
        &'a self,
        meta: &'a SessionMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<BoxChatEngine, SessionError>> + Send + 'a>> {
        Box::pin(self.create(meta))
    }
}

/// Type-erased engine factory stored in the mode registry.
pub struct BoxEngineFactory {
    inner: Box<dyn EngineFactoryDyn>,
}

impl BoxEngineFactory {
    pub fn new<T: ChatEngineFactory + 'static>(factory: T) -> Self {
        Self {
            inner: Box::new(factory),
        }
    }

    pub fn mode(&self) -> ModeTag {
        self.inner.mode()
    }

    pub fn supports_role_switch(&self) -> bool {
        self.inner.supports_role_switch()
    }

    pub fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError> {
        self.inner.validate_args(args)
    }

    pub async fn create(&self, meta: &SessionMetadata) -> Result<BoxChatEngine, SessionError> {
        self.inner.create_boxed(meta).await
    }
}

impl std::fmt::Debug for BoxEngineFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxEngineFactory")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}
