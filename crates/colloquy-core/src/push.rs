//! Message pusher collaborator boundary.
//!
//! Transports that can deliver proactive messages (scheduled news reports,
//! admin notifications) implement `MessagePusher`. Long messages are split
//! before delivery because some chat platforms cap message length.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use colloquy_types::error::PushError;
use colloquy_types::identity::UserId;

/// Maximum characters per pushed message part.
pub const MAX_PUSH_LENGTH: usize = 3500;

/// Destination of a proactive push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    User(UserId),
    Group(String),
}

/// Trait for proactive message delivery.
pub trait MessagePusher: Send + Sync {
    fn send_user(
        &self,
        user: &UserId,
        text: &str,
    ) -> impl Future<Output = Result<(), PushError>> + Send;

    fn send_group(
        &self,
        group: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), PushError>> + Send;
}

/// Object-safe version of [`MessagePusher`] with boxed futures.
pub trait MessagePusherDyn: Send + Sync {
    fn send_user_boxed<'a>(
        &'a self,
        user: &'a UserId,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + 'a>>;

    fn send_group_boxed<'a>(
        &'a self,
        group: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + 'a>>;
}

impl<T: MessagePusher> MessagePusherDyn for T {
    fn send_user_boxed<'a>(
        &'a self,
        user: &'a UserId,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + 'a>> {
        Box::pin(self.send_user(user, text))
    }

    fn send_group_boxed<'a>(
        &'a self,
        group: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + 'a>> {
        Box::pin(self.send_group(group, text))
    }
}

/// Shared, type-erased pusher handle.
#[derive(Clone)]
pub struct SharedPusher {
    inner: Arc<dyn MessagePusherDyn>,
}

impl SharedPusher {
    pub fn new<T: MessagePusher + 'static>(pusher: T) -> Self {
        Self {
            inner: Arc::new(pusher),
        }
    }

    /// Deliver `text` to `target`, splitting it into parts of at most
    /// [`MAX_PUSH_LENGTH`] characters.
    pub async fn deliver(&self, target: &PushTarget, text: &str) -> Result<(), PushError> {
        for part in split_message(text, MAX_PUSH_LENGTH) {
            match target {
                PushTarget::User(user) => self.inner.send_user_boxed(user, part).await?,
                PushTarget::Group(group) => self.inner.send_group_boxed(group, part).await?,
            }
        }
        Ok(())
    }
}

/// Split `text` into chunks of at most `max_len` characters, preferring to
/// break at a newline when one falls inside the chunk.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    // A zero-length part can never consume input; clamp so the loop
    // always terminates.
    let max_len = max_len.max(1);
    let mut parts = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if rest.chars().count() <= max_len {
            parts.push(rest);
            break;
        }
        // Byte offset of the max_len-th char.
        let hard_cut = rest
            .char_indices()
            .nth(max_len)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let chunk = &rest[..hard_cut];
        let cut = match chunk.rfind('\n') {
            Some(nl) if nl > 0 => nl,
            _ => hard_cut,
        };
        parts.push(&rest[..cut]);
        rest = rest[cut..].trim_start_matches('\n');
    }
    parts
}
