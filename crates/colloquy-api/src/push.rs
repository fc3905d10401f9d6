//! Outbound push sinks for the `clqy` process.
//!
//! Scheduled news reports are addressed to users and groups, but this
//! binary has no chat platform attached. In interactive chat the push is
//! printed to the terminal; under `serve` it is written to the log so an
//! operator can see that the job fired and what it produced.

use console::style;
use tracing::info;

use colloquy_core::push::MessagePusher;
use colloquy_types::error::PushError;
use colloquy_types::identity::UserId;

/// Prints pushes to stdout, styled like an incoming message.
pub struct ConsolePusher;

impl MessagePusher for ConsolePusher {
    async fn send_user(&self, user: &UserId, text: &str) -> Result<(), PushError> {
        println!();
        println!(
            "  {} {}",
            style(format!("[push -> {}]", user.as_str())).magenta().bold(),
            text
        );
        Ok(())
    }

    async fn send_group(&self, group: &str, text: &str) -> Result<(), PushError> {
        println!();
        println!(
            "  {} {}",
            style(format!("[push -> group {group}]")).magenta().bold(),
            text
        );
        Ok(())
    }
}

/// Writes pushes to the tracing log. Used by the HTTP server, where no
/// terminal is watching.
pub struct LogPusher;

impl MessagePusher for LogPusher {
    async fn send_user(&self, user: &UserId, text: &str) -> Result<(), PushError> {
        info!(user = %user.as_str(), len = text.len(), "push delivered\n{text}");
        Ok(())
    }

    async fn send_group(&self, group: &str, text: &str) -> Result<(), PushError> {
        info!(group = %group, len = text.len(), "push delivered\n{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::push::{PushTarget, SharedPusher};

    #[tokio::test]
    async fn test_log_pusher_accepts_both_targets() {
        let pusher = SharedPusher::new(LogPusher);
        pusher
            .deliver(&PushTarget::User(UserId::new("dave")), "hello")
            .await
            .unwrap();
        pusher
            .deliver(&PushTarget::Group("42".to_string()), "hello")
            .await
            .unwrap();
    }
}
