//! Main chat loop orchestration.
//!
//! Every submitted line goes through `CommandRouter::handle_inbound`
//! exactly as a REST request would, so the terminal and the HTTP API
//! cannot drift apart in behavior.

use console::style;
use tracing::info;

use colloquy_types::identity::UserId;

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::input::{ChatInput, InputEvent};

/// Run the interactive chat loop as `user` until EOF.
pub async fn run_chat_loop(state: &AppState, user: &str) -> anyhow::Result<()> {
    let owner = UserId::new(user);

    print_welcome_banner(
        owner.as_str(),
        &state.config.default_model,
        state.config.news.enabled,
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("failed to initialize input: {e}"))?;

    info!(user = %owner.as_str(), "chat loop started");

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Bye.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!(
                    "\n  {}",
                    style("Press Ctrl+D to exit, or keep chatting.").dim()
                );
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }
                let reply = state.router.handle_inbound(&owner, &text).await;
                for line in reply.lines() {
                    println!("  {line}");
                }
                println!();
            }
        }
    }

    Ok(())
}
