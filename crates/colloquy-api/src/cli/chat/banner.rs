//! Welcome banner display for the chat front end.

use console::style;

/// Print the welcome banner at the start of an interactive chat.
pub fn print_welcome_banner(user: &str, default_model: &str, news_enabled: bool) {
    println!();
    println!("  {} {}", style("Colloquy").cyan().bold(), style("chat").dim());
    println!();
    println!("  {}  {}", style("User:").bold(), style(user).dim());
    println!(
        "  {}  {}",
        style("Default model:").bold(),
        style(default_model).dim()
    );
    if news_enabled {
        println!(
            "  {}  {}",
            style("News push:").bold(),
            style("scheduled").dim()
        );
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
