//! Report renderers for the news push.

use colloquy_types::news::{NewsItem, ReportFormat};

/// Render `items` in the configured format.
pub fn render(items: &[NewsItem], format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => render_text(items),
        ReportFormat::Markdown => render_markdown(items),
        ReportFormat::Html => render_html(items),
    }
}

fn render_text(items: &[NewsItem]) -> String {
    let mut lines = vec![format!("News digest ({} items):\n", items.len())];
    for (i, item) in items.iter().enumerate() {
        lines.push(format!("{}. [{}] {}", i + 1, item.source, item.title));
        if !item.summary.is_empty() {
            lines.push(format!("   {}", item.summary));
        }
        lines.push(format!("   {}\n", item.link));
    }
    lines.join("\n")
}

fn render_markdown(items: &[NewsItem]) -> String {
    let mut lines = vec![format!("# News digest ({})\n", items.len())];
    for (i, item) in items.iter().enumerate() {
        lines.push(format!("## {}. [{}] {}", i + 1, item.source, item.title));
        if !item.summary.is_empty() {
            lines.push(format!("> {}", item.summary));
        }
        lines.push(format!("[read more]({})\n", item.link));
    }
    lines.join("\n")
}

fn render_html(items: &[NewsItem]) -> String {
    let mut html = vec!["<html><body>".to_string()];
    html.push(format!("<h1>News digest ({})</h1>", items.len()));
    for item in items {
        html.push(format!(
            "<h2>[{}] <a href=\"{}\">{}</a></h2>",
            item.source, item.link, item.title
        ));
        if !item.summary.is_empty() {
            html.push(format!("<p>{}</p>", item.summary));
        }
    }
    html.push("</body></html>".to_string());
    html.concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str, summary: &str) -> NewsItem {
        NewsItem {
            source: "feed".to_string(),
            title: title.to_string(),
            link: "https://example.com/x".to_string(),
            published_at: Utc::now(),
            summary: summary.to_string(),
        }
    }

    #[test]
    fn test_text_numbering_and_summary() {
        let out = render(&[item("first", "sum"), item("second", "")], ReportFormat::Text);
        assert!(out.contains("1. [feed] first"));
        assert!(out.contains("   sum"));
        assert!(out.contains("2. [feed] second"));
    }

    #[test]
    fn test_markdown_links() {
        let out = render(&[item("hello", "")], ReportFormat::Markdown);
        assert!(out.contains("## 1. [feed] hello"));
        assert!(out.contains("[read more](https://example.com/x)"));
    }

    #[test]
    fn test_html_wraps_document() {
        let out = render(&[item("hello", "sum")], ReportFormat::Html);
        assert!(out.starts_with("<html><body>"));
        assert!(out.ends_with("</body></html>"));
        assert!(out.contains("<p>sum</p>"));
    }
}
