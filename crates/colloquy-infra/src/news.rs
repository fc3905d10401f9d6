//! HTTP RSS feed fetcher.
//!
//! Fetches a feed over HTTP and parses the RSS 2.0 item list with a
//! streaming XML reader. Publication dates are RFC 2822 (the RSS norm)
//! with an RFC 3339 fallback; items without a parseable date get the
//! fetch time so the recency filter does not silently drop them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use colloquy_core::news::FeedFetcher;
use colloquy_types::error::NewsError;
use colloquy_types::news::NewsItem;

const SUMMARY_MAX_CHARS: usize = 64;

pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, name: &str, url: &str) -> Result<Vec<NewsItem>, NewsError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewsError::Fetch(format!("[{name}] {e}")))?
            .error_for_status()
            .map_err(|e| NewsError::Fetch(format!("[{name}] {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| NewsError::Fetch(format!("[{name}] {e}")))?;

        let items = parse_rss(name, &body)?;
        debug!(feed = %name, items = items.len(), "feed fetched");
        Ok(items)
    }
}

#[derive(Default)]
struct PartialItem {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    description: Option<String>,
}

impl PartialItem {
    fn into_news_item(self, source: &str) -> NewsItem {
        let summary = self
            .description
            .as_deref()
            .map(|d| truncate_summary(&strip_html(d)))
            .unwrap_or_default();
        NewsItem {
            source: source.to_string(),
            title: self.title.unwrap_or_else(|| "N/A".to_string()),
            link: self.link.unwrap_or_else(|| "#".to_string()),
            published_at: self
                .pub_date
                .as_deref()
                .and_then(parse_pub_date)
                .unwrap_or_else(Utc::now),
            summary,
        }
    }
}

/// Parse the `<item>` entries of an RSS 2.0 document.
fn parse_rss(source: &str, body: &str) -> Result<Vec<NewsItem>, NewsError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<PartialItem> = None;
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => match tag.local_name().as_ref() {
                b"item" => current = Some(PartialItem::default()),
                b"title" if current.is_some() => field = Some("title"),
                b"link" if current.is_some() => field = Some("link"),
                b"pubDate" if current.is_some() => field = Some("pubDate"),
                b"description" if current.is_some() => field = Some("description"),
                _ => field = None,
            },
            Ok(Event::Text(text)) => {
                if let (Some(item), Some(name)) = (current.as_mut(), field) {
                    let value = text
                        .decode()
                        .map_err(|e| NewsError::Fetch(format!("[{source}] bad xml text: {e}")))?
                        .into_owned();
                    match name {
                        "title" => item.title = Some(value),
                        "link" => item.link = Some(value),
                        "pubDate" => item.pub_date = Some(value),
                        "description" => item.description = Some(value),
                        _ => {}
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if let (Some(item), Some(name)) = (current.as_mut(), field) {
                    let value = String::from_utf8_lossy(data.as_ref()).into_owned();
                    match name {
                        "title" => item.title = Some(value),
                        "description" => item.description = Some(value),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(tag)) => match tag.local_name().as_ref() {
                b"item" => {
                    if let Some(item) = current.take() {
                        items.push(item.into_news_item(source));
                    }
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(NewsError::Fetch(format!("[{source}] xml error: {e}"))),
            _ => {}
        }
    }
    Ok(items)
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Remove HTML tags, keeping the text between them.
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(SUMMARY_MAX_CHARS - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <link>https://example.com</link>
    <item>
      <title>First headline</title>
      <link>https://example.com/1</link>
      <pubDate>Mon, 24 Aug 2026 09:00:00 +0000</pubDate>
      <description>&lt;p&gt;A &lt;b&gt;short&lt;/b&gt; summary.&lt;/p&gt;</description>
    </item>
    <item>
      <title><![CDATA[Second & headline]]></title>
      <link>https://example.com/2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_rss("example", FEED).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].source, "example");
        assert_eq!(items[0].title, "First headline");
        assert_eq!(items[0].link, "https://example.com/1");
        assert_eq!(items[0].summary, "A short summary.");
        assert_eq!(
            items[0].published_at,
            DateTime::parse_from_rfc2822("Mon, 24 Aug 2026 09:00:00 +0000").unwrap()
        );

        assert_eq!(items[1].title, "Second & headline");
        // No pubDate falls back to fetch time, inside the recency window.
        assert!(items[1].published_at <= Utc::now());
    }

    #[test]
    fn test_channel_title_is_not_an_item() {
        let items = parse_rss("example", FEED).unwrap();
        assert!(items.iter().all(|i| i.title != "Example Feed"));
    }

    #[test]
    fn test_strip_html_and_truncate() {
        assert_eq!(strip_html("<p>hello <b>world</b></p>"), "hello world");
        let long = "x".repeat(100);
        let summary = truncate_summary(&long);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_pub_date_formats() {
        assert!(parse_pub_date("Mon, 24 Aug 2026 09:00:00 +0000").is_some());
        assert!(parse_pub_date("2026-08-24T09:00:00Z").is_some());
        assert!(parse_pub_date("yesterday").is_none());
    }
}
