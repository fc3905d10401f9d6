//! Global configuration structure.
//!
//! Deserialized from `{data_dir}/config.toml` by the infra loader. Every
//! field has a serde default so a partial (or missing) file still yields a
//! usable configuration. Admin identity and news scheduling live here so
//! tests can construct gates and jobs with different settings per test --
//! there is no ambient global state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::news::ReportFormat;

/// Top-level configuration for the Colloquy service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Transport identities allowed to run `/admin` commands.
    pub admin_user_ids: Vec<String>,

    /// Model used when a session's config carries no `model` key.
    pub default_model: String,

    /// DeepSeek API key. The `DEEPSEEK_API_KEY` environment variable takes
    /// precedence over this field.
    pub deepseek_api_key: Option<String>,

    /// Base URL of a local Ollama server (OpenAI-compatible endpoint is
    /// derived by appending `/v1`).
    pub ollama_base_url: String,

    /// Path to the role registry file (`roles.json`).
    pub roles_path: String,

    /// Path to the dialogue chunk corpus consumed by the retriever.
    pub chunks_path: String,

    /// Path to the background knowledge file.
    pub background_path: String,

    /// Maximum number of live engines held in memory.
    pub engine_cache_capacity: usize,

    /// Request timeout for collaborator calls (LLM, feeds), in seconds.
    pub collaborator_timeout_secs: u64,

    pub news: NewsConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            admin_user_ids: Vec::new(),
            default_model: "deepseek-chat".to_string(),
            deepseek_api_key: None,
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            roles_path: "knowledge/roles.json".to_string(),
            chunks_path: "knowledge/chunks.json".to_string(),
            background_path: "knowledge/background.txt".to_string(),
            engine_cache_capacity: 32,
            collaborator_timeout_secs: 60,
            news: NewsConfig::default(),
        }
    }
}

/// Configuration for the scheduled news report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub enabled: bool,

    /// Feed name -> feed URL.
    pub feeds: BTreeMap<String, String>,

    /// Hour (0-23) at which the daily report fires.
    pub hour: u32,

    /// Minute (0-59) at which the daily report fires.
    pub minute: u32,

    pub max_items_per_feed: usize,

    pub max_total_items: usize,

    /// Keep only items whose title contains at least one keyword.
    /// Empty list keeps everything.
    pub include_keywords: Vec<String>,

    pub report_format: ReportFormat,

    /// Group identities the report is pushed to.
    pub target_group_ids: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feeds: BTreeMap::new(),
            hour: 8,
            minute: 0,
            max_items_per_feed: 3,
            max_total_items: 15,
            include_keywords: Vec::new(),
            report_format: ReportFormat::Text,
            target_group_ids: Vec::new(),
        }
    }
}
