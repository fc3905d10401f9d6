//! Global configuration loader for Colloquy.
//!
//! Reads `config.toml` from the data directory (`~/.colloquy/` in
//! production) and deserializes it into [`GlobalConfig`]. Falls back to
//! defaults when the file is missing or malformed. The DeepSeek API key
//! can always be supplied via `DEEPSEEK_API_KEY`, which wins over the
//! file.

use std::path::{Path, PathBuf};

use colloquy_types::config::GlobalConfig;

/// Resolve the data directory: `COLLOQUY_DATA_DIR` if set, otherwise
/// `~/.colloquy`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COLLOQUY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".colloquy")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`GlobalConfig::default()`].
/// - Unparseable file: logs a warning and returns the default.
/// - `DEEPSEEK_API_KEY` in the environment overrides the file's key.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "no config.toml found at {}, using defaults",
                config_path.display()
            );
            return apply_env_overrides(GlobalConfig::default());
        }
        Err(err) => {
            tracing::warn!(
                "failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return apply_env_overrides(GlobalConfig::default());
        }
    };

    let config = match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    };
    apply_env_overrides(config)
}

fn apply_env_overrides(mut config: GlobalConfig) -> GlobalConfig {
    if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
        if !key.is_empty() {
            config.deepseek_api_key = Some(key);
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.default_model, "deepseek-chat");
        assert_eq!(config.engine_cache_capacity, 32);
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
admin_user_ids = ["1001"]
default_model = "ollama/qwen3"
engine_cache_capacity = 8

[news]
enabled = true
hour = 9
minute = 30
report_format = "markdown"

[news.feeds]
hn = "https://news.ycombinator.com/rss"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.admin_user_ids, vec!["1001"]);
        assert_eq!(config.default_model, "ollama/qwen3");
        assert_eq!(config.engine_cache_capacity, 8);
        assert!(config.news.enabled);
        assert_eq!(config.news.hour, 9);
        assert_eq!(config.news.minute, 30);
        assert_eq!(config.news.feeds.len(), 1);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.default_model, "deepseek-chat");
    }
}
