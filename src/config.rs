use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::{DEFAULT_BASE_URL, DEFAULT_PAGE_COUNT};

const DEFAULT_ENV_PREFIX: &str = "THREAD_SCOUT";
pub const MAX_PAGES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_boards")]
    pub boards: Vec<String>,
    #[serde(default = "default_terms")]
    pub terms: Vec<String>,
    #[serde(default = "default_pages")]
    pub pages: usize,
    /// Worker threads per sweep; 0 uses one per CPU.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            boards: default_boards(),
            terms: default_terms(),
            pages: default_pages(),
            workers: 0,
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_boards() -> Vec<String> {
    vec!["b".into()]
}

fn default_terms() -> Vec<String> {
    vec!["Facts".into(), "Logic".into(), "Other".into()]
}

fn default_pages() -> usize {
    DEFAULT_PAGE_COUNT
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_user_agent() -> String {
    format!("thread-scout/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewerConfig {
    /// Command used to open a thread, `%URL%` is replaced by the thread
    /// address. Empty means the system browser.
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config: crawl.terms must list at least one term")]
    NoTerms,
    #[error("config: crawl.terms contains a blank term")]
    BlankTerm,
    #[error("config: crawl.terms lists {0:?} more than once (terms are case-insensitive)")]
    DuplicateTerm(String),
    #[error("config: crawl.boards must list at least one board")]
    NoBoards,
    #[error("config: crawl.boards contains an invalid board name {0:?}")]
    InvalidBoard(String),
    #[error("config: crawl.pages must be at least 1")]
    NoPages,
    #[error("config: crawl.pages is {0}, at most 100 index pages per board")]
    TooManyPages(usize),
    #[error("config: crawl.timeout must be longer than zero")]
    ZeroTimeout,
    #[error("config: crawl.base_url {url:?} is invalid: {message}")]
    BaseUrl { url: String, message: String },
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terms.is_empty() {
            return Err(ConfigError::NoTerms);
        }
        let mut seen = HashSet::new();
        for term in &self.terms {
            if term.trim().is_empty() {
                return Err(ConfigError::BlankTerm);
            }
            if !seen.insert(term.to_lowercase()) {
                return Err(ConfigError::DuplicateTerm(term.clone()));
            }
        }

        if self.boards.is_empty() {
            return Err(ConfigError::NoBoards);
        }
        for board in &self.boards {
            let name = board.trim();
            if name.is_empty() || name.contains('/') || name.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidBoard(board.clone()));
            }
        }

        if self.pages == 0 {
            return Err(ConfigError::NoPages);
        }
        if self.pages > MAX_PAGES {
            return Err(ConfigError::TooManyPages(self.pages));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        anyhow::ensure!(path.exists(), "config file {} not found", path.display());
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.crawl.base_url.is_empty() {
        base.crawl.base_url = other.crawl.base_url;
    }
    if !other.crawl.boards.is_empty() {
        base.crawl.boards = other.crawl.boards;
    }
    // An explicitly empty term list is kept so validation can reject it.
    base.crawl.terms = other.crawl.terms;
    base.crawl.pages = other.crawl.pages;
    if other.crawl.workers != 0 {
        base.crawl.workers = other.crawl.workers;
    }
    base.crawl.timeout = other.crawl.timeout;
    if !other.crawl.user_agent.is_empty() {
        base.crawl.user_agent = other.crawl.user_agent;
    }

    if !other.viewer.command.is_empty() {
        base.viewer.command = other.viewer.command;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "crawl.base_url" => cfg.crawl.base_url = value,
        "crawl.boards" => cfg.crawl.boards = split_list(&value),
        "crawl.terms" => cfg.crawl.terms = split_list(&value),
        "crawl.pages" => match value.parse::<usize>() {
            Ok(parsed) => cfg.crawl.pages = parsed,
            Err(err) => warn!(key, value = %value, error = %err, "ignoring env override"),
        },
        "crawl.workers" => match value.parse::<usize>() {
            Ok(parsed) => cfg.crawl.workers = parsed,
            Err(err) => warn!(key, value = %value, error = %err, "ignoring env override"),
        },
        "crawl.timeout" => match humantime::parse_duration(&value) {
            Ok(duration) => cfg.crawl.timeout = duration,
            Err(err) => warn!(key, value = %value, error = %err, "ignoring env override"),
        },
        "crawl.user_agent" => cfg.crawl.user_agent = value,
        "viewer.command" => cfg.viewer.command = split_list(&value),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("thread-scout").join("config.yaml"))
}

pub fn to_yaml(cfg: &Config) -> Result<String> {
    serde_yaml::to_string(cfg).context("config: failed to serialize config")
}
