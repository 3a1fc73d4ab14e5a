use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LookoutError;

/// Top-level configuration loaded from `.lookout.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// The resolved value is built once at startup and handed to every component.
///
/// # Examples
///
/// ```
/// use lookout_core::LookoutConfig;
///
/// let config = LookoutConfig::default();
/// assert_eq!(config.llm.model, "gpt-4o");
/// assert!(!config.review.auto_approve);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookoutConfig {
    /// Hosting API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review and publishing behavior.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl LookoutConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Io`] if the file cannot be read, or
    /// [`LookoutError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lookout_core::LookoutConfig;
    /// use std::path::Path;
    ///
    /// let config = LookoutConfig::from_file(Path::new(".lookout.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LookoutError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::LookoutConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// auto_approve = true
    /// "#;
    /// let config = LookoutConfig::from_toml(toml).unwrap();
    /// assert!(config.review.auto_approve);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LookoutError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from an environment lookup.
    ///
    /// Empty values are ignored so that an unset CI secret (which GitHub
    /// Actions expands to `""`) does not clobber a value from the file.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::LookoutConfig;
    ///
    /// let mut config = LookoutConfig::default();
    /// config.apply_env(|key| match key {
    ///     "GITHUB_REPOSITORY" => Some("octocat/hello-world".into()),
    ///     "LOOKOUT_MODEL" => Some("gpt-4o-mini".into()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.github.repository.as_deref(), Some("octocat/hello-world"));
    /// assert_eq!(config.llm.model, "gpt-4o-mini");
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GITHUB_REPOSITORY") {
            self.github.repository = Some(v);
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.github.token = Some(v);
        }
        if let Some(v) = get("GITHUB_API_URL") {
            self.github.api_url = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("LOOKOUT_MODEL") {
            self.llm.model = v;
        }
    }
}

/// Hosting API configuration.
///
/// # Examples
///
/// ```
/// use lookout_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert_eq!(config.api_url, "https://api.github.com");
/// assert!(config.token.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Repository in `owner/name` form.
    pub repository: Option<String>,
    /// Bearer token for the REST API.
    pub token: Option<String>,
    /// API root (GitHub Enterprise installs use `https://host/api/v3`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repository: None,
            token: None,
            api_url: default_api_url(),
        }
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use lookout_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o");
/// assert_eq!(config.max_diff_chars, 60_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL, up to and including the version segment
    /// (e.g. `http://localhost:11434/v1` for Ollama).
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum characters of diff text placed in the prompt.
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_diff_chars() -> usize {
    60_000
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_diff_chars: default_max_diff_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Review and publishing configuration.
///
/// # Examples
///
/// ```
/// use lookout_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert!(!config.auto_approve);
/// assert!(config.inline_comments);
/// assert!(config.delete_stale);
/// assert!(!config.dry_run);
/// assert_eq!(config.max_inline_comments, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Submit an approving review when the model approves (default: false).
    #[serde(default)]
    pub auto_approve: bool,
    /// Post inline comments at diff positions (default: true).
    #[serde(default = "default_true")]
    pub inline_comments: bool,
    /// Delete comments left by earlier runs before posting (default: true).
    #[serde(default = "default_true")]
    pub delete_stale: bool,
    /// Log every hosting API write instead of performing it (default: false).
    #[serde(default)]
    pub dry_run: bool,
    /// Upper bound on inline comments per run (default: 20).
    #[serde(default = "default_max_inline_comments")]
    pub max_inline_comments: usize,
    /// Additional glob patterns to leave out of the review.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_inline_comments() -> usize {
    20
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            auto_approve: false,
            inline_comments: true,
            delete_stale: true,
            dry_run: false,
            max_inline_comments: default_max_inline_comments(),
            skip_patterns: Vec::new(),
        }
    }
}
