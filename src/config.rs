use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub gist: GistConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address for the HTTP listener (e.g. `0.0.0.0:8080`).
    #[serde(default = "default_http_listen")]
    pub http_listen: String,
    /// Directory served under `/css`.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Directory holding `gist.html`.  When unset the built-in template is used.
    #[serde(default)]
    pub templates_dir: Option<String>,
    /// Re-read template files on every render (development mode).
    #[serde(default)]
    pub template_reload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_listen: default_http_listen(),
            assets_dir: default_assets_dir(),
            templates_dir: None,
            template_reload: false,
        }
    }
}

fn default_http_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_assets_dir() -> String {
    "./assets/css".to_string()
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Repository whose files are rendered (e.g. `https://github.com/iris-contrib/examples`).
    #[serde(default = "default_root_repo")]
    pub root_repo: String,
    /// Host prefix of the browsable pages, replaced by `raw_host` to build raw URLs.
    #[serde(default = "default_web_host")]
    pub web_host: String,
    /// Host prefix serving raw file contents.
    #[serde(default = "default_raw_host")]
    pub raw_host: String,
    /// Branch segment used in `/blob/<branch>/` page URLs.
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Overall deadline for a single upstream request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            root_repo: default_root_repo(),
            web_host: default_web_host(),
            raw_host: default_raw_host(),
            branch: default_branch(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_root_repo() -> String {
    "https://github.com/iris-contrib/examples".to_string()
}

fn default_web_host() -> String {
    "https://github.com".to_string()
}

fn default_raw_host() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_user_agent() -> String {
    "gistview/0.1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Gist rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GistConfig {
    /// File appended to example paths that do not name a file.
    #[serde(default = "default_entry_file")]
    pub default_entry_file: String,
    /// Prefix of the directory shown in the `$ cd` line of the run transcript.
    #[serde(default = "default_workspace_prefix")]
    pub workspace_prefix: String,
    /// Command shown in the last line of the run transcript.
    #[serde(default = "default_run_command")]
    pub run_command: String,
    /// syntect theme used by the highlighter.
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for GistConfig {
    fn default() -> Self {
        Self {
            default_entry_file: default_entry_file(),
            workspace_prefix: default_workspace_prefix(),
            run_command: default_run_command(),
            theme: default_theme(),
        }
    }
}

fn default_entry_file() -> String {
    "main.go".to_string()
}

fn default_workspace_prefix() -> String {
    "$GOPATH/src/".to_string()
}

fn default_run_command() -> String {
    "go run".to_string()
}

fn default_theme() -> String {
    "InspiredGitHub".to_string()
}

// ---------------------------------------------------------------------------
// Realtime viewer channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimeConfig {
    /// Delay (milliseconds) before the post-leave count is broadcast.
    #[serde(default)]
    pub leave_broadcast_delay_ms: u64,
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load and validate a [`Config`] from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Basic sanity checks that cannot be expressed purely with serde.
pub fn validate_config(config: &Config) -> Result<()> {
    anyhow::ensure!(
        config.upstream.root_repo.starts_with(&config.upstream.web_host),
        "upstream.root_repo must live under upstream.web_host"
    );
    anyhow::ensure!(
        !config.upstream.branch.is_empty() && !config.upstream.branch.contains('/'),
        "upstream.branch must be a single path segment"
    );
    anyhow::ensure!(
        config.upstream.request_timeout_secs > 0,
        "upstream.request_timeout_secs must be positive"
    );
    anyhow::ensure!(
        !config.gist.default_entry_file.is_empty() && config.gist.default_entry_file.contains('.'),
        "gist.default_entry_file must be a file name with an extension"
    );
    Ok(())
}
