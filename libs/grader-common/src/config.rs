// Grader configuration: remote host credentials, remote/local directories, toolchain
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_STAGING_DIR: &str = "received_sources";
pub const DEFAULT_COMPILER: &str = "gcc";
pub const DEFAULT_SOURCE_EXTENSION: &str = "c";
pub const DEFAULT_MAX_PARALLEL_RUNS: usize = 8;
pub const DEFAULT_HTTP_PORT: u16 = 5122;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    pub private_key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraderConfig {
    pub ssh: SshConfig,
    /// Defaults to `/home/<username>/compile`
    #[serde(default)]
    pub remote_base_dir: Option<String>,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_compiler")]
    pub compiler: String,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    #[serde(default = "default_max_parallel_runs")]
    pub max_parallel_runs: usize,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

fn default_compiler() -> String {
    DEFAULT_COMPILER.to_string()
}

fn default_source_extension() -> String {
    DEFAULT_SOURCE_EXTENSION.to_string()
}

fn default_max_parallel_runs() -> usize {
    DEFAULT_MAX_PARALLEL_RUNS
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

impl GraderConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Grader config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: GraderConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .with_context(|| format!("Missing required environment variable {}", key))
        };

        let port = match lookup("SSH_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("Invalid SSH_PORT: {}", raw))?,
            ),
            None => None,
        };

        let max_parallel_runs = match lookup("GRADER_MAX_PARALLEL_RUNS") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("Invalid GRADER_MAX_PARALLEL_RUNS: {}", raw))?,
            None => DEFAULT_MAX_PARALLEL_RUNS,
        };

        let http_port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", raw))?,
            None => DEFAULT_HTTP_PORT,
        };

        let config = GraderConfig {
            ssh: SshConfig {
                host: required("SSH_ADDRESS")?,
                port,
                username: required("SSH_USERNAME")?,
                private_key: PathBuf::from(required("SSH_PRIVATE_KEY_LOCATION")?),
            },
            remote_base_dir: lookup("GRADER_REMOTE_BASE_DIR"),
            staging_dir: lookup("GRADER_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_staging_dir),
            compiler: lookup("GRADER_COMPILER").unwrap_or_else(default_compiler),
            source_extension: lookup("GRADER_SOURCE_EXTENSION")
                .unwrap_or_else(default_source_extension),
            max_parallel_runs,
            http_port,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ssh.host.trim().is_empty() {
            bail!("ssh.host must not be empty");
        }
        if self.ssh.username.trim().is_empty() {
            bail!("ssh.username must not be empty");
        }
        if self.compiler.trim().is_empty() {
            bail!("compiler must not be empty");
        }
        if self.max_parallel_runs == 0 {
            bail!("max_parallel_runs must be at least 1");
        }
        Ok(())
    }

    /// Remote directory under which every run gets its own subdirectory
    pub fn remote_base_dir(&self) -> String {
        let base = match &self.remote_base_dir {
            Some(dir) => dir.clone(),
            None => format!("/home/{}/compile", self.ssh.username),
        };
        base.trim_end_matches('/').to_string()
    }
}
