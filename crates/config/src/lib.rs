//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. a TOML file (explicit path, else `config.toml` in the platform
//!    configuration directory if it exists),
//! 3. `MIRRORHASH_*` environment variables, nested keys split on `__`
//!    (`MIRRORHASH_HTTP__ATTEMPTS=5`).
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mirrorhash_mirror::{DEFAULT_CONCURRENCY, Distro, FetchOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "MIRRORHASH_";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-distribution outputs go to `<output_dir>/<distro>/`.
    pub output_dir: PathBuf,
    /// Root for per-item scratch directories. Defaults to
    /// `<output_dir>/<distro>/tmp`.
    pub temp_dir: Option<PathBuf>,
    pub workers: usize,
    /// Seconds between progress reports (and `urls.csv` snapshots) while
    /// hashing.
    pub progress_interval: u64,
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    /// Listing roots per distribution, replacing the built-in ones.
    pub mirrors: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Seconds.
    pub connect_timeout: u64,
    /// Seconds, for a whole request including the body.
    pub timeout: u64,
    pub attempts: u32,
    /// Seconds.
    pub retry_delay: u64,
    pub user_agent: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            temp_dir: None,
            workers: 16,
            progress_interval: 30,
            http: HttpConfig::default(),
            discovery: DiscoveryConfig::default(),
            mirrors: BTreeMap::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = FetchOptions::default();
        Self {
            connect_timeout: defaults.connect_timeout.as_secs(),
            timeout: defaults.timeout.as_secs(),
            attempts: defaults.attempts,
            retry_delay: defaults.retry_delay.as_secs(),
            user_agent: defaults.user_agent,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY }
    }
}

impl HttpConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            timeout: Duration::from_secs(self.timeout),
            attempts: self.attempts,
            retry_delay: Duration::from_secs(self.retry_delay),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Where one distribution's files live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paths {
    pub dir: PathBuf,
    pub queue: PathBuf,
    pub urls: PathBuf,
    pub packages: PathBuf,
    pub files: PathBuf,
    pub temp: PathBuf,
}

impl Config {
    /// The platform-specific default configuration file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "mirrorhash").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load the configuration from every layer and validate it.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                debug!(path = %path.display(), "loading configuration file");
                figment = figment.merge(Toml::file(path));
            },
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    debug!(path = %path.display(), "loading default configuration file");
                    figment = figment.merge(Toml::file(path));
                }
            },
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers must be at least 1"));
        }
        if self.progress_interval == 0 {
            exn::bail!(ErrorKind::Invalid("progress_interval must be at least 1 second"));
        }
        if self.http.attempts == 0 {
            exn::bail!(ErrorKind::Invalid("http.attempts must be at least 1"));
        }
        if self.http.timeout == 0 || self.http.connect_timeout == 0 {
            exn::bail!(ErrorKind::Invalid("http timeouts must be at least 1 second"));
        }
        if self.discovery.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("discovery.concurrency must be at least 1"));
        }
        if self.mirrors.values().any(Vec::is_empty) {
            exn::bail!(ErrorKind::Invalid("mirror root lists must not be empty"));
        }
        Ok(())
    }

    /// Listing roots for a distribution: configured ones, else the built-in
    /// defaults.
    pub fn roots(&self, distro: Distro) -> Vec<String> {
        match self.mirrors.get(distro.as_str()) {
            Some(roots) => roots.clone(),
            None => distro.roots().iter().map(|root| root.to_string()).collect(),
        }
    }

    pub fn paths(&self, distro: Distro) -> Paths {
        let dir = self.output_dir.join(distro.as_str());
        let temp = match &self.temp_dir {
            Some(temp) => temp.join(distro.as_str()),
            None => dir.join("tmp"),
        };
        Paths {
            queue: dir.join("queue.db"),
            urls: dir.join("urls.csv"),
            packages: dir.join("packages.csv"),
            files: dir.join("files.csv"),
            temp,
            dir,
        }
    }
}
