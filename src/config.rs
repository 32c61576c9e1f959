//! Settings shared by the tracker and the aggregation service.
//!
//! Values come from command line flags first, then `config.toml` in the application directory
//! (or the file passed with `--config`), then the defaults below.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, level_filters::LevelFilter};
use url::Url;

use crate::{
    classifier::{Classifier, DEFAULT_PRODUCTIVE_SITES, DEFAULT_UNPRODUCTIVE_SITES},
    utils::dir::{create_application_default_path, ensure_dir},
};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_USER: &str = "default";

/// Flags every command and binary accepts.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_STATE_HOME/sitetime or $HOME/.local/state/sitetime"
    )]
    pub dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Config file. By default config.toml in the application directory")]
    pub config: Option<PathBuf>,
    #[arg(long = "log-filter", global = true)]
    pub log: Option<LevelFilter>,
    /// Mirror logs to stderr. This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    pub log_console: bool,
}

impl ConfigArgs {
    /// Resolves the application directory and loads the settings that live in it.
    pub fn resolve(&self) -> Result<(PathBuf, Settings)> {
        let app_dir = match &self.dir {
            Some(dir) => ensure_dir(dir.clone())?,
            None => create_application_default_path()?,
        };
        let settings = Settings::load(self.config.as_deref(), &app_dir)?;
        Ok((app_dir, settings))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base url of the aggregation service the tracker mirrors increments to.
    pub server_url: String,
    /// Address the aggregation service binds to.
    pub listen: SocketAddr,
    pub user_id: String,
    /// Seconds between periodic session flushes.
    pub flush_interval_secs: u64,
    pub allowed_origins: Vec<String>,
    pub productive_sites: Vec<String>,
    pub unproductive_sites: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: format!("http://localhost:{DEFAULT_PORT}"),
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            user_id: DEFAULT_USER.into(),
            flush_interval_secs: 60,
            allowed_origins: vec!["http://localhost".into(), "http://frontend".into()],
            productive_sites: DEFAULT_PRODUCTIVE_SITES.iter().map(|v| v.to_string()).collect(),
            unproductive_sites: DEFAULT_UNPRODUCTIVE_SITES
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// Reads `explicit` when given, otherwise the config file in `app_dir` if there is one.
    pub fn load(explicit: Option<&Path>, app_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = app_dir.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    debug!("No config at {path:?}, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {path:?}"))?;
        let settings = Self::parse(&content).with_context(|| format!("Invalid config {path:?}"))?;
        debug!("Loaded config from {path:?}");
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            return Err(anyhow!("flush_interval_secs must be positive"));
        }
        if self.user_id.trim().is_empty() {
            return Err(anyhow!("user_id must not be empty"));
        }
        self.server_url()?;
        Ok(())
    }

    pub fn server_url(&self) -> Result<Url> {
        Url::parse(&self.server_url)
            .with_context(|| format!("Invalid server_url {:?}", self.server_url))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(&self.productive_sites, &self.unproductive_sites)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;

    use crate::daemon::storage::entities::Category;

    use super::{ConfigArgs, Settings, CONFIG_FILE_NAME};

    #[test]
    fn test_defaults_without_file() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings::load(None, dir.path())?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.flush_interval(), Duration::from_secs(60));
        assert_eq!(settings.listen.port(), 3001);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "user_id = \"alice\"\nproductive_sites = [\"rust-lang.org\"]\n",
        )?;

        let settings = Settings::load(None, dir.path())?;
        assert_eq!(settings.user_id, "alice");
        assert_eq!(settings.server_url, "http://localhost:3001");

        let classifier = settings.classifier();
        assert_eq!(classifier.classify("doc.rust-lang.org"), Category::Productive);
        assert_eq!(classifier.classify("github.com"), Category::Neutral);
        assert_eq!(classifier.classify("youtube.com"), Category::Unproductive);
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Settings::parse("flush_interval_secs = 0").is_err());
        assert!(Settings::parse("server_url = \"not a url\"").is_err());
        assert!(Settings::parse("unknown_key = 1").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        assert!(Settings::load(Some(&dir.path().join("absent.toml")), dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_args_create_application_dir() -> Result<()> {
        let dir = tempdir()?;
        let args = ConfigArgs {
            dir: Some(dir.path().join("app")),
            config: None,
            log: None,
            log_console: false,
        };

        let (app_dir, settings) = args.resolve()?;
        assert!(app_dir.is_dir());
        assert_eq!(settings, Settings::default());
        Ok(())
    }
}
