use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api.base_url`
pub const API_URL_ENV: &str = "RENTDASH_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  pub api: ApiConfig,
  pub views: ViewsConfig,
  pub health: HealthConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8080".to_string(),
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
  /// Rows per page of the users, vehicles and notifications lists
  pub page_size: u32,
  pub bookings_page_size: u32,
}

impl Default for ViewsConfig {
  fn default() -> Self {
    Self {
      page_size: 10,
      bookings_page_size: 20,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
  pub refresh_secs: u64,
  /// Services probed via `/services/{name}/health`
  pub services: Vec<String>,
}

impl Default for HealthConfig {
  fn default() -> Self {
    Self {
      refresh_secs: 30,
      services: vec![
        "users".to_string(),
        "vehicles".to_string(),
        "bookings".to_string(),
        "notifications".to_string(),
      ],
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  pub level: String,
  /// Directory of the rolling log file (defaults to the platform cache dir)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./rentdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rentdash/config.yaml
  /// 4. Built-in defaults
  ///
  /// `RENTDASH_API_URL` wins over whatever the file says.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      if !url.trim().is_empty() {
        config.api.base_url = url.trim().to_string();
      }
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("rentdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rentdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;
    if self.views.page_size == 0 || self.views.bookings_page_size == 0 {
      return Err(eyre!("Page sizes must be at least 1"));
    }
    if self.health.refresh_secs == 0 {
      return Err(eyre!("health.refresh_secs must be at least 1"));
    }
    Ok(())
  }

  /// Header title: the configured one, else the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.base_url)
      .ok()
      .and_then(|u| {
        u.host_str().map(|h| match u.port() {
          Some(port) => format!("{}:{}", h, port),
          None => h.to_string(),
        })
      })
      .unwrap_or_else(|| self.api.base_url.clone())
  }

  /// Directory the rolling log file is written to.
  pub fn log_directory(&self) -> PathBuf {
    self
      .log
      .directory
      .clone()
      .or_else(|| dirs::cache_dir().map(|d| d.join("rentdash")))
      .unwrap_or_else(|| PathBuf::from("."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "http://localhost:8080");
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.views.page_size, 10);
    assert_eq!(config.views.bookings_page_size, 20);
    assert_eq!(config.health.refresh_secs, 30);
    assert_eq!(config.health.services.len(), 4);
    assert_eq!(config.display_title(), "localhost:8080");
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let file = write_config(
      "title: Fleet ops\napi:\n  base_url: https://rent.example.com\nviews:\n  page_size: 25\n",
    );
    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.display_title(), "Fleet ops");
    assert_eq!(config.api.base_url, "https://rent.example.com");
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.views.page_size, 25);
    assert_eq!(config.views.bookings_page_size, 20);
  }

  #[test]
  fn test_empty_file_is_defaults() {
    let file = write_config("\n");
    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_bad_yaml_is_an_error() {
    let file = write_config("api: [not, a, map]\n");
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
  }

  #[test]
  fn test_missing_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_validate_rejects_zero_page_size() {
    let mut config = Config::default();
    config.views.page_size = 0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_title_falls_back_to_host() {
    let mut config = Config::default();
    config.api.base_url = "https://api.rent.example.com/".to_string();
    assert_eq!(config.display_title(), "api.rent.example.com");
  }
}
