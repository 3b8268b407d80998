//! Server configuration: `config.toml` layered with `OSAS_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                  String,
  #[serde(default = "defaults::port")]
  pub port:                  u16,
  #[serde(default = "defaults::database_path")]
  pub database_path:         PathBuf,
  /// Directory uploaded documents are written under.
  #[serde(default = "defaults::storage_root")]
  pub storage_root:          PathBuf,
  /// Origin used in links inside outbound mail.
  #[serde(default = "defaults::public_base_url")]
  pub public_base_url:       String,
  /// Where `storage_root` is served from. Defaults to
  /// `{public_base_url}/files`.
  pub files_base_url:        Option<String>,
  #[serde(default = "defaults::reminder_window_hours")]
  pub reminder_window_hours: i64,
  #[serde(default = "defaults::max_upload_bytes")]
  pub max_upload_bytes:      usize,
  /// Admin account created at startup when no account has this email.
  pub admin_email:           Option<String>,
  #[serde(default = "defaults::admin_name")]
  pub admin_name:            String,
  /// PHC string from `osas-server hash-password`.
  pub admin_password_hash:   Option<String>,
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".to_owned() }
  pub fn port() -> u16 { 8080 }
  pub fn database_path() -> PathBuf { PathBuf::from("~/.local/share/osas/osas.db") }
  pub fn storage_root() -> PathBuf { PathBuf::from("~/.local/share/osas/files") }
  pub fn public_base_url() -> String { "http://localhost:8080".to_owned() }
  pub fn reminder_window_hours() -> i64 { 24 }
  pub fn max_upload_bytes() -> usize { 10 * 1024 * 1024 }
  pub fn admin_name() -> String { "OSAS Administrator".to_owned() }
}

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("OSAS"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig =
      settings.try_deserialize().context("failed to deserialise ServerConfig")?;
    cfg.database_path = expand_tilde(&cfg.database_path);
    cfg.storage_root = expand_tilde(&cfg.storage_root);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn files_base_url(&self) -> String {
    self
      .files_base_url
      .clone()
      .unwrap_or_else(|| format!("{}/files", self.public_base_url.trim_end_matches('/')))
  }

  pub fn api_config(&self) -> osas_api::ApiConfig {
    osas_api::ApiConfig {
      public_base_url:       self.public_base_url.clone(),
      reminder_window_hours: self.reminder_window_hours,
      max_upload_bytes:      self.max_upload_bytes,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/osas-config.toml")).unwrap();
    assert_eq!(cfg.reminder_window_hours, 24);
    assert_eq!(
      cfg.files_base_url(),
      format!("{}/files", cfg.public_base_url.trim_end_matches('/'))
    );
  }

  #[test]
  fn file_values_override_defaults() {
    let path = std::env::temp_dir().join(format!("osas-config-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "port = 9191\nstorage_root = \"/srv/osas/files\"\nfiles_base_url = \"https://cdn.test\"\n",
    )
    .unwrap();
    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.storage_root, PathBuf::from("/srv/osas/files"));
    assert_eq!(cfg.files_base_url(), "https://cdn.test");
    if std::env::var("OSAS_PORT").is_err() {
      assert_eq!(cfg.port, 9191);
    }
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/osas.db")), PathBuf::from(home).join("osas.db"));
    assert_eq!(expand_tilde(Path::new("/abs/osas.db")), PathBuf::from("/abs/osas.db"));
  }
}
