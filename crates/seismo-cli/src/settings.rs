//! Runtime settings, layered from an optional TOML file and `SEISMO_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use seismo_analytics::PointOfInterest;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Credential for the analysis backend. Runs refuse to start without it.
  #[serde(default)]
  pub api_key:            Option<String>,
  #[serde(default)]
  pub points_of_interest: Vec<PointOfInterest>,
}

fn default_store_path() -> PathBuf { PathBuf::from("seismo.db") }

impl Settings {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: PathBuf) -> anyhow::Result<Self> {
    Self::from_sources(config::File::from(path).required(false))
  }

  fn from_sources<S>(file: S) -> anyhow::Result<Self>
  where
    S: config::Source + Send + Sync + 'static,
  {
    let settings = config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("SEISMO"))
      .build()
      .context("failed to read config file")?;

    let mut out: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    out.store_path = expand_tilde(&out.store_path);
    Ok(out)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
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
  use config::{File, FileFormat};

  use super::*;

  #[test]
  fn file_values_and_defaults() {
    let toml = r#"
      api_key = "secret"

      [[points_of_interest]]
      name = "Taal"
      latitude = 14.0
      longitude = 121.0

      [[points_of_interest]]
      name = "Mayon"
      latitude = 13.26
      longitude = 123.69
    "#;
    let s = Settings::from_sources(File::from_str(toml, FileFormat::Toml)).unwrap();
    assert_eq!(s.api_key.as_deref(), Some("secret"));
    assert_eq!(s.points_of_interest.len(), 2);
    assert_eq!(s.points_of_interest[1], PointOfInterest::new("Mayon", 13.26, 123.69));
    assert_eq!(s.store_path, PathBuf::from("seismo.db"));
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/quakes.db")), PathBuf::from(home).join("quakes.db"));
    assert_eq!(expand_tilde(Path::new("/var/quakes.db")), PathBuf::from("/var/quakes.db"));
  }
}
