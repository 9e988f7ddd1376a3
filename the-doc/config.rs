//! Editor configuration, read from TOML.
//!
//! ```toml
//! [normalize]
//! iteration-factor = 42
//!
//! [schema]
//! type-key = "type"
//! inline = ["link", "mention"]
//! void = ["mention", "image"]
//!
//! [history]
//! limit = 100
//! ```
//!
//! Every section and key is optional. Unknown keys are rejected.

use std::{
  fs,
  path::{
    Path,
    PathBuf,
  },
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("normalize.iteration-factor must be at least 1")]
  ZeroIterationFactor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
  pub normalize: NormalizeConfig,
  pub schema:    SchemaConfig,
  pub history:   HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct NormalizeConfig {
  /// Repairs allowed per dirty path in one pass before the pass is
  /// considered runaway.
  pub iteration_factor: usize,
}

impl Default for NormalizeConfig {
  fn default() -> Self {
    Self {
      iteration_factor: 42,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SchemaConfig {
  /// Element property holding the element's type.
  pub type_key: String,
  /// Element types that flow inside text.
  pub inline:   Vec<String>,
  /// Element types whose content is not editable.
  pub void:     Vec<String>,
}

impl Default for SchemaConfig {
  fn default() -> Self {
    Self {
      type_key: "type".to_string(),
      inline:   Vec::new(),
      void:     Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HistoryConfig {
  /// Undo batches kept before the oldest is dropped.
  pub limit: usize,
}

impl Default for HistoryConfig {
  fn default() -> Self {
    Self { limit: 100 }
  }
}

impl Config {
  pub fn load(source: &str) -> Result<Config> {
    let config: Config = toml::from_str(source)?;
    config.validate()
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| {
      ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }
    })?;
    Self::load(&source)
  }

  /// Load `global`, then overlay the tables and keys present in `local`.
  pub fn load_layered(global: &str, local: &str) -> Result<Config> {
    let global: toml::Table = toml::from_str(global)?;
    let local: toml::Table = toml::from_str(local)?;
    let merged = merge_tables(global, local, 2);
    let config: Config = toml::Value::Table(merged).try_into()?;
    config.validate()
  }

  fn validate(self) -> Result<Config> {
    if self.normalize.iteration_factor == 0 {
      return Err(ConfigError::ZeroIterationFactor);
    }
    Ok(self)
  }
}

/// Overlay `right` onto `left`, recursing into tables up to `depth` levels.
/// Arrays and scalars from `right` replace the ones in `left`.
fn merge_tables(mut left: toml::Table, right: toml::Table, depth: usize) -> toml::Table {
  for (key, rvalue) in right {
    let merged = match (left.remove(&key), rvalue) {
      (Some(toml::Value::Table(ltable)), toml::Value::Table(rtable)) if depth > 0 => {
        toml::Value::Table(merge_tables(ltable, rtable, depth - 1))
      },
      (_, rvalue) => rvalue,
    };
    left.insert(key, merged);
  }
  left
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn empty_source_is_default() {
    assert_eq!(Config::load("").unwrap(), Config::default());
    assert_eq!(Config::default().normalize.iteration_factor, 42);
    assert_eq!(Config::default().history.limit, 100);
    assert_eq!(Config::default().schema.type_key, "type");
  }

  #[test]
  fn sections_are_kebab_case() {
    let config = Config::load(
      r#"
      [normalize]
      iteration-factor = 7

      [schema]
      type-key = "kind"
      inline = ["link"]
      void = ["image"]
      "#,
    )
    .unwrap();
    assert_eq!(config.normalize.iteration_factor, 7);
    assert_eq!(config.schema.type_key, "kind");
    assert_eq!(config.schema.inline, vec!["link"]);
    assert_eq!(config.schema.void, vec!["image"]);
    assert_eq!(config.history, HistoryConfig::default());
  }

  #[test]
  fn unknown_keys_and_zero_factor_are_rejected() {
    assert!(matches!(
      Config::load("[history]\ndepth = 3"),
      Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
      Config::load("[normalize]\niteration-factor = 0"),
      Err(ConfigError::ZeroIterationFactor)
    ));
  }

  #[test]
  fn local_layer_overrides_global() {
    let config = Config::load_layered(
      "[schema]\ninline = [\"link\"]\ntype-key = \"kind\"\n[history]\nlimit = 5",
      "[schema]\ninline = [\"mention\"]",
    )
    .unwrap();
    assert_eq!(config.schema.inline, vec!["mention"]);
    assert_eq!(config.schema.type_key, "kind");
    assert_eq!(config.history.limit, 5);
  }

  #[test]
  fn from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[history]\nlimit = 3").unwrap();
    assert_eq!(Config::from_file(file.path()).unwrap().history.limit, 3);
    assert!(matches!(
      Config::from_file("/definitely/not/here.toml"),
      Err(ConfigError::Io { .. })
    ));
  }
}
