use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::escaper::EscaperKind;

/// Errors raised while reading `utsushi.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine settings.
///
/// ```toml
/// probe_upward = true
/// max_probe_depth = 32
/// eager_tokens = false
///
/// [hosts]
/// string_literal = "backslash"
/// raw_string_literal = "verbatim"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
#[serde(default)]
pub struct InjectionSettings {
    /// Walk from the queried element toward the file root looking for a host
    pub probe_upward: bool,
    /// Upper bound on the number of ancestors visited by the upward walk
    pub max_probe_depth: usize,
    /// Project highlight tokens right after registration instead of on demand
    pub eager_tokens: bool,
    /// Host node kind → escaper used for fragments inside it
    pub hosts: HashMap<String, EscaperKind>,
}

impl Default for InjectionSettings {
    fn default() -> Self {
        Self {
            probe_upward: true,
            max_probe_depth: 64,
            eager_tokens: false,
            hosts: HashMap::new(),
        }
    }
}

impl InjectionSettings {
    pub fn from_toml_str(contents: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str::<InjectionSettings>(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Escaper configured for a host node kind.
    pub fn escaper_for(&self, kind: &str) -> Option<EscaperKind> {
        self.hosts.get(kind).copied()
    }
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> ConfigResult<InjectionSettings> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = InjectionSettings::from_toml_str(&contents, path)?;
    log::debug!(
        target: "utsushi::config",
        "Loaded {} ({} host kinds)",
        path.display(),
        settings.hosts.len()
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let settings =
            InjectionSettings::from_toml_str("eager_tokens = true", Path::new("inline")).unwrap();
        assert!(settings.eager_tokens);
        assert!(settings.probe_upward);
        assert_eq!(settings.max_probe_depth, 64);
        assert!(settings.hosts.is_empty());
    }

    #[test]
    fn test_hosts_table_maps_kinds_to_escapers() {
        let toml = r#"
            probe_upward = false

            [hosts]
            string_literal = "backslash"
            raw_string_literal = "verbatim"
        "#;
        let settings = InjectionSettings::from_toml_str(toml, Path::new("inline")).unwrap();
        assert!(!settings.probe_upward);
        assert_eq!(
            settings.escaper_for("string_literal"),
            Some(EscaperKind::Backslash)
        );
        assert_eq!(
            settings.escaper_for("raw_string_literal"),
            Some(EscaperKind::Verbatim)
        );
        assert_eq!(settings.escaper_for("identifier"), None);
    }

    #[test]
    fn test_unknown_escaper_is_a_parse_error() {
        let err = InjectionSettings::from_toml_str(
            "[hosts]\nstring_literal = \"rot13\"",
            Path::new("bad.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
