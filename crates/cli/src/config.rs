// ==============================================================================
// comb.toml Configuration
// ==============================================================================
//
// Discovers and loads `comb.toml` project configuration files. Every field is
// a default that the matching command line flag overrides.
//
// Example comb.toml:
//
// ```toml
// source = "1"
// target = "(2 * 2^8)"
// witness_hex = "8090"
// ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "comb.toml";

/// Top-level `comb.toml` configuration.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombConfig {
    /// Declared input type of the program root.
    #[serde(default)]
    pub source: Option<String>,

    /// Declared output type of the program root.
    #[serde(default)]
    pub target: Option<String>,

    /// Packed witness bits, as hex.
    #[serde(default)]
    pub witness_hex: Option<String>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(comb::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid comb.toml")]
    #[diagnostic(code(comb::config::toml))]
    Toml(#[from] toml::de::Error),
}

/// Walk up from `start_dir` looking for `comb.toml`. Returns the first match.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Read and parse a `comb.toml` file.
pub fn load_config(path: &Path) -> Result<CombConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CombConfig = toml::from_str(&contents)?;
    log::debug!("loaded {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = indoc! {r#"
            source = "1"
            target = "(2 * 2^8)"
            witness_hex = "8090"
        "#};
        let config: CombConfig = toml::from_str(toml_str).expect("parse error");
        assert_eq!(
            config,
            CombConfig {
                source: Some("1".to_string()),
                target: Some("(2 * 2^8)".to_string()),
                witness_hex: Some("8090".to_string()),
            }
        );
    }

    #[test]
    fn parse_empty_config() {
        let config: CombConfig = toml::from_str("").expect("parse error");
        assert_eq!(config, CombConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<CombConfig>("stubs = []").is_err());
    }

    #[test]
    fn finds_config_in_parent() {
        let root = std::env::temp_dir().join(format!("comb-config-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILE), "source = \"1\"\n").unwrap();

        let found = find_config(&nested).expect("config above nested dir");
        assert_eq!(found, root.join(CONFIG_FILE));
        assert_eq!(load_config(&found).unwrap().source.as_deref(), Some("1"));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
