//! CLI configuration.
//!
//! Loaded from `~/.config/sdfs/config.toml` (or `--config`), then overridden
//! by command-line flags. Every key is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Keys accepted in the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Display name of the filesystem.
    pub name: Option<String>,
    /// Host directory mounted as `/`.
    pub root: Option<PathBuf>,
    pub read_only: bool,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log: Option<String>,
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sdfs").join("config.toml"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file.
    ///
    /// An explicit path must exist; the default path may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Apply command-line overrides. Flags win over the file.
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if overrides.name.is_some() {
            self.name = overrides.name;
        }
        if overrides.root.is_some() {
            self.root = overrides.root;
        }
        if overrides.log.is_some() {
            self.log = overrides.log;
        }
        self.read_only |= overrides.read_only;
        self
    }

    /// The mounted directory, defaulting to the working directory.
    pub fn root_or_cwd(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("resolving working directory"),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub name: Option<String>,
    pub root: Option<PathBuf>,
    pub read_only: bool,
    pub log: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            name = "Card"
            root = "/media/card"
            read_only = true
            log = "sdfs=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.name.as_deref(), Some("Card"));
        assert_eq!(config.root, Some(PathBuf::from("/media/card")));
        assert!(config.read_only);
        assert_eq!(config.log.as_deref(), Some("sdfs=debug"));
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("colour = \"red\"").is_err());
    }

    #[test]
    fn test_load_explicit_missing_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_and_merge() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "name = \"File\"\nroot = \"/from/file\"\n").unwrap();

        let config = Config::load(Some(&file)).unwrap().merge(Overrides {
            root: Some(PathBuf::from("/from/flag")),
            read_only: true,
            ..Default::default()
        });
        assert_eq!(config.name.as_deref(), Some("File"));
        assert_eq!(config.root, Some(PathBuf::from("/from/flag")));
        assert!(config.read_only);
        assert_eq!(config.log, None);
    }
}
