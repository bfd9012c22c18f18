//! icie configuration.
//!
//! Loaded from `<config dir>/icie/icie.toml`, or the `--config` path. A
//! missing default file means defaults; a missing explicit file is an error.
//!
//! ```toml
//! worker = "/opt/icie/worker"
//!
//! [template]
//! path = "~/templates/main.cpp"
//! start = { row = 5, column = 5 }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use icie::{Config, TemplateConfig};

pub const CONFIG_FILE: &str = "icie.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Worker executable.
    #[serde(default)]
    pub worker: Option<PathBuf>,

    #[serde(default)]
    pub template: TemplateConfig,
}

impl Settings {
    /// `<config dir>/icie/icie.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("icie").join(CONFIG_FILE))
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => {
                    tracing::debug!("No config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let settings = Self::parse(&contents, dirs::home_dir().as_deref())
            .with_context(|| format!("invalid config at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(settings)
    }

    /// Parse TOML and expand a leading `~` in paths against `home`.
    pub fn parse(contents: &str, home: Option<&Path>) -> Result<Self> {
        let mut settings: Self = toml::from_str(contents)?;
        if let Some(home) = home {
            settings.worker = settings.worker.map(|p| expand_home(p, home));
            settings.template.path = settings.template.path.map(|p| expand_home(p, home));
        }
        Ok(settings)
    }

    /// The part the core reads through `Host::load_config`.
    pub fn core(&self) -> Config {
        Config {
            template: self.template.clone(),
        }
    }
}

fn expand_home(path: PathBuf, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icie::Position;

    #[test]
    fn full_config() {
        let settings = Settings::parse(
            r#"
            worker = "/opt/icie/worker"

            [template]
            path = "~/templates/main.cpp"
            start = { row = 5, column = 9 }
            "#,
            Some(Path::new("/home/u")),
        )
        .unwrap();

        assert_eq!(settings.worker, Some(PathBuf::from("/opt/icie/worker")));
        assert_eq!(
            settings.core().template,
            TemplateConfig {
                path: Some(PathBuf::from("/home/u/templates/main.cpp")),
                start: Position { row: 5, column: 9 },
            }
        );
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Settings::parse("", None).unwrap(), Settings::default());
    }

    #[test]
    fn tilde_inside_a_name_is_left_alone() {
        let settings =
            Settings::parse(r#"worker = "/opt/~worker""#, Some(Path::new("/home/u"))).unwrap();
        assert_eq!(settings.worker, Some(PathBuf::from("/opt/~worker")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::parse("wroker = \"/x\"", None).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[template]\npath = \"/t/main.cpp\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.template.path, Some(PathBuf::from("/t/main.cpp")));
        assert_eq!(settings.template.start, Position::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
