//! Configuration for the lens CLI.
//!
//! Configuration is stored in ~/.lens/config.yaml. Command-line flags
//! override values from the file.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".lens";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the ONNX model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,

    /// Path to the label file, one class name per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<PathBuf>,

    /// Model input height (0 = default 224).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub input_height: i32,

    /// Model input width (0 = default 224).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub input_width: i32,

    /// Number of engines to run in parallel (0 = 1).
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub workers: usize,

    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    path: Option<PathBuf>,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

fn is_zero_usize(n: &usize) -> bool {
    *n == 0
}

/// Flag values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<PathBuf>,
    pub labels: Option<PathBuf>,
    pub input_height: Option<i32>,
    pub input_width: Option<i32>,
    pub workers: Option<usize>,
}

/// Fully resolved settings for a classification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model: PathBuf,
    pub labels: PathBuf,
    pub input_height: i32,
    pub input_width: i32,
    pub workers: usize,
}

impl Config {
    /// Gets the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Loads the config from `custom_path`, or the default location.
    ///
    /// A missing default file yields an empty config; a missing explicit
    /// file is an error.
    pub fn load(custom_path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match custom_path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                anyhow::bail!("config file {} not found", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        let mut cfg = Self::parse(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.path = Some(path);
        Ok(cfg)
    }

    /// Parses YAML config content.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Returns the path the config was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Applies flag overrides and checks that required paths are set.
    pub fn resolve(&self, overrides: &Overrides) -> anyhow::Result<Settings> {
        let Some(model) = overrides.model.clone().or_else(|| self.model.clone()) else {
            let msg = "no model configured, use --model or set `model` in the config file";
            anyhow::bail!(msg);
        };
        let Some(labels) = overrides.labels.clone().or_else(|| self.labels.clone()) else {
            let msg = "no label file configured, use --labels or set `labels` in the config file";
            anyhow::bail!(msg);
        };

        Ok(Settings {
            model,
            labels,
            input_height: overrides.input_height.unwrap_or(self.input_height),
            input_width: overrides.input_width.unwrap_or(self.input_width),
            workers: overrides.workers.unwrap_or(self.workers).max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_full() {
        let cfg = Config::parse(
            "model: /models/mobilenetv2-7.onnx\n\
             labels: /models/imagenet_classes.txt\n\
             input_height: 256\n\
             input_width: 256\n\
             workers: 4\n",
        )
        .unwrap();
        assert_eq!(cfg.model.as_deref(), Some(Path::new("/models/mobilenetv2-7.onnx")));
        assert_eq!(cfg.input_height, 256);
        assert_eq!(cfg.workers, 4);
    }

    #[test]
    fn parse_empty() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn flags_override_file() {
        let cfg = Config::parse("model: a.onnx\nlabels: a.txt\ninput_height: 256\n").unwrap();
        let settings = cfg
            .resolve(&Overrides {
                model: Some("b.onnx".into()),
                input_width: Some(128),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.model, PathBuf::from("b.onnx"));
        assert_eq!(settings.labels, PathBuf::from("a.txt"));
        assert_eq!(settings.input_height, 256);
        assert_eq!(settings.input_width, 128);
        assert_eq!(settings.workers, 1);
    }

    #[test]
    fn missing_model_is_an_error() {
        let err = Config::default()
            .resolve(&Overrides {
                labels: Some("l.txt".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("--model"));
    }

    #[test]
    fn missing_labels_is_an_error() {
        let err = Config::parse("model: m.onnx\n")
            .unwrap()
            .resolve(&Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("--labels"));
    }

    #[test]
    fn load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model: m.onnx\nlabels: l.txt").unwrap();
        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.path(), Some(file.path()));
        assert_eq!(cfg.labels.as_deref(), Some(Path::new("l.txt")));
    }

    #[test]
    fn load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("none.yaml"))).is_err());
    }
}
