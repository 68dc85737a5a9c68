//! Output utilities.

use std::{fs::File, io::Write, path::PathBuf};

use clap::ValueEnum;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `image: label` line per image (default).
    #[default]
    Text,
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

/// Result for one image.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Classification {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Output configuration.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
}

impl Output {
    pub fn new(format: OutputFormat, file: Option<PathBuf>) -> Self {
        Self { format, file }
    }

    /// Renders `results` in the configured format.
    pub fn render(&self, results: &[Classification]) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Text => results.iter().map(text_line).collect(),
            OutputFormat::Yaml => serde_yaml::to_string(results)?,
            OutputFormat::Json => serde_json::to_string_pretty(results)? + "\n",
        })
    }

    /// Writes `results` to the output file, or stdout.
    pub fn write(&self, results: &[Classification]) -> anyhow::Result<()> {
        let output = self.render(results)?;
        match &self.file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(output.as_bytes())?;
            }
            None => print!("{output}"),
        }
        Ok(())
    }
}

fn text_line(c: &Classification) -> String {
    match (&c.label, &c.error) {
        (_, Some(err)) => format!("{}: error: {err}\n", c.image.display()),
        (Some(label), None) => format!("{}: {label}\n", c.image.display()),
        (None, None) => format!("{}:\n", c.image.display()),
    }
}
