//! `lens config`: inspect configuration.

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::output::OutputFormat;
use crate::Cli;

/// Inspect CLI configuration.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the config file location
    Path,
    /// Print the loaded configuration
    Show,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match self.command {
            ConfigSubcommand::Path => {
                let path = cli
                    .config
                    .clone()
                    .or_else(Config::default_path)
                    .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?;
                println!("{}", path.display());
            }
            ConfigSubcommand::Show => {
                let cfg = Config::load(cli.config.as_deref())?;
                print!("{}", render(&cfg, cli.format)?);
            }
        }
        Ok(())
    }
}

/// Renders `cfg`. YAML output names the file it was loaded from.
fn render(cfg: &Config, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(cfg)? + "\n",
        OutputFormat::Text | OutputFormat::Yaml => {
            let body = serde_yaml::to_string(cfg)?;
            match cfg.path() {
                Some(path) => format!("# {}\n{body}", path.display()),
                None => body,
            }
        }
    })
}
