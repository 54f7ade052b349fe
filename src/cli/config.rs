//! Config subcommand implementation.

use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use crate::output;
use clap::{Parser, Subcommand};

/// Show or initialise settings.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings as JSON
    Show,

    /// Write a settings file with default values
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self, settings: &AppSettings) -> CliResult<()> {
        match &self.action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(settings)
                    .map_err(crate::error::ConfigError::from)?;
                println!("{}", json);
            }
            ConfigAction::Init { force } => {
                let file = Paths::get()?.settings_file();
                if file.exists() && !force {
                    output::print_warning(&format!(
                        "{} already exists, use --force to overwrite",
                        file.display()
                    ));
                    return Ok(());
                }
                let written = AppSettings::default().save()?;
                output::print_success(&format!("wrote {}", written.display()));
            }
        }
        Ok(())
    }
}
