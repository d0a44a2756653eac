//! Command-line interface implementation.

use crate::config::Config;
use crate::display::{self, OutputFormat};
use crate::error::{Result, RollSafeError};
use crate::gate::GateState;
use crate::location;
use crate::logging::Verbosity;
use crate::operations::VaultOperations;
use crate::utils::{self, success, warning};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Compliance document vault for commercial drivers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the vault
    #[arg(long, global = true, env = "ROLLSAFE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = "ROLLSAFE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Read the PIN from the first line of stdin instead of prompting
    #[arg(long, global = true)]
    pub pin_stdin: bool,

    /// More log output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Without a command, start the interactive shell
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Compliance status of every document
    #[command(alias = "status")]
    Dashboard,

    /// List documents, optionally filtered
    #[command(alias = "ls")]
    List {
        /// Matches title, category and tags (case-insensitive)
        query: Option<String>,
    },

    /// Show one document
    Show { id: String },

    /// Attach a file (photo or scan) to a document
    Attach { id: String, file: PathBuf },

    /// Remove a document's attachment
    Detach { id: String },

    /// Save a document's attachment to a file
    Export { id: String, out: PathBuf },

    /// Set an expiration date (YYYY-MM-DD) or "none"
    Expires { id: String, date: String },

    /// Show or hide a document in inspection mode
    Allow { id: String },

    /// Set the inspection PIN
    SetPin,

    /// Inspection mode
    Inspect {
        #[command(subcommand)]
        action: Option<InspectAction>,
    },

    /// Report the device position
    Location,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectAction {
    /// Unlock inspection mode
    Enter,
    /// Leave inspection mode
    Exit,
    /// Submit the PIN and flip the current mode
    Toggle,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    /// Load configuration, applying `--data-dir`.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_from(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        Ok(config)
    }

    fn read_pin(&self, prompt: &str) -> Result<Zeroizing<String>> {
        if self.pin_stdin {
            utils::read_pin_from_stdin()
        } else {
            utils::prompt_pin(prompt)
        }
    }

    fn read_new_pin(&self) -> Result<Zeroizing<String>> {
        if self.pin_stdin {
            utils::read_pin_from_stdin()
        } else {
            utils::prompt_new_pin()
        }
    }

    /// Execute a one-shot command.
    pub async fn execute(&self, command: &Commands) -> Result<()> {
        let config = self.load_config()?;

        if let Commands::Location = command {
            return self.locate(&config).await;
        }

        let mut ops = VaultOperations::open(&config);
        if !ops.is_persistent() {
            warning("Vault storage is unavailable; changes will not be saved");
        }
        self.run(&mut ops, command, Local::now().date_naive())
    }

    /// Run a vault command against `ops`.
    pub fn run(&self, ops: &mut VaultOperations, command: &Commands, today: NaiveDate) -> Result<()> {
        let json = self.output == OutputFormat::Json;

        match command {
            Commands::Dashboard => {
                let summary = ops.dashboard(today);
                if json {
                    display::print_json(&summary)?;
                } else {
                    display::print_dashboard(&summary);
                }
            }
            Commands::List { query } => {
                let docs = ops.list(query.as_deref().unwrap_or(""), today);
                if json {
                    display::print_json(&docs)?;
                } else {
                    display::print_document_list(&docs);
                }
            }
            Commands::Show { id } => {
                let doc = ops.show(id, today)?;
                if json {
                    display::print_json(&doc)?;
                } else {
                    display::print_document(&doc);
                }
            }
            Commands::Attach { id, file } => {
                let info = ops.attach_file(id, file)?;
                if json {
                    display::print_json(&info)?;
                } else {
                    success(&format!(
                        "Attached {} to {id} ({})",
                        info.file_name,
                        utils::format_bytes(info.size)
                    ));
                }
            }
            Commands::Detach { id } => {
                let info = ops.detach(id)?;
                if json {
                    display::print_json(&info)?;
                } else {
                    success(&format!("Removed {} from {id}", info.file_name));
                }
            }
            Commands::Export { id, out } => {
                let info = ops.export_attachment(id, out)?;
                if json {
                    display::print_json(&info)?;
                } else {
                    success(&format!("Saved {} to {}", info.file_name, out.display()));
                }
            }
            Commands::Expires { id, date } => {
                let date = utils::parse_expiration(date)?;
                ops.set_expiration(id, date)?;
                if json {
                    display::print_json(&serde_json::json!({ "id": id, "expires_on": date }))?;
                } else {
                    match date {
                        Some(d) => success(&format!("{id} now expires on {d}")),
                        None => success(&format!("Cleared expiration date of {id}")),
                    }
                }
            }
            Commands::Allow { id } => {
                let allowed = ops.toggle_allowlist(id)?;
                if json {
                    display::print_json(&serde_json::json!({ "id": id, "allowlisted": allowed }))?;
                } else if allowed {
                    success(&format!("{id} will be shown in inspection mode"));
                } else {
                    success(&format!("{id} will be hidden in inspection mode"));
                }
            }
            Commands::SetPin => {
                let pin = self.read_new_pin()?;
                ops.set_pin(&pin)?;
                success("Inspection PIN set; inspection mode is locked");
            }
            Commands::Inspect { action } => self.inspect(ops, *action, today)?,
            Commands::Location => {
                return Err(RollSafeError::Other(
                    "location does not operate on the vault".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn inspect(
        &self,
        ops: &mut VaultOperations,
        action: Option<InspectAction>,
        today: NaiveDate,
    ) -> Result<()> {
        if let Some(action) = action {
            if ops.gate_state() == GateState::NoPinSet {
                return Err(RollSafeError::NoPinSet);
            }
            let pin = self.read_pin("Inspection PIN")?;
            let state = match action {
                InspectAction::Enter => ops.enter_inspection(&pin)?,
                InspectAction::Exit => ops.exit_inspection(&pin)?,
                InspectAction::Toggle => ops.submit_pin(&pin)?,
            };
            if self.output == OutputFormat::Text {
                success(&format!("Inspection mode: {}", display::gate_label(state)));
            }
        }

        let report = ops.inspection(today);
        if self.output == OutputFormat::Json {
            display::print_json(&report)?;
        } else {
            display::print_inspection(&report);
        }
        Ok(())
    }

    async fn locate(&self, config: &Config) -> Result<()> {
        let provider = config.location.provider();
        let fix = location::locate_once(provider.as_ref(), config.location.timeout()).await?;
        if self.output == OutputFormat::Json {
            display::print_json(&fix)?;
        } else {
            display::print_location(&fix);
        }
        Ok(())
    }
}
