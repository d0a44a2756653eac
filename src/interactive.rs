//! Interactive shell.
//!
//! Each line is parsed with the same subcommand grammar as the one-shot CLI
//! and runs to completion before the next prompt.

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::display::{self, OutputFormat};
use crate::error::{Result, RollSafeError};
use crate::location;
use crate::operations::VaultOperations;
use crate::utils::warning;
use chrono::Local;
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// One shell line.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

/// Split a line into words, honoring double quotes.
pub fn split_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}

/// Interactive vault shell.
pub struct InteractiveVault<'a> {
    cli: &'a Cli,
    config: Config,
    ops: VaultOperations,
    editor: DefaultEditor,
}

impl<'a> InteractiveVault<'a> {
    pub fn new(cli: &'a Cli) -> Result<Self> {
        let config = cli.load_config()?;
        let ops = VaultOperations::open(&config);
        if !ops.is_persistent() {
            warning("Vault storage is unavailable; changes will not be saved");
        }

        let editor = DefaultEditor::new()
            .map_err(|_| RollSafeError::Other("Failed to create editor".to_string()))?;

        Ok(Self {
            cli,
            config,
            ops,
            editor,
        })
    }

    /// Run the interactive loop.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = format!("{} ", "rollsafe>".cyan());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    match self.execute_line(line).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => eprintln!("{} {}", "Error:".red(), e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("\nUse 'exit' to quit");
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err:?}");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Execute one line. Returns false when the shell should exit.
    async fn execute_line(&mut self, line: &str) -> Result<bool> {
        let words = split_line(line);
        match words.first().map(String::as_str) {
            None => return Ok(true),
            Some("exit" | "quit" | "q") => return Ok(false),
            Some("help" | "?") => {
                self.show_help();
                return Ok(true);
            }
            Some(_) => {}
        }

        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("{e}");
                return Ok(true);
            }
        };

        if let Commands::Location = parsed.command {
            let provider = self.config.location.provider();
            let fix = location::locate_once(provider.as_ref(), self.config.location.timeout()).await?;
            if self.cli.output == OutputFormat::Json {
                display::print_json(&fix)?;
            } else {
                display::print_location(&fix);
            }
            return Ok(true);
        }

        self.cli
            .run(&mut self.ops, &parsed.command, Local::now().date_naive())?;
        Ok(true)
    }

    fn print_welcome(&self) {
        println!("{}", "RollSafe".bold());
        println!("Driver vault and inspection mode");
        println!(
            "Inspection: {}    Type 'help' for commands",
            display::gate_label(self.ops.gate_state())
        );
        println!();
    }

    fn show_help(&self) {
        println!("{}", "Commands:".bold());
        let rows = [
            ("dashboard", "Compliance status of every document"),
            ("list [query]", "List documents, optionally filtered"),
            ("show <id>", "Show one document"),
            ("attach <id> <file>", "Attach a photo or scan"),
            ("detach <id>", "Remove an attachment"),
            ("export <id> <file>", "Save an attachment to a file"),
            ("expires <id> <date|none>", "Set or clear the expiration date"),
            ("allow <id>", "Show or hide a document in inspection mode"),
            ("set-pin", "Set the inspection PIN"),
            ("inspect [enter|exit|toggle]", "Inspection mode"),
            ("location", "Report the device position"),
            ("help", "Show this help"),
            ("exit", "Leave the shell"),
        ];
        for (cmd, desc) in rows {
            println!("  {:<30} {}", cmd.cyan(), desc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("list"), vec!["list"]);
        assert_eq!(split_line("  show   cdl "), vec!["show", "cdl"]);
        assert_eq!(split_line(r#"list "cab card""#), vec!["list", "cab card"]);
        assert_eq!(
            split_line(r#"attach cdl "/tmp/my scan.pdf""#),
            vec!["attach", "cdl", "/tmp/my scan.pdf"]
        );
        assert_eq!(split_line(r#"expires cdl """#), vec!["expires", "cdl", ""]);
    }

    #[test]
    fn test_shell_grammar_matches_cli() {
        let line = ShellLine::try_parse_from(split_line("inspect toggle")).unwrap();
        assert_eq!(
            line.command,
            Commands::Inspect {
                action: Some(crate::cli::InspectAction::Toggle)
            }
        );
        assert!(ShellLine::try_parse_from(split_line("frobnicate")).is_err());
    }
}
