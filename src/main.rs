//! Main entry point for rollsafe.

use clap::Parser;
use rollsafe::cli::Cli;
use rollsafe::interactive::InteractiveVault;
use rollsafe::logging::init_logging;
use rollsafe::utils::error_exit;

#[tokio::main]
async fn main() {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let result = match &cli.command {
        Some(command) => cli.execute(command).await,
        None => run_interactive(&cli).await,
    };

    if let Err(e) = result {
        error_exit(&e.to_string(), 1);
    }
}

/// Start the shell, or explain how to use one-shot commands when there is
/// no terminal to talk to.
async fn run_interactive(cli: &Cli) -> rollsafe::Result<()> {
    if !(atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)) {
        return Err(rollsafe::RollSafeError::Other(
            "No command given and not running in a terminal. Run 'rollsafe --help' for commands."
                .to_string(),
        ));
    }

    let mut vault = InteractiveVault::new(cli)?;
    vault.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["rollsafe", "list"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["rollsafe", "inspect"]);
        assert!(cli.is_ok());
    }
}
