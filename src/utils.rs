//! Terminal helpers and input parsing.

use crate::error::{Result, RollSafeError};
use crate::status::ExpirationStatus;
use chrono::NaiveDate;
use colored::*;
use std::io::{self, BufRead};
use zeroize::Zeroizing;

/// Parse a `YYYY-MM-DD` date. `none` (any case) or an empty string clears it.
pub fn parse_expiration(input: &str) -> Result<Option<NaiveDate>> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| RollSafeError::InvalidDate(input.to_string()))
}

/// Human-readable byte count.
pub fn format_bytes(size: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if size >= MIB {
        format!("{:.1} MiB", size as f64 / MIB as f64)
    } else if size >= KIB {
        format!("{:.1} KiB", size as f64 / KIB as f64)
    } else {
        format!("{size} B")
    }
}

/// Status label colored for the terminal.
pub fn status_badge(status: ExpirationStatus) -> ColoredString {
    match status {
        ExpirationStatus::Good => status.label().green(),
        ExpirationStatus::ExpiringSoon => status.label().yellow().bold(),
        ExpirationStatus::Expired => status.label().red().bold(),
        ExpirationStatus::Unknown => status.label().dimmed(),
    }
}

/// Describe how far away a date is.
pub fn describe_days(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("in {d} days"),
    }
}

/// Prompt for a PIN with masked input.
pub fn prompt_pin(prompt: &str) -> Result<Zeroizing<String>> {
    use dialoguer::Password;

    let pin = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(|e| RollSafeError::Other(e.to_string()))?;

    if pin.is_empty() {
        return Err(RollSafeError::Cancelled);
    }
    Ok(Zeroizing::new(pin))
}

/// Prompt for a new PIN twice.
pub fn prompt_new_pin() -> Result<Zeroizing<String>> {
    let pin = prompt_pin("New inspection PIN")?;
    let confirm = prompt_pin("Confirm PIN")?;
    if *pin != *confirm {
        return Err(RollSafeError::PinMismatch);
    }
    Ok(pin)
}

/// Read a PIN from the first line of stdin.
pub fn read_pin_from_stdin() -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line)?;
    let pin = Zeroizing::new(line.trim().to_string());
    if pin.is_empty() {
        return Err(RollSafeError::Cancelled);
    }
    Ok(pin)
}

/// Print an error message and exit.
pub fn error_exit(message: &str, code: i32) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(code);
}

/// Print a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print a warning message on stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiration() {
        assert_eq!(
            parse_expiration("2026-10-12").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 12)
        );
        assert_eq!(parse_expiration(" NONE ").unwrap(), None);
        assert_eq!(parse_expiration("").unwrap(), None);
        assert!(matches!(
            parse_expiration("10/12/2026"),
            Err(RollSafeError::InvalidDate(_))
        ));
        assert!(parse_expiration("2026-02-30").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.0 MiB");
    }

    #[test]
    fn test_describe_days() {
        assert_eq!(describe_days(0), "today");
        assert_eq!(describe_days(1), "tomorrow");
        assert_eq!(describe_days(-1), "yesterday");
        assert_eq!(describe_days(-5), "5 days ago");
        assert_eq!(describe_days(30), "in 30 days");
    }
}
