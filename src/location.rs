//! One-shot device position queries.
//!
//! A query is a single request bounded by a fixed deadline. There is no retry:
//! a timeout or provider failure is reported as
//! [`RollSafeError::LocationUnavailable`].

use crate::error::{Result, RollSafeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Default deadline for a position query.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy_m: f64,
}

impl LocationFix {
    /// Reject coordinates outside the valid ranges.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(RollSafeError::LocationUnavailable(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(RollSafeError::LocationUnavailable(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        if !self.accuracy_m.is_finite() || self.accuracy_m < 0.0 {
            return Err(RollSafeError::LocationUnavailable(format!(
                "invalid accuracy {}",
                self.accuracy_m
            )));
        }
        Ok(())
    }
}

/// Source of position fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<LocationFix>;
}

/// No positioning capability on this device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<LocationFix> {
        Err(RollSafeError::LocationUnavailable(
            "no location provider configured".to_string(),
        ))
    }
}

/// A fixed position, e.g. the home terminal.
#[derive(Debug, Clone, Copy)]
pub struct StaticLocation(pub LocationFix);

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current_position(&self) -> Result<LocationFix> {
        Ok(self.0)
    }
}

/// Runs an external program that prints a JSON fix on stdout.
///
/// The output shape matches `termux-location`: an object with `latitude`,
/// `longitude` and `accuracy` fields. Extra fields are ignored.
#[derive(Debug, Clone)]
pub struct CommandLocation {
    program: String,
    args: Vec<String>,
}

#[derive(Deserialize)]
struct CommandFix {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy: f64,
}

impl CommandLocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse the program's stdout.
    pub fn parse_output(stdout: &[u8]) -> Result<LocationFix> {
        let fix: CommandFix = serde_json::from_slice(stdout).map_err(|e| {
            RollSafeError::LocationUnavailable(format!("unreadable location output: {e}"))
        })?;
        Ok(LocationFix {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_m: fix.accuracy,
        })
    }
}

#[async_trait]
impl LocationProvider for CommandLocation {
    async fn current_position(&self) -> Result<LocationFix> {
        debug!(program = %self.program, "querying location command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                RollSafeError::LocationUnavailable(format!("failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            return Err(RollSafeError::LocationUnavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        Self::parse_output(&output.stdout)
    }
}

/// Ask `provider` for one fix, giving up after `deadline`.
pub async fn locate_once(provider: &dyn LocationProvider, deadline: Duration) -> Result<LocationFix> {
    let fix = tokio::time::timeout(deadline, provider.current_position())
        .await
        .map_err(|_| {
            RollSafeError::LocationUnavailable(format!(
                "timed out after {} seconds",
                deadline.as_secs_f32()
            ))
        })??;

    fix.validate()?;
    Ok(fix)
}
