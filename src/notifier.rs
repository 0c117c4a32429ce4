//! # Change Notifier
//!
//! Runs the user supplied post-sync action through the system shell.
//! Output streams are inherited; a failing action is logged and never
//! changes the run's result.

use crate::constants::NOTIFIER_SHELL;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Hook invoked once after a run that changed something
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, action: &str) -> Result<ExitStatus>;
}

/// Executes actions with `/bin/sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellNotifier;

#[async_trait]
impl ChangeNotifier for ShellNotifier {
    async fn notify(&self, action: &str) -> Result<ExitStatus> {
        info!("Executing command {}", action);
        Command::new(NOTIFIER_SHELL)
            .arg("-c")
            .arg(action)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Could not start {NOTIFIER_SHELL} for {action:?}"))
    }
}

/// Run `action` and log the outcome; returns whether it exited successfully.
pub async fn run_action(notifier: &dyn ChangeNotifier, action: &str) -> bool {
    match notifier.notify(action).await {
        Ok(status) if status.success() => {
            info!("Command finished successfully");
            true
        }
        Ok(status) => {
            warn!("Command exited with {}", status);
            false
        }
        Err(e) => {
            error!("Could not execute due to error: {:#}", e);
            false
        }
    }
}
