//! Launching the platform's default URL handler.

use std::process::Command;

use tracing::info;

use crate::error::{Result, TidyError};

/// Opens URLs for the operator.
pub trait Browser {
    fn open(&mut self, url: &str) -> Result<()>;
}

/// Spawns the desktop's URL opener and returns without waiting for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Option<Command> {
        let mut cmd = if cfg!(target_os = "linux") {
            Command::new("xdg-open")
        } else if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("rundll32");
            cmd.arg("url.dll,FileProtocolHandler");
            cmd
        } else {
            return None;
        };
        cmd.arg(url);
        Some(cmd)
    }
}

impl Browser for SystemBrowser {
    fn open(&mut self, url: &str) -> Result<()> {
        let mut cmd = Self::command(url).ok_or_else(|| TidyError::Browser {
            url: url.to_string(),
            reason: "unsupported platform".to_string(),
        })?;
        info!(url, "Opening link");
        cmd.spawn().map_err(|e| TidyError::Browser {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
