//! Terminal host: colored notices, dialoguer pickers, subprocess builds

use colored::Colorize;
use dbtsuite_core::{Notice, Notifier, Severity};
use dbtsuite_engine::{Host, HostError, PickItem, Selection};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{MultiSelect, Select};
use std::io::IsTerminal;
use std::path::Path;
use std::process::Command;

/// Host backed by the current terminal
pub struct TerminalHost {
    /// Print build commands instead of running them
    dry_run: bool,

    /// Whether pickers may prompt; off when stdin is not a terminal
    interactive: bool,
}

impl TerminalHost {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            interactive: std::io::stdin().is_terminal(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }
}

impl Notifier for TerminalHost {
    fn notify(&mut self, notice: Notice) {
        match notice.severity {
            Severity::Info => eprintln!("{} {}", "info:".cyan().bold(), notice.message),
            Severity::Warn => eprintln!("{} {}", "warning:".yellow().bold(), notice.message),
        }
    }
}

impl Host for TerminalHost {
    fn pick(&mut self, placeholder: &str, items: &[PickItem], many: bool) -> Selection<usize> {
        if !self.interactive || items.is_empty() {
            tracing::debug!("Not prompting for '{}': no terminal or no items", placeholder);
            return Selection::Cancelled;
        }

        let labels: Vec<String> = items
            .iter()
            .map(|item| {
                if item.description.is_empty() {
                    item.label.clone()
                } else {
                    format!("{}  {}", item.label, item.description.dimmed())
                }
            })
            .collect();
        let theme = ColorfulTheme::default();

        let answer = if many {
            MultiSelect::with_theme(&theme)
                .with_prompt(placeholder)
                .items(&labels)
                .interact_opt()
                .map(|picked| picked.map_or(Selection::Cancelled, Selection::Multi))
        } else {
            Select::with_theme(&theme)
                .with_prompt(placeholder)
                .items(&labels)
                .default(0)
                .interact_opt()
                .map(|picked| picked.map_or(Selection::Cancelled, Selection::Single))
        };

        answer.unwrap_or_else(|e| {
            tracing::warn!("Picker failed: {}", e);
            Selection::Cancelled
        })
    }

    fn open(&mut self, path: &Path) -> Result<(), HostError> {
        // stdout carries only the path, so `$EDITOR $(dbtsuite ...)` works
        println!("{}", path.display());
        Ok(())
    }

    fn run_in_terminal(&mut self, command: &str) -> Result<(), HostError> {
        if self.dry_run {
            println!("{}", command);
            return Ok(());
        }

        eprintln!("{} {}", "Running".cyan(), command.bold());

        let status = shell(command)
            .status()
            .map_err(|source| HostError::Terminal {
                command: command.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(HostError::CommandFailed {
                command: command.to_string(),
                status: status.to_string(),
            })
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
