//! User-facing commands
//!
//! Every command either completes its action or shows exactly one notice
//! and returns [`CommandOutcome::Aborted`]. Only host failures (a file that
//! cannot be opened, a build process that cannot be spawned) are errors.

use crate::host::{Host, HostError, PickItem, Selection};
use dbtsuite_core::{Config, Model, Notice, NoticeCode};
use dbtsuite_dbt::{
    build_command, extract_refs, extract_selection, BuildModes, Navigation, Resolver, Snapshot,
};
use std::path::PathBuf;

/// The document the user is working in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Absolute path, when the document is backed by a file
    pub path: Option<PathBuf>,

    /// Full text
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            text: text.into(),
        }
    }
}

/// What a command ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A notice was shown and nothing else happened
    Aborted,

    /// This file was opened
    Opened(PathBuf),

    /// This shell command was run
    Ran(String),
}

/// Commands over one workspace snapshot
pub struct Commands<'a> {
    snapshot: Option<&'a Snapshot>,
    config: &'a Config,
    resolver: Resolver,
}

impl<'a> Commands<'a> {
    /// `snapshot` is `None` when the workspace is not a dbt project
    pub fn new(snapshot: Option<&'a Snapshot>, config: &'a Config) -> Self {
        Self {
            snapshot,
            config,
            resolver: Resolver::new(config.navigation.into()),
        }
    }

    /// Pick build modes and models, then run `dbt build --select ...`
    pub fn build(&self, host: &mut dyn Host) -> Result<CommandOutcome, HostError> {
        let Some(snapshot) = self.require_snapshot(host) else {
            return Ok(CommandOutcome::Aborted);
        };

        let mode_items: Vec<PickItem> = BuildModes::LABELS
            .iter()
            .map(|label| PickItem::new(*label, ""))
            .collect();
        let modes = host.pick("Selection mode", &mode_items, true);

        let models = snapshot.registry.models();
        let model_items: Vec<PickItem> = models.iter().map(model_item).collect();
        let picked = host.pick("Select models to build", &model_items, true);

        let names: Vec<&str> = picked
            .into_vec()
            .into_iter()
            .filter_map(|idx| models.get(idx))
            .map(|m| m.name.as_str())
            .collect();

        if modes.is_cancelled() || names.is_empty() {
            host.notify(Notice::no_models_selected_for_build());
            return Ok(CommandOutcome::Aborted);
        }

        let labels: Vec<&str> = modes
            .into_vec()
            .into_iter()
            .filter_map(|idx| BuildModes::LABELS.get(idx).copied())
            .collect();

        self.run_build(host, &names, BuildModes::from_labels(&labels))
    }

    /// Run `dbt build --select ...` for models chosen up front
    pub fn build_models<S: AsRef<str>>(
        &self,
        host: &mut dyn Host,
        models: &[S],
        modes: BuildModes,
    ) -> Result<CommandOutcome, HostError> {
        if self.require_snapshot(host).is_none() {
            return Ok(CommandOutcome::Aborted);
        }
        if models.is_empty() {
            host.notify(Notice::no_models_selected_for_build());
            return Ok(CommandOutcome::Aborted);
        }

        self.run_build(host, models, modes)
    }

    fn run_build<S: AsRef<str>>(
        &self,
        host: &mut dyn Host,
        models: &[S],
        modes: BuildModes,
    ) -> Result<CommandOutcome, HostError> {
        let command = build_command(&self.config.build.executable, models, modes);
        tracing::info!("Running {}", command);
        host.run_in_terminal(&command)?;
        Ok(CommandOutcome::Ran(command))
    }

    /// Open one of the models the document references
    pub fn goto_upstream(
        &self,
        host: &mut dyn Host,
        document: Option<&Document>,
    ) -> Result<CommandOutcome, HostError> {
        let Some(document) = document else {
            host.notify(Notice::no_active_document());
            return Ok(CommandOutcome::Aborted);
        };

        let candidates = extract_refs(&document.text);
        if candidates.is_empty() {
            host.notify(Notice::no_upstream_models());
            return Ok(CommandOutcome::Aborted);
        }

        let Some(snapshot) = self.require_snapshot(host) else {
            return Ok(CommandOutcome::Aborted);
        };

        let resolved = self.resolver.resolve(&candidates, &snapshot.registry, host);
        if resolved.is_empty() {
            host.notify(Notice::no_upstream_models());
            return Ok(CommandOutcome::Aborted);
        }

        self.navigate(host, snapshot, resolved, "Select upstream model")
    }

    /// Open one of the models that reference the document's model
    pub fn goto_downstream(
        &self,
        host: &mut dyn Host,
        document: Option<&Document>,
    ) -> Result<CommandOutcome, HostError> {
        let Some(path) = document.and_then(|d| d.path.as_deref()) else {
            host.notify(Notice::no_active_document());
            return Ok(CommandOutcome::Aborted);
        };

        let Some(snapshot) = self.require_snapshot(host) else {
            return Ok(CommandOutcome::Aborted);
        };

        let name = snapshot
            .registry
            .by_path(path)
            .map(|m| m.name.clone())
            .or_else(|| Model::name_from_path(path));
        let candidates = name
            .as_deref()
            .map(|n| snapshot.downstream.downstream(n))
            .unwrap_or_default();

        if candidates.is_empty() {
            host.notify(Notice::no_downstream_models());
            return Ok(CommandOutcome::Aborted);
        }

        let resolved = self.resolver.resolve(candidates, &snapshot.registry, host);
        if resolved.is_empty() {
            host.notify(Notice::no_downstream_models());
            return Ok(CommandOutcome::Aborted);
        }

        self.navigate(host, snapshot, resolved, "Select downstream model")
    }

    /// Open the model named by a (possibly partial) selection
    pub fn goto_model(
        &self,
        host: &mut dyn Host,
        selection: &str,
    ) -> Result<CommandOutcome, HostError> {
        let Some(snapshot) = self.require_snapshot(host) else {
            return Ok(CommandOutcome::Aborted);
        };

        let candidates = extract_selection(selection);
        if candidates.is_empty() {
            host.notify(Notice::info(
                NoticeCode::NoMatch,
                format!("Could not find model {}", selection.trim()),
            ));
            return Ok(CommandOutcome::Aborted);
        }

        let resolved = self.resolver.resolve(&candidates, &snapshot.registry, host);
        if resolved.is_empty() {
            // with warnings on, each miss already said the same thing
            if !self.resolver.options().warn_on_no_match {
                host.notify(Notice::info(
                    NoticeCode::NoMatch,
                    format!("Could not find model {}", candidates.join(", ")),
                ));
            }
            return Ok(CommandOutcome::Aborted);
        }

        self.navigate(host, snapshot, resolved, "Select model")
    }

    /// Open the lone match or let the user pick one; `resolved` is non-empty
    fn navigate(
        &self,
        host: &mut dyn Host,
        snapshot: &Snapshot,
        resolved: Vec<String>,
        placeholder: &str,
    ) -> Result<CommandOutcome, HostError> {
        let target = match self.resolver.next_step(resolved) {
            Navigation::Nothing => return Ok(CommandOutcome::Aborted),
            Navigation::Jump(name) => match snapshot.registry.get(&name) {
                Some(model) => model,
                None => {
                    host.notify(Notice::model_not_found(&name));
                    return Ok(CommandOutcome::Aborted);
                }
            },
            Navigation::Prompt(names) => {
                let models: Vec<&Model> = names
                    .iter()
                    .filter_map(|n| snapshot.registry.get(n))
                    .collect();
                let items: Vec<PickItem> = models.iter().map(|m| model_item(m)).collect();

                match host.pick(placeholder, &items, false) {
                    Selection::Single(idx) => match models.get(idx) {
                        Some(model) => *model,
                        None => return Ok(self.nothing_selected(host)),
                    },
                    Selection::Cancelled | Selection::Multi(_) => {
                        return Ok(self.nothing_selected(host));
                    }
                }
            }
        };

        host.open(&target.absolute_path)?;
        Ok(CommandOutcome::Opened(target.absolute_path.clone()))
    }

    fn nothing_selected(&self, host: &mut dyn Host) -> CommandOutcome {
        host.notify(Notice::no_model_selected());
        CommandOutcome::Aborted
    }

    fn require_snapshot(&self, host: &mut dyn Host) -> Option<&'a Snapshot> {
        if self.snapshot.is_none() {
            host.notify(Notice::workspace_not_supported());
        }
        self.snapshot
    }
}

fn model_item(model: &Model) -> PickItem {
    PickItem::new(model.file_name(), model.relative_path.display().to_string())
}
