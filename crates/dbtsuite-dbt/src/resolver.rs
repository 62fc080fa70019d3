//! Resolution of reference candidates to known models

use crate::registry::ModelRegistry;
use dbtsuite_core::{NavigationConfig, Notice, Notifier};

/// Resolution behaviour toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Warn once per candidate that matches no model
    pub warn_on_no_match: bool,

    /// Navigate straight to a lone match instead of prompting
    pub jump_if_single: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        NavigationConfig::default().into()
    }
}

impl From<NavigationConfig> for ResolveOptions {
    fn from(config: NavigationConfig) -> Self {
        Self {
            warn_on_no_match: config.warn_on_no_match,
            jump_if_single: config.jump_if_single,
        }
    }
}

/// What the caller should do with a resolved candidate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Nothing resolved
    Nothing,

    /// Open this model without asking
    Jump(String),

    /// Ask the user to choose among these models
    Prompt(Vec<String>),
}

/// Matches candidate names against the registry by exact name
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Keep the candidates naming a known model, in input order
    ///
    /// Duplicates are kept. Each unmatched candidate produces one warning
    /// when `warn_on_no_match` is on and is dropped silently otherwise.
    pub fn resolve<S, N>(
        &self,
        candidates: &[S],
        registry: &ModelRegistry,
        notifier: &mut N,
    ) -> Vec<String>
    where
        S: AsRef<str>,
        N: Notifier + ?Sized,
    {
        let mut resolved = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let name = candidate.as_ref();
            if registry.contains(name) {
                resolved.push(name.to_string());
            } else if self.options.warn_on_no_match {
                notifier.notify(Notice::model_not_found(name));
            } else {
                tracing::debug!("Dropping unresolved reference {}", name);
            }
        }

        resolved
    }

    /// Decide between jumping, prompting, or giving up
    pub fn next_step(&self, mut resolved: Vec<String>) -> Navigation {
        match resolved.len() {
            0 => Navigation::Nothing,
            1 if self.options.jump_if_single => {
                resolved.pop().map_or(Navigation::Nothing, Navigation::Jump)
            }
            _ => Navigation::Prompt(resolved),
        }
    }
}
