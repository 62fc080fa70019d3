//! `dbt build --select` rendering

/// Graph operators applied to every selected model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildModes {
    /// Prefix each model with `+` to include its upstream models
    pub upstream: bool,

    /// Suffix each model with `+` to include its downstream models
    pub downstream: bool,
}

impl BuildModes {
    /// Mode labels offered to the user, in picker order
    pub const LABELS: [&'static str; 2] = ["downstream", "upstream"];

    /// Modes from the labels a user picked
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let has = |label: &str| labels.iter().any(|l| l.as_ref() == label);
        Self {
            upstream: has("upstream"),
            downstream: has("downstream"),
        }
    }

    /// Render one model as a selector term (`+name+`, `name+`, ...)
    pub fn apply(&self, model: &str) -> String {
        format!(
            "{}{}{}",
            if self.upstream { "+" } else { "" },
            model,
            if self.downstream { "+" } else { "" },
        )
    }
}

/// Space-joined selector for the given models
pub fn selector<S: AsRef<str>>(models: &[S], modes: BuildModes) -> String {
    models
        .iter()
        .map(|m| modes.apply(m.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full shell command: `<executable> build --select <selector>`
pub fn build_command<S: AsRef<str>>(executable: &str, models: &[S], modes: BuildModes) -> String {
    format!("{} build --select {}", executable, selector(models, modes))
}
