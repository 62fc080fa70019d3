//! Recording host for running engine commands inside the server
//!
//! Engine commands are synchronous but every editor interaction is a
//! request to the client. A command runs against a [`ReplayHost`] holding
//! the answers collected so far. When it reaches a pick with no answer the
//! host records the prompt and cancels; the backend asks the client and
//! runs the command again with one more answer.

use dbtsuite_core::{Notice, Notifier};
use dbtsuite_engine::{Host, HostError, PickItem, Selection};
use std::collections::VecDeque;
use std::path::Path;

/// A pick the command wanted answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub placeholder: String,
    pub items: Vec<PickItem>,
    pub many: bool,
}

#[derive(Debug, Default)]
pub struct ReplayHost {
    answers: VecDeque<Selection<usize>>,
    pub prompt: Option<Prompt>,
    pub notices: Vec<Notice>,
}

impl ReplayHost {
    pub fn new(answers: impl IntoIterator<Item = Selection<usize>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Notifier for ReplayHost {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

impl Host for ReplayHost {
    fn pick(&mut self, placeholder: &str, items: &[PickItem], many: bool) -> Selection<usize> {
        if let Some(answer) = self.answers.pop_front() {
            return answer;
        }

        if self.prompt.is_none() {
            self.prompt = Some(Prompt {
                placeholder: placeholder.to_string(),
                items: items.to_vec(),
                many,
            });
        }
        Selection::Cancelled
    }

    // both are carried out from the command outcome once no pick is pending
    fn open(&mut self, _path: &Path) -> Result<(), HostError> {
        Ok(())
    }

    fn run_in_terminal(&mut self, _command: &str) -> Result<(), HostError> {
        Ok(())
    }
}

/// Action choosing no items of a multi-select prompt
pub const NONE_ACTION: &str = "(none)";
/// Action choosing every item of a multi-select prompt
pub const ALL_ACTION: &str = "(all)";

/// Action title for an item; the description is the unique one when present
pub fn title_of(item: &PickItem) -> &str {
    if item.description.is_empty() {
        item.label.as_str()
    } else {
        item.description.as_str()
    }
}

/// Message actions offered for a prompt
pub fn action_titles(prompt: &Prompt) -> Vec<String> {
    let mut titles: Vec<String> = prompt.items.iter().map(|i| title_of(i).to_string()).collect();
    if prompt.many {
        titles.push(NONE_ACTION.to_string());
        titles.push(ALL_ACTION.to_string());
    }
    titles
}

/// Match a chosen action title back to an item index
pub fn answer_for(items: &[PickItem], title: Option<&str>, many: bool) -> Selection<usize> {
    let Some(title) = title else {
        return Selection::Cancelled;
    };

    if many {
        match title {
            NONE_ACTION => return Selection::Multi(Vec::new()),
            ALL_ACTION => return Selection::Multi((0..items.len()).collect()),
            _ => {}
        }
    }

    match items.iter().position(|item| title_of(item) == title) {
        Some(idx) if many => Selection::Multi(vec![idx]),
        Some(idx) => Selection::Single(idx),
        None => Selection::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtsuite_core::{Config, Model, ModelKind};
    use dbtsuite_dbt::{ModelRegistry, Snapshot};
    use dbtsuite_engine::{CommandOutcome, Commands, Document};
    use std::path::PathBuf;

    fn model(name: &str) -> Model {
        Model {
            name: name.to_string(),
            relative_path: PathBuf::from(format!("models/{}.sql", name)),
            absolute_path: PathBuf::from(format!("/project/models/{}.sql", name)),
            upstream_models: Vec::new(),
            kind: ModelKind::Model,
        }
    }

    #[test]
    fn unanswered_pick_is_recorded_once() {
        let mut host = ReplayHost::new([]);
        let items = vec![PickItem::new("a.sql", "models/a.sql")];

        assert!(host.pick("first", &items, false).is_cancelled());
        assert!(host.pick("second", &items, true).is_cancelled());

        let prompt = host.prompt.unwrap();
        assert_eq!(prompt.placeholder, "first");
        assert!(!prompt.many);
    }

    #[test]
    fn answers_are_consumed_in_order() {
        let mut host = ReplayHost::new([Selection::Multi(vec![1]), Selection::Single(0)]);
        let items = vec![PickItem::new("a", ""), PickItem::new("b", "")];

        assert_eq!(host.pick("modes", &items, true), Selection::Multi(vec![1]));
        assert_eq!(host.pick("models", &items, false), Selection::Single(0));
        assert!(host.prompt.is_none());
    }

    #[test]
    fn answer_for_title() {
        let items = vec![PickItem::new("a.sql", ""), PickItem::new("b.sql", "")];

        assert_eq!(answer_for(&items, Some("b.sql"), false), Selection::Single(1));
        assert_eq!(answer_for(&items, Some("b.sql"), true), Selection::Multi(vec![1]));
        assert!(answer_for(&items, Some("c.sql"), false).is_cancelled());
        assert!(answer_for(&items, None, false).is_cancelled());
    }

    #[test]
    fn same_file_name_in_two_folders() {
        let items = vec![
            PickItem::new("orders.sql", "models/staging/orders.sql"),
            PickItem::new("orders.sql", "models/marts/orders.sql"),
        ];
        let prompt = Prompt {
            placeholder: "Select model".to_string(),
            items: items.clone(),
            many: false,
        };

        assert_eq!(
            action_titles(&prompt),
            vec!["models/staging/orders.sql", "models/marts/orders.sql"]
        );
        let answer = answer_for(&items, Some("models/marts/orders.sql"), false);
        assert_eq!(answer, Selection::Single(1));
    }

    #[test]
    fn multi_select_offers_none_and_all() {
        let items = vec![PickItem::new("downstream", ""), PickItem::new("upstream", "")];
        let prompt = Prompt {
            placeholder: "Selection mode".to_string(),
            items: items.clone(),
            many: true,
        };

        assert_eq!(action_titles(&prompt), vec!["downstream", "upstream", "(none)", "(all)"]);
        assert_eq!(answer_for(&items, Some(NONE_ACTION), true), Selection::Multi(vec![]));
        assert_eq!(answer_for(&items, Some(ALL_ACTION), true), Selection::Multi(vec![0, 1]));
        // single-choice prompts have no such actions
        assert!(answer_for(&items, Some(ALL_ACTION), false).is_cancelled());
    }

    /// Answer each prompt of a build in turn, the way the backend does
    fn replay_build(commands: &Commands, titles: &[&str]) -> (CommandOutcome, ReplayHost) {
        let mut answers = Vec::new();
        loop {
            let mut host = ReplayHost::new(answers.clone());
            let outcome = commands.build(&mut host).unwrap();
            match host.prompt.take() {
                Some(prompt) => {
                    let title = titles.get(answers.len()).copied();
                    answers.push(answer_for(&prompt.items, title, prompt.many));
                }
                None => return (outcome, host),
            }
        }
    }

    #[test]
    fn build_without_modes() {
        let snapshot = Snapshot::new(ModelRegistry::new(vec![model("a"), model("b")]));
        let config = Config::default();
        let commands = Commands::new(Some(&snapshot), &config);

        let (outcome, host) = replay_build(&commands, &[NONE_ACTION, "models/a.sql"]);

        assert_eq!(outcome, CommandOutcome::Ran("dbt build --select a".to_string()));
        assert!(host.notices.is_empty());
    }

    #[test]
    fn build_with_all_modes() {
        let snapshot = Snapshot::new(ModelRegistry::new(vec![model("a"), model("b")]));
        let config = Config::default();
        let commands = Commands::new(Some(&snapshot), &config);

        let (outcome, _) = replay_build(&commands, &[ALL_ACTION, ALL_ACTION]);

        assert_eq!(outcome, CommandOutcome::Ran("dbt build --select +a+ +b+".to_string()));
    }

    #[test]
    fn build_dismissed_prompt_aborts() {
        let snapshot = Snapshot::new(ModelRegistry::new(vec![model("a")]));
        let config = Config::default();
        let commands = Commands::new(Some(&snapshot), &config);

        let (outcome, host) = replay_build(&commands, &[]);

        assert_eq!(outcome, CommandOutcome::Aborted);
        assert_eq!(host.notices[0].message, "No models selected. Aborting dbt build");
    }

    #[test]
    fn prompt_then_replay_opens_answer() {
        let snapshot = Snapshot::new(ModelRegistry::new(vec![model("a"), model("b")]));
        let config = Config::default();
        let commands = Commands::new(Some(&snapshot), &config);
        let document = Document::new(
            "/project/models/c.sql",
            "select * from {{ ref('a') }} join {{ ref('b') }}",
        );

        let mut first = ReplayHost::new([]);
        let outcome = commands.goto_upstream(&mut first, Some(&document)).unwrap();
        assert_eq!(outcome, CommandOutcome::Aborted);
        let prompt = first.prompt.unwrap();
        assert_eq!(prompt.placeholder, "Select upstream model");

        let answer = answer_for(&prompt.items, Some("models/b.sql"), prompt.many);
        let mut second = ReplayHost::new([answer]);
        let outcome = commands.goto_upstream(&mut second, Some(&document)).unwrap();

        assert_eq!(outcome, CommandOutcome::Opened(PathBuf::from("/project/models/b.sql")));
        assert!(second.prompt.is_none());
        assert!(second.notices.is_empty());
    }
}
