//! Integration tests for commands over an on-disk project

use dbtsuite_core::{Config, Notice, Notifier};
use dbtsuite_dbt::WorkspaceCache;
use dbtsuite_engine::{CommandOutcome, Commands, Document, Host, HostError, PickItem, Selection};
use std::fs;
use std::path::{Path, PathBuf};

/// Host that always picks the last item
#[derive(Default)]
struct LastPickHost {
    notices: Vec<Notice>,
    opened: Vec<PathBuf>,
}

impl Notifier for LastPickHost {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

impl Host for LastPickHost {
    fn pick(&mut self, _placeholder: &str, items: &[PickItem], many: bool) -> Selection<usize> {
        match items.len() {
            0 => Selection::Cancelled,
            n if many => Selection::Multi(vec![n - 1]),
            n => Selection::Single(n - 1),
        }
    }

    fn open(&mut self, path: &Path) -> Result<(), HostError> {
        self.opened.push(path.to_path_buf());
        Ok(())
    }

    fn run_in_terminal(&mut self, _command: &str) -> Result<(), HostError> {
        Ok(())
    }
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn navigate_project_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "seeds/raw_orders.csv", "id\n1\n");
    write(root, "models/staging/stg_orders.sql", "select * from {{ ref('raw_orders') }}");
    write(root, "models/orders.sql", "select * from {{ ref('stg_orders') }}");
    write(root, "models/order_items.sql", "select * from {{ ref('stg_orders') }}");

    let config = Config::discover(root).unwrap();
    let cache = WorkspaceCache::open(root, config.project.clone()).unwrap();
    let snapshot = cache.snapshot().unwrap();
    let commands = Commands::new(Some(&snapshot), &config);

    // downstream of the staging model: order_items, orders (discovery order)
    let stg_path = root.join("models/staging/stg_orders.sql");
    let document = Document::new(&stg_path, fs::read_to_string(&stg_path).unwrap());
    let mut host = LastPickHost::default();
    let outcome = commands.goto_downstream(&mut host, Some(&document)).unwrap();
    assert_eq!(outcome, CommandOutcome::Opened(root.join("models/orders.sql")));

    // upstream of the staging model is the seed
    let mut host = LastPickHost::default();
    let outcome = commands.goto_upstream(&mut host, Some(&document)).unwrap();
    assert_eq!(outcome, CommandOutcome::Opened(root.join("seeds/raw_orders.csv")));
    assert!(host.notices.is_empty());
    assert_eq!(host.opened, vec![root.join("seeds/raw_orders.csv")]);
}

#[test]
fn build_command_uses_configured_executable() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "dbtsuite.toml", "[build]\nexecutable = \"uv run dbt\"\n");
    write(root, "models/orders.sql", "select 1");

    let config = Config::discover(root).unwrap();
    let cache = WorkspaceCache::open(root, config.project.clone()).unwrap();
    let snapshot = cache.snapshot().unwrap();
    let commands = Commands::new(Some(&snapshot), &config);

    // last mode label is "upstream"
    let mut host = LastPickHost::default();
    let outcome = commands.build(&mut host).unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Ran("uv run dbt build --select +orders".to_string())
    );
}
