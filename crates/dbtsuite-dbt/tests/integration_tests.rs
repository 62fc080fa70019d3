//! Integration tests for project scanning and the model graph

use dbtsuite_core::{ProjectConfig, RecordingNotifier};
use dbtsuite_dbt::{
    extract_selection, Navigation, ResolveOptions, Resolver, WorkspaceCache,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn jaffle_shop(root: &Path) {
    write(root, "seeds/raw_customers.csv", "id,name\n1,a\n");
    write(root, "seeds/raw_orders.csv", "id,customer_id\n1,1\n");
    write(
        root,
        "models/staging/stg_customers.sql",
        "select * from {{ ref('raw_customers') }}",
    );
    write(
        root,
        "models/staging/stg_orders.sql",
        "select * from {{ ref('raw_orders') }}",
    );
    write(
        root,
        "models/customers.sql",
        "with customers as (\n  select * from {{ ref('stg_customers') }}\n),\n\
         orders as (\n  select * from {{ ref('stg_orders') }}\n),\n\
         first_orders as (\n  select * from {{ ref('stg_orders') }}\n)\n\
         select * from customers",
    );
    write(
        root,
        "models/orders.sql",
        "select * from {{ ref('stg_orders') }} left join {{ ref('legacy_payments') }}",
    );
}

#[test]
fn build_project_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    jaffle_shop(dir.path());

    let cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
    let snapshot = cache.snapshot().expect("project has a models directory");

    let names: Vec<&str> = snapshot
        .registry
        .models()
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["customers", "orders", "stg_customers", "stg_orders", "raw_customers", "raw_orders"]
    );

    assert_eq!(snapshot.downstream.downstream("stg_orders"), ["customers", "customers", "orders"]);
    assert_eq!(snapshot.downstream.downstream("raw_orders"), ["stg_orders"]);
    // referenced but never discovered
    assert_eq!(snapshot.downstream.downstream("legacy_payments"), ["orders"]);
    assert!(snapshot.registry.get("legacy_payments").is_none());

    let graph = snapshot.graph();
    assert_eq!(
        graph.all_downstream("raw_orders"),
        vec!["stg_orders", "customers", "orders"]
    );
}

#[test]
fn every_upstream_edge_is_mirrored_downstream() {
    let dir = tempfile::tempdir().unwrap();
    jaffle_shop(dir.path());

    let cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
    let snapshot = cache.snapshot().unwrap();

    for model in snapshot.registry.models() {
        for upstream in &model.upstream_models {
            let expected = model
                .upstream_models
                .iter()
                .filter(|u| *u == upstream)
                .count();
            let actual = snapshot
                .downstream
                .downstream(upstream)
                .iter()
                .filter(|d| **d == model.name)
                .count();
            assert_eq!(actual, expected, "{} -> {}", upstream, model.name);
        }
        assert!(snapshot.downstream.contains(&model.name));
    }
}

#[test]
fn selection_resolves_to_single_jump() {
    let dir = tempfile::tempdir().unwrap();
    jaffle_shop(dir.path());

    let cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
    let snapshot = cache.snapshot().unwrap();
    let resolver = Resolver::new(ResolveOptions::default());
    let mut notifier = RecordingNotifier::new();

    let candidates = extract_selection("ref('stg_orders");
    let resolved = resolver.resolve(&candidates, &snapshot.registry, &mut notifier);

    assert_eq!(resolver.next_step(resolved), Navigation::Jump("stg_orders".to_string()));
    assert!(notifier.notices.is_empty());
}

#[test]
fn workspace_without_models_has_no_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "seeds/raw_orders.csv", "id\n");

    let cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
    assert!(cache.snapshot().is_none());
}
