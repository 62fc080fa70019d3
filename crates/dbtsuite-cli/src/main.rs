use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use dbtsuite_core::Config;
use dbtsuite_dbt::{BuildModes, Snapshot, WorkspaceCache};
use dbtsuite_engine::{find_cte_symbols, CommandOutcome, Commands, Document};

mod terminal;

use terminal::TerminalHost;

/// dbtsuite - navigate and build dbt models from the terminal
#[derive(Parser)]
#[command(name = "dbtsuite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: <project-dir>/dbtsuite.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// dbt project root (default: current directory)
    #[arg(short, long, global = true)]
    project_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every model and seed with its reference counts
    Models {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the path of a model referenced by a file
    Upstream {
        /// Model file to read refs from
        file: PathBuf,
    },

    /// Print the path of a model that references a file
    Downstream {
        /// Model file whose dependents to list
        file: PathBuf,
    },

    /// Print the path of the model named by (possibly partial) ref text
    Goto {
        /// Selected text, e.g. `stg_orders`, `ref('stg_orders` or a full ref
        text: String,
    },

    /// Show transitive upstream and downstream models
    Lineage {
        /// Model name
        model: String,
    },

    /// List the CTEs defined in a model file
    Symbols {
        /// Model file
        file: PathBuf,

        /// Print JSON instead of a list
        #[arg(long)]
        json: bool,
    },

    /// Run `dbt build --select` for chosen models
    Build {
        /// Models to build (prompted for when omitted)
        models: Vec<String>,

        /// Include upstream models (`+model`)
        #[arg(short, long)]
        upstream: bool,

        /// Include downstream models (`model+`)
        #[arg(short, long)]
        downstream: bool,

        /// Print the command instead of running it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.project_dir.as_deref(), cli.verbose)?;
    let root = std::fs::canonicalize(&config.project_root).with_context(|| {
        format!("Project directory {} not found", config.project_root.display())
    })?;

    if cli.verbose {
        eprintln!("{} {}", "Scanning".cyan(), root.display());
    }

    let cache = WorkspaceCache::open(&root, config.project.clone())
        .context("Failed to scan dbt project")?;
    let snapshot = cache.snapshot();

    if cli.verbose {
        if let Some(snapshot) = &snapshot {
            eprintln!("{} {} models", "Found".cyan(), snapshot.registry.len());
        }
    }

    let dry_run = matches!(cli.command, Command::Build { dry_run: true, .. });
    let mut host = TerminalHost::new(dry_run);
    let commands = Commands::new(snapshot.as_deref(), &config);

    let outcome = match cli.command {
        Command::Models { json } => return models_command(&mut host, snapshot.as_deref(), json),
        Command::Lineage { model } => {
            return lineage_command(&mut host, snapshot.as_deref(), &model)
        }
        Command::Symbols { file, json } => return symbols_command(&file, json),
        Command::Upstream { file } => {
            let document = read_document(&file)?;
            commands.goto_upstream(&mut host, Some(&document))?
        }
        Command::Downstream { file } => {
            let document = read_document(&file)?;
            commands.goto_downstream(&mut host, Some(&document))?
        }
        Command::Goto { text } => commands.goto_model(&mut host, &text)?,
        Command::Build {
            models,
            upstream,
            downstream,
            ..
        } => {
            if models.is_empty() && host.is_interactive() {
                commands.build(&mut host)?
            } else {
                let modes = BuildModes {
                    upstream,
                    downstream,
                };
                commands.build_models(&mut host, &models, modes)?
            }
        }
    };

    if outcome == CommandOutcome::Aborted {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Explicit config file, else `<project>/dbtsuite.toml`, else defaults
fn load_config(
    config_path: Option<&Path>,
    project_dir: Option<&Path>,
    verbose: bool,
) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let root = project_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
            if verbose && !root.join(dbtsuite_core::config::CONFIG_FILE_NAME).exists() {
                eprintln!("{}", "No config file found, using defaults".yellow());
            }
            Config::discover(&root)?
        }
    };

    if let Some(dir) = project_dir {
        config.project_root = dir.to_path_buf();
    } else if config.project_root.as_os_str().is_empty() {
        config.project_root = PathBuf::from(".");
    }

    Ok(config)
}

fn read_document(file: &Path) -> Result<Document> {
    let path = std::fs::canonicalize(file)
        .with_context(|| format!("File not found: {}", file.display()))?;
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::new(path, text))
}

#[derive(Serialize)]
struct ModelRow<'a> {
    name: &'a str,
    kind: String,
    path: String,
    upstream: &'a [String],
    downstream: &'a [String],
}

/// Models command - list the registry
fn models_command(host: &mut TerminalHost, snapshot: Option<&Snapshot>, json: bool) -> Result<()> {
    use dbtsuite_core::{Notice, Notifier};

    let Some(snapshot) = snapshot else {
        host.notify(Notice::workspace_not_supported());
        std::process::exit(1);
    };

    let rows: Vec<ModelRow> = snapshot
        .registry
        .models()
        .iter()
        .map(|m| ModelRow {
            name: &m.name,
            kind: m.kind.to_string(),
            path: m.relative_path.display().to_string(),
            upstream: &m.upstream_models,
            downstream: snapshot.downstream.downstream(&m.name),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in &rows {
        println!(
            "{}  {:<5}  {:>3} up  {:>3} down  {}",
            format!("{:<width$}", row.name, width = width).green(),
            row.kind,
            row.upstream.len(),
            row.downstream.len(),
            row.path.dimmed(),
        );
    }
    eprintln!("{} models", rows.len());

    Ok(())
}

/// Lineage command - transitive upstream/downstream of a model
fn lineage_command(
    host: &mut TerminalHost,
    snapshot: Option<&Snapshot>,
    model: &str,
) -> Result<()> {
    use dbtsuite_core::{Notice, Notifier};

    let Some(snapshot) = snapshot else {
        host.notify(Notice::workspace_not_supported());
        std::process::exit(1);
    };

    if !snapshot.registry.contains(model) && !snapshot.downstream.contains(model) {
        host.notify(Notice::model_not_found(model));
        std::process::exit(1);
    }

    let graph = snapshot.graph();
    let upstream = graph.all_upstream(model);
    let downstream = graph.all_downstream(model);

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Model Lineage".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Model:".bold(), model.green());
    println!();

    print_lineage_section("Upstream models", &upstream, snapshot);
    print_lineage_section("Downstream models", &downstream, snapshot);

    println!("{}", "=".repeat(60).bright_blue());

    Ok(())
}

fn print_lineage_section(title: &str, names: &[String], snapshot: &Snapshot) {
    println!("{} {}", format!("{}:", title).bold(), names.len());

    if names.is_empty() {
        println!("  {}", "(none)".dimmed());
    }

    for (i, name) in names.iter().enumerate() {
        let info = snapshot
            .registry
            .get(name)
            .map(|m| format!("{} ({})", name, m.relative_path.display()))
            .unwrap_or_else(|| format!("{} (not in project)", name));

        println!("  {}. {}", i + 1, info.yellow());
    }

    println!();
}

/// Symbols command - list CTE definitions
fn symbols_command(file: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let symbols = find_cte_symbols(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&symbols)?);
        return Ok(());
    }

    for symbol in &symbols {
        println!(
            "{}:{}:{}  {}",
            file.display(),
            symbol.position.line + 1,
            symbol.position.character + 1,
            symbol.name.green()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn build_flags_parse() {
        let cli =
            Cli::try_parse_from(["dbtsuite", "build", "orders", "-u", "-d", "--dry-run"]).unwrap();
        match cli.command {
            Command::Build {
                models,
                upstream,
                downstream,
                dry_run,
            } => {
                assert_eq!(models, vec!["orders".to_string()]);
                assert!(upstream && downstream && dry_run);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn config_defaults_to_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dbtsuite.toml"),
            "[project]\nmodels_dir = \"transform\"\n",
        )
        .unwrap();

        let config = load_config(None, Some(dir.path()), false).unwrap();
        assert_eq!(config.project.models_dir, "transform");
        assert_eq!(config.project_root, dir.path());
    }
}
