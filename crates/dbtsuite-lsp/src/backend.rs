//! LSP backend implementation for dbtsuite
//!
//! Holds the open documents and one cached model snapshot for the workspace
//! folder. Requests read the current snapshot; rebuilds happen off to the
//! side on a blocking thread and replace it in one write.

use crate::host::{action_titles, answer_for, Prompt, ReplayHost};
use dbtsuite_core::config::CONFIG_FILE_NAME;
use dbtsuite_core::{Config, Severity};
use dbtsuite_dbt::{ref_at_offset, BuildModes, Snapshot, WorkspaceCache};
use dbtsuite_engine::{
    find_cte_symbols, offset_at, position_at, CommandOutcome, Commands, Document, HostError,
    Selection, TextPosition,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions, DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    DocumentSymbolParams, DocumentSymbolResponse, ExecuteCommandOptions, ExecuteCommandParams,
    FileChangeType, FileSystemWatcher, GlobPattern, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverContents, HoverParams, HoverProviderCapability,
    InitializeParams, InitializeResult, InitializedParams, Location, MarkupContent, MarkupKind,
    MessageActionItem, MessageType, OneOf, Position, Range, Registration, ServerCapabilities,
    ServerInfo, ShowDocumentParams, SymbolInformation, SymbolKind, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url, WatchKind,
    WorkDoneProgressOptions, WorkspaceFoldersServerCapabilities, WorkspaceServerCapabilities,
};
use tower_lsp::{Client, LanguageServer};

/// Commands accepted by `workspace/executeCommand`
pub const COMMANDS: &[&str] = &[
    "dbtsuite.build",
    "dbtsuite.gotoUpstream",
    "dbtsuite.gotoDownstream",
    "dbtsuite.gotoModel",
    "dbtsuite.rebuild",
];

/// Upper bound on client round trips for one command
const MAX_PROMPTS: usize = 4;

type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Config and model cache for the open workspace folder
#[derive(Debug, Clone)]
struct Workspace {
    config: Config,
    cache: WorkspaceCache,
    /// Bumped on open and at the start of every rebuild
    generation: u64,
}

impl Workspace {
    fn load(root: PathBuf) -> std::result::Result<Self, LoadError> {
        let config = Config::discover(&root)?;
        let cache = WorkspaceCache::open(&root, config.project.clone())?;
        Ok(Self {
            config,
            cache,
            generation: 0,
        })
    }
}

/// Claim the workspace for a rebuild, returning the cache to rebuild
fn begin_rebuild(slot: &mut Option<Workspace>, generation: u64) -> Option<WorkspaceCache> {
    let ws = slot.as_mut()?;
    ws.generation = generation;
    Some(ws.cache.clone())
}

/// Install a rebuilt cache unless a reload or newer rebuild came after it
fn install_rebuild(slot: &mut Option<Workspace>, generation: u64, cache: WorkspaceCache) -> bool {
    match slot.as_mut() {
        Some(ws) if ws.generation == generation => {
            ws.cache = cache;
            true
        }
        _ => false,
    }
}

/// Arguments of `dbtsuite.build`; with no models the user is prompted
#[derive(Debug, Default, Deserialize)]
struct BuildArgs {
    #[serde(default)]
    models: Vec<String>,
    #[serde(default)]
    upstream: bool,
    #[serde(default)]
    downstream: bool,
}

#[derive(Debug)]
enum ServerCommand {
    Build(BuildArgs),
    GotoUpstream(Option<Url>),
    GotoDownstream(Option<Url>),
    GotoModel(String),
    Rebuild,
}

impl ServerCommand {
    fn parse(command: &str, arguments: &[Value]) -> std::result::Result<Self, String> {
        let first = arguments.first();
        let uri = || first.and_then(Value::as_str).and_then(|s| Url::parse(s).ok());

        match command {
            "dbtsuite.build" => {
                let args = match first {
                    Some(value) => BuildArgs::deserialize(value)
                        .map_err(|e| format!("Invalid build arguments: {}", e))?,
                    None => BuildArgs::default(),
                };
                Ok(Self::Build(args))
            }
            "dbtsuite.gotoUpstream" => Ok(Self::GotoUpstream(uri())),
            "dbtsuite.gotoDownstream" => Ok(Self::GotoDownstream(uri())),
            "dbtsuite.gotoModel" => Ok(Self::GotoModel(
                first.and_then(Value::as_str).unwrap_or_default().to_string(),
            )),
            "dbtsuite.rebuild" => Ok(Self::Rebuild),
            other => Err(format!("Unknown command {}", other)),
        }
    }
}

/// LSP backend for dbtsuite
pub struct Backend {
    /// LSP client for communicating with the editor
    client: Client,
    /// Currently open documents (URI -> text content)
    documents: Arc<RwLock<HashMap<Url, String>>>,
    /// `None` until a workspace folder is known
    workspace: Arc<RwLock<Option<Workspace>>>,
    /// Source of workspace generations
    generation: AtomicU64,
}

impl Backend {
    /// Create a new LSP backend
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            workspace: Arc::new(RwLock::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Load config and models for `root`, replacing the current workspace
    async fn open_workspace(&self, root: Option<PathBuf>) {
        let Some(root) = root else {
            *self.workspace.write().await = None;
            return;
        };

        let display = root.display().to_string();
        let loaded = match tokio::task::spawn_blocking(move || Workspace::load(root)).await {
            Ok(Ok(workspace)) => Some(workspace),
            Ok(Err(e)) => {
                self.client
                    .show_message(MessageType::ERROR, format!("Failed to load {}: {}", display, e))
                    .await;
                None
            }
            Err(e) => {
                tracing::error!("Workspace load task failed: {}", e);
                None
            }
        };

        if let Some(workspace) = &loaded {
            let models = workspace.cache.snapshot().map_or(0, |s| s.registry.len());
            self.client
                .log_message(
                    MessageType::INFO,
                    format!("Loaded {} models from {}", models, display),
                )
                .await;
        }

        let mut slot = self.workspace.write().await;
        *slot = loaded.map(|workspace| Workspace {
            generation: self.next_generation(),
            ..workspace
        });
    }

    /// Rebuild the model cache without blocking readers
    async fn rebuild(&self) {
        let (generation, cache) = {
            let mut slot = self.workspace.write().await;
            let generation = self.next_generation();
            (generation, begin_rebuild(&mut slot, generation))
        };
        let Some(mut cache) = cache else {
            return;
        };

        match tokio::task::spawn_blocking(move || cache.rebuild().map(|()| cache)).await {
            Ok(Ok(cache)) => {
                if !install_rebuild(&mut *self.workspace.write().await, generation, cache) {
                    tracing::debug!("Dropping rebuild {}, superseded", generation);
                }
            }
            Ok(Err(e)) => {
                self.client
                    .show_message(MessageType::ERROR, format!("Failed to rebuild models: {}", e))
                    .await;
            }
            Err(e) => tracing::error!("Rebuild task failed: {}", e),
        }
    }

    async fn root(&self) -> Option<PathBuf> {
        let workspace = self.workspace.read().await;
        workspace.as_ref().map(|ws| ws.cache.root().to_path_buf())
    }

    async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        let workspace = self.workspace.read().await;
        workspace.as_ref().and_then(|ws| ws.cache.snapshot())
    }

    /// Open document text, falling back to the file on disk
    async fn document_text(&self, uri: &Url) -> Option<String> {
        if let Some(text) = self.documents.read().await.get(uri) {
            return Some(text.clone());
        }

        let path = uri.to_file_path().ok()?;
        tokio::fs::read_to_string(path).await.ok()
    }

    /// Model name under the cursor, with the snapshot it resolves against
    async fn name_at(&self, uri: &Url, position: Position) -> Option<(String, Arc<Snapshot>)> {
        let text = self.document_text(uri).await?;
        let snapshot = self.snapshot().await?;

        let offset = offset_at(&text, from_lsp_position(position));
        let name = name_under_cursor(&text, offset)?;
        Some((name, snapshot))
    }

    /// Run an engine command, asking the client for each pick it needs
    async fn run_command(&self, command: ServerCommand) -> Result<Option<Value>> {
        let (snapshot, config) = {
            let workspace = self.workspace.read().await;
            match workspace.as_ref() {
                Some(ws) => (ws.cache.snapshot(), ws.config.clone()),
                None => (None, Config::default()),
            }
        };

        let document = match &command {
            ServerCommand::GotoUpstream(Some(uri)) | ServerCommand::GotoDownstream(Some(uri)) => {
                self.document_text(uri).await.map(|text| Document {
                    path: uri.to_file_path().ok(),
                    text,
                })
            }
            _ => None,
        };

        let mut answers: Vec<Selection<usize>> = Vec::new();
        for _ in 0..=MAX_PROMPTS {
            let mut host = ReplayHost::new(answers.clone());
            let result = {
                let commands = Commands::new(snapshot.as_deref(), &config);
                match &command {
                    ServerCommand::Build(args) if args.models.is_empty() => {
                        commands.build(&mut host)
                    }
                    ServerCommand::Build(args) => {
                        let modes = BuildModes {
                            upstream: args.upstream,
                            downstream: args.downstream,
                        };
                        commands.build_models(&mut host, &args.models, modes)
                    }
                    ServerCommand::GotoUpstream(_) => {
                        commands.goto_upstream(&mut host, document.as_ref())
                    }
                    ServerCommand::GotoDownstream(_) => {
                        commands.goto_downstream(&mut host, document.as_ref())
                    }
                    ServerCommand::GotoModel(text) => commands.goto_model(&mut host, text),
                    ServerCommand::Rebuild => Ok(CommandOutcome::Aborted),
                }
            };

            match host.prompt.take() {
                Some(prompt) => {
                    let title = self.ask(&prompt).await;
                    answers.push(answer_for(&prompt.items, title.as_deref(), prompt.many));
                }
                None => return Ok(self.finish(host, result).await),
            }
        }

        tracing::warn!("Command still prompting after {} answers", MAX_PROMPTS);
        Ok(None)
    }

    /// One pick as a message request; multi-select offers one item, none or all
    async fn ask(&self, prompt: &Prompt) -> Option<String> {
        let actions = action_titles(prompt)
            .into_iter()
            .map(|title| MessageActionItem {
                title,
                properties: HashMap::new(),
            })
            .collect();

        match self
            .client
            .show_message_request(MessageType::INFO, prompt.placeholder.clone(), Some(actions))
            .await
        {
            Ok(choice) => choice.map(|action| action.title),
            Err(e) => {
                tracing::warn!("Prompt failed: {}", e);
                None
            }
        }
    }

    async fn finish(
        &self,
        host: ReplayHost,
        result: std::result::Result<CommandOutcome, HostError>,
    ) -> Option<Value> {
        for notice in host.notices {
            self.client
                .show_message(message_type(notice.severity), notice.message)
                .await;
        }

        match result {
            Ok(CommandOutcome::Opened(path)) => {
                self.show_document(&path).await;
                None
            }
            // the client runs the build in its own terminal
            Ok(CommandOutcome::Ran(command)) => Some(Value::String(command)),
            Ok(CommandOutcome::Aborted) => None,
            Err(e) => {
                self.client.show_message(MessageType::ERROR, e.to_string()).await;
                None
            }
        }
    }

    async fn show_document(&self, path: &Path) {
        let Ok(uri) = Url::from_file_path(path) else {
            tracing::warn!("Not a file path: {}", path.display());
            return;
        };

        let params = ShowDocumentParams {
            uri,
            external: Some(false),
            take_focus: Some(true),
            selection: None,
        };
        if let Err(e) = self.client.show_document(params).await {
            let message = format!("Failed to open {}: {}", path.display(), e);
            self.client.show_message(MessageType::ERROR, message).await;
        }
    }

    async fn register_file_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String("**/*".to_string()),
                kind: Some(WatchKind::Create | WatchKind::Delete),
            }],
        };
        let registration = Registration {
            id: "dbtsuite-watch".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };

        if let Err(e) = self.client.register_capability(vec![registration]).await {
            tracing::warn!("Client refused file watching: {}", e);
        }
    }
}

#[allow(deprecated)]
fn initial_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())
        .and_then(|uri| uri.to_file_path().ok())
}

fn message_type(severity: Severity) -> MessageType {
    match severity {
        Severity::Info => MessageType::INFO,
        Severity::Warn => MessageType::WARNING,
    }
}

fn to_lsp_position(position: TextPosition) -> Position {
    Position::new(position.line, position.character)
}

fn from_lsp_position(position: Position) -> TextPosition {
    TextPosition {
        line: position.line,
        character: position.character,
    }
}

fn is_identifier(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Ref whose span covers `offset`, else the bare identifier there
fn name_under_cursor(text: &str, offset: usize) -> Option<String> {
    if let Some((name, _)) = ref_at_offset(text, offset) {
        return Some(name);
    }

    let offset = offset.min(text.len());
    let start = text[..offset]
        .char_indices()
        .rev()
        .find(|(_, c)| !is_identifier(*c))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let end = text[offset..]
        .find(|c: char| !is_identifier(c))
        .map_or(text.len(), |i| offset + i);

    (start < end).then(|| text[start..end].to_string())
}

fn definition(snapshot: &Snapshot, name: &str) -> Option<Location> {
    let model = snapshot.registry.get(name)?;
    let uri = Url::from_file_path(&model.absolute_path).ok()?;
    Some(Location::new(uri, Range::default()))
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        return "_none_".to_string();
    }
    names
        .iter()
        .map(|n| format!("`{}`", n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn hover_markdown(snapshot: &Snapshot, name: &str) -> Option<String> {
    let model = snapshot.registry.get(name)?;
    let graph = snapshot.graph();

    let mut markdown = format!(
        "**{}** ({})\n\n`{}`\n\n",
        model.name,
        model.kind,
        model.relative_path.display()
    );
    markdown.push_str(&format!("Upstream: {}\n\n", name_list(graph.upstream(name))));
    markdown.push_str(&format!("Downstream: {}\n", name_list(graph.downstream(name))));

    Some(markdown)
}

#[allow(deprecated)]
fn cte_symbols(uri: &Url, text: &str) -> Vec<SymbolInformation> {
    find_cte_symbols(text)
        .into_iter()
        .map(|symbol| {
            let start = to_lsp_position(symbol.position);
            let end = to_lsp_position(position_at(text, symbol.offset + symbol.name.len()));

            SymbolInformation {
                name: symbol.name,
                kind: SymbolKind::STRUCT,
                tags: None,
                deprecated: None,
                location: Location::new(uri.clone(), Range::new(start, end)),
                container_name: None,
            }
        })
        .collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.open_workspace(initial_root(&params)).await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "dbtsuite-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.register_file_watcher().await;

        if self.snapshot().await.is_none() {
            self.client
                .log_message(MessageType::INFO, "No dbt files found in workspace")
                .await;
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents
            .write()
            .await
            .insert(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // full sync: the last change holds the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .write()
                .await
                .insert(params.text_document.uri, change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(text) = params.text {
            self.documents.write().await.insert(uri.clone(), text);
        }

        let Some(file_name) = uri
            .to_file_path()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            return;
        };

        if file_name == CONFIG_FILE_NAME {
            tracing::info!("Config saved, reloading workspace");
            let root = self.root().await;
            self.open_workspace(root).await;
            return;
        }

        // refs may have changed
        let is_project_file = {
            let workspace = self.workspace.read().await;
            workspace.as_ref().is_some_and(|ws| {
                let project = &ws.config.project;
                project.is_model_file(&file_name) || project.is_seed_file(&file_name)
            })
        };
        if is_project_file {
            self.rebuild().await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents
            .write()
            .await
            .remove(&params.text_document.uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let structural = params.changes.iter().any(|change| {
            change.typ == FileChangeType::CREATED || change.typ == FileChangeType::DELETED
        });

        if structural {
            tracing::debug!("{} watched file events", params.changes.len());
            self.rebuild().await;
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let current = self.root().await;
        let added = params
            .event
            .added
            .first()
            .and_then(|folder| folder.uri.to_file_path().ok());
        let removed_current = current.as_ref().is_some_and(|root| {
            params
                .event
                .removed
                .iter()
                .any(|folder| folder.uri.to_file_path().ok().as_ref() == Some(root))
        });

        match added {
            Some(root) => self.open_workspace(Some(root)).await,
            None if removed_current => self.open_workspace(None).await,
            None => {}
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some((name, snapshot)) = self.name_at(&uri, position).await else {
            return Ok(None);
        };

        Ok(hover_markdown(&snapshot, &name).map(|value| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range: None,
        }))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some((name, snapshot)) = self.name_at(&uri, position).await else {
            return Ok(None);
        };

        Ok(definition(&snapshot, &name).map(GotoDefinitionResponse::Scalar))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(text) = self.document_text(&uri).await else {
            return Ok(None);
        };

        Ok(Some(DocumentSymbolResponse::Flat(cte_symbols(&uri, &text))))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let command = ServerCommand::parse(&params.command, &params.arguments)
            .map_err(Error::invalid_params)?;

        if let ServerCommand::Rebuild = command {
            self.rebuild().await;
            return Ok(None);
        }

        self.run_command(command).await
    }
}
