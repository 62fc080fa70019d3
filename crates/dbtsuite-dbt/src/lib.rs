//! dbt project scanning and model graph construction
//!
//! This crate handles:
//! - Discovering model and seed files under a project root
//! - Extracting `{{ ref('...') }}` references from model text
//! - Building the model registry and its downstream index
//! - Resolving (possibly partial) reference text to known models
//! - Rendering `dbt build --select` selectors

pub mod cache;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod refs;
pub mod registry;
pub mod resolver;
pub mod selector;

pub use cache::{Snapshot, WorkspaceCache};
pub use discovery::discover_files;
pub use error::ProjectError;
pub use graph::{DownstreamIndex, ModelGraph};
pub use refs::{extract_refs, extract_selection, ref_at_offset};
pub use registry::{build_registry, ModelRegistry};
pub use resolver::{Navigation, ResolveOptions, Resolver};
pub use selector::{build_command, selector, BuildModes};
