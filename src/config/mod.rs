//! Wiring scripts: the orchestration layer that sequences patch requests.
//!
//! A script carries the ordered `add-import` / `add-dependency` /
//! `add-route` actions a schematic uses to hook a new context into
//! generated source, plus the anchor convention and an optional generator
//! version gate.

pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{apply_script, check_script, ActionResult, ApplicationError};
pub use loader::{
    load_manifest_from_path, load_script_from_path, load_script_from_str, ConfigError,
};
pub use schema::{
    ActionDefinition, ActionOp, AnchorConfig, Metadata, ProjectManifest, WiringScript,
    MANIFEST_FILE,
};
pub use version::matches_requirement;
