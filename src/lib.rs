//! Wirepatch: structural source patching for generated Go projects
//!
//! The post-generation half of a project scaffolder: once a project has
//! been generated, schematics wire new contexts into it by patching the
//! existing source rather than regenerating it.
//!
//! # Architecture
//!
//! All mutations compile down to a single primitive: [`Splice`], a verified
//! byte-span replacement. Intelligence lives in span acquisition (tree-sitter
//! parsing, anchor location, canonical-form dedup), not in the application
//! logic. Declarations a patch does not touch keep their exact bytes.
//!
//! # Safety
//!
//! - Splices verify expected before-text before applying
//! - A spliced buffer is adopted only after it re-parses cleanly
//! - Atomic file writes (tempfile + fsync + rename)
//! - Project boundary enforcement
//! - Idempotent operations
//!
//! # Example
//!
//! ```no_run
//! use wirepatch::{apply_patch, AnchorSpec, PatchRequest};
//!
//! let request = PatchRequest::AddStatementAfterAnchor {
//!     source: "router.POST(\"/login\", authHandler.Login)".to_string(),
//! };
//!
//! match apply_patch("internal/server/routes.go", &AnchorSpec::default(), &request) {
//!     Ok(outcome) => println!("Patch outcome: {:?}", outcome),
//!     Err(e) => eprintln!("Patch failed: {}", e),
//! }
//! ```

pub mod config;
pub mod edit;
pub mod patch;
pub mod safety;
pub mod ts;

// Re-exports
pub use config::{
    apply_script, check_script, load_manifest_from_path, load_script_from_path,
    load_script_from_str, matches_requirement, ActionResult, ApplicationError, ConfigError,
    ProjectManifest, WiringScript, MANIFEST_FILE,
};
pub use edit::{Splice, SpliceError, SpliceVerification};
pub use patch::{
    apply_patch, AnchorSpec, ImportSpec, PatchError, PatchOutcome, PatchRequest, PatchSession,
};
pub use safety::{ProjectGuard, SafetyError};
pub use ts::{GoParser, ParseError, ParsedSource};
