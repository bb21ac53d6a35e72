//! The structural patcher for generated Go source files.
//!
//! A patch session loads one file, locates the wiring function that acts as
//! the insertion target, compiles statement fragments in a synthetic shell,
//! suppresses duplicates by canonical comparison, and splices verified
//! byte-span edits into the buffer before writing it back atomically.

pub mod anchor;
pub mod canon;
pub mod errors;
pub mod fragment;
pub mod imports;
pub mod session;

pub use anchor::AnchorSpec;
pub use errors::PatchError;
pub use imports::ImportSpec;
pub use session::{apply_patch, PatchOutcome, PatchRequest, PatchSession};
