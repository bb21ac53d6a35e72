use crate::edit::SpliceError;
use crate::ts::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for patch sessions.
///
/// Every variant is fatal to the request that produced it. A failed request
/// never changes the session buffer, so the target file keeps its previous
/// bytes unless a later commit succeeds.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("fragment does not parse as a single Go statement: {snippet:?}")]
    FragmentSyntax { snippet: String },

    #[error("anchor function '{function}' not found in {path}")]
    NoAnchor { function: String, path: PathBuf },

    #[error("no package clause in {path}")]
    MissingPackageClause { path: PathBuf },

    #[error("patch would leave {path} unparseable; splice discarded")]
    BrokenSplice { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("splice error: {0}")]
    Splice(#[from] SpliceError),
}
