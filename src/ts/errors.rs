use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to set Go language for parser")]
    LanguageSet,

    #[error("failed to parse Go source")]
    ParseFailed,

    #[error("syntax error at line {line}, column {column} (bytes {byte_start}..{byte_end})")]
    Syntax {
        byte_start: usize,
        byte_end: usize,
        line: usize,
        column: usize,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
