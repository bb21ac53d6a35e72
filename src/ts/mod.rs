//! Tree-sitter integration for parsing Go source.
//!
//! This module provides CST-based access to generated Go files, enabling
//! precise byte-span location of declarations and statements without losing
//! comments or formatting.

pub mod errors;
pub mod parser;

pub use errors::ParseError;
pub use parser::{ErrorNode, GoParser, ParsedSource};
