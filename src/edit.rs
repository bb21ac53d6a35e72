use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// All patch operations (imports, dependency statements, route statements)
/// compile down to this single primitive. Intelligence lives in span
/// acquisition against the syntax tree, not in the application logic.
///
/// A `Splice` is applied to the in-memory source buffer held by a patch
/// session; the session persists the whole buffer at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until apply() is called"]
pub struct Splice {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: SpliceVerification,
}

/// Verification strategy for splice safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl SpliceVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            SpliceVerification::ExactMatch(expected) => text == expected,
            SpliceVerification::Hash(expected_hash) => {
                let actual_hash = xxh3_64(text.as_bytes());
                actual_hash == *expected_hash
            }
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            SpliceVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            SpliceVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in buffer of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("splice boundary is not a UTF-8 character boundary at byte {at}")]
    NotCharBoundary { at: usize },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Splice {
    /// Create a replacement splice with automatic verification generation.
    pub fn replace(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: SpliceVerification::from_text(expected_before),
        }
    }

    /// Create a zero-width insertion at the given offset.
    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self {
            byte_start: at,
            byte_end: at,
            new_text: new_text.into(),
            expected_before: SpliceVerification::ExactMatch(String::new()),
        }
    }

    /// Validate the splice against the current buffer contents.
    fn validate<'a>(&self, source: &'a str) -> Result<&'a str, SpliceError> {
        if self.byte_start > self.byte_end || self.byte_end > source.len() {
            return Err(SpliceError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: source.len(),
            });
        }

        for at in [self.byte_start, self.byte_end] {
            if !source.is_char_boundary(at) {
                return Err(SpliceError::NotCharBoundary { at });
            }
        }

        let current = &source[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(SpliceError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this splice to a source buffer, returning the new buffer.
    ///
    /// The input is left untouched on failure.
    pub fn apply(&self, source: &str) -> Result<String, SpliceError> {
        self.validate(source)?;

        let mut out = String::with_capacity(
            source.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&source[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&source[self.byte_end..]);

        Ok(out)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// This ensures crash safety - either the full write succeeds or nothing
/// changes. The mtime is bumped afterwards so file watchers that key on
/// timestamps notice the rewrite.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), SpliceError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        SpliceError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;

    temp.write_all(content)?;

    // Flush to disk (fsync)
    temp.as_file().sync_all()?;

    // Atomic rename
    temp.persist(path).map_err(|e| e.error)?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;

    Ok(())
}
