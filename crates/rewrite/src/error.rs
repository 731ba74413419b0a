//! Error types for rewrite passes and rule configuration.

use std::path::PathBuf;

/// Failure of a rewrite pass. Every variant aborts the pass.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// Writing rewritten output to the session writer failed.
    #[error("failed to write rewritten output: {0}")]
    Io(#[from] std::io::Error),

    /// A rule left the buffer stack at a different depth than it found it, or
    /// popped the root buffer. This is a rule bug, not a document problem.
    #[error("unbalanced buffer stack after <{tag}>: expected depth {expected}, found {actual}")]
    UnbalancedBuffers {
        tag: String,
        expected: usize,
        actual: usize,
    },

    /// `pop_buffer` was called while only the root buffer remained.
    #[error("cannot pop the root output buffer")]
    PopRootBuffer,
}

/// Invalid rule registration or rule configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read rule configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("a rule is already registered for tag <{tag}>")]
    DuplicateRule { tag: String },

    #[error("invalid tag name {name:?}: expected ASCII [A-Za-z][A-Za-z0-9:_-]*")]
    InvalidTagName { name: String },

    #[error("text filter has an empty `find` pattern")]
    EmptyTextFilter,
}
