//! Unified error type for the ffmatrix workspace.
//!
//! All crates funnel their failures into [`Error`]. Only a handful of
//! variants are fatal to a run; most are recovered locally (an excluded
//! catalog entry, a `false` probe verdict, a dropped stream) and exist so
//! the CLI can print an actionable message.

use std::fmt;
use std::path::PathBuf;

/// Unified error type covering all failure modes in ffmatrix.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external tool (ffmpeg, ffprobe) could not be found or failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media inspection failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A tool listing or help text could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The compatibility matrix file does not exist yet.
    #[error("Compatibility matrix not found at {}; run `ffmatrix build` first", path.display())]
    MatrixNotBuilt {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A container was queried that has no entry in the matrix.
    #[error("No matrix entry for container format '{0}'")]
    EntryNotFound(String),

    /// No stream of the source file maps to a codec known to the catalog.
    #[error("No supported stream: {0}")]
    NoSupportedStream(String),

    /// Request or configuration data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Parse`].
    pub fn parse(message: impl fmt::Display) -> Self {
        Error::Parse(message.to_string())
    }

    /// Convenience constructor for [`Error::MatrixNotBuilt`].
    pub fn matrix_not_built(path: impl Into<PathBuf>) -> Self {
        Error::MatrixNotBuilt { path: path.into() }
    }

    /// True for the error classes that should terminate a run with a
    /// non-zero exit: a missing tool/binary or an I/O failure on a path
    /// the caller named. Everything else degrades gracefully.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Tool { .. } | Error::Io { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert!(err.is_fatal());
    }

    #[test]
    fn probe_display() {
        let err = Error::Probe("corrupt header".into());
        assert_eq!(err.to_string(), "Probe error: corrupt header");
        assert!(!err.is_fatal());
    }

    #[test]
    fn parse_display() {
        let err = Error::parse("no separator line");
        assert_eq!(err.to_string(), "Parse error: no separator line");
    }

    #[test]
    fn matrix_not_built_mentions_build() {
        let err = Error::matrix_not_built("/data/matrix.json");
        let msg = err.to_string();
        assert!(msg.contains("/data/matrix.json"));
        assert!(msg.contains("ffmatrix build"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn entry_not_found_display() {
        let err = Error::EntryNotFound("mp4".into());
        assert_eq!(err.to_string(), "No matrix entry for container format 'mp4'");
    }

    #[test]
    fn no_supported_stream_display() {
        let err = Error::NoSupportedStream("no video or audio codec recognized".into());
        assert!(err.to_string().starts_with("No supported stream"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);

        fn err_fn() -> Result<i32> {
            Err(Error::Internal("boom".into()))
        }
        assert!(err_fn().is_err());
    }
}
